use anyhow::Result;
use chrono::{DateTime, Utc};
use pinboard_core::{Page, ThingFilter};
use pinboard_types::models::{Post, Thing, ThingDetail, ThingKind};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params_from_iter};
use uuid::Uuid;

use crate::Database;
use crate::models::{PostRow, ThingRow, from_json, task_status_text, time_text, to_json};

/// Append the listing filters as `AND` clauses with positional `?` parameters.
/// `file_ext` only applies to tables that store it.
pub(crate) fn push_filter(
    sql: &mut String,
    params: &mut Vec<Value>,
    filter: &ThingFilter,
    table: &str,
    has_file_ext: bool,
) {
    if has_file_ext {
        if let Some(ext) = &filter.file_ext {
            sql.push_str(" AND file_ext = ?");
            params.push(Value::Text(ext.clone()));
        }
    }
    if let Some(owner) = filter.owner {
        sql.push_str(" AND owner = ?");
        params.push(Value::Text(owner.to_string()));
    }
    if let Some(day) = filter.upload_date {
        sql.push_str(" AND substr(created_at, 1, 10) = ?");
        params.push(Value::Text(day.format("%Y-%m-%d").to_string()));
    }
    for tag in &filter.tags {
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM json_each({}.tags) WHERE json_each.value = ?)",
            table
        ));
        params.push(Value::Text(tag.clone()));
    }
}

fn collect_things(conn: &Connection, sql: &str, params: &[Value]) -> Result<Vec<Thing>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), ThingRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(Thing::try_from).collect()
}

impl Database {
    // -- Posts --

    pub fn insert_post(&self, post: &Post) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (id, board_id, owner, title, tags, state, likes, comments,
                                    created_at, modified_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    post.id.to_string(),
                    post.board_id.to_string(),
                    post.owner.to_string(),
                    post.title,
                    to_json(&post.tags)?,
                    post.state.as_str(),
                    to_json(&post.likes)?,
                    to_json(&post.comments)?,
                    time_text(post.created_at),
                    time_text(post.modified_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: Uuid) -> Result<Option<Post>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM posts WHERE id = ?1", PostRow::COLUMNS);
            let row = conn
                .query_row(&sql, [id.to_string()], PostRow::from_row)
                .optional()?;
            row.map(Post::try_from).transpose()
        })
    }

    // -- Things --

    pub fn insert_thing(&self, thing: &Thing) -> Result<()> {
        let (mut body, mut task_status, mut due_date) = (None, None, None);
        let (mut file_ext, mut file_mime, mut file_size, mut file_count) = (None, None, None, None);
        match &thing.detail {
            ThingDetail::Note { body: b } => body = Some(b.clone()),
            ThingDetail::Task { status, due_date: d } => {
                task_status = Some(task_status_text(*status));
                due_date = d.map(time_text);
            }
            ThingDetail::File {
                file_ext: e,
                file_mime: m,
                file_size: s,
            } => {
                file_ext = Some(e.clone());
                file_mime = Some(m.clone());
                file_size = Some(*s);
            }
            ThingDetail::Collection { file_count: c } => file_count = Some(*c),
        }

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO things (id, board_id, post_id, owner, kind, title, tags, state, pos,
                                     likes, comments, body, task_status, due_date, file_ext,
                                     file_mime, file_size, file_count, created_at, modified_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                         ?17, ?18, ?19, ?20)",
                rusqlite::params![
                    thing.id.to_string(),
                    thing.board_id.to_string(),
                    thing.post_id.to_string(),
                    thing.owner.to_string(),
                    thing.kind().as_str(),
                    thing.title,
                    to_json(&thing.tags)?,
                    thing.state.as_str(),
                    thing.pos,
                    to_json(&thing.likes)?,
                    to_json(&thing.comments)?,
                    body,
                    task_status,
                    due_date,
                    file_ext,
                    file_mime,
                    file_size,
                    file_count,
                    time_text(thing.created_at),
                    time_text(thing.modified_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_thing(&self, id: Uuid) -> Result<Option<Thing>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM things WHERE id = ?1", ThingRow::COLUMNS);
            let row = conn
                .query_row(&sql, [id.to_string()], ThingRow::from_row)
                .optional()?;
            row.map(Thing::try_from).transpose()
        })
    }

    /// One page of a board's things of `kind`, newest first. Hidden items are excluded.
    pub fn list_things(
        &self,
        board_id: Uuid,
        kind: ThingKind,
        filter: &ThingFilter,
        limit: usize,
    ) -> Result<Page<Thing>> {
        self.with_conn(|conn| {
            let mut clause = String::from(" WHERE board_id = ? AND kind = ? AND state != 'HIDDEN'");
            let mut params = vec![
                Value::Text(board_id.to_string()),
                Value::Text(kind.as_str().to_string()),
            ];
            push_filter(&mut clause, &mut params, filter, "things", true);

            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM things{}", clause),
                params_from_iter(params.iter()),
                |r| r.get(0),
            )?;

            let sql = format!(
                "SELECT {} FROM things{} ORDER BY created_at DESC LIMIT ?",
                ThingRow::COLUMNS,
                clause
            );
            params.push(Value::Integer(limit as i64));
            let items = collect_things(conn, &sql, &params)?;

            let total = total as usize;
            Ok(Page {
                has_more: items.len() < total,
                items,
                total,
            })
        })
    }

    pub fn post_things(&self, post_id: Uuid, kind: ThingKind) -> Result<Vec<Thing>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM things WHERE post_id = ? AND kind = ? AND state != 'HIDDEN'
                 ORDER BY created_at",
                ThingRow::COLUMNS
            );
            collect_things(
                conn,
                &sql,
                &[
                    Value::Text(post_id.to_string()),
                    Value::Text(kind.as_str().to_string()),
                ],
            )
        })
    }

    pub fn recent_things(&self, board_id: Uuid, since: DateTime<Utc>, limit: usize) -> Result<Vec<Thing>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM things WHERE board_id = ? AND state != 'HIDDEN' AND created_at >= ?
                 ORDER BY created_at DESC LIMIT ?",
                ThingRow::COLUMNS
            );
            collect_things(
                conn,
                &sql,
                &[
                    Value::Text(board_id.to_string()),
                    Value::Text(time_text(since)),
                    Value::Integer(limit as i64),
                ],
            )
        })
    }

    /// Distinct tags used by the board's posts and visible things.
    pub fn board_things_tags(&self, board_id: Uuid) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT json_each.value FROM things, json_each(things.tags)
                 WHERE things.board_id = ?1 AND things.state != 'HIDDEN'
                 UNION
                 SELECT DISTINCT json_each.value FROM posts, json_each(posts.tags)
                 WHERE posts.board_id = ?1 AND posts.state != 'HIDDEN'
                 ORDER BY 1",
            )?;
            let tags = stmt
                .query_map([board_id.to_string()], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(tags)
        })
    }

    // -- Likes --

    /// Toggle `profile_id` in the likes of a thing, post or board.
    /// Returns `(liked, total)`, or `None` when no such item exists.
    pub fn toggle_like(&self, item_id: Uuid, profile_id: Uuid) -> Result<Option<(bool, usize)>> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut result = None;

            for table in ["things", "posts", "boards"] {
                let likes: Option<String> = tx
                    .query_row(
                        &format!("SELECT likes FROM {} WHERE id = ?1", table),
                        [item_id.to_string()],
                        |r| r.get(0),
                    )
                    .optional()?;
                let Some(likes) = likes else {
                    continue;
                };

                let mut likes: Vec<Uuid> = from_json("likes", &likes)?;
                let liked = if likes.contains(&profile_id) {
                    likes.retain(|p| *p != profile_id);
                    false
                } else {
                    likes.push(profile_id);
                    true
                };
                tx.execute(
                    &format!("UPDATE {} SET likes = ?2 WHERE id = ?1", table),
                    [item_id.to_string(), to_json(&likes)?],
                )?;
                result = Some((liked, likes.len()));
                break;
            }

            tx.commit()?;
            Ok(result)
        })
    }

    /// Kind of the item with this id, looked up across things, posts and boards.
    pub fn item_kind(&self, item_id: Uuid) -> Result<Option<(ThingKind, Uuid)>> {
        self.with_conn(|conn| {
            let id = item_id.to_string();
            let thing: Option<(String, String)> = conn
                .query_row(
                    "SELECT kind, board_id FROM things WHERE id = ?1",
                    [&id],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )
                .optional()?;
            if let Some((kind, board_id)) = thing {
                let kind = ThingKind::parse(&kind)
                    .ok_or_else(|| anyhow::anyhow!("unknown thing kind '{}'", kind))?;
                return Ok(Some((kind, crate::models::parse_uuid(&board_id)?)));
            }

            let post: Option<String> = conn
                .query_row("SELECT board_id FROM posts WHERE id = ?1", [&id], |r| r.get(0))
                .optional()?;
            if let Some(board_id) = post {
                return Ok(Some((ThingKind::Post, crate::models::parse_uuid(&board_id)?)));
            }

            let board: Option<String> = conn
                .query_row("SELECT id FROM boards WHERE id = ?1", [&id], |r| r.get(0))
                .optional()?;
            Ok(board.map(|_| (ThingKind::Board, item_id)))
        })
    }
}
