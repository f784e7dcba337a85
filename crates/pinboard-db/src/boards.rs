use anyhow::Result;
use chrono::Utc;
use pinboard_core::ThingFilter;
use pinboard_types::models::{Board, ItemState, MemberList};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params_from_iter};
use uuid::Uuid;

use crate::Database;
use crate::models::{BoardRow, MemberRow, parse_uuid, time_text, to_json};
use crate::things::push_filter;

impl Database {
    pub fn insert_board(&self, board: &Board) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO boards (id, owner, title, description, visibility, state, password,
                                     parent_id, tags, likes, comments, created_at, modified_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                rusqlite::params![
                    board.id.to_string(),
                    board.owner.to_string(),
                    board.title,
                    board.description,
                    board.visibility.as_str(),
                    board.state.as_str(),
                    board.password,
                    board.parent_id.map(|p| p.to_string()),
                    to_json(&board.tags)?,
                    to_json(&board.likes)?,
                    to_json(&board.comments)?,
                    time_text(board.created_at),
                    time_text(board.modified_at),
                ],
            )?;

            for (list, _) in MemberList::PRECEDENCE {
                for profile_id in board.members(list) {
                    insert_member(&tx, board.id, *profile_id, list)?;
                }
            }
            for profile_id in &board.followers {
                insert_member(&tx, board.id, *profile_id, MemberList::Followers)?;
            }

            tx.commit()?;
            Ok(())
        })
    }

    /// Board with its member lists. Hidden boards are only returned when asked for.
    pub fn get_board(&self, id: Uuid, include_hidden: bool) -> Result<Option<Board>> {
        self.with_conn(|conn| query_board(conn, id, include_hidden))
    }

    pub fn child_board_ids(&self, id: Uuid) -> Result<Vec<Uuid>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM boards WHERE parent_id = ?1")?;
            let ids = stmt
                .query_map([id.to_string()], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            ids.iter().map(|s| parse_uuid(s)).collect()
        })
    }

    /// Active children of `parent_id`, newest first.
    pub fn sub_boards(
        &self,
        parent_id: Uuid,
        filter: &ThingFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Board>> {
        self.with_conn(|conn| {
            let mut sql = format!(
                "SELECT {} FROM boards WHERE parent_id = ?1 AND state = 'ACTIVE'",
                BoardRow::COLUMNS
            );
            let mut params = vec![Value::Text(parent_id.to_string())];
            push_filter(&mut sql, &mut params, filter, "boards", false);
            sql.push_str(" ORDER BY created_at DESC, id LIMIT ? OFFSET ?");
            params.push(Value::Integer(limit as i64));
            params.push(Value::Integer(offset as i64));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(params.iter()), BoardRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|row| {
                    let members = query_members(conn, &row.id)?;
                    row.into_board(members)
                })
                .collect()
        })
    }

    pub fn update_board_settings(&self, board: &Board) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE boards SET title = ?2, description = ?3, visibility = ?4, password = ?5,
                                   tags = ?6, modified_at = ?7
                 WHERE id = ?1",
                rusqlite::params![
                    board.id.to_string(),
                    board.title,
                    board.description,
                    board.visibility.as_str(),
                    board.password,
                    to_json(&board.tags)?,
                    time_text(board.modified_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn set_board_state(&self, id: Uuid, state: ItemState) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE boards SET state = ?2, modified_at = ?3 WHERE id = ?1",
                rusqlite::params![id.to_string(), state.as_str(), time_text(Utc::now())],
            )?;
            Ok(())
        })
    }

    /// Move a profile to `list`, removing it from every other role-bearing list.
    pub fn set_member_list(&self, board_id: Uuid, profile_id: Uuid, list: Option<MemberList>) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "DELETE FROM board_members WHERE board_id = ?1 AND profile_id = ?2 AND list != 'followers'",
                [board_id.to_string(), profile_id.to_string()],
            )?;
            if let Some(list) = list {
                insert_member(&tx, board_id, profile_id, list)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn set_follower(&self, board_id: Uuid, profile_id: Uuid, following: bool) -> Result<()> {
        self.with_conn_mut(|conn| {
            if following {
                insert_member(conn, board_id, profile_id, MemberList::Followers)?;
            } else {
                conn.execute(
                    "DELETE FROM board_members WHERE board_id = ?1 AND profile_id = ?2 AND list = 'followers'",
                    [board_id.to_string(), profile_id.to_string()],
                )?;
            }
            Ok(())
        })
    }
}

pub(crate) fn insert_member(conn: &Connection, board_id: Uuid, profile_id: Uuid, list: MemberList) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO board_members (board_id, profile_id, list, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            board_id.to_string(),
            profile_id.to_string(),
            list.as_str(),
            time_text(Utc::now())
        ],
    )?;
    Ok(())
}

fn query_members(conn: &Connection, board_id: &str) -> Result<Vec<MemberRow>> {
    let mut stmt = conn.prepare(
        "SELECT profile_id, list FROM board_members WHERE board_id = ?1 ORDER BY created_at",
    )?;
    let rows = stmt
        .query_map([board_id], |row| {
            Ok(MemberRow {
                profile_id: row.get(0)?,
                list: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_board(conn: &Connection, id: Uuid, include_hidden: bool) -> Result<Option<Board>> {
    let sql = format!("SELECT {} FROM boards WHERE id = ?1", BoardRow::COLUMNS);
    let row = conn
        .query_row(&sql, [id.to_string()], BoardRow::from_row)
        .optional()?;

    let Some(row) = row else {
        return Ok(None);
    };
    if !include_hidden && row.state == ItemState::Hidden.as_str() {
        return Ok(None);
    }
    let members = query_members(conn, &row.id)?;
    Ok(Some(row.into_board(members)?))
}
