//! Database row types. These map directly to SQLite rows and are converted into
//! the shared domain models at the crate boundary.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};
use pinboard_types::models::{
    Board, Bookmark, Comment, ConciseProfile, ItemState, MemberList, Post, TaskStatus, Thing,
    ThingDetail, ThingKind, Visibility,
};
use rusqlite::Row;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid> {
    s.parse().with_context(|| format!("invalid uuid '{}'", s))
}

pub(crate) fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("invalid timestamp '{}'", s))?
        .with_timezone(&Utc))
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
pub(crate) fn time_text(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn from_json<T: DeserializeOwned>(column: &str, s: &str) -> Result<T> {
    serde_json::from_str(s).with_context(|| format!("invalid JSON in column {}", column))
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn parse_state(s: &str) -> Result<ItemState> {
    ItemState::parse(s).ok_or_else(|| anyhow!("unknown state '{}'", s))
}

pub struct ProfileRow {
    pub account_id: i64,
    pub id: String,
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub photo: String,
    pub created_at: String,
}

impl ProfileRow {
    pub const COLUMNS: &'static str =
        "account_id, id, username, password, first_name, last_name, photo, created_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            account_id: row.get(0)?,
            id: row.get(1)?,
            username: row.get(2)?,
            password: row.get(3)?,
            first_name: row.get(4)?,
            last_name: row.get(5)?,
            photo: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    pub fn concise(&self) -> Result<ConciseProfile> {
        Ok(ConciseProfile {
            id: parse_uuid(&self.id)?,
            account_id: self.account_id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            screen_name: self.username.clone(),
            photo: self.photo.clone(),
        })
    }
}

pub struct BoardRow {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub description: String,
    pub visibility: String,
    pub state: String,
    pub password: Option<String>,
    pub parent_id: Option<String>,
    pub tags: String,
    pub likes: String,
    pub comments: String,
    pub created_at: String,
    pub modified_at: String,
}

pub struct MemberRow {
    pub profile_id: String,
    pub list: String,
}

impl BoardRow {
    pub const COLUMNS: &'static str = "id, owner, title, description, visibility, state, password, \
         parent_id, tags, likes, comments, created_at, modified_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            visibility: row.get(4)?,
            state: row.get(5)?,
            password: row.get(6)?,
            parent_id: row.get(7)?,
            tags: row.get(8)?,
            likes: row.get(9)?,
            comments: row.get(10)?,
            created_at: row.get(11)?,
            modified_at: row.get(12)?,
        })
    }

    pub fn into_board(self, members: Vec<MemberRow>) -> Result<Board> {
        let mut board = Board {
            id: parse_uuid(&self.id)?,
            owner: parse_uuid(&self.owner)?,
            title: self.title,
            description: self.description,
            visibility: Visibility::parse(&self.visibility)
                .ok_or_else(|| anyhow!("unknown visibility '{}'", self.visibility))?,
            state: parse_state(&self.state)?,
            password: self.password,
            parent_id: self.parent_id.as_deref().map(parse_uuid).transpose()?,
            admins: vec![],
            authors: vec![],
            viewers: vec![],
            subscribers: vec![],
            guests: vec![],
            blocked: vec![],
            followers: vec![],
            tags: from_json("tags", &self.tags)?,
            likes: from_json("likes", &self.likes)?,
            comments: from_json::<Vec<Comment>>("comments", &self.comments)?,
            created_at: parse_time(&self.created_at)?,
            modified_at: parse_time(&self.modified_at)?,
        };

        for member in members {
            let list = MemberList::parse(&member.list)
                .ok_or_else(|| anyhow!("unknown member list '{}'", member.list))?;
            board.members_mut(list).push(parse_uuid(&member.profile_id)?);
        }
        Ok(board)
    }
}

pub struct PostRow {
    pub id: String,
    pub board_id: String,
    pub owner: String,
    pub title: String,
    pub tags: String,
    pub state: String,
    pub likes: String,
    pub comments: String,
    pub created_at: String,
    pub modified_at: String,
}

impl PostRow {
    pub const COLUMNS: &'static str =
        "id, board_id, owner, title, tags, state, likes, comments, created_at, modified_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            board_id: row.get(1)?,
            owner: row.get(2)?,
            title: row.get(3)?,
            tags: row.get(4)?,
            state: row.get(5)?,
            likes: row.get(6)?,
            comments: row.get(7)?,
            created_at: row.get(8)?,
            modified_at: row.get(9)?,
        })
    }
}

impl TryFrom<PostRow> for Post {
    type Error = anyhow::Error;

    fn try_from(row: PostRow) -> Result<Self> {
        Ok(Post {
            id: parse_uuid(&row.id)?,
            board_id: parse_uuid(&row.board_id)?,
            owner: parse_uuid(&row.owner)?,
            title: row.title,
            tags: from_json("tags", &row.tags)?,
            state: parse_state(&row.state)?,
            likes: from_json("likes", &row.likes)?,
            comments: from_json("comments", &row.comments)?,
            created_at: parse_time(&row.created_at)?,
            modified_at: parse_time(&row.modified_at)?,
        })
    }
}

pub struct ThingRow {
    pub id: String,
    pub board_id: String,
    pub post_id: String,
    pub owner: String,
    pub kind: String,
    pub title: String,
    pub tags: String,
    pub state: String,
    pub pos: Option<i64>,
    pub likes: String,
    pub comments: String,
    pub body: Option<String>,
    pub task_status: Option<String>,
    pub due_date: Option<String>,
    pub file_ext: Option<String>,
    pub file_mime: Option<String>,
    pub file_size: Option<i64>,
    pub file_count: Option<i64>,
    pub created_at: String,
    pub modified_at: String,
}

impl ThingRow {
    pub const COLUMNS: &'static str = "id, board_id, post_id, owner, kind, title, tags, state, pos, \
         likes, comments, body, task_status, due_date, file_ext, file_mime, file_size, file_count, \
         created_at, modified_at";

    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            board_id: row.get(1)?,
            post_id: row.get(2)?,
            owner: row.get(3)?,
            kind: row.get(4)?,
            title: row.get(5)?,
            tags: row.get(6)?,
            state: row.get(7)?,
            pos: row.get(8)?,
            likes: row.get(9)?,
            comments: row.get(10)?,
            body: row.get(11)?,
            task_status: row.get(12)?,
            due_date: row.get(13)?,
            file_ext: row.get(14)?,
            file_mime: row.get(15)?,
            file_size: row.get(16)?,
            file_count: row.get(17)?,
            created_at: row.get(18)?,
            modified_at: row.get(19)?,
        })
    }
}

pub(crate) fn task_status_text(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "TODO",
        TaskStatus::InProgress => "IN_PROGRESS",
        TaskStatus::Done => "DONE",
    }
}

fn parse_task_status(s: &str) -> Result<TaskStatus> {
    match s {
        "TODO" => Ok(TaskStatus::Todo),
        "IN_PROGRESS" => Ok(TaskStatus::InProgress),
        "DONE" => Ok(TaskStatus::Done),
        other => Err(anyhow!("unknown task status '{}'", other)),
    }
}

impl TryFrom<ThingRow> for Thing {
    type Error = anyhow::Error;

    fn try_from(row: ThingRow) -> Result<Self> {
        let kind =
            ThingKind::parse(&row.kind).ok_or_else(|| anyhow!("unknown thing kind '{}'", row.kind))?;
        let detail = match kind {
            ThingKind::Note => ThingDetail::Note {
                body: row.body.unwrap_or_default(),
            },
            ThingKind::Task => ThingDetail::Task {
                status: row
                    .task_status
                    .as_deref()
                    .map(parse_task_status)
                    .transpose()?
                    .unwrap_or_default(),
                due_date: row.due_date.as_deref().map(parse_time).transpose()?,
            },
            ThingKind::File => ThingDetail::File {
                file_ext: row.file_ext.unwrap_or_default(),
                file_mime: row.file_mime.unwrap_or_default(),
                file_size: row.file_size.unwrap_or_default(),
            },
            ThingKind::Collection => ThingDetail::Collection {
                file_count: row.file_count.unwrap_or_default(),
            },
            ThingKind::Board | ThingKind::Post => {
                return Err(anyhow!("things table holds a {} row", kind.as_str()));
            }
        };

        Ok(Thing {
            id: parse_uuid(&row.id)?,
            board_id: parse_uuid(&row.board_id)?,
            post_id: parse_uuid(&row.post_id)?,
            owner: parse_uuid(&row.owner)?,
            title: row.title,
            tags: from_json("tags", &row.tags)?,
            state: parse_state(&row.state)?,
            pos: row.pos,
            likes: from_json("likes", &row.likes)?,
            comments: from_json("comments", &row.comments)?,
            created_at: parse_time(&row.created_at)?,
            modified_at: parse_time(&row.modified_at)?,
            detail,
        })
    }
}

pub struct BookmarkRow {
    pub id: String,
    pub thing_id: String,
    pub profile_id: String,
    pub thing_type: String,
    pub created_at: String,
}

impl TryFrom<BookmarkRow> for Bookmark {
    type Error = anyhow::Error;

    fn try_from(row: BookmarkRow) -> Result<Self> {
        Ok(Bookmark {
            id: parse_uuid(&row.id)?,
            thing_id: parse_uuid(&row.thing_id)?,
            profile_id: parse_uuid(&row.profile_id)?,
            thing_kind: ThingKind::parse(&row.thing_type)
                .ok_or_else(|| anyhow!("unknown thing type '{}'", row.thing_type))?,
            created_at: parse_time(&row.created_at)?,
        })
    }
}
