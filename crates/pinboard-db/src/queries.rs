use anyhow::Result;
use chrono::Utc;
use pinboard_types::models::{Bookmark, ThingKind};
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::Database;
use crate::models::{BookmarkRow, ProfileRow, time_text};

impl Database {
    // -- Profiles --

    /// Returns the new profile's account id.
    pub fn create_profile(
        &self,
        id: Uuid,
        username: &str,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO profiles (id, username, password, first_name, last_name, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    id.to_string(),
                    username,
                    password_hash,
                    first_name,
                    last_name,
                    time_text(Utc::now())
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_profile_by_username(&self, username: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, "username", username))
    }

    pub fn get_profile_by_id(&self, id: Uuid) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, "id", &id.to_string()))
    }

    // -- Bookmarks --

    pub fn get_bookmark(&self, thing_id: Uuid, profile_id: Uuid) -> Result<Option<Bookmark>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, thing_id, profile_id, thing_type, created_at FROM bookmarks
                     WHERE thing_id = ?1 AND profile_id = ?2",
                    [thing_id.to_string(), profile_id.to_string()],
                    |row| {
                        Ok(BookmarkRow {
                            id: row.get(0)?,
                            thing_id: row.get(1)?,
                            profile_id: row.get(2)?,
                            thing_type: row.get(3)?,
                            created_at: row.get(4)?,
                        })
                    },
                )
                .optional()?;
            row.map(Bookmark::try_from).transpose()
        })
    }

    /// Toggle a bookmark: removes if it exists, inserts if not.
    /// Returns the bookmark id when one now exists.
    pub fn toggle_bookmark(
        &self,
        thing_id: Uuid,
        profile_id: Uuid,
        kind: ThingKind,
    ) -> Result<Option<Uuid>> {
        self.with_conn_mut(|conn| {
            let params = [thing_id.to_string(), profile_id.to_string()];
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM bookmarks WHERE thing_id = ?1 AND profile_id = ?2",
                    [&params[0], &params[1]],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing_id) = existing {
                conn.execute("DELETE FROM bookmarks WHERE id = ?1", [&existing_id])?;
                Ok(None)
            } else {
                let id = Uuid::new_v4();
                conn.execute(
                    "INSERT INTO bookmarks (id, thing_id, profile_id, thing_type, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![
                        id.to_string(),
                        params[0],
                        params[1],
                        kind.as_str(),
                        time_text(Utc::now())
                    ],
                )?;
                Ok(Some(id))
            }
        })
    }
}

fn query_profile(conn: &Connection, column: &str, value: &str) -> Result<Option<ProfileRow>> {
    let sql = format!(
        "SELECT {} FROM profiles WHERE {} = ?1",
        ProfileRow::COLUMNS,
        column
    );
    let row = conn.query_row(&sql, [value], ProfileRow::from_row).optional()?;
    Ok(row)
}
