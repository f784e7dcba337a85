use anyhow::{Result, anyhow};
use pinboard_types::models::{BoardInvite, MemberList, Role};
use rusqlite::{OptionalExtension, Row};
use uuid::Uuid;

use crate::Database;
use crate::boards::insert_member;
use crate::models::{parse_time, parse_uuid, time_text};

const COLUMNS: &str = "id, board_id, sender_id, invitee_id, role, created_at";

struct InviteRow {
    id: String,
    board_id: String,
    sender_id: String,
    invitee_id: String,
    role: String,
    created_at: String,
}

impl InviteRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            board_id: row.get(1)?,
            sender_id: row.get(2)?,
            invitee_id: row.get(3)?,
            role: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn into_invite(self) -> Result<BoardInvite> {
        Ok(BoardInvite {
            id: parse_uuid(&self.id)?,
            board_id: parse_uuid(&self.board_id)?,
            sender_id: parse_uuid(&self.sender_id)?,
            invitee_id: parse_uuid(&self.invitee_id)?,
            role: self
                .role
                .parse::<Role>()
                .map_err(|e| anyhow!("invite {}: {}", self.id, e))?,
            created_at: parse_time(&self.created_at)?,
        })
    }
}

impl Database {
    /// `false` when the invitee already has a pending invitation to the board.
    pub fn insert_invite(&self, invite: &BoardInvite) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO board_invites (id, board_id, sender_id, invitee_id, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    invite.id.to_string(),
                    invite.board_id.to_string(),
                    invite.sender_id.to_string(),
                    invite.invitee_id.to_string(),
                    invite.role.as_str(),
                    time_text(invite.created_at),
                ],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_invite(&self, board_id: Uuid, invitee_id: Uuid) -> Result<Option<BoardInvite>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM board_invites WHERE board_id = ?1 AND invitee_id = ?2",
                COLUMNS
            );
            conn.query_row(
                &sql,
                [board_id.to_string(), invitee_id.to_string()],
                InviteRow::from_row,
            )
            .optional()?
            .map(InviteRow::into_invite)
            .transpose()
        })
    }

    /// Move the invitee into `list` and drop the invitation in one transaction.
    pub fn accept_invite(&self, invite: &BoardInvite, list: MemberList) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let (board_id, invitee_id) = (invite.board_id.to_string(), invite.invitee_id.to_string());
            tx.execute(
                "DELETE FROM board_members WHERE board_id = ?1 AND profile_id = ?2 AND list != 'followers'",
                [&board_id, &invitee_id],
            )?;
            insert_member(&tx, invite.board_id, invite.invitee_id, list)?;
            tx.execute(
                "DELETE FROM board_invites WHERE board_id = ?1 AND invitee_id = ?2",
                [&board_id, &invitee_id],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn delete_invite(&self, board_id: Uuid, invitee_id: Uuid) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "DELETE FROM board_invites WHERE board_id = ?1 AND invitee_id = ?2",
                [board_id.to_string(), invitee_id.to_string()],
            )?;
            Ok(())
        })
    }

    pub fn list_invites(&self, invitee_id: Uuid) -> Result<Vec<BoardInvite>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM board_invites WHERE invitee_id = ?1 ORDER BY created_at",
                COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([invitee_id.to_string()], InviteRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(InviteRow::into_invite).collect()
        })
    }
}
