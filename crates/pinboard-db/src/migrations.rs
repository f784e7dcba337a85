use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE profiles (
                account_id  INTEGER PRIMARY KEY AUTOINCREMENT,
                id          TEXT NOT NULL UNIQUE,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                first_name  TEXT NOT NULL DEFAULT '',
                last_name   TEXT NOT NULL DEFAULT '',
                photo       TEXT NOT NULL DEFAULT '',
                created_at  TEXT NOT NULL
            );

            CREATE TABLE boards (
                id          TEXT PRIMARY KEY,
                owner       TEXT NOT NULL,
                title       TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                visibility  TEXT NOT NULL DEFAULT 'PUBLIC',
                state       TEXT NOT NULL DEFAULT 'ACTIVE',
                password    TEXT,
                parent_id   TEXT REFERENCES boards(id),
                tags        TEXT NOT NULL DEFAULT '[]',
                likes       TEXT NOT NULL DEFAULT '[]',
                comments    TEXT NOT NULL DEFAULT '[]',
                created_at  TEXT NOT NULL,
                modified_at TEXT NOT NULL
            );

            CREATE INDEX idx_boards_parent ON boards(parent_id);

            CREATE TABLE board_members (
                board_id    TEXT NOT NULL REFERENCES boards(id),
                profile_id  TEXT NOT NULL,
                list        TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (board_id, profile_id, list)
            );

            CREATE INDEX idx_board_members_profile ON board_members(profile_id);

            CREATE TABLE posts (
                id          TEXT PRIMARY KEY,
                board_id    TEXT NOT NULL REFERENCES boards(id),
                owner       TEXT NOT NULL,
                title       TEXT NOT NULL,
                tags        TEXT NOT NULL DEFAULT '[]',
                state       TEXT NOT NULL DEFAULT 'ACTIVE',
                likes       TEXT NOT NULL DEFAULT '[]',
                comments    TEXT NOT NULL DEFAULT '[]',
                created_at  TEXT NOT NULL,
                modified_at TEXT NOT NULL
            );

            CREATE INDEX idx_posts_board ON posts(board_id, created_at);

            CREATE TABLE things (
                id          TEXT PRIMARY KEY,
                board_id    TEXT NOT NULL REFERENCES boards(id),
                post_id     TEXT NOT NULL REFERENCES posts(id),
                owner       TEXT NOT NULL,
                kind        TEXT NOT NULL,
                title       TEXT NOT NULL DEFAULT '',
                tags        TEXT NOT NULL DEFAULT '[]',
                state       TEXT NOT NULL DEFAULT 'ACTIVE',
                pos         INTEGER,
                likes       TEXT NOT NULL DEFAULT '[]',
                comments    TEXT NOT NULL DEFAULT '[]',
                body        TEXT,
                task_status TEXT,
                due_date    TEXT,
                file_ext    TEXT,
                file_mime   TEXT,
                file_size   INTEGER,
                file_count  INTEGER,
                created_at  TEXT NOT NULL,
                modified_at TEXT NOT NULL
            );

            CREATE INDEX idx_things_board_kind ON things(board_id, kind, created_at);
            CREATE INDEX idx_things_post ON things(post_id);

            CREATE TABLE bookmarks (
                id          TEXT PRIMARY KEY,
                thing_id    TEXT NOT NULL,
                profile_id  TEXT NOT NULL,
                thing_type  TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                UNIQUE(thing_id, profile_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (board invitations)");
        conn.execute_batch(
            "
            CREATE TABLE board_invites (
                id          TEXT PRIMARY KEY,
                board_id    TEXT NOT NULL REFERENCES boards(id),
                sender_id   TEXT NOT NULL,
                invitee_id  TEXT NOT NULL,
                role        TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                UNIQUE(board_id, invitee_id)
            );

            CREATE INDEX idx_board_invites_invitee ON board_invites(invitee_id, created_at);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
