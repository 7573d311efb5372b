//! v001 -- Initial schema creation.
//!
//! Creates the `users` and `outlines` tables. An outline row is a whole
//! document: its items live in the `items` column as a JSON array.

use rusqlite::Connection;

const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id              TEXT PRIMARY KEY NOT NULL,
    email           TEXT NOT NULL UNIQUE COLLATE NOCASE,
    name            TEXT NOT NULL,
    hashed_password TEXT NOT NULL,             -- salt_hex$hash_hex
    settings        TEXT NOT NULL,             -- JSON object
    created_at      TEXT NOT NULL,             -- RFC-3339, microseconds
    updated_at      TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Outlines
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS outlines (
    id         TEXT PRIMARY KEY NOT NULL,
    user_id    TEXT NOT NULL,
    title      TEXT NOT NULL,
    items      TEXT NOT NULL,                  -- JSON array of items
    item_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_outlines_user_updated
    ON outlines(user_id, updated_at DESC);
"#;

/// Apply the v001 migration.
pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(UP_SQL)
}
