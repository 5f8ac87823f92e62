//! DDL statements and additive migrations for the index schema.
//!
//! Timestamps are stored as INTEGER milliseconds since the epoch.
//! Booleans are INTEGER 0/1. The full-text table is an external
//! content FTS5 table whose rowids mirror the `messages` rowids.

use std::collections::HashSet;

use rusqlite::Connection;
use tracing::debug;

use crate::error::Result;
use crate::sqlite::db::DbError;

/// Core DDL, executed on every open.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS topics (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL,
        created_at  INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        id         TEXT PRIMARY KEY,
        topic_id   TEXT NOT NULL REFERENCES topics(id) ON DELETE CASCADE,
        parent_id  TEXT REFERENCES messages(id) ON DELETE CASCADE,
        body       TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_messages_topic_created ON messages(topic_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_messages_parent ON messages(parent_id)",
    r#"
    CREATE TABLE IF NOT EXISTS meta (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS blobs (
        id         TEXT PRIMARY KEY,
        content    BLOB NOT NULL,
        size       INTEGER NOT NULL,
        mime_type  TEXT,
        created_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS attachments (
        message_id TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
        blob_id    TEXT NOT NULL REFERENCES blobs(id) ON DELETE CASCADE,
        name       TEXT,
        PRIMARY KEY (message_id, blob_id)
    )
    "#,
    r#"
    CREATE VIRTUAL TABLE IF NOT EXISTS messages_fts
        USING fts5(body, content='messages', content_rowid='rowid')
    "#,
];

/// Columns added to `messages` after the original table shape.
///
/// All nullable; column removal and type change are non-goals, so this
/// list only ever grows.
const MESSAGE_COLUMN_MIGRATIONS: &[(&str, &str)] = &[
    ("sender_id", "TEXT"),
    ("sender_name", "TEXT"),
    ("sender_model", "TEXT"),
    ("sender_role", "TEXT"),
    ("git_oid", "TEXT"),
    ("git_head", "TEXT"),
    ("git_dirty", "INTEGER"),
    ("git_prefix", "TEXT"),
];

/// Ensures all tables, indexes, and columns exist. Idempotent.
pub(crate) fn ensure_schema(conn: &Connection) -> Result<()> {
    for stmt in SCHEMA_STATEMENTS {
        conn.execute_batch(stmt).map_err(DbError::from)?;
    }
    migrate_message_columns(conn)?;
    Ok(())
}

/// Adds any missing sender/git columns and the sender index.
fn migrate_message_columns(conn: &Connection) -> Result<()> {
    let have = existing_message_columns(conn)?;
    for (name, column_type) in MESSAGE_COLUMN_MIGRATIONS {
        if !have.contains(*name) {
            debug!(column = name, "adding column to messages");
            conn.execute_batch(&format!("ALTER TABLE messages ADD COLUMN {name} {column_type}"))
                .map_err(DbError::from)?;
        }
    }
    conn.execute_batch("CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender_id)")
        .map_err(DbError::from)?;
    Ok(())
}

fn existing_message_columns(conn: &Connection) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("PRAGMA table_info(messages)")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<HashSet<_>>>()?;
    Ok(columns)
}
