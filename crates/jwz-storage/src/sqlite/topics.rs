//! Topic rows.

use rusqlite::{params, Connection, OptionalExtension, Row};

use jwz_core::record::TopicRecord;
use jwz_core::Topic;

use crate::error::{Result, StoreError};
use crate::sqlite::db::{self, DbError};

fn scan_topic(row: &Row<'_>) -> rusqlite::Result<Topic> {
    Ok(Topic {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
    })
}

/// Inserts a freshly created topic. A unique-name collision maps to
/// [`StoreError::TopicExists`].
pub(crate) fn insert_topic(conn: &Connection, topic: &Topic) -> Result<()> {
    let result = conn.execute(
        "INSERT INTO topics (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![topic.id, topic.name, topic.description, topic.created_at],
    );
    match result {
        Ok(_) => Ok(()),
        Err(e) if db::is_constraint(&e) => Err(StoreError::TopicExists(topic.name.clone())),
        Err(e) => Err(DbError::from(e).into()),
    }
}

/// Replay-side insert: insert-or-ignore so re-replay is safe.
pub(crate) fn apply_topic_record(conn: &Connection, record: &TopicRecord) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO topics (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![record.id, record.name, record.description, record.created_at],
    )?;
    Ok(())
}

pub(crate) fn topic_by_name(conn: &Connection, name: &str) -> Result<Option<Topic>> {
    let topic = conn
        .query_row(
            "SELECT id, name, description, created_at FROM topics WHERE name = ?1",
            params![name],
            scan_topic,
        )
        .optional()?;
    Ok(topic)
}

pub(crate) fn list_topics(conn: &Connection) -> Result<Vec<Topic>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, created_at FROM topics ORDER BY created_at, id",
    )?;
    let topics = stmt
        .query_map([], scan_topic)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(topics)
}
