//! Message rows: inserts, lookups, threading, prefix resolution.

use rusqlite::{params, Connection, OptionalExtension, Row};

use jwz_core::record::MessageRecord;
use jwz_core::{idgen, GitContext, Message, Sender};

use crate::error::{Result, StoreError};

/// Message columns plus the derived reply count, for SELECTs over the
/// `messages` table aliased as `m`.
pub(crate) const MESSAGE_COLUMNS: &str = "\
    m.id, m.topic_id, m.parent_id, m.body, m.created_at, \
    m.sender_id, m.sender_name, m.sender_model, m.sender_role, \
    m.git_oid, m.git_head, m.git_dirty, m.git_prefix, \
    (SELECT COUNT(*) FROM messages r WHERE r.parent_id = m.id) AS reply_count";

/// Deserialises a row selected through [`MESSAGE_COLUMNS`].
///
/// Every value is copied out of the statement's buffers here; the
/// returned record owns all of its data.
pub(crate) fn scan_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let sender = match row.get::<_, Option<String>>("sender_id")? {
        Some(id) => Some(Sender {
            id,
            name: row
                .get::<_, Option<String>>("sender_name")?
                .unwrap_or_default(),
            model: row.get("sender_model")?,
            role: row.get("sender_role")?,
        }),
        None => None,
    };

    let git = match row.get::<_, Option<String>>("git_oid")? {
        Some(oid) => Some(GitContext {
            oid,
            head: row
                .get::<_, Option<String>>("git_head")?
                .unwrap_or_default(),
            dirty: row.get::<_, Option<i64>>("git_dirty")?.unwrap_or(0) != 0,
            prefix: row
                .get::<_, Option<String>>("git_prefix")?
                .unwrap_or_default(),
        }),
        None => None,
    };

    Ok(Message {
        id: row.get("id")?,
        topic_id: row.get("topic_id")?,
        parent_id: row.get("parent_id")?,
        body: row.get("body")?,
        created_at: row.get("created_at")?,
        reply_count: row.get("reply_count")?,
        sender,
        git,
    })
}

const INSERT_COLUMNS: &str = "\
    id, topic_id, parent_id, body, created_at, \
    sender_id, sender_name, sender_model, sender_role, \
    git_oid, git_head, git_dirty, git_prefix";

/// Runs one of the INSERT variants below, binding every column of the
/// record. Returns the number of rows changed.
fn exec_insert(conn: &Connection, sql: &str, record: &MessageRecord) -> Result<usize> {
    let sender = record.sender.as_ref();
    let git = record.git.as_ref();
    let changed = conn.execute(
        sql,
        params![
            record.id,
            record.topic_id,
            record.parent_id,
            record.body,
            record.created_at,
            sender.map(|s| s.id.as_str()),
            sender.map(|s| s.name.as_str()),
            sender.and_then(|s| s.model.as_deref()),
            sender.and_then(|s| s.role.as_deref()),
            git.map(|g| g.oid.as_str()),
            git.map(|g| g.head.as_str()),
            git.map(|g| i64::from(g.dirty)),
            git.map(|g| g.prefix.as_str()),
        ],
    )?;
    Ok(changed)
}

/// Inserts a freshly created message and its full-text row.
pub(crate) fn insert_message(conn: &Connection, record: &MessageRecord) -> Result<()> {
    exec_insert(
        conn,
        &format!(
            "INSERT INTO messages ({INSERT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        ),
        record,
    )?;
    conn.execute(
        "INSERT INTO messages_fts (rowid, body) VALUES (?1, ?2)",
        params![conn.last_insert_rowid(), record.body],
    )?;
    Ok(())
}

/// Replay-side insert: insert-or-ignore, with the full-text row added
/// only when the message insert actually created a row.
pub(crate) fn apply_message_record(conn: &Connection, record: &MessageRecord) -> Result<()> {
    let changed = exec_insert(
        conn,
        &format!(
            "INSERT OR IGNORE INTO messages ({INSERT_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        ),
        record,
    )?;
    if changed > 0 {
        conn.execute(
            "INSERT INTO messages_fts (rowid, body) VALUES (?1, ?2)",
            params![conn.last_insert_rowid(), record.body],
        )?;
    }
    Ok(())
}

pub(crate) fn message_exists(conn: &Connection, id: &str) -> Result<bool> {
    let hit = conn
        .query_row("SELECT 1 FROM messages WHERE id = ?1", params![id], |_| {
            Ok(())
        })
        .optional()?;
    Ok(hit.is_some())
}

/// Returns `true` if `id` names a message inside `topic_id`.
pub(crate) fn message_in_topic(conn: &Connection, id: &str, topic_id: &str) -> Result<bool> {
    let hit = conn
        .query_row(
            "SELECT 1 FROM messages WHERE id = ?1 AND topic_id = ?2",
            params![id, topic_id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(hit.is_some())
}

/// Fetches one message by full identifier.
pub(crate) fn get_message(conn: &Connection, id: &str) -> Result<Message> {
    conn.query_row(
        &format!("SELECT {MESSAGE_COLUMNS} FROM messages m WHERE m.id = ?1"),
        params![id],
        scan_message,
    )
    .optional()?
    .ok_or_else(|| StoreError::MessageNotFound(id.to_string()))
}

/// Resolves a user-supplied identifier or prefix to the unique full
/// identifier it names.
///
/// A full-length input is probed for an exact match first, so a full
/// identifier can never be reported ambiguous against messages that
/// happen to share it as a prefix (shorter inputs skip the probe).
/// Otherwise up to two prefix matches are fetched: zero is not-found,
/// one is the answer, two is ambiguous.
pub(crate) fn resolve_id(conn: &Connection, input: &str) -> Result<String> {
    let prefix = idgen::normalize_prefix(input)
        .ok_or_else(|| StoreError::InvalidMessageId(input.to_string()))?;

    if idgen::is_valid_id(&prefix) && message_exists(conn, &prefix)? {
        return Ok(prefix);
    }

    // The id alphabet has no LIKE metacharacters, so the pattern is
    // safe to build by concatenation.
    let mut stmt =
        conn.prepare("SELECT id FROM messages WHERE id LIKE ?1 || '%' ORDER BY id LIMIT 2")?;
    let matches: Vec<String> = stmt
        .query_map(params![prefix], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;

    match matches.as_slice() {
        [] => Err(StoreError::MessageNotFound(input.to_string())),
        [id] => Ok(id.clone()),
        _ => Err(StoreError::MessageIdAmbiguous(input.to_string())),
    }
}

/// Root messages of a topic, newest first.
pub(crate) fn list_roots(conn: &Connection, topic_id: &str, limit: i64) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages m
         WHERE m.topic_id = ?1 AND m.parent_id IS NULL
         ORDER BY m.created_at DESC, m.id DESC
         LIMIT ?2"
    ))?;
    let messages = stmt
        .query_map(params![topic_id, limit], scan_message)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(messages)
}

/// The thread rooted at `root_id`: the root followed by every
/// transitive reply, in creation order.
///
/// Depth is not stored; callers derive it by chasing `parent_id`.
pub(crate) fn thread(conn: &Connection, root_id: &str) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare(&format!(
        "WITH RECURSIVE thread_ids(id) AS (
             SELECT id FROM messages WHERE id = ?1
             UNION ALL
             SELECT c.id FROM messages c JOIN thread_ids t ON c.parent_id = t.id
         )
         SELECT {MESSAGE_COLUMNS} FROM messages m
         JOIN thread_ids t ON t.id = m.id
         ORDER BY m.created_at ASC, m.id ASC"
    ))?;
    let messages: Vec<Message> = stmt
        .query_map(params![root_id], scan_message)?
        .collect::<rusqlite::Result<_>>()?;

    if messages.is_empty() {
        return Err(StoreError::MessageNotFound(root_id.to_string()));
    }
    Ok(messages)
}

/// Immediate children of a message, oldest first.
pub(crate) fn replies(conn: &Connection, parent_id: &str) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages m
         WHERE m.parent_id = ?1
         ORDER BY m.created_at ASC, m.id ASC"
    ))?;
    let messages = stmt
        .query_map(params![parent_id], scan_message)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(messages)
}
