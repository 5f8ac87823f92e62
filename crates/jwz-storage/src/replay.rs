//! Replay: reconciling the index with the append-only log.
//!
//! The index is a pure function of the log prefix up to the persisted
//! byte offset. On open the engine reads any suffix the index has not
//! observed and applies it inside one immediate transaction, updating
//! the offset in that same transaction. A log shorter than the offset
//! means an external truncation or rotation: the index is cleared and
//! rebuilt from offset zero.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use jwz_core::LogRecord;
use jwz_lockfile::LockFile;

use crate::error::Result;
use crate::log;
use crate::sqlite::db::{RetryPolicy, Txn};
use crate::sqlite::{messages, topics};

/// Meta table key holding the caught-up byte offset.
pub(crate) const OFFSET_KEY: &str = "jsonl_offset";

/// Reads the persisted offset; a missing or unparsable value is zero.
pub(crate) fn read_offset(conn: &Connection) -> Result<u64> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = ?1",
            params![OFFSET_KEY],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value.and_then(|s| s.parse().ok()).unwrap_or(0))
}

/// Persists the offset. Callers run this inside the transaction that
/// applied the corresponding records.
pub(crate) fn write_offset(conn: &Connection, offset: u64) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
        params![OFFSET_KEY, offset.to_string()],
    )?;
    Ok(())
}

/// Parses raw log bytes and applies every record to the index, all
/// topics before all messages (a message's foreign key needs its
/// topic). Malformed lines (partial writes, non-UTF-8, bad JSON) are
/// skipped; a trailing chunk without a newline parses as one such
/// line.
pub(crate) fn apply_log_bytes(conn: &Connection, bytes: &[u8]) -> Result<()> {
    let mut topic_records = Vec::new();
    let mut message_records = Vec::new();

    for raw in bytes.split(|&b| b == b'\n') {
        if raw.is_empty() {
            continue;
        }
        let Ok(line) = std::str::from_utf8(raw) else {
            debug!("skipping non-UTF-8 log line");
            continue;
        };
        match LogRecord::parse_line(line) {
            Ok(LogRecord::Topic(topic)) => topic_records.push(topic),
            Ok(LogRecord::Message(message)) => message_records.push(message),
            Err(e) => debug!(error = %e, "skipping malformed log line"),
        }
    }

    for record in &topic_records {
        topics::apply_topic_record(conn, record)?;
    }
    for record in &message_records {
        messages::apply_message_record(conn, record)?;
    }
    Ok(())
}

/// Empties the index. The full-text table goes first via its
/// `delete-all` command (required for external-content tables), then
/// messages before topics to respect the foreign keys.
fn clear_index(conn: &Connection) -> Result<()> {
    conn.execute("INSERT INTO messages_fts(messages_fts) VALUES('delete-all')", [])?;
    conn.execute("DELETE FROM messages", [])?;
    conn.execute("DELETE FROM topics", [])?;
    Ok(())
}

/// Brings the index up to date with the log.
///
/// The shared lock is held for the duration of the read so a
/// concurrent writer cannot append a partial record under it; the
/// transaction that applies the records runs after the lock is
/// released (appenders only ever add bytes past what we read).
pub(crate) fn catch_up(
    conn: &Connection,
    lock: &LockFile,
    log_path: &Path,
    policy: &RetryPolicy,
) -> Result<()> {
    let offset = read_offset(conn)?;

    let (start, clear, bytes) = {
        let _guard = lock.shared()?;
        let size = log::size(log_path)?;
        if size == offset {
            debug!(offset, "index is caught up with the log");
            return Ok(());
        }
        if size < offset {
            warn!(offset, size, "log is shorter than the persisted offset; rebuilding index");
            (0u64, true, log::read_from(log_path, 0)?)
        } else {
            (offset, false, log::read_from(log_path, offset)?)
        }
    };

    let tx = Txn::begin_immediate(conn, policy)?;
    if clear {
        clear_index(conn)?;
    }
    apply_log_bytes(conn, &bytes)?;
    write_offset(conn, start + bytes.len() as u64)?;
    tx.commit(policy)?;

    info!(
        from = start,
        bytes = bytes.len(),
        rebuilt = clear,
        "replayed log into index"
    );
    Ok(())
}
