//! Full-text search over message bodies.

use rusqlite::{params, Connection};

use jwz_core::Message;

use crate::error::Result;
use crate::sqlite::messages::{scan_message, MESSAGE_COLUMNS};

/// Neutralises the search engine's operator syntax by quoting the
/// whole input as a single phrase; embedded double quotes are escaped
/// by doubling. The result can never be parsed as `NEAR`, `AND`,
/// column filters, or any other query operator.
pub(crate) fn sanitize_query(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\"\""))
}

/// Searches message bodies, best match first (BM25), ties broken by
/// newest creation time. `topic` restricts results to one topic by
/// name.
pub(crate) fn search(
    conn: &Connection,
    raw_query: &str,
    topic: Option<&str>,
    limit: i64,
) -> Result<Vec<Message>> {
    let phrase = sanitize_query(raw_query);

    let messages = match topic {
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages_fts
                 JOIN messages m ON m.rowid = messages_fts.rowid
                 WHERE messages_fts MATCH ?1
                 ORDER BY bm25(messages_fts), m.created_at DESC
                 LIMIT ?2"
            ))?;
            stmt.query_map(params![phrase, limit], scan_message)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        }
        Some(name) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages_fts
                 JOIN messages m ON m.rowid = messages_fts.rowid
                 JOIN topics t ON t.id = m.topic_id
                 WHERE messages_fts MATCH ?1 AND t.name = ?2
                 ORDER BY bm25(messages_fts), m.created_at DESC
                 LIMIT ?3"
            ))?;
            stmt.query_map(params![phrase, name, limit], scan_message)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        }
    };
    Ok(messages)
}
