//! Content-addressed blob rows and message attachments.
//!
//! Blobs live only in the index, not in the append-only log: encoding
//! arbitrarily large payloads into a text log would defeat it. Replay
//! therefore restores topics and messages but not blobs.

use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use jwz_core::{Attachment, BlobInfo};

use crate::error::{Result, StoreError};

/// Digest algorithm prefix. Part of the identity: if the algorithm is
/// ever replaced, old identifiers stay valid under this prefix forever.
const ALGORITHM: &str = "sha256";

/// Computes the content-addressed identity of a byte string.
pub(crate) fn blob_id_for(bytes: &[u8]) -> String {
    format!("{ALGORITHM}:{:x}", Sha256::digest(bytes))
}

pub(crate) fn blob_exists(conn: &Connection, id: &str) -> Result<bool> {
    let hit = conn
        .query_row("SELECT 1 FROM blobs WHERE id = ?1", params![id], |_| Ok(()))
        .optional()?;
    Ok(hit.is_some())
}

/// Inserts a blob row. Insert-or-ignore keeps a concurrent double-put
/// harmless; the first writer's MIME label wins.
pub(crate) fn insert_blob(
    conn: &Connection,
    id: &str,
    bytes: &[u8],
    mime_type: Option<&str>,
    created_at: i64,
) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO blobs (id, content, size, mime_type, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, bytes, bytes.len() as i64, mime_type, created_at],
    )?;
    Ok(())
}

/// Returns the blob's bytes as an owned copy.
pub(crate) fn blob_content(conn: &Connection, id: &str) -> Result<Vec<u8>> {
    conn.query_row(
        "SELECT content FROM blobs WHERE id = ?1",
        params![id],
        |row| row.get::<_, Vec<u8>>(0),
    )
    .optional()?
    .ok_or_else(|| StoreError::BlobNotFound(id.to_string()))
}

pub(crate) fn blob_info(conn: &Connection, id: &str) -> Result<BlobInfo> {
    conn.query_row(
        "SELECT id, size, mime_type, created_at FROM blobs WHERE id = ?1",
        params![id],
        |row| {
            Ok(BlobInfo {
                id: row.get(0)?,
                size: row.get(1)?,
                mime_type: row.get(2)?,
                created_at: row.get(3)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| StoreError::BlobNotFound(id.to_string()))
}

/// Links a blob to a message. Re-attaching the same pair replaces the
/// display name.
pub(crate) fn attach(
    conn: &Connection,
    message_id: &str,
    blob_id: &str,
    name: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO attachments (message_id, blob_id, name) VALUES (?1, ?2, ?3)",
        params![message_id, blob_id, name],
    )?;
    Ok(())
}

pub(crate) fn attachments_for(conn: &Connection, message_id: &str) -> Result<Vec<Attachment>> {
    let mut stmt = conn.prepare(
        "SELECT message_id, blob_id, name FROM attachments WHERE message_id = ?1 ORDER BY blob_id",
    )?;
    let attachments = stmt
        .query_map(params![message_id], |row| {
            Ok(Attachment {
                message_id: row.get(0)?,
                blob_id: row.get(1)?,
                name: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(attachments)
}
