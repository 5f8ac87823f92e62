//! [`Repository`] -- the public API of the durable store.
//!
//! Owns the index connection, the lock-file handle, and the identifier
//! generator for one open store. Every write runs inside one immediate
//! transaction and one locked log append: index rows first, then the
//! log line (fsynced under the exclusive lock), then the offset, then
//! the commit. Any failure before the commit rolls the index back, so
//! the index never reflects state that is not durable in the log.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{debug, info, warn};

use jwz_core::idgen::{self, IdGenerator};
use jwz_core::record::{MessageRecord, TopicRecord};
use jwz_core::{Attachment, BlobInfo, GitContext, LogRecord, Message, Sender, Topic};
use jwz_lockfile::LockFile;

use crate::dir::{DB_FILE, LOCK_FILE, LOG_FILE};
use crate::error::{Result, StoreError};
use crate::log;
use crate::replay;
use crate::sqlite::db::{self, RetryPolicy, Txn};
use crate::sqlite::{blobs, messages, schema, search, topics};

/// An open message store.
///
/// Returned records are fully owned copies; nothing aliases the
/// engine's buffers. Writes take `&mut self` (the identifier generator
/// is stateful); reads take `&self`.
pub struct Repository {
    conn: Connection,
    lock: LockFile,
    root: PathBuf,
    log_path: PathBuf,
    ids: IdGenerator,
    policy: RetryPolicy,
}

impl Repository {
    /// Opens the store rooted at `store_dir` with default policy and
    /// system clock.
    pub fn open(store_dir: &Path) -> Result<Self> {
        Self::open_with(store_dir, RetryPolicy::default(), IdGenerator::new())
    }

    /// Opens the store with an explicit retry policy and identifier
    /// generator (test seam for deterministic clocks).
    pub fn open_with(store_dir: &Path, policy: RetryPolicy, ids: IdGenerator) -> Result<Self> {
        let conn = db::open(&store_dir.join(DB_FILE))?;
        schema::ensure_schema(&conn)?;

        let lock = LockFile::open(&store_dir.join(LOCK_FILE))?;
        let log_path = store_dir.join(LOG_FILE);

        replay::catch_up(&conn, &lock, &log_path, &policy)?;

        info!(root = %store_dir.display(), "opened message store");
        Ok(Self {
            conn,
            lock,
            root: store_dir.to_path_buf(),
            log_path,
            ids,
            policy,
        })
    }

    /// The store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Closes the store, releasing the index connection and the lock
    /// handle.
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| StoreError::from(e))?;
        Ok(())
    }

    // -- Topics --------------------------------------------------------------

    /// Creates a topic and returns its identifier.
    pub fn create_topic(&mut self, name: &str, description: &str) -> Result<String> {
        let name = name.trim();
        let description = description.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyTopicName);
        }

        let id = self.ids.generate();
        let topic = Topic {
            id: id.clone(),
            name: name.to_string(),
            description: description.to_string(),
            created_at: created_at_of(&id),
        };

        let tx = Txn::begin_immediate(&self.conn, &self.policy)?;
        topics::insert_topic(&self.conn, &topic)?;
        let line = LogRecord::Topic(TopicRecord::from(&topic)).to_line()?;
        self.append_and_advance(&line)?;
        tx.commit(&self.policy)?;

        debug!(topic = name, %id, "created topic");
        Ok(id)
    }

    /// All topics, oldest first.
    pub fn list_topics(&self) -> Result<Vec<Topic>> {
        topics::list_topics(&self.conn)
    }

    // -- Messages ------------------------------------------------------------

    /// Posts a message to the named topic and returns its identifier.
    ///
    /// `parent`, when given, must name an existing message in the same
    /// topic (full identifier or unique prefix).
    pub fn create_message(
        &mut self,
        topic_name: &str,
        parent: Option<&str>,
        body: &str,
        sender: Option<Sender>,
        git: Option<GitContext>,
    ) -> Result<String> {
        let body = body.trim();
        if body.is_empty() {
            return Err(StoreError::EmptyMessageBody);
        }

        let topic_name = topic_name.trim();
        let topic = topics::topic_by_name(&self.conn, topic_name)?
            .ok_or_else(|| StoreError::TopicNotFound(topic_name.to_string()))?;

        let parent_id = match parent {
            Some(raw) => {
                let resolved = match messages::resolve_id(&self.conn, raw) {
                    Ok(id) => id,
                    Err(StoreError::MessageNotFound(_)) => {
                        return Err(StoreError::ParentNotFound(raw.to_string()));
                    }
                    Err(e) => return Err(e),
                };
                if !messages::message_in_topic(&self.conn, &resolved, &topic.id)? {
                    return Err(StoreError::ParentNotFound(raw.to_string()));
                }
                Some(resolved)
            }
            None => None,
        };

        let id = self.ids.generate();
        let record = MessageRecord {
            id: id.clone(),
            topic_id: topic.id,
            parent_id,
            body: body.to_string(),
            created_at: created_at_of(&id),
            sender,
            git,
        };

        let tx = Txn::begin_immediate(&self.conn, &self.policy)?;
        messages::insert_message(&self.conn, &record)?;
        let line = LogRecord::Message(record).to_line()?;
        self.append_and_advance(&line)?;
        tx.commit(&self.policy)?;

        debug!(topic = topic_name, %id, "posted message");
        Ok(id)
    }

    /// Resolves a full identifier or unique prefix to the full
    /// identifier.
    pub fn resolve_message_id(&self, input: &str) -> Result<String> {
        messages::resolve_id(&self.conn, input)
    }

    /// Fetches one message by full identifier or unique prefix.
    pub fn fetch_message(&self, id_or_prefix: &str) -> Result<Message> {
        let id = messages::resolve_id(&self.conn, id_or_prefix)?;
        messages::get_message(&self.conn, &id)
    }

    /// Root messages of a topic, newest first, up to `limit`.
    pub fn list_messages(&self, topic_name: &str, limit: i64) -> Result<Vec<Message>> {
        let topic_name = topic_name.trim();
        let topic = topics::topic_by_name(&self.conn, topic_name)?
            .ok_or_else(|| StoreError::TopicNotFound(topic_name.to_string()))?;
        messages::list_roots(&self.conn, &topic.id, limit)
    }

    /// The thread rooted at the given message: the root followed by
    /// all transitive replies in creation order.
    pub fn thread(&self, id_or_prefix: &str) -> Result<Vec<Message>> {
        let id = messages::resolve_id(&self.conn, id_or_prefix)?;
        messages::thread(&self.conn, &id)
    }

    /// Immediate replies to the given message, oldest first.
    pub fn replies(&self, id_or_prefix: &str) -> Result<Vec<Message>> {
        let id = messages::resolve_id(&self.conn, id_or_prefix)?;
        messages::replies(&self.conn, &id)
    }

    /// Full-text search over message bodies. The query is matched
    /// verbatim as a single phrase; engine operators in the input have
    /// no effect.
    pub fn search(&self, query: &str, topic: Option<&str>, limit: i64) -> Result<Vec<Message>> {
        let topic = topic.map(str::trim);
        search::search(&self.conn, query, topic, limit)
    }

    // -- Blobs ---------------------------------------------------------------

    /// Stores a blob and returns its content-addressed identifier.
    /// Re-putting identical bytes returns the existing identity; the
    /// first writer's MIME label wins.
    pub fn put_blob(&mut self, bytes: &[u8], mime_type: Option<&str>) -> Result<String> {
        let id = blobs::blob_id_for(bytes);
        if blobs::blob_exists(&self.conn, &id)? {
            debug!(%id, "blob already stored");
            return Ok(id);
        }

        let tx = Txn::begin_immediate(&self.conn, &self.policy)?;
        blobs::insert_blob(
            &self.conn,
            &id,
            bytes,
            mime_type,
            idgen::system_ms() as i64,
        )?;
        tx.commit(&self.policy)?;

        debug!(%id, size = bytes.len(), "stored blob");
        Ok(id)
    }

    /// Returns a blob's bytes.
    pub fn get_blob(&self, id: &str) -> Result<Vec<u8>> {
        blobs::blob_content(&self.conn, id)
    }

    /// Returns a blob's metadata.
    pub fn fetch_blob(&self, id: &str) -> Result<BlobInfo> {
        blobs::blob_info(&self.conn, id)
    }

    /// Attaches a blob to a message. Both must already exist;
    /// re-attaching the same pair replaces the display name.
    pub fn attach_blob(
        &mut self,
        message_id_or_prefix: &str,
        blob_id: &str,
        name: Option<&str>,
    ) -> Result<()> {
        let message_id = messages::resolve_id(&self.conn, message_id_or_prefix)?;
        if !blobs::blob_exists(&self.conn, blob_id)? {
            return Err(StoreError::BlobNotFound(blob_id.to_string()));
        }

        let tx = Txn::begin_immediate(&self.conn, &self.policy)?;
        blobs::attach(&self.conn, &message_id, blob_id, name)?;
        tx.commit(&self.policy)?;
        Ok(())
    }

    /// All attachments of a message.
    pub fn list_attachments(&self, message_id_or_prefix: &str) -> Result<Vec<Attachment>> {
        let message_id = messages::resolve_id(&self.conn, message_id_or_prefix)?;
        blobs::attachments_for(&self.conn, &message_id)
    }

    // -- Log append ----------------------------------------------------------

    /// Appends one record line to the log under the exclusive lock and
    /// persists the post-append offset. Runs inside the caller's open
    /// transaction.
    ///
    /// If another process appended since our last replay, its records
    /// are ingested first (idempotently) so the offset stays equal to
    /// the byte length of everything the index reflects.
    fn append_and_advance(&self, line: &str) -> Result<()> {
        let guard = self.lock.exclusive()?;

        let offset = replay::read_offset(&self.conn)?;
        let size = log::size(&self.log_path)?;
        if size > offset {
            debug!(offset, size, "ingesting records appended by another process");
            let gap = log::read_from(&self.log_path, offset)?;
            replay::apply_log_bytes(&self.conn, &gap)?;
        } else if size < offset {
            warn!(offset, size, "log shrank while the store was open; next open will rebuild");
        }

        let end = log::append_line(&self.log_path, line)?;
        replay::write_offset(&self.conn, end)?;

        drop(guard);
        Ok(())
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// Creation timestamp for a record, taken from its identifier so the
/// id and the stored time can never disagree.
fn created_at_of(id: &str) -> i64 {
    idgen::timestamp_ms(id).unwrap_or_else(idgen::system_ms) as i64
}
