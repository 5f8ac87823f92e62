//! Durable store for the jwz message system.
//!
//! Two representations of the same data live side by side in the store
//! directory: an append-only JSONL log (the source of truth) and a
//! SQLite index (a rebuildable cache supporting queries and full-text
//! search). The [`Repository`] keeps them consistent: every write goes
//! to both inside one transaction and one locked log append, and every
//! open replays whatever log suffix the index has not yet observed.
//!
//! Deleting `messages.db` loses nothing but blobs: topics and messages
//! are rebuilt from the log on the next open.

pub mod dir;
pub mod error;
pub mod repo;
pub mod sqlite;

mod log;
mod replay;

pub use dir::{discover, init_store, ALT_STORE_DIR_NAME, DB_FILE, LOCK_FILE, LOG_FILE, STORE_DIR_NAME};
pub use error::{Result, StoreError};
pub use repo::Repository;
pub use sqlite::db::{DbError, RetryPolicy};
