//! SQLite-backed query index.
//!
//! The index is a rebuildable cache over the append-only log; all
//! mutation goes through immediate transactions opened by the
//! repository or the replay engine.

pub mod db;
pub(crate) mod blobs;
pub(crate) mod messages;
pub(crate) mod schema;
pub(crate) mod search;
pub(crate) mod topics;
