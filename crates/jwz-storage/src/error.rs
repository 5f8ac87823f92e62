//! Store error types.

use std::path::PathBuf;

use crate::sqlite::db::DbError;

/// Errors surfaced by the store to its callers.
///
/// Everything here is permanent except [`StoreError::DatabaseBusy`],
/// which the driver only raises after its retry budget is exhausted.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No store directory between the working directory and the
    /// filesystem root.
    #[error("no message store found (searched up to the filesystem root)")]
    StoreNotFound,

    /// `init` was asked to create a store that already exists.
    #[error("store already exists: {0}")]
    StoreAlreadyExists(PathBuf),

    /// No topic with the given name.
    #[error("topic not found: {0}")]
    TopicNotFound(String),

    /// A topic with the given name already exists.
    #[error("topic already exists: {0}")]
    TopicExists(String),

    /// No message matches the given identifier or prefix.
    #[error("message not found: {0}")]
    MessageNotFound(String),

    /// More than one message matches the given prefix.
    #[error("message id is ambiguous: {0} (give more characters)")]
    MessageIdAmbiguous(String),

    /// The identifier contains characters outside the id alphabet or
    /// has an impossible length.
    #[error("invalid message id: {0}")]
    InvalidMessageId(String),

    /// The named parent message does not exist in the target topic.
    #[error("parent message not found: {0}")]
    ParentNotFound(String),

    /// The engine stayed busy through the whole retry budget.
    #[error("database busy: another process is holding the store")]
    DatabaseBusy,

    /// Topic name was empty after trimming.
    #[error("topic name must not be empty")]
    EmptyTopicName,

    /// Message body was empty after trimming.
    #[error("message body must not be empty")]
    EmptyMessageBody,

    /// No blob with the given identifier.
    #[error("blob not found: {0}")]
    BlobNotFound(String),

    /// Driver-level error (busy or engine).
    #[error(transparent)]
    Db(#[from] DbError),

    /// I/O on the log, lock, or store directory failed.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A log record could not be serialized.
    #[error("log record error: {0}")]
    Record(#[from] serde_json::Error),

    /// The advisory lock could not be acquired or created.
    #[error(transparent)]
    Lock(#[from] jwz_lockfile::LockError),
}

/// Convenience alias used throughout the storage crate.
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Db(DbError::from(e))
    }
}

impl StoreError {
    /// Returns `true` if the error means "does not exist" for some
    /// entity kind.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::StoreNotFound
                | Self::TopicNotFound(_)
                | Self::MessageNotFound(_)
                | Self::ParentNotFound(_)
                | Self::BlobNotFound(_)
        )
    }

    /// Returns `true` if the operation may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DatabaseBusy | Self::Db(DbError::Busy(_)))
    }
}
