//! Message domain types.

use serde::{Deserialize, Serialize};

/// Identity attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    /// Stable sender identifier (agent id, user name, etc.).
    pub id: String,
    /// Memorable display name.
    pub name: String,
    /// Model label, when the sender is a model-backed agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Role label (e.g. "reviewer").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Source-control state captured at post time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitContext {
    /// Commit digest of HEAD.
    pub oid: String,
    /// Branch name, or `"detached"` for a detached HEAD.
    pub head: String,
    /// Whether the working tree had uncommitted changes.
    pub dirty: bool,
    /// Subdirectory prefix relative to the repository root (may be empty).
    pub prefix: String,
}

/// A message posted to a topic, optionally replying to another message
/// in the same topic.
///
/// The parent edge is a lookup by id, not ownership: the message graph
/// is a forest and every record is an independent value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Stable identifier (26-char sortable id).
    pub id: String,
    /// Owning topic identifier.
    pub topic_id: String,
    /// Parent message identifier; `None` for thread roots.
    pub parent_id: Option<String>,
    /// Message body, trimmed of surrounding whitespace.
    pub body: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: i64,
    /// Number of direct replies. Derived at query time, never stored
    /// as authority.
    pub reply_count: i64,
    /// Sender identity, if recorded.
    pub sender: Option<Sender>,
    /// Captured git state, if recorded.
    pub git: Option<GitContext>,
}

impl Message {
    /// Returns `true` if this message starts a thread.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
