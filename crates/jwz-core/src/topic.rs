//! Topic domain type.

use serde::{Deserialize, Serialize};

/// A named container that groups related messages.
///
/// Topics are immutable after creation. The `name` is unique within a
/// store and already trimmed of surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Stable identifier (26-char sortable id, see [`crate::idgen`]).
    pub id: String,
    /// User-visible unique name.
    pub name: String,
    /// Free-form description (may be empty).
    pub description: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: i64,
}
