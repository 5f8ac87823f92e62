//! Blob and attachment domain types.

use serde::{Deserialize, Serialize};

/// Metadata for a content-addressed binary object.
///
/// The identifier is the textual digest `"sha256:<lowercase hex>"` of
/// the blob's bytes. The algorithm prefix is part of the identity, not
/// metadata: should the algorithm ever change, old identifiers remain
/// valid forever under the old prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobInfo {
    /// Content-addressed identifier.
    pub id: String,
    /// Byte length of the content.
    pub size: i64,
    /// MIME label supplied at first insertion, if any.
    pub mime_type: Option<String>,
    /// Insertion time in milliseconds since the Unix epoch.
    pub created_at: i64,
}

/// A link from a message to a blob, with an optional display name.
///
/// Unique per `(message_id, blob_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// The message the blob is attached to.
    pub message_id: String,
    /// The attached blob.
    pub blob_id: String,
    /// Display name (typically the original file name).
    pub name: Option<String>,
}
