//! Core types for the jwz message store.
//!
//! Domain records (topics, messages, blobs), the append-only log line
//! model, the monotonic identifier generator, and the memorable-name
//! generator. Everything here is plain data; persistence lives in
//! `jwz-storage`.

pub mod blob;
pub mod idgen;
pub mod message;
pub mod namegen;
pub mod record;
pub mod topic;

pub use blob::{Attachment, BlobInfo};
pub use message::{GitContext, Message, Sender};
pub use record::{LogRecord, MessageRecord, TopicRecord};
pub use topic::Topic;
