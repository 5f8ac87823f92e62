//! Append-only log line model.
//!
//! The durable log is a JSONL file: one minified JSON object per line,
//! terminated by `\n`. Two record shapes exist, distinguished by the
//! `type` field. Field order is not significant and unknown fields are
//! ignored on read, so the format can grow additively.

use serde::{Deserialize, Serialize};

use crate::message::{GitContext, Message, Sender};
use crate::topic::Topic;

/// A single line of the append-only log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LogRecord {
    Topic(TopicRecord),
    Message(MessageRecord),
}

/// Log form of a topic creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: i64,
}

/// Log form of a message creation.
///
/// `parent_id`, `sender`, and `git` serialize as JSON `null` when
/// absent; readers accept both `null` and a missing field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: String,
    pub topic_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub body: String,
    pub created_at: i64,
    #[serde(default)]
    pub sender: Option<Sender>,
    #[serde(default)]
    pub git: Option<GitContext>,
}

impl LogRecord {
    /// Serializes the record as one minified JSON line, including the
    /// terminating newline.
    pub fn to_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Parses one log line. The caller decides what to do with
    /// malformed lines (replay skips them).
    pub fn parse_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line.trim_end_matches(['\r', '\n']))
    }
}

impl From<&Topic> for TopicRecord {
    fn from(t: &Topic) -> Self {
        Self {
            id: t.id.clone(),
            name: t.name.clone(),
            description: t.description.clone(),
            created_at: t.created_at,
        }
    }
}

impl From<&Message> for MessageRecord {
    fn from(m: &Message) -> Self {
        Self {
            id: m.id.clone(),
            topic_id: m.topic_id.clone(),
            parent_id: m.parent_id.clone(),
            body: m.body.clone(),
            created_at: m.created_at,
            sender: m.sender.clone(),
            git: m.git.clone(),
        }
    }
}
