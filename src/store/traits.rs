//! Transcript store contract and message types.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Speaker of a transcript message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

/// A single role-tagged turn in a session transcript.
///
/// Messages are immutable once appended; append order is dialogue order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            content: content.into(),
        }
    }
}

/// Expiring key-value storage for per-session ordered transcripts.
///
/// Each operation is individually atomic; callers get no multi-operation
/// transactions. An absent or expired key reads as an empty transcript,
/// never as an error.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Append a message at the tail of the session's transcript, creating
    /// the key if absent. Rearms the sliding expiry window on the key.
    async fn append(&self, session_id: &str, message: Message) -> Result<()>;

    /// (Re)set the session's time-to-live without altering content.
    async fn set_expiry(&self, session_id: &str, ttl: Duration) -> Result<()>;

    /// Read the full transcript in append order. Absent or expired keys
    /// yield an empty sequence.
    async fn read_all(&self, session_id: &str) -> Result<Vec<Message>>;

    /// Remove the key entirely, independent of its TTL state. Deleting an
    /// absent key is a no-op.
    async fn delete(&self, session_id: &str) -> Result<()>;

    /// The name of this store implementation.
    fn name(&self) -> &str;
}
