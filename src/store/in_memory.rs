//! In-memory transcript store implementation.
//!
//! Expiry is lazy: a lapsed entry is dropped on the next access to its key,
//! so an expired transcript is indistinguishable from one that never existed.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

use super::traits::{Message, TranscriptStore};

struct Entry {
    messages: Vec<Message>,
    expires_at: DateTime<Utc>,
}

/// An in-memory transcript store backed by a mutex-protected hash map.
pub struct InMemoryTranscriptStore {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
}

impl InMemoryTranscriptStore {
    /// Create a store whose appends arm `ttl` as the sliding expiry window.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn deadline(from: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>> {
        let window = chrono::Duration::from_std(ttl).context("transcript ttl out of range")?;
        from.checked_add_signed(window)
            .context("transcript expiry deadline overflow")
    }

    /// Drop the entry if its deadline has lapsed. Callers must hold the lock.
    fn evict_if_expired(entries: &mut HashMap<String, Entry>, session_id: &str) {
        let expired = entries
            .get(session_id)
            .is_some_and(|entry| entry.expires_at <= Utc::now());
        if expired {
            entries.remove(session_id);
        }
    }
}

#[async_trait]
impl TranscriptStore for InMemoryTranscriptStore {
    async fn append(&self, session_id: &str, message: Message) -> Result<()> {
        let expires_at = Self::deadline(Utc::now(), self.ttl)?;
        let mut entries = self.entries.lock();
        Self::evict_if_expired(&mut entries, session_id);

        let entry = entries.entry(session_id.to_string()).or_insert_with(|| Entry {
            messages: Vec::new(),
            expires_at,
        });
        entry.messages.push(message);
        entry.expires_at = expires_at;
        Ok(())
    }

    async fn set_expiry(&self, session_id: &str, ttl: Duration) -> Result<()> {
        let expires_at = Self::deadline(Utc::now(), ttl)?;
        let mut entries = self.entries.lock();
        Self::evict_if_expired(&mut entries, session_id);

        // Materializes an empty transcript for an absent key so a freshly
        // created session is live before its first append.
        entries
            .entry(session_id.to_string())
            .or_insert_with(|| Entry {
                messages: Vec::new(),
                expires_at,
            })
            .expires_at = expires_at;
        Ok(())
    }

    async fn read_all(&self, session_id: &str) -> Result<Vec<Message>> {
        let mut entries = self.entries.lock();
        Self::evict_if_expired(&mut entries, session_id);

        Ok(entries
            .get(session_id)
            .map(|entry| entry.messages.clone())
            .unwrap_or_default())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        entries.remove(session_id);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn append_and_read_preserves_order() {
        let store = InMemoryTranscriptStore::new(HOUR);

        store.append("s1", Message::user("q1")).await.unwrap();
        store.append("s1", Message::bot("a1")).await.unwrap();
        store.append("s1", Message::user("q2")).await.unwrap();

        let transcript = store.read_all("s1").await.unwrap();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[0], Message::user("q1"));
        assert_eq!(transcript[1], Message::bot("a1"));
        assert_eq!(transcript[2], Message::user("q2"));
    }

    #[tokio::test]
    async fn read_absent_key_is_empty_not_error() {
        let store = InMemoryTranscriptStore::new(HOUR);
        let transcript = store.read_all("never-created").await.unwrap();
        assert!(transcript.is_empty());
    }

    #[tokio::test]
    async fn append_creates_absent_key() {
        let store = InMemoryTranscriptStore::new(HOUR);
        store.append("implicit", Message::user("hello")).await.unwrap();

        let transcript = store.read_all("implicit").await.unwrap();
        assert_eq!(transcript, vec![Message::user("hello")]);
    }

    #[tokio::test]
    async fn set_expiry_materializes_empty_transcript() {
        let store = InMemoryTranscriptStore::new(HOUR);
        store.set_expiry("fresh", HOUR).await.unwrap();

        let entries = store.entries.lock();
        assert!(entries.contains_key("fresh"));
        assert!(entries.get("fresh").unwrap().messages.is_empty());
    }

    #[tokio::test]
    async fn lapsed_entry_reads_as_never_existed() {
        let store = InMemoryTranscriptStore::new(HOUR);
        store.append("s1", Message::user("q1")).await.unwrap();
        store.set_expiry("s1", Duration::ZERO).await.unwrap();

        let transcript = store.read_all("s1").await.unwrap();
        assert!(transcript.is_empty());
    }

    #[tokio::test]
    async fn append_rearms_expiry_window() {
        let store = InMemoryTranscriptStore::new(HOUR);
        store.append("s1", Message::user("q1")).await.unwrap();
        store.set_expiry("s1", Duration::ZERO).await.unwrap();

        // The expired key is gone; the next append recreates it with a
        // fresh window rather than inheriting the lapsed deadline.
        store.append("s1", Message::user("q2")).await.unwrap();
        let transcript = store.read_all("s1").await.unwrap();
        assert_eq!(transcript, vec![Message::user("q2")]);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryTranscriptStore::new(HOUR);
        store.append("s1", Message::user("q1")).await.unwrap();

        store.delete("s1").await.unwrap();
        store.delete("s1").await.unwrap();
        store.delete("never-created").await.unwrap();

        assert!(store.read_all("s1").await.unwrap().is_empty());
    }

    #[test]
    fn message_serializes_with_lowercase_roles() {
        let json = serde_json::to_string(&Message::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);

        let json = serde_json::to_string(&Message::bot("hello")).unwrap();
        assert_eq!(json, r#"{"role":"bot","content":"hello"}"#);
    }
}
