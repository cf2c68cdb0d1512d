//! Session lifecycle — identity creation and expiry policy.
//!
//! The [`SessionManager`] is the sole authority for minting session IDs;
//! no other component invents one.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::store::TranscriptStore;

pub struct SessionManager {
    store: Arc<dyn TranscriptStore>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn TranscriptStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Mint a fresh session and return its ID.
    ///
    /// The ID is a random UUID v4, so it is not derivable from counters and
    /// collisions are negligible at expected scale. The key is cleared and
    /// its TTL armed before the ID is handed out, so a client can query the
    /// session immediately without racing key materialization.
    pub async fn create_session(&self) -> Result<String> {
        let session_id = Uuid::new_v4().to_string();
        self.store.delete(&session_id).await?;
        self.store.set_expiry(&session_id, self.ttl).await?;
        tracing::info!(session_id, ttl_secs = self.ttl.as_secs(), "session created");
        Ok(session_id)
    }

    /// Remove a session's transcript immediately.
    ///
    /// Idempotent: deleting an absent or already-expired session still
    /// reports success, because the end state is identical.
    pub async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.store.delete(session_id).await?;
        tracing::info!(session_id, "session deleted");
        Ok(())
    }
}
