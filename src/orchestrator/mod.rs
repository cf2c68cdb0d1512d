//! Query orchestration — one user/backend/bot round trip per call.
//!
//! The sequence is ordered but deliberately not transactional: concurrent
//! calls against the same session may interleave their appends, and a
//! backend failure leaves a trailing unanswered user turn in the transcript.
//! The transcript is an append-only log of what happened, not an
//! exactly-once record.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::AnswerBackend;
use crate::error::GatewayError;
use crate::store::{Message, TranscriptStore};

pub struct QueryOrchestrator {
    store: Arc<dyn TranscriptStore>,
    backend: Arc<dyn AnswerBackend>,
    ttl: Duration,
}

impl QueryOrchestrator {
    pub fn new(
        store: Arc<dyn TranscriptStore>,
        backend: Arc<dyn AnswerBackend>,
        ttl: Duration,
    ) -> Self {
        Self { store, backend, ttl }
    }

    /// Submit one query against a session and return the backend's answer.
    ///
    /// Steps, in order: validate input, append the user turn, call the
    /// backend, append the bot turn, refresh the session TTL. Appending to
    /// an unknown session implicitly recreates it; the gateway does not
    /// distinguish "unknown session" from "fresh session" at append time.
    /// A TTL refresh failure is logged but does not withhold an already
    /// computed answer.
    pub async fn submit_query(
        &self,
        session_id: &str,
        query: &str,
    ) -> Result<String, GatewayError> {
        if session_id.is_empty() {
            return Err(GatewayError::InvalidInput("sessionId is required".to_string()));
        }
        if query.is_empty() {
            return Err(GatewayError::InvalidInput("query is required".to_string()));
        }

        self.store
            .append(session_id, Message::user(query))
            .await
            .map_err(GatewayError::Store)?;

        let answer = self
            .backend
            .answer(query)
            .await
            .map_err(GatewayError::Backend)?;

        self.store
            .append(session_id, Message::bot(&answer))
            .await
            .map_err(GatewayError::Store)?;

        if let Err(error) = self.store.set_expiry(session_id, self.ttl).await {
            tracing::warn!(
                session_id,
                error = %error,
                "transcript expiry refresh failed; answer still returned"
            );
        }

        tracing::debug!(session_id, backend = self.backend.name(), "query answered");
        Ok(answer)
    }

    /// Read a session's full transcript in append order.
    pub async fn history(&self, session_id: &str) -> Result<Vec<Message>, GatewayError> {
        self.store.read_all(session_id).await.map_err(GatewayError::Store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryTranscriptStore, Role};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const HOUR: Duration = Duration::from_secs(3600);

    /// Scripted backend: echoes a canned reply or fails every call.
    struct ScriptedBackend {
        reply: Option<String>,
        calls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn answering(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AnswerBackend for ScriptedBackend {
        async fn answer(&self, query: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => anyhow::bail!("backend unavailable: {query}"),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn orchestrator(
        backend: ScriptedBackend,
    ) -> (QueryOrchestrator, Arc<dyn TranscriptStore>) {
        let store: Arc<dyn TranscriptStore> = Arc::new(InMemoryTranscriptStore::new(HOUR));
        (
            QueryOrchestrator::new(store.clone(), Arc::new(backend), HOUR),
            store,
        )
    }

    #[tokio::test]
    async fn sequential_queries_preserve_turn_order() {
        let (orchestrator, store) = orchestrator(ScriptedBackend::answering("ok"));

        orchestrator.submit_query("s1", "q1").await.unwrap();
        orchestrator.submit_query("s1", "q2").await.unwrap();

        let transcript = store.read_all("s1").await.unwrap();
        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript[0], Message::user("q1"));
        assert_eq!(transcript[1], Message::bot("ok"));
        assert_eq!(transcript[2], Message::user("q2"));
        assert_eq!(transcript[3], Message::bot("ok"));
    }

    #[tokio::test]
    async fn empty_session_id_is_rejected_before_any_side_effect() {
        let (orchestrator, store) = orchestrator(ScriptedBackend::answering("ok"));

        let err = orchestrator.submit_query("", "q1").await.err().unwrap();
        assert!(matches!(err, GatewayError::InvalidInput(_)));
        assert!(store.read_all("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_query_is_rejected_without_calling_backend() {
        let backend = ScriptedBackend::answering("ok");
        let store: Arc<dyn TranscriptStore> = Arc::new(InMemoryTranscriptStore::new(HOUR));
        let backend = Arc::new(backend);
        let orchestrator = QueryOrchestrator::new(store.clone(), backend.clone(), HOUR);

        let err = orchestrator.submit_query("s1", "").await.err().unwrap();
        assert!(matches!(err, GatewayError::InvalidInput(_)));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert!(store.read_all("s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn backend_failure_retains_orphaned_user_turn() {
        let (orchestrator, store) = orchestrator(ScriptedBackend::failing());

        let err = orchestrator.submit_query("s1", "q1").await.err().unwrap();
        assert!(matches!(err, GatewayError::Backend(_)));

        // The user message stays; there is no compensating rollback and no
        // matching bot turn.
        let transcript = store.read_all("s1").await.unwrap();
        assert_eq!(transcript, vec![Message::user("q1")]);
    }

    #[tokio::test]
    async fn unknown_session_is_recreated_at_append_time() {
        let (orchestrator, store) = orchestrator(ScriptedBackend::answering("ok"));

        orchestrator.submit_query("never-created", "q1").await.unwrap();
        let transcript = store.read_all("never-created").await.unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].role, Role::User);
        assert_eq!(transcript[1].role, Role::Bot);
    }

    #[tokio::test]
    async fn history_of_unknown_session_is_empty() {
        let (orchestrator, _) = orchestrator(ScriptedBackend::answering("ok"));
        assert!(orchestrator.history("never-created").await.unwrap().is_empty());
    }
}
