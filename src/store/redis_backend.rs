//! Redis/Valkey-backed transcript store.
//!
//! One list per session under `<prefix>:<session-id>`, holding JSON-encoded
//! messages in append order. Expiry is delegated to the server's key TTL.
//! A single multiplexed connection is shared across all in-flight requests;
//! a failed command reconnects once and reissues before surfacing the error.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::FromRedisValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::traits::{Message, TranscriptStore};

pub struct RedisTranscriptStore {
    client: redis::Client,
    key_prefix: String,
    ttl: Duration,
    connection: Arc<Mutex<Option<redis::aio::MultiplexedConnection>>>,
}

impl RedisTranscriptStore {
    /// Create a store against `url`. Appends arm `ttl` as the sliding window.
    pub fn new(url: &str, key_prefix: &str, ttl: Duration) -> Result<Self> {
        let client = redis::Client::open(url)
            .with_context(|| format!("invalid redis url for transcript store: {url}"))?;
        Ok(Self {
            client,
            key_prefix: key_prefix.trim_end_matches(':').to_string(),
            ttl,
            connection: Arc::new(Mutex::new(None)),
        })
    }

    fn transcript_key(&self, session_id: &str) -> String {
        format!("{}:{}", self.key_prefix, session_id)
    }

    async fn ensure_connection(
        &self,
        connection: &mut Option<redis::aio::MultiplexedConnection>,
    ) -> Result<()> {
        if connection.is_some() {
            return Ok(());
        }
        *connection = Some(
            self.client
                .get_multiplexed_async_connection()
                .await
                .context("failed to open redis connection for transcript store")?,
        );
        tracing::debug!(key_prefix = %self.key_prefix, "redis transcript store connected");
        Ok(())
    }

    /// Run a command against the shared connection, reconnecting once on
    /// failure. This is connection management, not operation retry: the
    /// command is reissued at most one time after a stale-connection error.
    async fn run_command<T, F>(&self, operation: &'static str, build: F) -> Result<T>
    where
        T: FromRedisValue + Send,
        F: Fn() -> redis::Cmd,
    {
        let mut last_err: Option<anyhow::Error> = None;
        for attempt in 0..2 {
            let mut conn_guard = self.connection.lock().await;
            self.ensure_connection(&mut conn_guard).await?;
            let conn = conn_guard
                .as_mut()
                .ok_or_else(|| anyhow::anyhow!("redis transcript store connection unavailable"))?;
            let result: redis::RedisResult<T> = build().query_async(conn).await;
            match result {
                Ok(value) => return Ok(value),
                Err(err) => {
                    tracing::warn!(
                        operation,
                        attempt = attempt + 1,
                        error = %err,
                        "redis command failed; reconnecting"
                    );
                    *conn_guard = None;
                    last_err =
                        Some(anyhow::anyhow!(err).context("redis command failed for transcript store"));
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("redis command failed for unknown reason")))
    }

    async fn run_pipeline<T, F>(&self, operation: &'static str, build: F) -> Result<T>
    where
        T: FromRedisValue + Send,
        F: Fn() -> redis::Pipeline,
    {
        let mut last_err: Option<anyhow::Error> = None;
        for attempt in 0..2 {
            let mut conn_guard = self.connection.lock().await;
            self.ensure_connection(&mut conn_guard).await?;
            let conn = conn_guard
                .as_mut()
                .ok_or_else(|| anyhow::anyhow!("redis transcript store connection unavailable"))?;
            let result: redis::RedisResult<T> = build().query_async(conn).await;
            match result {
                Ok(value) => return Ok(value),
                Err(err) => {
                    tracing::warn!(
                        operation,
                        attempt = attempt + 1,
                        error = %err,
                        "redis pipeline failed; reconnecting"
                    );
                    *conn_guard = None;
                    last_err = Some(
                        anyhow::anyhow!(err).context("redis pipeline failed for transcript store"),
                    );
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("redis pipeline failed for unknown reason")))
    }
}

#[async_trait]
impl TranscriptStore for RedisTranscriptStore {
    async fn append(&self, session_id: &str, message: Message) -> Result<()> {
        let key = self.transcript_key(session_id);
        let payload =
            serde_json::to_string(&message).context("failed to encode message for redis")?;
        let ttl_secs = self.ttl.as_secs();

        // RPUSH + EXPIRE in one atomic pipeline so the sliding window is
        // rearmed by the same round trip that mutates the transcript.
        self.run_pipeline::<(), _>("append", || {
            let mut pipe = redis::pipe();
            pipe.atomic();
            pipe.cmd("RPUSH").arg(&key).arg(&payload).ignore();
            pipe.cmd("EXPIRE").arg(&key).arg(ttl_secs).ignore();
            pipe
        })
        .await?;
        tracing::debug!(session_id, ttl_secs, "transcript message appended");
        Ok(())
    }

    async fn set_expiry(&self, session_id: &str, ttl: Duration) -> Result<()> {
        let key = self.transcript_key(session_id);
        let ttl_secs = ttl.as_secs();

        // EXPIRE on an absent key is a server-side no-op (returns 0); the
        // key reads as empty either way, so that is not an error here.
        let _: i64 = self
            .run_command("set_expiry", || {
                let mut cmd = redis::cmd("EXPIRE");
                cmd.arg(&key).arg(ttl_secs);
                cmd
            })
            .await?;
        Ok(())
    }

    async fn read_all(&self, session_id: &str) -> Result<Vec<Message>> {
        let key = self.transcript_key(session_id);
        let payloads: Vec<String> = self
            .run_command("read_all", || {
                let mut cmd = redis::cmd("LRANGE");
                cmd.arg(&key).arg(0).arg(-1);
                cmd
            })
            .await?;

        let mut messages = Vec::with_capacity(payloads.len());
        for payload in payloads {
            match serde_json::from_str::<Message>(&payload) {
                Ok(message) => messages.push(message),
                Err(error) => {
                    tracing::warn!(
                        session_id,
                        error = %error,
                        "skipping invalid message payload in transcript"
                    );
                }
            }
        }
        Ok(messages)
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let key = self.transcript_key(session_id);
        let _: i64 = self
            .run_command("delete", || {
                let mut cmd = redis::cmd("DEL");
                cmd.arg(&key);
                cmd
            })
            .await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "redis"
    }
}
