//! Transcript storage — expiring per-session message logs.
//!
//! Each backend implements the [`TranscriptStore`] trait defined in
//! [`traits`] and is selected by its canonical string key in the factory
//! function [`create_store`].

pub mod in_memory;
pub mod redis_backend;
pub mod traits;

pub use in_memory::InMemoryTranscriptStore;
pub use redis_backend::RedisTranscriptStore;
pub use traits::{Message, Role, TranscriptStore};

use crate::config::StoreConfig;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Factory: create the configured transcript store backend.
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn TranscriptStore>> {
    let ttl = Duration::from_secs(config.ttl_secs);
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryTranscriptStore::new(ttl))),
        "redis" => Ok(Arc::new(RedisTranscriptStore::new(
            &config.url,
            &config.key_prefix,
            ttl,
        )?)),
        other => anyhow::bail!(
            "Unknown store backend: {other}. Supported backends: \"redis\", \"memory\"."
        ),
    }
}
