//! Configuration — TOML file plus environment overrides.
//!
//! Resolution order: explicit `--config` path → `~/.ragway/config.toml` →
//! built-in defaults. Environment variables (`PORT`, `REDIS_URL`,
//! `RAG_API_URL`, `SESSION_TTL_SECS`) are applied after the file loads.

use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sliding transcript expiry window, in seconds.
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// Top-level gateway configuration, loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Gateway server configuration: host and port (`[gateway]`).
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Transcript store configuration: backend, url, ttl (`[store]`).
    #[serde(default)]
    pub store: StoreConfig,

    /// Answer backend configuration (`[backend]`).
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Gateway server configuration (`[gateway]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Bind host (default: 127.0.0.1)
    #[serde(default = "default_gateway_host")]
    pub host: String,
    /// Bind port (default: 3001)
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

/// Transcript store configuration (`[store]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store backend: `"redis"` or `"memory"` (default: redis).
    #[serde(default = "default_store_backend")]
    pub backend: String,
    /// Store connection URL (redis backend only).
    #[serde(default = "default_store_url")]
    pub url: String,
    /// Key prefix for transcript entries.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Sliding session TTL in seconds (default: 3600).
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

/// Answer backend configuration (`[backend]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Query endpoint of the question-answering service.
    #[serde(default = "default_backend_url")]
    pub url: String,
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3001
}

fn default_store_backend() -> String {
    "redis".to_string()
}

fn default_store_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_key_prefix() -> String {
    "session".to_string()
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS
}

fn default_backend_url() -> String {
    "http://localhost:8000/query".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            url: default_store_url(),
            key_prefix: default_key_prefix(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
        }
    }
}

impl Config {
    /// Default config file location: `~/.ragway/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        UserDirs::new().map(|dirs| dirs.home_dir().join(".ragway").join("config.toml"))
    }

    /// Load from `path` if given, otherwise from the default location.
    /// A missing file yields defaults; a malformed file is an error.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let resolved = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path(),
        };

        let Some(resolved) = resolved else {
            return Ok(Self::default());
        };

        if !resolved.exists() {
            return Ok(Self::default());
        }

        let raw = tokio::fs::read_to_string(&resolved)
            .await
            .with_context(|| format!("failed to read config: {}", resolved.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("invalid config TOML: {}", resolved.display()))
    }

    /// Apply environment variable overrides on top of the loaded file.
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = env_nonempty("PORT") {
            match port.parse::<u16>() {
                Ok(port) => self.gateway.port = port,
                Err(_) => {
                    tracing::warn!(value = %port, "ignoring invalid PORT override");
                }
            }
        }
        if let Some(url) = env_nonempty("REDIS_URL") {
            self.store.url = url;
        }
        if let Some(url) = env_nonempty("RAG_API_URL") {
            self.backend.url = url;
        }
        if let Some(ttl) = env_nonempty("SESSION_TTL_SECS") {
            match ttl.parse::<u64>() {
                Ok(secs) if secs > 0 => self.store.ttl_secs = secs,
                _ => {
                    tracing::warn!(value = %ttl, "ignoring invalid SESSION_TTL_SECS override");
                }
            }
        }
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
