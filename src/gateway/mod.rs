//! HTTP gateway — thin transport binding over the session core.
//!
//! Routes map one-to-one onto Session Manager and Query Orchestrator
//! operations; handlers live in [`api`]. The store handle and backend
//! client are constructed once at startup and injected into the state,
//! never held as ambient globals.

pub mod api;

use anyhow::{Context, Result};
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;

use crate::backend::{AnswerBackend, HttpAnswerBackend};
use crate::config::Config;
use crate::orchestrator::QueryOrchestrator;
use crate::sessions::SessionManager;
use crate::store;

/// Request bodies are session IDs plus a query string; 64 KiB is generous.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub orchestrator: Arc<QueryOrchestrator>,
}

/// Build the gateway router over the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/session", post(api::handle_create_session))
        .route("/query", post(api::handle_query))
        .route("/session/{session_id}/history", get(api::handle_history))
        .route("/session/{session_id}", delete(api::handle_delete_session))
        .route("/health", get(api::handle_health))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

/// Start the gateway and serve until a shutdown signal arrives.
pub async fn run_gateway(host: &str, port: u16, config: &Config) -> Result<()> {
    let ttl = Duration::from_secs(config.store.ttl_secs);
    let store = store::create_store(&config.store)?;
    let backend: Arc<dyn AnswerBackend> = Arc::new(HttpAnswerBackend::new(&config.backend.url));

    let state = AppState {
        sessions: Arc::new(SessionManager::new(store.clone(), ttl)),
        orchestrator: Arc::new(QueryOrchestrator::new(store.clone(), backend, ttl)),
    };

    let app = router(state);
    let listener = tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind gateway to {host}:{port}"))?;
    info!(
        addr = %listener.local_addr()?,
        store = store.name(),
        backend_url = %config.backend.url,
        ttl_secs = ttl.as_secs(),
        "ragway gateway listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server error")
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to install shutdown signal handler");
        return;
    }
    info!("shutdown signal received; draining gateway");
}
