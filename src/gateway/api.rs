//! REST API handlers for the session gateway.

use super::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;

use crate::error::GatewayError;

#[derive(Deserialize)]
pub struct QueryBody {
    /// Absent fields deserialize as empty and are rejected by the
    /// orchestrator's input validation, so missing and empty are one case.
    #[serde(default, rename = "sessionId")]
    pub session_id: String,
    #[serde(default)]
    pub query: String,
}

/// Map a gateway error onto its transport status and JSON body.
fn error_response(err: &GatewayError) -> Response {
    let (status, body) = match err {
        GatewayError::InvalidInput(message) => (
            StatusCode::BAD_REQUEST,
            serde_json::json!({"error": message}),
        ),
        GatewayError::Backend(detail) => (
            StatusCode::BAD_GATEWAY,
            serde_json::json!({"error": "Failed to get response", "details": format!("{detail:#}")}),
        ),
        GatewayError::Store(detail) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            serde_json::json!({"error": "Transcript store failure", "details": format!("{detail:#}")}),
        ),
    };
    (status, Json(body)).into_response()
}

/// POST /session — mint a fresh session
pub async fn handle_create_session(State(state): State<AppState>) -> impl IntoResponse {
    match state.sessions.create_session().await {
        Ok(session_id) => Json(serde_json::json!({"sessionId": session_id})).into_response(),
        Err(e) => error_response(&GatewayError::Store(e)),
    }
}

/// POST /query — one question/answer round trip against a session
pub async fn handle_query(
    State(state): State<AppState>,
    Json(body): Json<QueryBody>,
) -> impl IntoResponse {
    match state
        .orchestrator
        .submit_query(&body.session_id, &body.query)
        .await
    {
        Ok(answer) => Json(serde_json::json!({"response": answer})).into_response(),
        Err(err) => {
            tracing::warn!(session_id = %body.session_id, error = %err, "query failed");
            error_response(&err)
        }
    }
}

/// GET /session/{session_id}/history — full transcript in append order
pub async fn handle_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.orchestrator.history(&session_id).await {
        Ok(history) => Json(serde_json::json!({"history": history})).into_response(),
        Err(err) => error_response(&err),
    }
}

/// DELETE /session/{session_id} — clear a session immediately
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.sessions.delete_session(&session_id).await {
        Ok(()) => Json(serde_json::json!({"message": "Session history cleared."})).into_response(),
        Err(e) => error_response(&GatewayError::Store(e)),
    }
}

/// GET /health — liveness probe
pub async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok", "service": "ragway"}))
}
