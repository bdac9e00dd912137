//! Handlers behind the guard, plus the unguarded health probe.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Serialize;

use crate::http::middleware::GuardState;
use crate::security::Session;

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
    /// Form field to echo the token in.
    pub field: String,
    /// Header to echo the token in.
    pub header: String,
}

pub async fn index() -> &'static str {
    "Request accepted"
}

pub async fn submit(body: String) -> impl IntoResponse {
    tracing::debug!(bytes = body.len(), "Form submission accepted");
    (StatusCode::OK, "Submission accepted")
}

/// Issue a fresh CSRF token for the caller's session.
pub async fn csrf_token(
    State(state): State<GuardState>,
    Extension(session): Extension<Session>,
) -> Json<TokenResponse> {
    let token = state.guard.issue_csrf_token(&session);
    Json(TokenResponse {
        token,
        field: state.csrf.field_name.clone(),
        header: state.csrf.header_name.clone(),
    })
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
