use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::admin::AdminState;

pub async fn admin_auth_middleware(
    State(state): State<AdminState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if let Some(key) = presented {
        if bool::from(key.as_bytes().ct_eq(state.api_key.as_bytes())) {
            return Ok(next.run(request).await);
        }
    }

    tracing::warn!("Admin request with missing or invalid API key");
    Err(StatusCode::UNAUTHORIZED)
}
