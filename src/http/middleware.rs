//! Guard middleware.
//! Builds a `GuardRequest` from the axum request and runs the guard.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::{CsrfConfig, GuardConfig, SessionConfig};
use crate::observability::metrics;
use crate::security::csrf::is_safe_method;
use crate::security::ip::{effective_transport, extract_client_ip};
use crate::security::session::{session_cookie, session_id_from_headers};
use crate::security::{GuardRejection, GuardRequest, RequestGuard, SessionStore, Transport};

/// State shared by the guard middleware and guarded handlers.
#[derive(Clone)]
pub struct GuardState {
    pub guard: Arc<RequestGuard>,
    pub sessions: SessionStore,
    pub csrf: Arc<CsrfConfig>,
    pub session: Arc<SessionConfig>,
    pub trust_proxy: bool,
    pub https_enforced: bool,
}

impl GuardState {
    pub fn new(config: &GuardConfig, guard: Arc<RequestGuard>, sessions: SessionStore) -> Self {
        Self {
            guard,
            sessions,
            csrf: Arc::new(config.csrf.clone()),
            session: Arc::new(config.session.clone()),
            trust_proxy: config.listener.trust_proxy,
            https_enforced: config.https.enforce,
        }
    }
}

pub async fn guard_middleware(
    State(state): State<GuardState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let listener_transport = request
        .extensions()
        .get::<Transport>()
        .copied()
        .unwrap_or(Transport::Plain);
    let transport = effective_transport(request.headers(), listener_transport, state.trust_proxy);
    let client_ip = extract_client_ip(
        request.headers(),
        request.extensions().get::<ConnectInfo<SocketAddr>>(),
        state.trust_proxy,
    );

    // A plain request is about to be redirected; its token is irrelevant.
    let (mut request, csrf_token) = if state.https_enforced && !transport.is_secure() {
        (request, None)
    } else {
        match extract_csrf_token(request, &state.csrf).await {
            Ok(extracted) => extracted,
            Err(rejection) => return reject(rejection, client_ip),
        }
    };

    let guard_request = GuardRequest {
        transport,
        method: request.method().clone(),
        host: request_host(&request),
        path_and_query: request
            .uri()
            .path_and_query()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| "/".to_string()),
        client_ip,
        csrf_token,
    };

    let session_id = session_id_from_headers(request.headers(), &state.session.cookie_name);
    let session = state.sessions.resume_or_create(session_id.as_deref());

    if let Err(rejection) = state.guard.init_request(&guard_request, &session) {
        if session.is_new() {
            session.destroy();
        }
        return reject(rejection, client_ip);
    }

    metrics::record_allowed();
    let set_cookie = session
        .is_new()
        .then(|| session_cookie(&state.session, session.id()));
    request.extensions_mut().insert(session);

    let mut response = next.run(request).await;
    if let Some(cookie) = set_cookie.and_then(|c| HeaderValue::from_str(&c).ok()) {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

fn reject(rejection: GuardRejection, client_ip: IpAddr) -> Response {
    tracing::warn!(client = %client_ip, reason = rejection.reason(), "Request rejected: {}", rejection);
    metrics::record_rejected(rejection.reason());
    rejection.into_response()
}

fn request_host<B>(request: &Request<B>) -> Option<String> {
    request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.as_str().to_string()))
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| {
            mime.trim()
                .eq_ignore_ascii_case("application/x-www-form-urlencoded")
        })
}

/// Find the submitted token in the CSRF header, or in the form body of a
/// state-mutating request. A buffered body is put back for the handler.
async fn extract_csrf_token(
    request: Request<Body>,
    csrf: &CsrfConfig,
) -> Result<(Request<Body>, Option<String>), GuardRejection> {
    if !csrf.enabled {
        return Ok((request, None));
    }

    if let Some(token) = request
        .headers()
        .get(csrf.header_name.as_str())
        .and_then(|v| v.to_str().ok())
    {
        let token = token.trim().to_string();
        return Ok((request, Some(token)));
    }

    if is_safe_method(request.method()) || !is_form(request.headers()) {
        return Ok((request, None));
    }

    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, csrf.max_form_bytes)
        .await
        .map_err(|_| GuardRejection::PayloadTooLarge)?;
    let token = url::form_urlencoded::parse(&bytes)
        .find(|(name, _)| name == csrf.field_name.as_str())
        .map(|(_, value)| value.into_owned());

    Ok((Request::from_parts(parts, Body::from(bytes)), token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn token_read_from_form_and_body_restored() {
        let request = Request::post("/submit")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded; charset=utf-8")
            .body(Body::from("name=a&csrf_token=abc%20def"))
            .unwrap();

        let (request, token) = extract_csrf_token(request, &CsrfConfig::default())
            .await
            .unwrap();
        assert_eq!(token.as_deref(), Some("abc def"));

        let body = axum::body::to_bytes(request.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"name=a&csrf_token=abc%20def");
    }

    #[tokio::test]
    async fn header_takes_precedence_over_form() {
        let request = Request::post("/submit")
            .header("X-CSRF-Token", "from-header")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("csrf_token=from-form"))
            .unwrap();

        let (_, token) = extract_csrf_token(request, &CsrfConfig::default())
            .await
            .unwrap();
        assert_eq!(token.as_deref(), Some("from-header"));
    }

    #[tokio::test]
    async fn oversized_form_is_rejected() {
        let config = CsrfConfig {
            max_form_bytes: 8,
            ..CsrfConfig::default()
        };
        let request = Request::post("/submit")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("csrf_token=0123456789"))
            .unwrap();

        let err = extract_csrf_token(request, &config).await.unwrap_err();
        assert_eq!(err, GuardRejection::PayloadTooLarge);
    }

    #[tokio::test]
    async fn json_body_is_not_scanned() {
        let request = Request::post("/submit")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"csrf_token":"x"}"#))
            .unwrap();

        let (_, token) = extract_csrf_token(request, &CsrfConfig::default())
            .await
            .unwrap();
        assert!(token.is_none());
    }
}
