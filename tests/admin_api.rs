//! Admin API tests, driven in-process through the router.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use request_guard::{GuardConfig, HttpServer};
use serde_json::Value;
use tower::ServiceExt;

fn server() -> HttpServer {
    let mut config = GuardConfig::default();
    config.admin.enabled = true;
    config.admin.api_key = "test-admin-key".into();
    HttpServer::new(config)
}

async fn get(server: &HttpServer, path: &str, key: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::get(path);
    if let Some(key) = key {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {key}"));
    }
    let res = server
        .admin_app()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), 64 * 1024).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_admin_requires_valid_key() {
    let server = server();

    let (status, _) = get(&server, "/admin/status", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get(&server, "/admin/status", Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = get(&server, "/admin/status", Some("test-admin-key")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "operational");
}

#[tokio::test]
async fn test_admin_reports_tracked_clients() {
    let server = server();
    for _ in 0..12 {
        server.guard().limiter().check("10.0.0.5");
    }
    server.guard().limiter().check("10.0.0.6");
    server.sessions().resume_or_create(None);

    let (_, body) = get(&server, "/admin/clients", Some("test-admin-key")).await;
    assert_eq!(body["max_requests"], 10);
    assert_eq!(body["window_secs"], 60);
    assert_eq!(body["clients"][0]["client"], "10.0.0.5");
    assert_eq!(body["clients"][0]["count"], 12);
    assert_eq!(body["clients"][0]["limited"], true);
    assert_eq!(body["clients"][1]["limited"], false);

    let (_, body) = get(&server, "/admin/sessions", Some("test-admin-key")).await;
    assert_eq!(body["active"], 1);
}

#[tokio::test]
async fn test_secure_listener_skips_redirect() {
    let server = server();
    let req = Request::get("/")
        .header(header::HOST, "guard.example")
        .body(Body::empty())
        .unwrap();

    let res = server
        .app(request_guard::security::Transport::Secure)
        .oneshot(req)
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get(header::SET_COOKIE).is_some());

    let req = Request::get("/")
        .header(header::HOST, "guard.example")
        .body(Body::empty())
        .unwrap();
    let res = server
        .app(request_guard::security::Transport::Plain)
        .oneshot(req)
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
}
