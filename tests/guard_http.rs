//! End-to-end tests against a running guard.

use reqwest::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use reqwest::StatusCode;
use serde_json::Value;

mod common;

const FORWARDED_PROTO: &str = "X-Forwarded-Proto";

#[tokio::test]
async fn test_plain_request_is_redirected() {
    let guard = common::start_guard(request_guard::GuardConfig::default()).await;
    let client = common::client();

    let res = client
        .get(guard.url("/login?next=%2Fhome"))
        .header("Host", "guard.example")
        .send()
        .await
        .expect("guard unreachable");

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(
        res.headers().get(LOCATION).unwrap(),
        "https://guard.example/login?next=%2Fhome"
    );
    assert!(res.headers().get(SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_health_is_not_guarded() {
    let guard = common::start_guard(request_guard::GuardConfig::default()).await;

    let res = common::client().get(guard.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("x-request-id").is_some());
}

#[tokio::test]
async fn test_csrf_round_trip_over_forwarded_https() {
    let guard = common::start_guard(common::proxied_config()).await;
    let client = common::client();

    let res = client
        .get(guard.url("/csrf-token"))
        .header(FORWARDED_PROTO, "https")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let cookie = res
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .expect("session cookie")
        .to_string();
    assert!(cookie.starts_with("guard_session="));

    let body: Value = res.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 64);
    assert_eq!(body["field"], "csrf_token");

    let submit = |form: String| {
        client
            .post(guard.url("/submit"))
            .header(FORWARDED_PROTO, "https")
            .header(COOKIE, cookie.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
    };

    let ok = submit(format!("comment=hi&csrf_token={token}")).await.unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    assert!(ok.headers().get(SET_COOKIE).is_none());

    let mut mutated = token.clone().into_bytes();
    mutated[0] = if mutated[0] == b'a' { b'b' } else { b'a' };
    let mutated = String::from_utf8(mutated).unwrap();
    let bad = submit(format!("csrf_token={mutated}")).await.unwrap();
    assert_eq!(bad.status(), StatusCode::FORBIDDEN);

    let missing = submit("comment=hi".to_string()).await.unwrap();
    assert_eq!(missing.status(), StatusCode::FORBIDDEN);

    let via_header = client
        .post(guard.url("/submit"))
        .header(FORWARDED_PROTO, "https")
        .header(COOKIE, cookie.clone())
        .header("X-CSRF-Token", token.as_str())
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(via_header.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_token_from_another_session_is_rejected() {
    let guard = common::start_guard(common::proxied_config()).await;
    let client = common::client();

    let res = client
        .get(guard.url("/csrf-token"))
        .header(FORWARDED_PROTO, "https")
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    // No cookie: the guard opens a fresh session with no token.
    let res = client
        .post(guard.url("/submit"))
        .header(FORWARDED_PROTO, "https")
        .header("X-CSRF-Token", token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_eleventh_request_is_rate_limited() {
    let guard = common::start_guard(common::proxied_config()).await;
    let client = common::client();

    let get_as = |ip: &'static str| {
        client
            .get(guard.url("/"))
            .header(FORWARDED_PROTO, "https")
            .header("X-Forwarded-For", ip)
            .send()
    };

    for i in 0..10 {
        let res = get_as("10.0.0.5").await.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "request {} should pass", i + 1);
    }

    let res = get_as("10.0.0.5").await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(res.headers().get("retry-after").is_none());

    let other = get_as("10.0.0.6").await.unwrap();
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forwarded_prefix_cannot_dodge_rate_limit() {
    let guard = common::start_guard(common::proxied_config()).await;
    let client = common::client();

    let get_via_proxy = |i: usize| {
        client
            .get(guard.url("/"))
            .header(FORWARDED_PROTO, "https")
            .header("X-Forwarded-For", format!("198.51.100.{i}, 10.0.0.5"))
            .send()
    };

    for i in 0..10 {
        let res = get_via_proxy(i).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "request {} should pass", i + 1);
    }

    let res = get_via_proxy(10).await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_optional_token_mode_skips_missing_token() {
    let mut config = common::proxied_config();
    config.csrf.require_on_unsafe_methods = false;
    let guard = common::start_guard(config).await;

    let res = common::client()
        .post(guard.url("/submit"))
        .header(FORWARDED_PROTO, "https")
        .body("comment=hi")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
