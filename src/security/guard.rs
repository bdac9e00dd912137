//! The per-request guard: HTTPS, then CSRF, then rate limiting.

use std::net::IpAddr;
use std::time::Instant;

use axum::http::Method;

use crate::config::GuardConfig;
use crate::observability::metrics;
use crate::security::csrf::{CsrfPolicy, TokenStore};
use crate::security::https::{HttpsPolicy, Transport};
use crate::security::rate_limit::RateLimiter;
use crate::security::rejection::GuardRejection;

/// What the guard needs to know about one request.
#[derive(Debug, Clone)]
pub struct GuardRequest {
    pub transport: Transport,
    pub method: Method,
    pub host: Option<String>,
    pub path_and_query: String,
    pub client_ip: IpAddr,
    /// Token submitted in the CSRF header or form field, if any.
    pub csrf_token: Option<String>,
}

/// `Ok` lets the request through; `Err` ends it.
pub type Verdict = Result<(), GuardRejection>;

/// Shared guard state, built once at startup.
pub struct RequestGuard {
    https: HttpsPolicy,
    csrf: CsrfPolicy,
    limiter: RateLimiter,
    rate_limit_enabled: bool,
}

impl RequestGuard {
    pub fn new(config: &GuardConfig) -> Self {
        Self {
            https: HttpsPolicy::from_config(&config.https),
            csrf: CsrfPolicy::from_config(&config.csrf),
            limiter: RateLimiter::from_config(&config.rate_limit),
            rate_limit_enabled: config.rate_limit.enabled,
        }
    }

    pub fn init_request<S>(&self, request: &GuardRequest, session: &S) -> Verdict
    where
        S: TokenStore + ?Sized,
    {
        self.init_request_at(request, session, Instant::now())
    }

    /// Run every check in order; the first failure wins and later checks
    /// are skipped, so a redirected request is never counted.
    pub fn init_request_at<S>(&self, request: &GuardRequest, session: &S, now: Instant) -> Verdict
    where
        S: TokenStore + ?Sized,
    {
        self.https.enforce(
            request.transport,
            request.host.as_deref(),
            &request.path_and_query,
        )?;
        self.csrf
            .verify(&request.method, request.csrf_token.as_deref(), session)?;
        self.rate_limit(request.client_ip, now)
    }

    fn rate_limit(&self, client_ip: IpAddr, now: Instant) -> Verdict {
        if !self.rate_limit_enabled {
            return Ok(());
        }
        let key = client_ip.to_string();
        let outcome = self.limiter.check_at(&key, now);
        if outcome.allowed {
            Ok(())
        } else {
            tracing::debug!(client = %key, count = outcome.count, "Request budget exhausted");
            Err(GuardRejection::RateLimitExceeded { client: key })
        }
    }

    /// Issue a new CSRF token into `session` and return it.
    pub fn issue_csrf_token<S>(&self, session: &S) -> String
    where
        S: TokenStore + ?Sized,
    {
        let token = self.csrf.issue(session);
        metrics::record_token_issued();
        token
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}
