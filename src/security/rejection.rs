//! Terminal guard rejections and their HTTP responses.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// Why the guard refused a request. Every variant ends the request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardRejection {
    /// Received over plain HTTP; the client should retry at `location`.
    #[error("insecure transport, redirecting to {location}")]
    TransportInsecure { location: String },

    /// No host to build a redirect from.
    #[error("missing Host header")]
    MissingHost,

    /// State-mutating request without a CSRF token.
    #[error("missing CSRF token")]
    TokenMissing,

    /// Submitted CSRF token does not match the session token.
    #[error("CSRF token mismatch")]
    TokenMismatch,

    /// Client exceeded its request budget for the current window.
    #[error("rate limit exceeded for {client}")]
    RateLimitExceeded { client: String },

    /// Form body too large to scan for a token.
    #[error("request body too large")]
    PayloadTooLarge,
}

impl GuardRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::TransportInsecure { .. } => StatusCode::FOUND,
            Self::MissingHost => StatusCode::BAD_REQUEST,
            Self::TokenMissing | Self::TokenMismatch => StatusCode::FORBIDDEN,
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Short label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::TransportInsecure { .. } => "insecure_transport",
            Self::MissingHost => "missing_host",
            Self::TokenMissing => "csrf_missing",
            Self::TokenMismatch => "csrf_mismatch",
            Self::RateLimitExceeded { .. } => "rate_limited",
            Self::PayloadTooLarge => "payload_too_large",
        }
    }
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::TransportInsecure { location } => {
                let mut response = status.into_response();
                if let Ok(v) = HeaderValue::from_str(&location) {
                    response.headers_mut().insert(header::LOCATION, v);
                }
                response
            }
            Self::MissingHost => (status, "Missing Host header").into_response(),
            Self::TokenMissing => (status, "CSRF token required").into_response(),
            Self::TokenMismatch => (status, "CSRF token mismatch").into_response(),
            Self::RateLimitExceeded { .. } => (status, "Too many requests").into_response(),
            Self::PayloadTooLarge => (status, "Request body too large").into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_carries_location() {
        let response = GuardRejection::TransportInsecure {
            location: "https://example.com/a?b=1".into(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://example.com/a?b=1"
        );
    }

    #[test]
    fn rate_limit_response_has_no_retry_hint() {
        let response = GuardRejection::RateLimitExceeded {
            client: "10.0.0.5".into(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
    }
}
