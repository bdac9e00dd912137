//! CSRF token issuance and verification.
//!
//! Tokens are 32 bytes from the OS CSPRNG, hex-encoded (64 chars), stored
//! in the caller's session. Verification compares in constant time.

use axum::http::Method;
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::config::CsrfConfig;
use crate::security::rejection::GuardRejection;

pub const CSRF_TOKEN_BYTES: usize = 32;

/// Session-scoped storage for the CSRF token.
pub trait TokenStore {
    fn csrf_token(&self) -> Option<String>;
    fn store_csrf_token(&self, token: String);
}

/// Generate a fresh random token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; CSRF_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Constant-time token comparison.
///
/// Only the length is allowed to short-circuit; it is not secret.
pub fn tokens_match(expected: &str, submitted: &str) -> bool {
    expected.as_bytes().ct_eq(submitted.as_bytes()).into()
}

/// GET, HEAD, OPTIONS and TRACE never change server state and so never
/// need a token.
pub fn is_safe_method(method: &Method) -> bool {
    method.is_safe()
}

/// CSRF policy derived from configuration.
#[derive(Debug, Clone)]
pub struct CsrfPolicy {
    enabled: bool,
    require_on_unsafe_methods: bool,
}

impl CsrfPolicy {
    pub fn from_config(config: &CsrfConfig) -> Self {
        Self {
            enabled: config.enabled,
            require_on_unsafe_methods: config.require_on_unsafe_methods,
        }
    }

    pub fn verify<S>(
        &self,
        method: &Method,
        submitted: Option<&str>,
        session: &S,
    ) -> Result<(), GuardRejection>
    where
        S: TokenStore + ?Sized,
    {
        if !self.enabled {
            return Ok(());
        }

        let Some(submitted) = submitted else {
            if self.require_on_unsafe_methods && !is_safe_method(method) {
                return Err(GuardRejection::TokenMissing);
            }
            return Ok(());
        };

        match session.csrf_token() {
            Some(expected) if tokens_match(&expected, submitted) => Ok(()),
            _ => Err(GuardRejection::TokenMismatch),
        }
    }

    /// Issue a new token into `session`, replacing any previous one.
    pub fn issue<S>(&self, session: &S) -> String
    where
        S: TokenStore + ?Sized,
    {
        let token = generate_token();
        session.store_csrf_token(token.clone());
        token
    }
}
