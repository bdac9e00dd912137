//! HTTPS redirect enforcement.

use axum::http::uri::Authority;

use crate::config::HttpsConfig;
use crate::security::rejection::GuardRejection;

/// How the connection carrying a request was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Plain,
    Secure,
}

impl Transport {
    pub fn is_secure(self) -> bool {
        matches!(self, Self::Secure)
    }
}

#[derive(Debug, Clone)]
pub struct HttpsPolicy {
    enforce: bool,
    https_port: u16,
}

impl HttpsPolicy {
    pub fn from_config(config: &HttpsConfig) -> Self {
        Self {
            enforce: config.enforce,
            https_port: config.https_port,
        }
    }

    /// Reject plain-transport requests with a redirect to the same host
    /// and path over HTTPS.
    pub fn enforce(
        &self,
        transport: Transport,
        host: Option<&str>,
        path_and_query: &str,
    ) -> Result<(), GuardRejection> {
        if !self.enforce || transport.is_secure() {
            return Ok(());
        }

        let location = self
            .redirect_location(host.ok_or(GuardRejection::MissingHost)?, path_and_query)
            .ok_or(GuardRejection::MissingHost)?;
        Err(GuardRejection::TransportInsecure { location })
    }

    /// Build `https://host[:port]/path?query`. The incoming port is dropped
    /// because it belongs to the plain listener.
    pub fn redirect_location(&self, host: &str, path_and_query: &str) -> Option<String> {
        let authority: Authority = host.trim().parse().ok()?;
        let hostname = authority.host();
        if hostname.is_empty() {
            return None;
        }

        let path = if path_and_query.starts_with('/') {
            path_and_query
        } else {
            "/"
        };

        Some(if self.https_port == 443 {
            format!("https://{hostname}{path}")
        } else {
            format!("https://{hostname}:{}{path}", self.https_port)
        })
    }
}
