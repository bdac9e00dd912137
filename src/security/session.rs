//! In-memory sessions carried by a cookie.
//!
//! A session holds the CSRF token for one browser. Sessions idle past the
//! configured timeout count as ended and are swept.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{header, HeaderMap};
use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::config::SessionConfig;
use crate::security::csrf::TokenStore;

const SESSION_ID_BYTES: usize = 32;

#[derive(Debug, Clone)]
struct SessionRecord {
    csrf_token: Option<String>,
    last_seen: Instant,
}

/// Shared session map.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<DashMap<String, SessionRecord>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            idle_timeout,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(Duration::from_secs(config.idle_timeout_secs))
    }

    pub fn resume_or_create(&self, id: Option<&str>) -> Session {
        self.resume_or_create_at(id, Instant::now())
    }

    /// Resume the live session `id`, or start a new one when it is unknown
    /// or has been idle too long.
    pub fn resume_or_create_at(&self, id: Option<&str>, now: Instant) -> Session {
        if let Some(id) = id {
            if let Some(mut record) = self.inner.get_mut(id) {
                if now.saturating_duration_since(record.last_seen) < self.idle_timeout {
                    record.last_seen = now;
                    return Session {
                        id: id.to_owned(),
                        store: self.clone(),
                        is_new: false,
                    };
                }
            }
            self.inner.remove(id);
        }

        let id = new_session_id();
        self.inner.insert(
            id.clone(),
            SessionRecord {
                csrf_token: None,
                last_seen: now,
            },
        );
        Session {
            id,
            store: self.clone(),
            is_new: true,
        }
    }

    pub fn destroy(&self, id: &str) {
        self.inner.remove(id);
    }

    /// Remove idle sessions. Returns how many were removed.
    pub fn prune_idle(&self, now: Instant) -> usize {
        let before = self.inner.len();
        let idle_timeout = self.idle_timeout;
        self.inner
            .retain(|_, record| now.saturating_duration_since(record.last_seen) < idle_timeout);
        before.saturating_sub(self.inner.len())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Handle to one session, attached to the request for downstream handlers.
#[derive(Clone)]
pub struct Session {
    id: String,
    store: SessionStore,
    is_new: bool,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// True when this request started the session and the cookie still
    /// has to be sent.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn destroy(&self) {
        self.store.destroy(&self.id);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("is_new", &self.is_new)
            .finish_non_exhaustive()
    }
}

impl TokenStore for Session {
    fn csrf_token(&self) -> Option<String> {
        self.store
            .inner
            .get(&self.id)
            .and_then(|r| r.csrf_token.clone())
    }

    fn store_csrf_token(&self, token: String) {
        if let Some(mut record) = self.store.inner.get_mut(&self.id) {
            record.csrf_token = Some(token);
        }
    }
}

fn new_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Extract the session id from the `Cookie` header(s).
pub fn session_id_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value for a session.
pub fn session_cookie(config: &SessionConfig, id: &str) -> String {
    let secure = if config.secure_cookie { "; Secure" } else { "" };
    format!(
        "{}={}; HttpOnly{}; SameSite=Lax; Path=/; Max-Age={}",
        config.cookie_name, id, secure, config.idle_timeout_secs
    )
}
