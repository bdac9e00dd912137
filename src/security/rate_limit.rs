//! Fixed-window rate limiting keyed by client IP.

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::config::RateLimitConfig;

/// Per-client counter for the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_start: Instant,
}

impl RateLimitEntry {
    fn fresh(now: Instant) -> Self {
        Self {
            count: 1,
            window_start: now,
        }
    }

    fn is_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) >= window
    }
}

/// Result of accounting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitOutcome {
    pub allowed: bool,
    /// Count after this request was recorded.
    pub count: u32,
}

/// Process-wide fixed-window limiter.
///
/// Each check is a single read-modify-write under the map shard's write
/// lock, so concurrent requests for the same key never undercount.
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    pub fn check(&self, key: &str) -> RateLimitOutcome {
        self.check_at(key, Instant::now())
    }

    /// Record one request from `key` at `now`.
    pub fn check_at(&self, key: &str, now: Instant) -> RateLimitOutcome {
        let count = match self.entries.entry(key.to_owned()) {
            Entry::Vacant(slot) => {
                slot.insert(RateLimitEntry::fresh(now));
                1
            }
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                if entry.is_expired(now, self.window) {
                    *entry = RateLimitEntry::fresh(now);
                } else {
                    entry.count = entry.count.saturating_add(1);
                }
                entry.count
            }
        };

        RateLimitOutcome {
            allowed: count <= self.max_requests,
            count,
        }
    }

    /// Drop entries whose window has ended. Returns how many were removed.
    ///
    /// An expired entry would be reset on its next request anyway, so
    /// removing it does not change any future decision.
    pub fn prune_expired(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now, self.window));
        before.saturating_sub(self.entries.len())
    }

    pub fn entry(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.get(key).map(|r| *r.value())
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.entries.len()
    }

    /// Snapshot of `(client, count)` pairs, highest count first.
    pub fn snapshot(&self) -> Vec<(String, u32)> {
        let mut clients: Vec<_> = self
            .entries
            .iter()
            .map(|r| (r.key().clone(), r.value().count))
            .collect();
        clients.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        clients
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}
