//! Periodic cleanup of expired rate-limit entries and idle sessions.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;
use crate::security::guard::RequestGuard;
use crate::security::session::SessionStore;

const MIN_INTERVAL: Duration = Duration::from_secs(1);

pub struct Sweeper {
    guard: Arc<RequestGuard>,
    sessions: SessionStore,
    interval: Duration,
}

impl Sweeper {
    /// `interval` is clamped to at least one second.
    pub fn new(guard: Arc<RequestGuard>, sessions: SessionStore, interval: Duration) -> Self {
        Self {
            guard,
            sessions,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Sweeper starting");

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_at(Instant::now());
                }
                _ = shutdown.recv() => {
                    tracing::info!("Sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// One sweep pass. Returns `(clients_removed, sessions_removed)`.
    pub fn sweep_at(&self, now: Instant) -> (usize, usize) {
        let clients = self.guard.limiter().prune_expired(now);
        let sessions = self.sessions.prune_idle(now);

        metrics::record_tracked_clients(self.guard.limiter().tracked_clients());
        metrics::record_active_sessions(self.sessions.len());

        if clients > 0 || sessions > 0 {
            tracing::debug!(clients, sessions, "Swept expired state");
        }
        (clients, sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GuardConfig;

    #[tokio::test]
    async fn zero_interval_is_clamped() {
        let guard = Arc::new(RequestGuard::new(&GuardConfig::default()));
        let sessions = SessionStore::new(Duration::from_secs(30));
        let sweeper = Sweeper::new(guard, sessions, Duration::ZERO);
        assert_eq!(sweeper.interval, MIN_INTERVAL);

        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(sweeper.run(rx));
        tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[test]
    fn sweep_prunes_both_maps() {
        let config = GuardConfig::default();
        let guard = Arc::new(RequestGuard::new(&config));
        let sessions = SessionStore::new(Duration::from_secs(30));
        let t0 = Instant::now();

        guard.limiter().check_at("10.0.0.5", t0);
        sessions.resume_or_create_at(None, t0);

        let sweeper = Sweeper::new(guard.clone(), sessions.clone(), Duration::from_secs(60));
        assert_eq!(sweeper.sweep_at(t0 + Duration::from_secs(10)), (0, 0));
        assert_eq!(sweeper.sweep_at(t0 + Duration::from_secs(61)), (1, 1));
        assert_eq!(guard.limiter().tracked_clients(), 0);
        assert!(sessions.is_empty());
    }
}
