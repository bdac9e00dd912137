//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guard_requests_allowed_total` (counter)
//! - `guard_requests_rejected_total` (counter): by `reason`
//! - `guard_csrf_tokens_issued_total` (counter)
//! - `guard_tracked_clients` (gauge): rate-limit entries held
//! - `guard_active_sessions` (gauge)

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_allowed() {
    counter!("guard_requests_allowed_total").increment(1);
}

pub fn record_rejected(reason: &'static str) {
    counter!("guard_requests_rejected_total", "reason" => reason).increment(1);
}

pub fn record_token_issued() {
    counter!("guard_csrf_tokens_issued_total").increment(1);
}

pub fn record_tracked_clients(count: usize) {
    gauge!("guard_tracked_clients").set(count as f64);
}

pub fn record_active_sessions(count: usize) {
    gauge!("guard_active_sessions").set(count as f64);
}
