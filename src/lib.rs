//! Request guard: HTTPS redirect, CSRF verification and per-IP rate
//! limiting in front of an axum application.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;

pub use config::GuardConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use security::{GuardRejection, GuardRequest, RequestGuard, Verdict};
