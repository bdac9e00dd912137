//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → plain listener (tokio TcpListener, axum::serve)
//!     → tls.rs (optional rustls handshake via axum-server)
//!     → Hand off to HTTP layer, tagged with its Transport
//! ```
//!
//! # Design Decisions
//! - TLS is optional; without it every request is treated as plain
//! - Each listener stamps its own Transport so the guard never guesses

pub mod tls;
