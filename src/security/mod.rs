//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → ip.rs (client IP, effective transport)
//!     → session.rs (resume or create the cookie session)
//!     → guard.rs
//!         → https.rs (redirect plain HTTP)
//!         → csrf.rs (constant-time token check)
//!         → rate_limit.rs (per-IP fixed window)
//!     → Pass to handlers
//!
//! Background:
//!     sweeper.rs prunes expired windows and idle sessions
//! ```
//!
//! # Design Decisions
//! - Fail closed: every rejection ends the request
//! - Checks run in a fixed order; the first failure wins
//! - No trust in client input unless a fronting proxy is configured

pub mod csrf;
pub mod guard;
pub mod https;
pub mod ip;
pub mod rate_limit;
pub mod rejection;
pub mod session;
pub mod sweeper;

pub use csrf::TokenStore;
pub use guard::{GuardRequest, RequestGuard, Verdict};
pub use https::Transport;
pub use rejection::GuardRejection;
pub use session::{Session, SessionStore};
