//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, Transport tag per listener)
//!     → request.rs (request ID, trace span)
//!     → middleware.rs (build GuardRequest, run RequestGuard)
//!     → handlers.rs (downstream handling)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod server;

pub use middleware::GuardState;
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
