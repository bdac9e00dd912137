//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML), optional
//!     → loader.rs (parse & deserialize)
//!     → database.rs (DB_* environment overrides)
//!     → validation.rs (semantic checks)
//!     → GuardConfig (validated, immutable)
//!     → handed to subsystems at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod database;
pub mod loader;
pub mod schema;
pub mod validation;

pub use database::DatabaseConfig;
pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    AdminConfig, CsrfConfig, GuardConfig, HttpsConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, RateLimitConfig, SessionConfig, TimeoutConfig, TlsConfig,
};
