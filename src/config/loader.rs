//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::database::DatabaseConfig;
use crate::config::schema::GuardConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value:?}")]
    Env { key: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
///
/// Database settings from the environment take precedence over the file.
pub fn load_config(path: &Path) -> Result<GuardConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse, apply environment overrides and validate.
pub fn parse_config(content: &str) -> Result<GuardConfig, ConfigError> {
    let mut config: GuardConfig = toml::from_str(content)?;
    config.database.apply_env(|key| std::env::var(key).ok())?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load from `path` when given, otherwise start from defaults plus the
/// database environment.
pub fn load_or_default(path: Option<&Path>) -> Result<GuardConfig, ConfigError> {
    match path {
        Some(p) => load_config(p),
        None => {
            let config = GuardConfig {
                database: DatabaseConfig::from_env()?,
                ..GuardConfig::default()
            };
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}
