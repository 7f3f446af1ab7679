//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable naming the deployment environment.
pub const ENVIRONMENT_VAR: &str = "ENVIRONMENT";

const DEFAULT_ENVIRONMENT: &str = "production";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let mut config: AppConfig = toml::from_str(content)?;
    resolve_environment(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Built-in defaults, with the environment resolved.
pub fn default_config() -> AppConfig {
    let mut config = AppConfig::default();
    resolve_environment(&mut config);
    config
}

/// The deployment environment from `ENVIRONMENT`, defaulting to "production".
pub fn environment() -> String {
    match std::env::var(ENVIRONMENT_VAR) {
        Ok(env) if !env.is_empty() => env,
        _ => DEFAULT_ENVIRONMENT.to_string(),
    }
}

fn resolve_environment(config: &mut AppConfig) {
    if config.environment.is_empty() {
        config.environment = environment();
    }
}
