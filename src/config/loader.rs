//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::security::origin::ALLOWED_ORIGINS_ENV;

/// Overrides the listener bind address.
pub const BIND_ADDRESS_ENV: &str = "RELAY_BIND_ADDRESS";
/// Overrides the admin API key.
pub const ADMIN_API_KEY_ENV: &str = "RELAY_ADMIN_API_KEY";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
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

/// Load and validate configuration from a TOML file, then apply
/// environment overrides.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: RelayConfig = toml::from_str(&content)?;
    finalize(config, |key| std::env::var(key).ok())
}

/// Build the configuration used when no file is given: defaults plus
/// environment overrides.
pub fn config_from_env() -> Result<RelayConfig, ConfigError> {
    finalize(RelayConfig::default(), |key| std::env::var(key).ok())
}

fn finalize<F>(mut config: RelayConfig, lookup: F) -> Result<RelayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    apply_overrides(&mut config, lookup);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply environment overrides using `lookup` to read variables.
///
/// An empty `CORS_ALLOWED_ORIGINS` counts as unset.
pub fn apply_overrides<F>(config: &mut RelayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(origins) = lookup(ALLOWED_ORIGINS_ENV).filter(|v| !v.trim().is_empty()) {
        config.origins.allowed = Some(
            origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect(),
        );
    }
    if let Some(addr) = lookup(BIND_ADDRESS_ENV) {
        config.listener.bind_address = addr;
    }
    if let Some(key) = lookup(ADMIN_API_KEY_ENV) {
        config.admin.api_key = key;
    }
}
