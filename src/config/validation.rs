//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, ports valid, addresses parse)
//! - Detect duplicate unit registrations
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::RelayConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let stream = &config.stream;
    if stream.max_streams_per_unit == 0 {
        errors.push(ValidationError::new("stream.max_streams_per_unit", "must be at least 1"));
    }
    if stream.max_frame_bytes < 4 {
        errors.push(ValidationError::new(
            "stream.max_frame_bytes",
            "must hold at least the start and end markers",
        ));
    }
    if stream.unit_port == 0 {
        errors.push(ValidationError::new("stream.unit_port", "must be non-zero"));
    }
    if !stream.unit_path.starts_with('/') {
        errors.push(ValidationError::new("stream.unit_path", "must start with '/'"));
    }
    if stream.ws_write_buffer_bytes == 0 {
        errors.push(ValidationError::new("stream.ws_write_buffer_bytes", "must be non-zero"));
    }

    if let Some(allowed) = &config.origins.allowed {
        for origin in allowed {
            if origin.trim().is_empty() {
                errors.push(ValidationError::new("origins.allowed", "contains an empty origin"));
            }
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }
    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            "must be \"pretty\" or \"json\"",
        ));
    }

    if config.admin.enabled {
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::new("admin.api_key", "must be set when admin is enabled"));
        }
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "admin.bind_address",
                format!("'{}' is not a socket address", config.admin.bind_address),
            ));
        }
    }

    let mut seen = HashSet::new();
    for unit in &config.units {
        if unit.id.trim().is_empty() {
            errors.push(ValidationError::new("units.id", "must not be empty"));
        } else if !seen.insert(unit.id.as_str()) {
            errors.push(ValidationError::new(
                "units.id",
                format!("duplicate unit id '{}'", unit.id),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::UnitConfig;
    use crate::units::UnitStatus;

    fn unit(id: &str) -> UnitConfig {
        UnitConfig {
            id: id.to_string(),
            serial: String::new(),
            ip_address: None,
            status: UnitStatus::Offline,
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&RelayConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = RelayConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.stream.max_streams_per_unit = 0;
        config.stream.unit_path = "stream".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].field, "listener.bind_address");
        assert_eq!(errors[1].field, "stream.max_streams_per_unit");
        assert_eq!(errors[2].field, "stream.unit_path");
    }

    #[test]
    fn rejects_duplicate_units() {
        let mut config = RelayConfig::default();
        config.units = vec![unit("a"), unit("b"), unit("a")];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("duplicate"));
    }

    #[test]
    fn admin_requires_key_when_enabled() {
        let mut config = RelayConfig::default();
        config.admin.enabled = true;
        config.admin.api_key.clear();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "admin.api_key");
    }
}
