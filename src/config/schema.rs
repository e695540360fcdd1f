//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::units::UnitStatus;

/// Root configuration for the stream relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Relay session behaviour (limits, upstream endpoint, buffers).
    pub stream: StreamConfig,

    /// Browser origins permitted to open stream sockets.
    pub origins: OriginConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    /// Statically registered units.
    #[serde(default)]
    pub units: Vec<UnitConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Relay session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Maximum concurrent relay sessions per unit.
    pub max_streams_per_unit: usize,

    /// Hard cap on a single JPEG frame, in bytes.
    pub max_frame_bytes: usize,

    /// Port of the unit's MJPEG endpoint.
    pub unit_port: u16,

    /// Path of the unit's MJPEG endpoint.
    pub unit_path: String,

    /// Upper bound on establishing the TCP connection to a unit.
    /// The stream itself has no timeout.
    pub connect_timeout_secs: u64,

    /// WebSocket read buffer size in bytes.
    pub ws_read_buffer_bytes: usize,

    /// WebSocket write buffer size in bytes (sized for video frames).
    pub ws_write_buffer_bytes: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_streams_per_unit: 2,
            max_frame_bytes: 5 * 1024 * 1024, // 5MB
            unit_port: 8080,
            unit_path: "/stream".to_string(),
            connect_timeout_secs: 10,
            ws_read_buffer_bytes: 1024,
            ws_write_buffer_bytes: 64 * 1024,
        }
    }
}

/// Origin allow-list configuration.
///
/// `None` means "not configured": the development defaults apply unless
/// `CORS_ALLOWED_ORIGINS` is set.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct OriginConfig {
    pub allowed: Option<Vec<String>>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// A unit registered directly in the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UnitConfig {
    pub id: String,

    #[serde(default)]
    pub serial: String,

    /// Last known address (IP literal or hostname).
    #[serde(default)]
    pub ip_address: Option<String>,

    #[serde(default = "default_unit_status")]
    pub status: UnitStatus,
}

fn default_unit_status() -> UnitStatus {
    UnitStatus::Offline
}
