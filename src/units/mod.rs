//! Unit records as seen by the relay.
//!
//! # Data Flow
//! ```text
//! GET /ws/stream/{unit_id}
//!     → UnitDirectory::find_unit (owned by device management)
//!     → Unit snapshot (read once per session)
//! ```
//!
//! # Design Decisions
//! - The relay never writes unit records
//! - A snapshot is taken at session start; status changes mid-stream are not observed
//! - Lookups are async so any storage backend can sit behind the trait

pub mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::StaticUnitDirectory;

/// Operational status reported by a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UnitStatus {
    Online,
    Offline,
    Other(String),
}

impl From<String> for UnitStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "online" => UnitStatus::Online,
            "offline" => UnitStatus::Offline,
            _ => UnitStatus::Other(value),
        }
    }
}

impl From<UnitStatus> for String {
    fn from(status: UnitStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitStatus::Online => f.write_str("online"),
            UnitStatus::Offline => f.write_str("offline"),
            UnitStatus::Other(s) => f.write_str(s),
        }
    }
}

/// A hardware unit (camera + detection sensor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub serial: String,
    /// Last known address: IP literal or hostname.
    pub ip_address: Option<String>,
    pub status: UnitStatus,
}

impl Unit {
    pub fn is_online(&self) -> bool {
        self.status == UnitStatus::Online
    }

    /// The recorded address, if present and non-empty.
    pub fn address(&self) -> Option<&str> {
        self.ip_address.as_deref().filter(|a| !a.trim().is_empty())
    }
}

/// Failure of the backing store, distinct from "no such unit".
#[derive(Debug, thiserror::Error)]
#[error("unit lookup failed: {0}")]
pub struct DirectoryError(pub String);

/// Read access to unit records.
#[async_trait]
pub trait UnitDirectory: Send + Sync {
    /// Returns `Ok(None)` when no unit has this id.
    async fn find_unit(&self, unit_id: &str) -> Result<Option<Unit>, DirectoryError>;
}
