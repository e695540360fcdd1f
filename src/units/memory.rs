//! In-memory unit directory.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::config::UnitConfig;
use crate::units::{DirectoryError, Unit, UnitDirectory};

/// Concurrent map of unit id → unit, seeded from config.
///
/// Embedding applications keep it current with [`upsert`](Self::upsert)
/// and [`remove`](Self::remove) as heartbeats arrive.
#[derive(Debug, Default)]
pub struct StaticUnitDirectory {
    units: DashMap<String, Unit>,
}

impl StaticUnitDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(configs: &[UnitConfig]) -> Self {
        let directory = Self::new();
        for config in configs {
            directory.upsert(Unit {
                id: config.id.clone(),
                serial: config.serial.clone(),
                ip_address: config.ip_address.clone(),
                status: config.status.clone(),
            });
        }
        tracing::debug!(units = directory.len(), "Unit directory seeded");
        directory
    }

    pub fn upsert(&self, unit: Unit) {
        self.units.insert(unit.id.clone(), unit);
    }

    pub fn remove(&self, unit_id: &str) -> Option<Unit> {
        self.units.remove(unit_id).map(|(_, unit)| unit)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[async_trait]
impl UnitDirectory for StaticUnitDirectory {
    async fn find_unit(&self, unit_id: &str) -> Result<Option<Unit>, DirectoryError> {
        Ok(self.units.get(unit_id).map(|entry| entry.value().clone()))
    }
}
