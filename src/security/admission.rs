//! Per-unit stream admission.
//!
//! # Responsibilities
//! - Bound the number of concurrent relay sessions per unit
//! - Release slots exactly once, whatever way a session ends
//! - Forget units with no active sessions
//!
//! # Design Decisions
//! - One mutex around the whole map; acquire/release happen only at session
//!   start and end, never per frame
//! - Slots are RAII guards: dropping the guard releases the slot

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("max streams reached for this unit ({limit})")]
    LimitReached { limit: usize },
}

/// Tracks active relay sessions per unit.
#[derive(Debug)]
pub struct StreamAdmission {
    max_per_unit: usize,
    active: Mutex<HashMap<String, usize>>,
}

impl StreamAdmission {
    pub fn new(max_per_unit: usize) -> Self {
        Self {
            max_per_unit,
            active: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_per_unit(&self) -> usize {
        self.max_per_unit
    }

    // A panic while holding the lock cannot leave a count half-updated, so
    // a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, usize>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a slot for `unit_id`, or fail without changing any state.
    pub fn try_acquire(self: &Arc<Self>, unit_id: &str) -> Result<AdmissionSlot, AdmissionError> {
        let mut active = self.lock();
        let count = active.get(unit_id).copied().unwrap_or(0);
        if count >= self.max_per_unit {
            return Err(AdmissionError::LimitReached {
                limit: self.max_per_unit,
            });
        }
        active.insert(unit_id.to_string(), count + 1);
        drop(active);

        Ok(AdmissionSlot {
            admission: Arc::clone(self),
            unit_id: unit_id.to_string(),
        })
    }

    /// Give back a slot. Prefer dropping the [`AdmissionSlot`].
    pub fn release(&self, unit_id: &str) {
        let mut active = self.lock();
        match active.get_mut(unit_id) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                active.remove(unit_id);
            }
            None => {
                tracing::warn!(unit_id = %unit_id, "Release for a unit with no active streams");
            }
        }
    }

    /// Current number of sessions for `unit_id`.
    pub fn active_count(&self, unit_id: &str) -> usize {
        self.lock().get(unit_id).copied().unwrap_or(0)
    }

    /// Whether `unit_id` currently has an entry in the map.
    pub fn is_tracked(&self, unit_id: &str) -> bool {
        self.lock().contains_key(unit_id)
    }

    /// Copy of all non-zero counts, sorted by unit id.
    pub fn snapshot(&self) -> Vec<(String, usize)> {
        let mut entries: Vec<(String, usize)> = self
            .lock()
            .iter()
            .map(|(unit, count)| (unit.clone(), *count))
            .collect();
        entries.sort();
        entries
    }
}

/// A held admission slot. Releases on drop.
#[derive(Debug)]
pub struct AdmissionSlot {
    admission: Arc<StreamAdmission>,
    unit_id: String,
}

impl AdmissionSlot {
    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }
}

impl Drop for AdmissionSlot {
    fn drop(&mut self) {
        self.admission.release(&self.unit_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_enforced_per_unit() {
        let admission = Arc::new(StreamAdmission::new(2));

        let a = admission.try_acquire("unit-1").unwrap();
        let b = admission.try_acquire("unit-1").unwrap();
        assert_eq!(admission.active_count("unit-1"), 2);

        assert_eq!(
            admission.try_acquire("unit-1").unwrap_err(),
            AdmissionError::LimitReached { limit: 2 }
        );
        // A failed acquire changes nothing.
        assert_eq!(admission.active_count("unit-1"), 2);

        // Other units are independent.
        let other = admission.try_acquire("unit-2").unwrap();
        assert_eq!(other.unit_id(), "unit-2");

        drop(a);
        let c = admission.try_acquire("unit-1").unwrap();
        assert_eq!(admission.active_count("unit-1"), 2);

        drop((b, c, other));
    }

    #[test]
    fn key_is_removed_at_zero() {
        let admission = Arc::new(StreamAdmission::new(2));
        let slot = admission.try_acquire("unit-1").unwrap();
        assert!(admission.is_tracked("unit-1"));

        drop(slot);
        assert!(!admission.is_tracked("unit-1"));
        assert_eq!(admission.active_count("unit-1"), 0);
        assert!(admission.snapshot().is_empty());
    }

    #[test]
    fn stray_release_never_goes_negative() {
        let admission = StreamAdmission::new(2);
        admission.release("ghost");
        assert_eq!(admission.active_count("ghost"), 0);
        assert!(!admission.is_tracked("ghost"));
    }

    #[test]
    fn slot_is_released_when_holder_panics() {
        let admission = Arc::new(StreamAdmission::new(1));
        let handle = {
            let admission = Arc::clone(&admission);
            std::thread::spawn(move || {
                let _slot = admission.try_acquire("unit-1").unwrap();
                panic!("session blew up");
            })
        };
        assert!(handle.join().is_err());
        assert!(!admission.is_tracked("unit-1"));
        assert!(admission.try_acquire("unit-1").is_ok());
    }

    #[test]
    fn snapshot_is_sorted() {
        let admission = Arc::new(StreamAdmission::new(3));
        let _b = admission.try_acquire("b").unwrap();
        let _a1 = admission.try_acquire("a").unwrap();
        let _a2 = admission.try_acquire("a").unwrap();

        assert_eq!(
            admission.snapshot(),
            vec![("a".to_string(), 2), ("b".to_string(), 1)]
        );
    }

    #[test]
    fn concurrent_acquires_never_exceed_limit() {
        let admission = Arc::new(StreamAdmission::new(2));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let admission = Arc::clone(&admission);
                std::thread::spawn(move || admission.try_acquire("unit-1").ok())
            })
            .collect();

        let slots: Vec<AdmissionSlot> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(slots.len(), 2);
        assert_eq!(admission.active_count("unit-1"), 2);

        drop(slots);
        assert!(!admission.is_tracked("unit-1"));
    }
}
