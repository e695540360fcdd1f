//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Stream request:
//!     → address.rs (unit address must be public; resolve once)
//!     → admission.rs (per-unit session budget)
//!     → origin.rs (browser origin allow-list, at upgrade)
//!     → Pass to relay
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - No trust in unit-reported addresses
//! - Rejections never echo the offending address back to the client

pub mod address;
pub mod admission;
pub mod origin;

pub use address::{AddressValidator, Resolve, SystemResolver, UnsafeAddress, ValidatedAddress};
pub use admission::{AdmissionError, AdmissionSlot, StreamAdmission};
pub use origin::{OriginPolicy, OriginRejected};
