//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Stream handler and relay sessions produce:
//!     → logging.rs (structured log events, one span per session)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
