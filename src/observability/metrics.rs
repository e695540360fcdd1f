//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define relay metrics (sessions, rejections, frames)
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `relay_sessions_active` (gauge): relay sessions currently pumping
//! - `relay_sessions_total` (counter): finished sessions by `outcome`
//! - `relay_rejections_total` (counter): refused stream requests by `reason`
//! - `relay_frames_total` (counter): frames forwarded to clients
//! - `relay_frame_bytes` (histogram): size of forwarded frames
//!
//! # Design Decisions
//! - Recording is a no-op until [`init_metrics`] installs a recorder, so
//!   tests and metric-less deployments pay nothing
//! - Labels are static strings; unit ids are never used as labels

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const SESSIONS_ACTIVE: &str = "relay_sessions_active";
pub const SESSIONS_TOTAL: &str = "relay_sessions_total";
pub const REJECTIONS_TOTAL: &str = "relay_rejections_total";
pub const FRAMES_TOTAL: &str = "relay_frames_total";
pub const FRAME_BYTES: &str = "relay_frame_bytes";

/// Install the Prometheus recorder and its HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    ::metrics::describe_gauge!(SESSIONS_ACTIVE, "Relay sessions currently active");
    ::metrics::describe_counter!(SESSIONS_TOTAL, "Relay sessions finished, by outcome");
    ::metrics::describe_counter!(REJECTIONS_TOTAL, "Stream requests refused, by reason");
    ::metrics::describe_counter!(FRAMES_TOTAL, "MJPEG frames forwarded");
    ::metrics::describe_histogram!(FRAME_BYTES, "Size of forwarded MJPEG frames");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_rejection(reason: &'static str) {
    ::metrics::counter!(REJECTIONS_TOTAL, "reason" => reason).increment(1);
}

pub fn record_frame(len: usize) {
    ::metrics::counter!(FRAMES_TOTAL).increment(1);
    ::metrics::histogram!(FRAME_BYTES).record(len as f64);
}

/// Counts a session as active until dropped.
#[derive(Debug)]
pub struct ActiveSession {
    outcome: &'static str,
}

impl ActiveSession {
    pub fn start() -> Self {
        ::metrics::gauge!(SESSIONS_ACTIVE).increment(1.0);
        Self {
            outcome: "aborted",
        }
    }

    /// Outcome label reported when the guard drops.
    pub fn set_outcome(&mut self, outcome: &'static str) {
        self.outcome = outcome;
    }
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        ::metrics::gauge!(SESSIONS_ACTIVE).decrement(1.0);
        ::metrics::counter!(SESSIONS_TOTAL, "outcome" => self.outcome).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_noop() {
        record_rejection("not_found");
        record_frame(1024);
        let mut session = ActiveSession::start();
        session.set_outcome("client_closed");
        drop(session);
    }
}
