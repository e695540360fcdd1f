use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub uptime_secs: u64,
    pub max_streams_per_unit: usize,
    pub active_streams: usize,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitStreams {
    pub unit_id: String,
    pub active_streams: usize,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let active_streams: usize = state
        .admission
        .snapshot()
        .iter()
        .map(|(_, count)| count)
        .sum();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: if state.shutdown.is_triggered() {
            "shutting_down".to_string()
        } else {
            "operational".to_string()
        },
        uptime_secs: state.started.elapsed().as_secs(),
        max_streams_per_unit: state.admission.max_per_unit(),
        active_streams,
    })
}

/// Active stream counts per unit, sorted by unit id.
pub async fn get_streams(State(state): State<AdminState>) -> Json<Vec<UnitStreams>> {
    Json(
        state
            .admission
            .snapshot()
            .into_iter()
            .map(|(unit_id, active_streams)| UnitStreams {
                unit_id,
                active_streams,
            })
            .collect(),
    )
}
