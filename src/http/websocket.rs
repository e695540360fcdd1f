//! Stream WebSocket handling.
//!
//! # Responsibilities
//! - Run every pre-upgrade check, in order, and refuse with a plain HTTP error
//! - Complete the upgrade handshake with the client
//! - Open the unit stream and pump frames until one side stops
//!
//! # Data Flow
//! ```text
//! GET /ws/stream/{unit_id}
//!     → unit id → directory lookup → online + address → address validation
//!     → admission slot → origin → upgrade
//!     → RelaySession: unit ──MJPEG──► frames ──binary──► client
//! ```
//!
//! # Design Decisions
//! - The admission slot moves into the session and is released when the
//!   session (or a failed upgrade) drops it
//! - After the upgrade, upstream failures are reported as one text message
//!   followed by a close, never as an HTTP status
//! - No timeouts on the relay itself; it ends on EOF, error, client close or
//!   shutdown

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tracing::Instrument;
use uuid::Uuid;

use crate::http::request::{declared_origin, validate_unit_id};
use crate::http::response::RelayRejection;
use crate::http::server::AppState;
use crate::lifecycle::Shutdown;
use crate::observability::metrics::ActiveSession;
use crate::security::{AdmissionSlot, ValidatedAddress};
use crate::stream::relay::{pump_frames, watch_client, RelayEnd, RelayStats};
use crate::stream::UnitStreamClient;

/// `GET /ws/stream/{unit_id}`.
pub async fn stream_handler(
    State(state): State<AppState>,
    Path(unit_id): Path<String>,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, RelayRejection> {
    validate_unit_id(&unit_id)?;

    let unit = match state.units.find_unit(&unit_id).await {
        Ok(Some(unit)) => unit,
        Ok(None) => return Err(RelayRejection::UnitNotFound),
        Err(e) => {
            tracing::error!(unit_id = %unit_id, error = %e, "Failed to get unit");
            return Err(RelayRejection::LookupFailed);
        }
    };

    if !unit.is_online() {
        return Err(RelayRejection::UnitOffline);
    }
    let Some(address) = unit.address() else {
        return Err(RelayRejection::AddressUnknown);
    };

    let target = state.validator.validate(address).await.map_err(|reason| {
        tracing::warn!(unit_id = %unit_id, reason = %reason, "Refusing unsafe unit address");
        RelayRejection::UnsafeAddress
    })?;

    let slot = state.admission.try_acquire(&unit_id).map_err(|e| {
        tracing::warn!(unit_id = %unit_id, error = %e, "Max streams reached for unit");
        RelayRejection::TooManyStreams
    })?;

    let origin = declared_origin(&headers)?;
    if let Err(e) = state.origins.check(origin) {
        tracing::warn!(unit_id = %unit_id, error = %e, "Rejected WebSocket origin");
        return Err(RelayRejection::OriginForbidden);
    }

    let ws = upgrade.map_err(RelayRejection::Upgrade)?;

    let session = RelaySession {
        serial: unit.serial.clone(),
        target,
        upstream: state.upstream.clone(),
        max_frame_bytes: state.stream.max_frame_bytes,
        shutdown: state.shutdown.clone(),
        slot,
    };

    let failed_unit = unit_id.clone();
    Ok(ws
        .read_buffer_size(state.stream.ws_read_buffer_bytes)
        .write_buffer_size(state.stream.ws_write_buffer_bytes)
        .on_failed_upgrade(move |e| {
            tracing::warn!(unit_id = %failed_unit, error = %e, "WebSocket upgrade failed");
        })
        .on_upgrade(move |socket| session.run(socket)))
}

/// `GET /ws/stream/` with an empty unit id.
pub async fn missing_unit_id() -> RelayRejection {
    RelayRejection::MissingUnitId
}

/// One upgraded client bound to one unit stream.
struct RelaySession {
    serial: String,
    target: ValidatedAddress,
    upstream: UnitStreamClient,
    max_frame_bytes: usize,
    shutdown: Shutdown,
    slot: AdmissionSlot,
}

impl RelaySession {
    async fn run(self, socket: WebSocket) {
        let span = tracing::info_span!(
            "relay_session",
            session_id = %Uuid::new_v4(),
            unit_id = %self.slot.unit_id(),
            serial = %self.serial,
        );
        self.relay(socket).instrument(span).await
    }

    async fn relay(self, socket: WebSocket) {
        let mut active = ActiveSession::start();
        let (mut sink, mut client) = socket.split();
        tracing::debug!("WebSocket connected");

        let opened = tokio::select! {
            opened = self.upstream.open(&self.target) => opened,
            end = watch_client(&mut client) => {
                end.log(&RelayStats::default());
                active.set_outcome(end.label());
                return;
            }
            _ = self.shutdown.wait() => {
                let _ = sink.close().await;
                active.set_outcome(RelayEnd::Shutdown.label());
                return;
            }
        };

        let unit_stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(error = %e, "Failed to open unit stream");
                let _ = sink.send(Message::Text(e.client_message().into())).await;
                let _ = sink.close().await;
                active.set_outcome("upstream_unavailable");
                return;
            }
        };

        tracing::debug!(
            content_type = unit_stream.content_type().unwrap_or("unknown"),
            "Unit stream opened"
        );

        let mut frames = unit_stream.into_frames(self.max_frame_bytes);
        let mut stats = RelayStats::default();
        let end = tokio::select! {
            end = pump_frames(&mut frames, &mut sink, &mut stats) => end,
            end = watch_client(&mut client) => end,
            _ = self.shutdown.wait() => RelayEnd::Shutdown,
        };

        end.log(&stats);
        if matches!(end, RelayEnd::Shutdown) {
            let _ = sink
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::AWAY,
                    reason: "server shutting down".into(),
                })))
                .await;
        }
        let _ = sink.close().await;

        active.set_outcome(end.label());
        tracing::info!(
            frames = stats.frames,
            bytes = stats.bytes,
            outcome = end.label(),
            "Relay session ended"
        );
    }
}
