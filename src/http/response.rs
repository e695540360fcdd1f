//! Pre-upgrade rejections for stream requests.
//!
//! Every refusal before the WebSocket handshake is a plain-text HTTP error.
//! Bodies are fixed strings: nothing from the request or the unit record is
//! echoed back.

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::observability::metrics;

#[derive(Debug)]
pub enum RelayRejection {
    MissingUnitId,
    InvalidUnitId,
    UnitNotFound,
    LookupFailed,
    UnitOffline,
    AddressUnknown,
    UnsafeAddress,
    TooManyStreams,
    OriginForbidden,
    /// Not a valid WebSocket upgrade request.
    Upgrade(WebSocketUpgradeRejection),
}

impl RelayRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayRejection::MissingUnitId
            | RelayRejection::InvalidUnitId
            | RelayRejection::UnsafeAddress => StatusCode::BAD_REQUEST,
            RelayRejection::UnitNotFound => StatusCode::NOT_FOUND,
            RelayRejection::LookupFailed => StatusCode::INTERNAL_SERVER_ERROR,
            RelayRejection::UnitOffline | RelayRejection::AddressUnknown => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            RelayRejection::TooManyStreams => StatusCode::TOO_MANY_REQUESTS,
            RelayRejection::OriginForbidden => StatusCode::FORBIDDEN,
            RelayRejection::Upgrade(rejection) => rejection.status(),
        }
    }

    /// Client-facing message.
    pub fn message(&self) -> String {
        match self {
            RelayRejection::MissingUnitId => "Unit ID is required".into(),
            RelayRejection::InvalidUnitId => "Invalid unit ID".into(),
            RelayRejection::UnitNotFound => "Unit not found".into(),
            RelayRejection::LookupFailed => "Failed to get unit".into(),
            RelayRejection::UnitOffline => "Unit is offline".into(),
            RelayRejection::AddressUnknown => "Unit IP address unknown".into(),
            RelayRejection::UnsafeAddress => "Unit IP address is not valid for streaming".into(),
            RelayRejection::TooManyStreams => "Max streams reached for this unit".into(),
            RelayRejection::OriginForbidden => "Origin not allowed".into(),
            RelayRejection::Upgrade(rejection) => rejection.body_text(),
        }
    }

    /// Metrics label.
    pub fn reason(&self) -> &'static str {
        match self {
            RelayRejection::MissingUnitId => "missing_unit_id",
            RelayRejection::InvalidUnitId => "invalid_unit_id",
            RelayRejection::UnitNotFound => "not_found",
            RelayRejection::LookupFailed => "lookup_failed",
            RelayRejection::UnitOffline => "offline",
            RelayRejection::AddressUnknown => "address_unknown",
            RelayRejection::UnsafeAddress => "unsafe_address",
            RelayRejection::TooManyStreams => "too_many_streams",
            RelayRejection::OriginForbidden => "origin_forbidden",
            RelayRejection::Upgrade(_) => "not_websocket",
        }
    }
}

impl IntoResponse for RelayRejection {
    fn into_response(self) -> Response {
        metrics::record_rejection(self.reason());
        match self {
            RelayRejection::Upgrade(rejection) => rejection.into_response(),
            other => (other.status(), other.message()).into_response(),
        }
    }
}
