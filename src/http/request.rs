//! Request inspection for stream requests.
//!
//! # Responsibilities
//! - Tag every request with an `x-request-id`
//! - Validate the unit id path segment before any lookup
//! - Read the declared `Origin`

use axum::http::{header, HeaderMap, HeaderName};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::http::response::RelayRejection;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Longest accepted unit id, in bytes.
pub const MAX_UNIT_ID_LEN: usize = 128;

/// Layer assigning a UUID request id when the client did not send one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Layer copying the request id onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// Accepts ASCII letters, digits, `-`, `_` and `.`.
pub fn validate_unit_id(unit_id: &str) -> Result<&str, RelayRejection> {
    if unit_id.is_empty() {
        return Err(RelayRejection::MissingUnitId);
    }
    let valid = unit_id.len() <= MAX_UNIT_ID_LEN
        && unit_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    if valid {
        Ok(unit_id)
    } else {
        Err(RelayRejection::InvalidUnitId)
    }
}

/// The declared origin. A header that is not valid text is an
/// `Err`, which callers treat as a disallowed origin.
pub fn declared_origin(headers: &HeaderMap) -> Result<Option<&str>, RelayRejection> {
    match headers.get(header::ORIGIN) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|v| Some(v.trim()))
            .map_err(|_| RelayRejection::OriginForbidden),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn unit_id_charset_and_length() {
        assert_eq!(validate_unit_id("unit-1_A.b").unwrap(), "unit-1_A.b");
        assert!(matches!(validate_unit_id(""), Err(RelayRejection::MissingUnitId)));
        assert!(matches!(validate_unit_id("a/b"), Err(RelayRejection::InvalidUnitId)));
        assert!(matches!(validate_unit_id("uni t"), Err(RelayRejection::InvalidUnitId)));
        assert!(validate_unit_id(&"a".repeat(MAX_UNIT_ID_LEN)).is_ok());
        assert!(matches!(
            validate_unit_id(&"a".repeat(MAX_UNIT_ID_LEN + 1)),
            Err(RelayRejection::InvalidUnitId)
        ));
    }

    #[test]
    fn origin_header_is_read_and_trimmed() {
        let mut headers = HeaderMap::new();
        assert_eq!(declared_origin(&headers).unwrap(), None);

        headers.insert(header::ORIGIN, HeaderValue::from_static(" https://example.com "));
        assert_eq!(declared_origin(&headers).unwrap(), Some("https://example.com"));

        headers.insert(header::ORIGIN, HeaderValue::from_bytes(b"https://\xFFbad").unwrap());
        assert!(matches!(
            declared_origin(&headers),
            Err(RelayRejection::OriginForbidden)
        ));
    }
}
