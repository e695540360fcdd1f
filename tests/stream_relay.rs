//! Stream endpoint tests: every refusal before the upgrade, and the
//! diagnostic path after it.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tower::ServiceExt;

use unit_stream_relay::http::{build_router, AppState};
use unit_stream_relay::lifecycle::Shutdown;
use unit_stream_relay::units::UnitDirectory;

mod common;
use common::{test_config, test_state, FailingDirectory, FixedResolver};

fn resolver() -> FixedResolver {
    FixedResolver::default().with("cam.internal.example", &["198.51.100.7", "10.0.0.5"])
}

fn state() -> AppState {
    test_state(&test_config(), resolver())
}

/// A GET carrying the WebSocket handshake headers.
fn upgrade_request(path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header(header::CONNECTION, "upgrade")
        .header(header::UPGRADE, "websocket")
        .header(header::SEC_WEBSOCKET_VERSION, "13")
        .header(header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ==")
        .body(Body::empty())
        .unwrap()
}

async fn send(state: AppState, request: Request<Body>) -> (StatusCode, String) {
    let response = build_router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    (status, String::from_utf8_lossy(&body).trim().to_string())
}

#[tokio::test]
async fn health_reports_ok() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(state(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"status":"ok"}"#);
}

#[tokio::test]
async fn empty_unit_id_is_bad_request() {
    for path in ["/ws/stream/", "/ws/stream"] {
        let (status, body) = send(state(), upgrade_request(path)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(body, "Unit ID is required");
    }
}

#[tokio::test]
async fn malformed_unit_id_is_bad_request() {
    let (status, _) = send(state(), upgrade_request("/ws/stream/bad%20id")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_unit_is_not_found() {
    let (status, body) = send(state(), upgrade_request("/ws/stream/ghost")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Unit not found");
}

#[tokio::test]
async fn lookup_failure_is_internal_error() {
    let config = test_config();
    let units: Arc<dyn UnitDirectory> = Arc::new(FailingDirectory);
    let state = AppState::new(&config, units, Shutdown::new());

    let (status, body) = send(state, upgrade_request("/ws/stream/online-public")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Failed to get unit");
}

#[tokio::test]
async fn offline_or_unaddressed_unit_is_unavailable() {
    let (status, body) = send(state(), upgrade_request("/ws/stream/offline")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "Unit is offline");

    let (status, body) = send(state(), upgrade_request("/ws/stream/no-address")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, "Unit IP address unknown");
}

#[tokio::test]
async fn internal_addresses_are_refused_without_echo() {
    for unit in ["private", "hostname"] {
        let state = state();
        let admission = Arc::clone(&state.admission);
        let (status, body) = send(state, upgrade_request(&format!("/ws/stream/{unit}"))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{unit}");
        assert_eq!(body, "Unit IP address is not valid for streaming");
        assert!(!body.contains("192.168") && !body.contains("10.0.0.5"));
        // Refused before admission.
        assert!(!admission.is_tracked(unit));
    }
}

#[tokio::test]
async fn third_stream_for_a_unit_is_refused() {
    let state = state();
    let _a = state.admission.try_acquire("online-public").unwrap();
    let _b = state.admission.try_acquire("online-public").unwrap();

    let (status, body) = send(state.clone(), upgrade_request("/ws/stream/online-public")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, "Max streams reached for this unit");
    assert_eq!(state.admission.active_count("online-public"), 2);
}

#[tokio::test]
async fn disallowed_origin_is_forbidden_and_releases_slot() {
    let state = state();
    let admission = Arc::clone(&state.admission);

    let mut request = upgrade_request("/ws/stream/online-public");
    request
        .headers_mut()
        .insert(header::ORIGIN, "https://evil.example".parse().unwrap());

    let (status, body) = send(state, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Origin not allowed");
    assert!(!admission.is_tracked("online-public"));
}

#[tokio::test]
async fn configured_origins_replace_dev_defaults() {
    let mut config = test_config();
    config.origins.allowed = Some(vec!["https://console.example.com".into()]);
    let state = test_state(&config, resolver());

    let mut request = upgrade_request("/ws/stream/online-public");
    request
        .headers_mut()
        .insert(header::ORIGIN, "http://localhost:5173".parse().unwrap());

    let (status, _) = send(state, request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn plain_get_is_not_upgraded() {
    let state = state();
    let admission = Arc::clone(&state.admission);
    let request = Request::builder()
        .uri("/ws/stream/online-public")
        .body(Body::empty())
        .unwrap();

    let (status, _) = send(state, request).await;
    assert!(status.is_client_error(), "got {status}");
    assert!(!admission.is_tracked("online-public"));
}

#[tokio::test]
async fn unreachable_unit_gets_diagnostic_message_then_close() {
    let state = state();
    let admission = Arc::clone(&state.admission);
    let addr = common::spawn_relay(state).await;

    let mut request = format!("ws://{addr}/ws/stream/online-public")
        .into_client_request()
        .unwrap();
    request
        .headers_mut()
        .insert(header::ORIGIN, "http://localhost:3000".parse().unwrap());

    let (mut ws, response) = tokio_tungstenite::connect_async(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
    assert_eq!(admission.active_count("online-public"), 1);

    let first = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("diagnostic should arrive after the connect timeout");
    match first {
        Some(Ok(Message::Text(text))) => assert_eq!(text.as_str(), "Connection to unit failed"),
        other => panic!("expected diagnostic text, got {other:?}"),
    }

    while let Some(Ok(msg)) = ws.next().await {
        assert!(matches!(msg, Message::Close(_)), "unexpected {msg:?}");
    }

    for _ in 0..100 {
        if !admission.is_tracked("online-public") {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("slot not released after session ended");
}

#[tokio::test]
async fn missing_origin_is_allowed_for_non_browser_clients() {
    let state = state();
    let addr = common::spawn_relay(state).await;

    let (_ws, response) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws/stream/online-public"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
}
