//! Read-only admin API.
//!
//! Served on its own listener, behind a bearer key. Exposes relay status and
//! the per-unit stream counts held by admission.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;

use self::auth::admin_auth_middleware;
use self::handlers::{get_status, get_streams};
use crate::http::AppState;
use crate::lifecycle::Shutdown;
use crate::security::StreamAdmission;

#[derive(Clone)]
pub struct AdminState {
    pub admission: Arc<StreamAdmission>,
    pub api_key: Arc<str>,
    pub started: Instant,
    pub shutdown: Shutdown,
}

impl AdminState {
    /// Share admission and shutdown with the relay's state.
    pub fn new(relay: &AppState, api_key: &str) -> Self {
        Self {
            admission: Arc::clone(&relay.admission),
            api_key: Arc::from(api_key),
            started: Instant::now(),
            shutdown: relay.shutdown.clone(),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/streams", get(get_streams))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

/// Serve the admin API until shutdown.
pub async fn run_admin_server(listener: TcpListener, state: AdminState) -> std::io::Result<()> {
    let shutdown = state.shutdown.clone();
    tracing::info!(address = %listener.local_addr()?, "Admin API listening");
    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::admin::handlers::UnitStreams;

    fn state() -> AdminState {
        AdminState {
            admission: Arc::new(StreamAdmission::new(2)),
            api_key: Arc::from("secret"),
            started: Instant::now(),
            shutdown: Shutdown::new(),
        }
    }

    fn get(path: &str, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(path);
        if let Some(key) = key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn requests_without_the_key_are_unauthorized() {
        for key in [None, Some("wrong")] {
            let res = setup_admin_router(state())
                .oneshot(get("/admin/status", key))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn streams_lists_admission_counts() {
        let state = state();
        let _a = state.admission.try_acquire("unit-b").unwrap();
        let _b = state.admission.try_acquire("unit-a").unwrap();
        let _c = state.admission.try_acquire("unit-a").unwrap();

        let res = setup_admin_router(state)
            .oneshot(get("/admin/streams", Some("secret")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = to_bytes(res.into_body(), 64 * 1024).await.unwrap();
        let streams: Vec<UnitStreams> = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            streams,
            vec![
                UnitStreams { unit_id: "unit-a".into(), active_streams: 2 },
                UnitStreams { unit_id: "unit-b".into(), active_streams: 1 },
            ]
        );
    }
}
