//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener and stop on shutdown

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::{RelayConfig, StreamConfig};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::websocket::{missing_unit_id, stream_handler};
use crate::lifecycle::Shutdown;
use crate::security::{AddressValidator, OriginPolicy, StreamAdmission};
use crate::stream::UnitStreamClient;
use crate::units::UnitDirectory;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub units: Arc<dyn UnitDirectory>,
    pub validator: AddressValidator,
    pub admission: Arc<StreamAdmission>,
    pub origins: Arc<OriginPolicy>,
    pub upstream: UnitStreamClient,
    pub stream: StreamConfig,
    pub shutdown: Shutdown,
}

impl AppState {
    /// State for `config`, resolving unit hostnames with the system resolver.
    pub fn new(config: &RelayConfig, units: Arc<dyn UnitDirectory>, shutdown: Shutdown) -> Self {
        Self {
            units,
            validator: AddressValidator::system(),
            admission: Arc::new(StreamAdmission::new(config.stream.max_streams_per_unit)),
            origins: Arc::new(OriginPolicy::new(config.origins.allowed.clone())),
            upstream: UnitStreamClient::new(&config.stream),
            stream: config.stream.clone(),
            shutdown,
        }
    }

    pub fn with_validator(mut self, validator: AddressValidator) -> Self {
        self.validator = validator;
        self
    }
}

/// HTTP server for the stream relay.
pub struct HttpServer {
    router: Router,
    shutdown: Shutdown,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let shutdown = state.shutdown.clone();
        Self {
            router: build_router(state),
            shutdown,
        }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let shutdown = self.shutdown.clone();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws/stream/{unit_id}", get(stream_handler))
        .route("/ws/stream/", get(missing_unit_id))
        .route("/ws/stream", get(missing_unit_id))
        .route("/health", get(health))
        .with_state(state)
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(set_request_id_layer())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
