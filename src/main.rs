//! Unit Stream Relay
//!
//! Relays live MJPEG video from field units to browser clients over
//! WebSocket, one JPEG frame per binary message.
//!
//! # Architecture Overview
//!
//! ```text
//!   Browser                 ┌───────────────────────────────────────────┐
//!   ───────────────────────▶│ http::server   GET /ws/stream/{unit_id}   │
//!   WebSocket upgrade       │   │                                       │
//!                           │   ▼                                       │
//!                           │ units ─▶ security::address ─▶ admission   │
//!                           │   ─▶ origin ─▶ upgrade                    │
//!                           │   │                                       │
//!   ◀───────────────────────│ stream::relay ◀── stream::mjpeg ◀─────────┼──── Unit :8080/stream
//!   binary JPEG frames      │                                           │     (MJPEG over HTTP)
//!                           │ config · observability · lifecycle · admin│
//!                           └───────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use unit_stream_relay::admin::{run_admin_server, AdminState};
use unit_stream_relay::config::{config_from_env, load_config};
use unit_stream_relay::http::{AppState, HttpServer};
use unit_stream_relay::lifecycle::{shutdown_on_signal, Shutdown};
use unit_stream_relay::observability::{logging, metrics};
use unit_stream_relay::units::StaticUnitDirectory;

#[derive(Parser)]
#[command(name = "unit-stream-relay", version, about = "MJPEG to WebSocket relay for field units")]
struct Cli {
    /// Path to a TOML config file. Defaults plus environment overrides when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => config_from_env()?,
    };

    logging::init_logging(&config.observability);
    tracing::info!("unit-stream-relay v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_streams_per_unit = config.stream.max_streams_per_unit,
        max_frame_bytes = config.stream.max_frame_bytes,
        units = config.units.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    let units = Arc::new(StaticUnitDirectory::from_config(&config.units));
    let state = AppState::new(&config, units, shutdown.clone());
    tracing::info!(allowed_origins = ?state.origins.allowed(), "Origin policy");

    if config.admin.enabled {
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        let admin_state = AdminState::new(&state, &config.admin.api_key);
        tokio::spawn(async move {
            if let Err(e) = run_admin_server(admin_listener, admin_state).await {
                tracing::error!(error = %e, "Admin API failed");
            }
        });
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    HttpServer::new(state).run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
