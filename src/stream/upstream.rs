//! HTTP client for unit MJPEG endpoints.
//!
//! # Responsibilities
//! - Dial the validated IP of a unit (never a hostname)
//! - Issue `GET http://{ip}:{port}{path}` and check for `200 OK`
//! - Expose the response body as an `AsyncBufRead` for frame extraction
//!
//! # Design Decisions
//! - Only connection establishment is time-bounded; the stream itself is
//!   endless by nature and has no request or body timeout
//! - No connection pooling: each relay session owns its upstream socket

use std::io;
use std::pin::Pin;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, Method, Request, StatusCode};
use futures_util::{Stream, TryStreamExt};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio_util::io::StreamReader;

use crate::config::StreamConfig;
use crate::security::ValidatedAddress;
use crate::stream::mjpeg::MjpegReader;

type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Unit response body as a buffered reader.
pub type UnitBodyReader = StreamReader<ByteStream, Bytes>;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("failed to build unit request: {0}")]
    Request(#[from] axum::http::Error),
    #[error("connection to unit failed: {0}")]
    Connect(#[source] hyper_util::client::legacy::Error),
    #[error("unit stream returned status {0}")]
    Status(StatusCode),
}

impl UpstreamError {
    /// Diagnostic text sent to the WebSocket client.
    pub fn client_message(&self) -> &'static str {
        match self {
            UpstreamError::Request(_) => "Failed to connect to unit",
            UpstreamError::Connect(_) => "Connection to unit failed",
            UpstreamError::Status(_) => "Unit stream unavailable",
        }
    }
}

/// Opens MJPEG streams on units.
#[derive(Clone, Debug)]
pub struct UnitStreamClient {
    client: Client<HttpConnector, Body>,
    port: u16,
    path: String,
}

impl UnitStreamClient {
    pub fn new(config: &StreamConfig) -> Self {
        let mut connector = HttpConnector::new();
        let connect_timeout =
            (config.connect_timeout_secs > 0).then(|| Duration::from_secs(config.connect_timeout_secs));
        connector.set_connect_timeout(connect_timeout);

        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(connector);

        Self {
            client,
            port: config.unit_port,
            path: config.unit_path.clone(),
        }
    }

    pub fn stream_url(&self, target: &ValidatedAddress) -> String {
        format!("http://{}{}", target.socket_addr(self.port), self.path)
    }

    /// Connect to the unit and wait for response headers.
    pub async fn open(&self, target: &ValidatedAddress) -> Result<UnitStream, UpstreamError> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(self.stream_url(target))
            .header(header::USER_AGENT, concat!("unit-stream-relay/", env!("CARGO_PKG_VERSION")))
            .body(Body::empty())?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(UpstreamError::Connect)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(UpstreamError::Status(status));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body: ByteStream = Box::pin(
            Body::new(response.into_body())
                .into_data_stream()
                .map_err(io::Error::other),
        );

        Ok(UnitStream {
            content_type,
            reader: StreamReader::new(body),
        })
    }
}

/// An open `200 OK` response from a unit.
pub struct UnitStream {
    content_type: Option<String>,
    reader: UnitBodyReader,
}

impl UnitStream {
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn into_frames(self, max_frame_bytes: usize) -> MjpegReader<UnitBodyReader> {
        MjpegReader::new(self.reader, max_frame_bytes)
    }
}

impl std::fmt::Debug for UnitStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitStream")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}
