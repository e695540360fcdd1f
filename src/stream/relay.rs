//! Frame pump between a unit stream and a WebSocket client.
//!
//! # Data Flow
//! ```text
//! MjpegReader::next_frame ──► Message::Binary ──► WebSocket sink
//!        ▲                                              │
//!        └──────── awaits while the client is slow ◄────┘
//! ```
//!
//! There is no queue between the two sides: a slow client stalls reads from
//! the unit.

use std::fmt;

use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::io::AsyncBufRead;

use crate::observability::metrics;
use crate::stream::mjpeg::{FrameError, MjpegReader};

/// Why a relay session stopped.
#[derive(Debug)]
pub enum RelayEnd {
    /// The extractor failed (end of stream, oversized frame, read error).
    Upstream(FrameError),
    /// Writing to the client failed.
    WriteFailed(String),
    /// The client sent a close frame or went away.
    ClientClosed,
    /// Reading from the client failed.
    ClientError(String),
    /// The process is shutting down.
    Shutdown,
}

impl RelayEnd {
    /// Metrics label.
    pub fn label(&self) -> &'static str {
        match self {
            RelayEnd::Upstream(FrameError::EndOfStream) => "upstream_closed",
            RelayEnd::Upstream(FrameError::TooLarge { .. }) => "frame_too_large",
            RelayEnd::Upstream(FrameError::Io(_)) => "upstream_error",
            RelayEnd::WriteFailed(_) => "write_failed",
            RelayEnd::ClientClosed => "client_closed",
            RelayEnd::ClientError(_) => "client_error",
            RelayEnd::Shutdown => "shutdown",
        }
    }

    pub fn log(&self, stats: &RelayStats) {
        let frames = stats.frames;
        let bytes = stats.bytes;
        match self {
            RelayEnd::Upstream(FrameError::EndOfStream) => {
                tracing::debug!(frames, bytes, "Unit stream ended");
            }
            RelayEnd::Upstream(err @ FrameError::TooLarge { .. }) => {
                tracing::warn!(frames, bytes, error = %err, "Dropping unit stream");
            }
            RelayEnd::Upstream(err) => {
                tracing::debug!(frames, bytes, error = %err, "Error reading MJPEG frame");
            }
            RelayEnd::WriteFailed(err) => {
                tracing::debug!(frames, bytes, error = %err, "Error writing to websocket");
            }
            RelayEnd::ClientClosed => {
                tracing::debug!(frames, bytes, "Client closed websocket");
            }
            RelayEnd::ClientError(err) => {
                tracing::debug!(frames, bytes, error = %err, "Error reading from websocket");
            }
            RelayEnd::Shutdown => {
                tracing::debug!(frames, bytes, "Stream closed for shutdown");
            }
        }
    }
}

/// Counters for one session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub frames: u64,
    pub bytes: u64,
}

/// Forward frames until the extractor or the sink fails.
pub async fn pump_frames<R, S>(
    frames: &mut MjpegReader<R>,
    sink: &mut S,
    stats: &mut RelayStats,
) -> RelayEnd
where
    R: AsyncBufRead + Unpin,
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    loop {
        let frame = match frames.next_frame().await {
            Ok(frame) => frame,
            Err(err) => return RelayEnd::Upstream(err),
        };

        let len = frame.len();
        if let Err(err) = sink.send(Message::Binary(frame.into())).await {
            return RelayEnd::WriteFailed(err.to_string());
        }

        stats.frames += 1;
        stats.bytes += len as u64;
        metrics::record_frame(len);
    }
}

/// Drain client messages until it closes. Text and binary input is ignored.
pub async fn watch_client<S, E>(client: &mut S) -> RelayEnd
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    loop {
        match client.next().await {
            None | Some(Ok(Message::Close(_))) => return RelayEnd::ClientClosed,
            Some(Err(err)) => return RelayEnd::ClientError(err.to_string()),
            Some(Ok(_)) => {}
        }
    }
}
