//! Unit stream relay subsystem.
//!
//! # Data Flow
//! ```text
//! UnitStreamClient::open (upstream.rs)
//!     → GET http://{validated ip}:8080/stream
//!     → MjpegReader (mjpeg.rs) splits the body on JPEG markers
//!     → pump_frames (relay.rs) writes one binary message per frame
//! ```
//!
//! # Design Decisions
//! - One upstream connection per client; nothing is fanned out or cached
//! - Frames are forwarded unmodified, markers included
//! - Backpressure is the socket: no frame is ever dropped or queued

pub mod mjpeg;
pub mod relay;
pub mod upstream;

pub use mjpeg::{FrameError, MjpegReader, DEFAULT_MAX_FRAME_BYTES};
pub use relay::{RelayEnd, RelayStats};
pub use upstream::{UnitStream, UnitStreamClient, UpstreamError};
