//! MJPEG frame extraction.
//!
//! Frames are found by their JPEG markers, not by the multipart boundary or
//! `Content-Length` headers, so units with sloppy multipart framing still
//! work:
//!
//! ```text
//! --boundary\r\n
//! Content-Type: image/jpeg\r\n
//! Content-Length: XXXX\r\n
//! \r\n
//! FF D8 ........ FF D9      ← one frame, markers included
//! ```
//!
//! [`FrameScanner`] is the synchronous state machine; [`MjpegReader`] drives
//! it from any `AsyncBufRead`.

use std::io;
use std::mem;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// JPEG start-of-image marker.
pub const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
/// JPEG end-of-image marker.
pub const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];
/// Default cap on a single frame.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    /// The byte source closed. Normal end of a stream.
    #[error("MJPEG stream ended")]
    EndOfStream,
    #[error("MJPEG frame too large (limit {limit} bytes)")]
    TooLarge { limit: usize },
    #[error("MJPEG read error: {0}")]
    Io(#[from] io::Error),
}

impl FrameError {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, FrameError::EndOfStream)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Looking for `FF D8`; `saw_ff` if the last byte seen was `FF`.
    SeekingStart { saw_ff: bool },
    /// Inside a frame; `prev_ff` if the last appended byte was `FF`.
    Accumulating { prev_ff: bool },
}

/// Two-state JPEG marker scanner.
#[derive(Debug)]
pub struct FrameScanner {
    state: ScanState,
    frame: Vec<u8>,
    max_frame_bytes: usize,
}

impl FrameScanner {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            state: ScanState::SeekingStart { saw_ff: false },
            frame: Vec::new(),
            max_frame_bytes,
        }
    }

    /// Feed bytes into the scanner.
    ///
    /// Returns how many bytes of `input` were consumed and the completed
    /// frame, if one ended inside `input`. Bytes after a completed frame are
    /// left unconsumed for the next call. A frame over the cap is dropped
    /// and the scanner goes back to seeking a start marker.
    pub fn feed(&mut self, input: &[u8]) -> Result<(usize, Option<Vec<u8>>), FrameError> {
        for (i, &byte) in input.iter().enumerate() {
            match self.state {
                ScanState::SeekingStart { saw_ff } => {
                    if saw_ff && byte == JPEG_SOI[1] {
                        self.frame.clear();
                        self.frame.extend_from_slice(&JPEG_SOI);
                        self.state = ScanState::Accumulating { prev_ff: false };
                    } else {
                        self.state = ScanState::SeekingStart {
                            saw_ff: byte == 0xFF,
                        };
                    }
                }
                ScanState::Accumulating { prev_ff } => {
                    self.frame.push(byte);
                    if self.frame.len() > self.max_frame_bytes {
                        self.reset();
                        return Err(FrameError::TooLarge {
                            limit: self.max_frame_bytes,
                        });
                    }

                    if prev_ff && byte == JPEG_EOI[1] {
                        self.state = ScanState::SeekingStart { saw_ff: false };
                        return Ok((i + 1, Some(mem::take(&mut self.frame))));
                    }
                    self.state = ScanState::Accumulating {
                        prev_ff: byte == 0xFF,
                    };
                }
            }
        }
        Ok((input.len(), None))
    }

    /// True while a frame is partially accumulated.
    pub fn in_frame(&self) -> bool {
        matches!(self.state, ScanState::Accumulating { .. })
    }

    fn reset(&mut self) {
        self.frame = Vec::new();
        self.state = ScanState::SeekingStart { saw_ff: false };
    }
}

/// Pulls JPEG frames out of a buffered byte source.
#[derive(Debug)]
pub struct MjpegReader<R> {
    reader: R,
    scanner: FrameScanner,
}

impl<R> MjpegReader<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R, max_frame_bytes: usize) -> Self {
        Self {
            reader,
            scanner: FrameScanner::new(max_frame_bytes),
        }
    }

    /// Read the next complete frame, `FF D8` through `FF D9` inclusive.
    ///
    /// Leading bytes that are not part of a frame are discarded. Errors with
    /// [`FrameError::EndOfStream`] when the source closes, including in the
    /// middle of a frame.
    pub async fn next_frame(&mut self) -> Result<Vec<u8>, FrameError> {
        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Err(FrameError::EndOfStream);
            }

            let (consumed, frame) = self.scanner.feed(buf)?;
            self.reader.consume(consumed);
            if let Some(frame) = frame {
                return Ok(frame);
            }
        }
    }
}
