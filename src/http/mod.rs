//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace layer)
//!     → request.rs (unit id and origin extraction)
//!     → websocket.rs (pre-upgrade checks, relay session)
//!     → response.rs (plain-text refusals)
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use request::X_REQUEST_ID;
pub use response::RelayRejection;
pub use server::{build_router, AppState, HttpServer};
