//! HTTP intake subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request ID, trace, timeout, body limit)
//!     → handler (validate, rate limit, create record)
//!     → workflow::Dispatcher (background processing)
//!     → 202 with the record's reference code
//! ```
//!
//! The core never depends on this module.

pub mod server;

pub use server::{ApiError, AppState, HttpServer, SubmitRequest, SubmitResponse};
