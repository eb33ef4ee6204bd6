//! Authority Dispatch Library
//!
//! Submits documents to an external authority at most once concurrently,
//! retries transient failures behind circuit breakers, and notifies a
//! subscriber of every status change with a signed payload.

pub mod authority;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod notify;
pub mod observability;
pub mod records;
pub mod resilience;
pub mod security;
pub mod workflow;

pub use config::DispatchConfig;
pub use http::HttpServer;
pub use lifecycle::{Services, Shutdown};
