//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Intake request:
//!     → rate_limit.rs (per-issuer fixed window)
//!     → record creation
//! ```
//!
//! # Design Decisions
//! - Fail closed: an exhausted window rejects with 429
//! - Inbound authentication is not handled here

pub mod rate_limit;

pub use rate_limit::IssuerRateLimiter;
