//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Outbound call (authority submission, notification delivery, persistence):
//!     → retries.rs (ResilienceGuard::call)
//!         → circuit_breaker.rs (can_retry? fail fast if open)
//!         → timeouts.rs (per-attempt deadline)
//!         → on failure: circuit_breaker.rs records it, backoff.rs picks the delay
//!         → on success: breaker and backoff reset
//! ```
//!
//! # Design Decisions
//! - One breaker per protected-call class, injected at construction (no globals)
//! - Backoff schedules are per call; only the breaker is shared
//! - Every attempt carries a deadline; the loop itself is bounded by attempts

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use backoff::{Backoff, BackoffConfig};
pub use circuit_breaker::{BreakerConfig, BreakerSnapshot, CircuitBreaker, CircuitState};
pub use retries::{execute, execute_classified, ResilienceError, ResilienceGuard};
pub use timeouts::{with_deadline, DeadlineElapsed};
