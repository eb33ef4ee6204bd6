//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → breakers/guards → notification worker
//!         → orchestrator → dispatcher → reclaim sweep
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C → broadcast → intake server drains, reclaim sweep exits
//!         → senders dropped → delivery worker flushes queued notifications
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then the intake listener
//! - Ordered shutdown: stop intake, stop background loops, flush notifications

pub mod shutdown;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::Services;
