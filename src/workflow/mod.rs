//! Document workflow subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher.rs (bounded spawn)
//!     → orchestrator.rs (WorkflowOrchestrator::process)
//!         → state.rs (prepare: CREATED → PROCESSING, notify PROCESSING)
//!         → builder.rs (input payload → artifact)
//!         → authority::AuthorityClient::submit
//!         → interpreter.rs (AUTHORIZED | REJECTED, persist, notify)
//!         → on error: state.rs (mark_failed, notify FAILED)
//!
//! reclaim.rs (periodic): stale PROCESSING → CREATED → dispatcher.rs
//! ```
//!
//! # Design Decisions
//! - Same-id safety comes only from the conditional update in `state.rs`
//! - Store access goes through `persistence.rs`, so writes share one breaker
//! - No error escapes `process`; the record's status is the outcome

pub mod builder;
pub mod dispatcher;
pub mod error;
pub mod interpreter;
pub mod orchestrator;
pub mod persistence;
pub mod reclaim;
pub mod state;

pub use builder::{ArtifactBuilder, BuildError, PayloadXmlBuilder};
pub use dispatcher::Dispatcher;
pub use error::WorkflowError;
pub use interpreter::ResultInterpreter;
pub use orchestrator::WorkflowOrchestrator;
pub use persistence::GuardedStore;
pub use reclaim::ReclaimSweep;
pub use state::StateManager;
