//! Document record subsystem.
//!
//! # Data Flow
//! ```text
//! Intake:
//!     NewDocument → reference.rs (generate code, retry on conflict)
//!                 → store.rs (RecordStore::insert)
//!
//! Workflow:
//!     store.rs (get / conditional_update / update)
//!         ← workflow::state (processing lock)
//!         ← workflow::interpreter (terminal outcome)
//!         ← workflow::reclaim (stale PROCESSING → CREATED)
//! ```
//!
//! # Design Decisions
//! - The workflow depends only on the `RecordStore` trait; `memory.rs` is one backing
//! - A missed precondition is `Ok(None)`, never an error, so "lost the race"
//!   stays distinguishable from "not found"
//! - Every update stamps `updated_at`

pub mod memory;
pub mod reference;
pub mod store;
pub mod types;

pub use memory::MemoryRecordStore;
pub use reference::{create_record, generate_reference_code};
pub use store::{RecordStore, StoreError};
pub use types::{AuthorityFields, DocumentRecord, DocumentStatus, NewDocument, RecordUpdate};
