//! Persistence contract consumed by the workflow.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::records::types::{DocumentRecord, DocumentStatus, RecordUpdate};
use crate::resilience::DeadlineElapsed;

/// Why a store operation failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(Uuid),

    /// Unique id or reference code already taken.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Timeout(#[from] DeadlineElapsed),
}

impl StoreError {
    /// Outages and timeouts may clear up; a missing record or a conflict will not.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }
}

/// Backing storage for document records.
///
/// Implementations must make `conditional_update` atomic: the status check and
/// the write happen as one step, or two workers could both leave `CREATED`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<DocumentRecord>, StoreError>;

    /// Fails with `Conflict` if the id or reference code exists.
    async fn insert(&self, record: DocumentRecord) -> Result<DocumentRecord, StoreError>;

    /// Fails with `NotFound` if the id is absent.
    async fn update(&self, id: Uuid, update: RecordUpdate) -> Result<DocumentRecord, StoreError>;

    /// Apply `update` only if the stored status equals `expected`.
    ///
    /// Returns `Ok(None)` when the precondition fails and `Err(NotFound)` when
    /// the id is absent.
    async fn conditional_update(
        &self,
        id: Uuid,
        update: RecordUpdate,
        expected: DocumentStatus,
    ) -> Result<Option<DocumentRecord>, StoreError>;

    async fn list_by_status(&self, status: DocumentStatus) -> Result<Vec<DocumentRecord>, StoreError>;
}
