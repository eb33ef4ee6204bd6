//! Processing lock over a record's status.
//!
//! # Design Decisions
//! - The lock is the conditional `CREATED → PROCESSING` update; nothing else
//! - Losing the race, a missing record and a terminal record are all no-ops
//! - Marking a record failed never fails the caller

use serde_json::json;
use uuid::Uuid;

use crate::notify::NotificationSender;
use crate::records::{DocumentRecord, DocumentStatus, RecordUpdate};
use crate::workflow::error::WorkflowError;
use crate::workflow::persistence::GuardedStore;

#[derive(Clone)]
pub struct StateManager {
    store: GuardedStore,
    notifier: NotificationSender,
}

impl StateManager {
    pub fn new(store: GuardedStore, notifier: NotificationSender) -> Self {
        Self { store, notifier }
    }

    /// Take the processing lock on `id`.
    ///
    /// `Ok(None)` means there is nothing to do: the record is missing,
    /// terminal, or held by another worker.
    pub async fn prepare(&self, id: Uuid) -> Result<Option<DocumentRecord>, WorkflowError> {
        match self.acquire(id).await {
            Ok(record) => {
                self.notifier.notify(&record, DocumentStatus::Processing);
                Ok(Some(record))
            }
            Err(e) if e.is_noop() => {
                match &e {
                    WorkflowError::NotFound(_) => tracing::warn!(record_id = %id, "Record not found"),
                    _ => tracing::info!(record_id = %id, reason = %e, "Skipping record"),
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn acquire(&self, id: Uuid) -> Result<DocumentRecord, WorkflowError> {
        let record = self.store.get(id).await?.ok_or(WorkflowError::NotFound(id))?;

        if !record.status.is_processable() {
            return Err(WorkflowError::AlreadyTerminal {
                id,
                status: record.status,
            });
        }

        let locked = self
            .store
            .conditional_update(
                id,
                RecordUpdate::status(DocumentStatus::Processing),
                DocumentStatus::Created,
            )
            .await?
            .ok_or(WorkflowError::ConcurrencyLost(id))?;

        tracing::info!(record_id = %id, reference_code = %locked.reference_code, "Processing lock acquired");
        Ok(locked)
    }

    /// Move `id` to `FAILED` with the error text as its result payload.
    pub async fn mark_failed(&self, id: Uuid, error: &WorkflowError) {
        let update = RecordUpdate::status(DocumentStatus::Failed).with_result(json!({ "error": error.to_string() }));

        match self.store.update(id, update).await {
            Ok(record) => {
                tracing::warn!(record_id = %id, error = %error, "Record marked failed");
                self.notifier.notify(&record, DocumentStatus::Failed);
            }
            Err(e) => {
                tracing::error!(record_id = %id, error = %error, store_error = %e, "Failed to mark record failed");
            }
        }
    }
}
