//! Record store access through the persistence breaker.
//!
//! Only outages and timeouts are retried. `NotFound` and `Conflict` come back
//! as [`ResilienceError::Permanent`] and never count against the shared breaker.

use std::sync::Arc;
use uuid::Uuid;

use crate::records::{DocumentRecord, DocumentStatus, RecordStore, RecordUpdate, StoreError};
use crate::resilience::{ResilienceError, ResilienceGuard};

type Guarded<T> = Result<T, ResilienceError<StoreError>>;

/// A `RecordStore` whose every call is retried by a shared guard.
#[derive(Clone)]
pub struct GuardedStore {
    store: Arc<dyn RecordStore>,
    guard: ResilienceGuard,
}

impl GuardedStore {
    pub fn new(store: Arc<dyn RecordStore>, guard: ResilienceGuard) -> Self {
        Self { store, guard }
    }

    pub fn guard(&self) -> &ResilienceGuard {
        &self.guard
    }

    pub async fn get(&self, id: Uuid) -> Guarded<Option<DocumentRecord>> {
        self.guard.call_classified(|| self.store.get(id), StoreError::is_transient).await
    }

    pub async fn update(&self, id: Uuid, update: RecordUpdate) -> Guarded<DocumentRecord> {
        self.guard
            .call_classified(|| self.store.update(id, update.clone()), StoreError::is_transient)
            .await
    }

    pub async fn conditional_update(
        &self,
        id: Uuid,
        update: RecordUpdate,
        expected: DocumentStatus,
    ) -> Guarded<Option<DocumentRecord>> {
        self.guard
            .call_classified(
                || self.store.conditional_update(id, update.clone(), expected),
                StoreError::is_transient,
            )
            .await
    }

    pub async fn list_by_status(&self, status: DocumentStatus) -> Guarded<Vec<DocumentRecord>> {
        self.guard
            .call_classified(|| self.store.list_by_status(status), StoreError::is_transient)
            .await
    }
}
