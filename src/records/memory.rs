//! In-process record store.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::records::store::{RecordStore, StoreError};
use crate::records::types::{DocumentRecord, DocumentStatus, RecordUpdate};

/// `DashMap`-backed store. Compare-and-set runs under the entry's shard lock.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: DashMap<Uuid, DocumentRecord>,
    references: DashMap<String, Uuid>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, id: Uuid) -> Result<Option<DocumentRecord>, StoreError> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    async fn insert(&self, record: DocumentRecord) -> Result<DocumentRecord, StoreError> {
        // Reserve the reference code first so two inserts cannot share one.
        match self.references.entry(record.reference_code.clone()) {
            Entry::Occupied(_) => {
                return Err(StoreError::Conflict(format!(
                    "reference code {} already exists",
                    record.reference_code
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(record.id);
            }
        }

        match self.records.entry(record.id) {
            Entry::Occupied(_) => {
                self.references.remove(&record.reference_code);
                Err(StoreError::Conflict(format!("record {} already exists", record.id)))
            }
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    async fn update(&self, id: Uuid, update: RecordUpdate) -> Result<DocumentRecord, StoreError> {
        let mut entry = self.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        update.apply_to(entry.value_mut(), Utc::now());
        Ok(entry.value().clone())
    }

    async fn conditional_update(
        &self,
        id: Uuid,
        update: RecordUpdate,
        expected: DocumentStatus,
    ) -> Result<Option<DocumentRecord>, StoreError> {
        let mut entry = self.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if entry.status != expected {
            return Ok(None);
        }
        update.apply_to(entry.value_mut(), Utc::now());
        Ok(Some(entry.value().clone()))
    }

    async fn list_by_status(&self, status: DocumentStatus) -> Result<Vec<DocumentRecord>, StoreError> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.status == status)
            .map(|r| r.value().clone())
            .collect())
    }
}
