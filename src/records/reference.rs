//! Reference code generation and collision-retrying record creation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::records::store::{RecordStore, StoreError};
use crate::records::types::{DocumentRecord, NewDocument};

/// Attempts before a reference code collision is surfaced.
pub const MAX_REFERENCE_ATTEMPTS: u32 = 5;

/// `yymmddHHMMSS` followed by six hex characters.
pub fn generate_reference_code(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}{}", now.format("%y%m%d%H%M%S"), &suffix[..6])
}

/// Insert a new `CREATED` record, regenerating the reference code on conflict.
pub async fn create_record(store: &dyn RecordStore, draft: NewDocument) -> Result<DocumentRecord, StoreError> {
    create_record_with(store, draft, generate_reference_code).await
}

/// [`create_record`] with an injectable code generator.
pub async fn create_record_with<G>(
    store: &dyn RecordStore,
    draft: NewDocument,
    mut code_gen: G,
) -> Result<DocumentRecord, StoreError>
where
    G: FnMut(DateTime<Utc>) -> String,
{
    let mut attempt = 1;
    loop {
        let now = Utc::now();
        let record = draft.clone().into_record(Uuid::new_v4(), code_gen(now), now);
        match store.insert(record).await {
            Ok(created) => {
                tracing::info!(
                    record_id = %created.id,
                    reference_code = %created.reference_code,
                    jurisdiction = %created.jurisdiction,
                    "Record created"
                );
                return Ok(created);
            }
            Err(StoreError::Conflict(reason)) if attempt < MAX_REFERENCE_ATTEMPTS => {
                tracing::warn!(attempt, reason = %reason, "Reference code collision, regenerating");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
