//! Authority result → terminal record state.

use serde_json::Value;
use uuid::Uuid;

use crate::notify::NotificationSender;
use crate::observability::metrics;
use crate::records::{AuthorityFields, DocumentRecord, DocumentStatus, RecordUpdate};
use crate::workflow::error::WorkflowError;
use crate::workflow::persistence::GuardedStore;

/// `status` value that marks an authorized result.
pub const SUCCESS_INDICATOR: &str = "AUTHORIZED";

#[derive(Clone)]
pub struct ResultInterpreter {
    store: GuardedStore,
    notifier: NotificationSender,
}

impl ResultInterpreter {
    pub fn new(store: GuardedStore, notifier: NotificationSender) -> Self {
        Self { store, notifier }
    }

    /// Persist the terminal outcome for `record` and notify with the stored snapshot.
    pub async fn apply(
        &self,
        id: Uuid,
        record: &DocumentRecord,
        result: &Value,
    ) -> Result<DocumentRecord, WorkflowError> {
        let status = determine_status(result);
        let updated = self.store.update(id, build_update(result, status)).await?;

        tracing::info!(
            record_id = %id,
            reference_code = %record.reference_code,
            status = %status,
            "Authority outcome recorded"
        );
        metrics::record_workflow_outcome(status.as_str());
        self.notifier.notify(&updated, status);
        Ok(updated)
    }
}

/// `AUTHORIZED` only on the explicit success indicator; anything else is a rejection.
pub fn determine_status(result: &Value) -> DocumentStatus {
    match result.get("status").and_then(Value::as_str) {
        Some(SUCCESS_INDICATOR) => DocumentStatus::Authorized,
        _ => DocumentStatus::Rejected,
    }
}

/// Status, raw result for audit, and any authority identifiers present.
pub fn build_update(result: &Value, status: DocumentStatus) -> RecordUpdate {
    let field = |key: &str| match result.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    };

    RecordUpdate::status(status)
        .with_result(result.clone())
        .with_authority(AuthorityFields {
            access_key: field("access_key"),
            protocol: field("protocol"),
            number: field("number"),
            series: field("series"),
            xml_url: field("xml_url"),
            danfe_url: field("danfe_url"),
            authorized_at: field("authorized_at"),
        })
}
