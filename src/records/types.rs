//! Record model and the update value applied to it.

use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Lifecycle of a submitted document.
///
/// ```text
/// CREATED → PROCESSING → AUTHORIZED | REJECTED | FAILED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Created,
    Processing,
    Authorized,
    Rejected,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Created => "CREATED",
            DocumentStatus::Processing => "PROCESSING",
            DocumentStatus::Authorized => "AUTHORIZED",
            DocumentStatus::Rejected => "REJECTED",
            DocumentStatus::Failed => "FAILED",
        }
    }

    /// No transition is attempted out of a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DocumentStatus::Authorized | DocumentStatus::Rejected | DocumentStatus::Failed
        )
    }

    pub fn is_processable(self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifiers and links returned by the authority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xml_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub danfe_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorized_at: Option<String>,
}

impl AuthorityFields {
    /// Overwrite each field that `other` sets.
    pub fn merge(&mut self, other: &AuthorityFields) {
        fn take(dst: &mut Option<String>, src: &Option<String>) {
            if src.is_some() {
                dst.clone_from(src);
            }
        }
        take(&mut self.access_key, &other.access_key);
        take(&mut self.protocol, &other.protocol);
        take(&mut self.number, &other.number);
        take(&mut self.series, &other.series);
        take(&mut self.xml_url, &other.xml_url);
        take(&mut self.danfe_url, &other.danfe_url);
        take(&mut self.authorized_at, &other.authorized_at);
    }

    pub fn is_empty(&self) -> bool {
        *self == AuthorityFields::default()
    }
}

/// A document tracked through submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub reference_code: String,
    pub status: DocumentStatus,
    /// Selects the authority endpoint.
    pub jurisdiction: String,
    /// Per-record notification URL override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_url: Option<String>,
    pub input_payload: Value,
    pub result_payload: Option<Value>,
    #[serde(flatten)]
    pub authority: AuthorityFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Intake data for a record that does not exist yet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewDocument {
    pub jurisdiction: String,
    #[serde(default)]
    pub notification_url: Option<String>,
    pub payload: Value,
}

impl NewDocument {
    /// Materialize a `CREATED` record.
    pub fn into_record(self, id: Uuid, reference_code: String, now: DateTime<Utc>) -> DocumentRecord {
        DocumentRecord {
            id,
            reference_code,
            status: DocumentStatus::Created,
            jurisdiction: self.jurisdiction,
            notification_url: self.notification_url,
            input_payload: self.payload,
            result_payload: None,
            authority: AuthorityFields::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields to change on a record. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordUpdate {
    pub status: Option<DocumentStatus>,
    pub result_payload: Option<Value>,
    pub authority: AuthorityFields,
}

impl RecordUpdate {
    pub fn status(status: DocumentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_result(mut self, payload: Value) -> Self {
        self.result_payload = Some(payload);
        self
    }

    pub fn with_authority(mut self, fields: AuthorityFields) -> Self {
        self.authority = fields;
        self
    }

    /// Apply to `record` and stamp `updated_at`.
    pub fn apply_to(&self, record: &mut DocumentRecord, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(payload) = &self.result_payload {
            record.result_payload = Some(payload.clone());
        }
        record.authority.merge(&self.authority);
        record.updated_at = now;
    }
}
