//! Workflow failure taxonomy.

use thiserror::Error;
use uuid::Uuid;

use crate::authority::{AuthorityError, ExtractionError};
use crate::records::{DocumentStatus, StoreError};
use crate::resilience::ResilienceError;
use crate::workflow::builder::BuildError;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Retries ran out on a transient failure.
    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    Transient {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    #[error("circuit '{breaker}' is open: [{}]", .errors.join("; "))]
    CircuitOpen { breaker: String, errors: Vec<String> },

    #[error("record {0} not found")]
    NotFound(Uuid),

    /// Another worker moved the record first.
    #[error("record {0} is already being processed")]
    ConcurrencyLost(Uuid),

    #[error("record {id} is already {status}")]
    AlreadyTerminal { id: Uuid, status: DocumentStatus },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("persistence failed: {0}")]
    Persistence(StoreError),

    #[error(transparent)]
    Build(#[from] BuildError),

    /// Non-retryable authority-side problem, e.g. an unknown jurisdiction.
    #[error("authority error: {0}")]
    Authority(String),

    #[error("workflow task aborted: {0}")]
    Aborted(String),
}

impl WorkflowError {
    /// Outcomes that leave the record untouched and are not failures.
    pub fn is_noop(&self) -> bool {
        matches!(
            self,
            WorkflowError::NotFound(_) | WorkflowError::ConcurrencyLost(_) | WorkflowError::AlreadyTerminal { .. }
        )
    }
}

impl From<ResilienceError<StoreError>> for WorkflowError {
    fn from(e: ResilienceError<StoreError>) -> Self {
        match e {
            ResilienceError::CircuitOpen { breaker, errors } => WorkflowError::CircuitOpen { breaker, errors },
            ResilienceError::Permanent(StoreError::NotFound(id)) => WorkflowError::NotFound(id),
            ResilienceError::Exhausted { source, .. } | ResilienceError::Permanent(source) => {
                WorkflowError::Persistence(source)
            }
        }
    }
}

impl From<AuthorityError> for WorkflowError {
    fn from(e: AuthorityError) -> Self {
        match e {
            AuthorityError::UnsupportedJurisdiction(_) => WorkflowError::Authority(e.to_string()),
            AuthorityError::Transport(ResilienceError::CircuitOpen { breaker, errors }) => {
                WorkflowError::CircuitOpen { breaker, errors }
            }
            AuthorityError::Transport(ResilienceError::Exhausted { attempts, source }) => WorkflowError::Transient {
                operation: "authority submission".to_string(),
                attempts,
                last_error: source.to_string(),
            },
            AuthorityError::Transport(ResilienceError::Permanent(source)) => {
                WorkflowError::Authority(source.to_string())
            }
            AuthorityError::Extraction(e) => WorkflowError::Extraction(e),
        }
    }
}
