//! End-to-end processing of one record.

use std::sync::Arc;
use uuid::Uuid;

use crate::authority::AuthorityClient;
use crate::observability::metrics;
use crate::records::{DocumentRecord, DocumentStatus};
use crate::workflow::builder::ArtifactBuilder;
use crate::workflow::error::WorkflowError;
use crate::workflow::interpreter::ResultInterpreter;
use crate::workflow::state::StateManager;

/// Stateless; safe to run concurrently for different ids.
#[derive(Clone)]
pub struct WorkflowOrchestrator {
    state: StateManager,
    builder: Arc<dyn ArtifactBuilder>,
    authority: AuthorityClient,
    interpreter: ResultInterpreter,
}

impl WorkflowOrchestrator {
    pub fn new(
        state: StateManager,
        builder: Arc<dyn ArtifactBuilder>,
        authority: AuthorityClient,
        interpreter: ResultInterpreter,
    ) -> Self {
        Self {
            state,
            builder,
            authority,
            interpreter,
        }
    }

    /// Process `id` to a terminal state. Never returns an error.
    ///
    /// Returns the final record when this call did the work.
    pub async fn process(&self, id: Uuid) -> Option<DocumentRecord> {
        let record = match self.state.prepare(id).await {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                // Lock not held; the record stays CREATED until the reclaim sweep retries it.
                tracing::error!(record_id = %id, error = %e, "Could not acquire processing lock");
                return None;
            }
        };

        match self.run(&record).await {
            Ok(updated) => Some(updated),
            Err(e) => {
                tracing::error!(record_id = %id, error = %e, "Workflow failed");
                self.fail(id, &e).await;
                None
            }
        }
    }

    async fn run(&self, record: &DocumentRecord) -> Result<DocumentRecord, WorkflowError> {
        let artifact = self.builder.build(&record.input_payload)?;
        let result = self.authority.submit(&artifact, record).await?;
        self.interpreter.apply(record.id, record, &result).await
    }

    /// Terminal cleanup; logs instead of failing.
    pub async fn fail(&self, id: Uuid, error: &WorkflowError) {
        metrics::record_workflow_outcome(DocumentStatus::Failed.as_str());
        self.state.mark_failed(id, error).await;
    }
}
