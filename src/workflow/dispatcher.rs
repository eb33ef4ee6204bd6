//! Bounded background execution of workflows.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::records::DocumentRecord;
use crate::workflow::error::WorkflowError;
use crate::workflow::orchestrator::WorkflowOrchestrator;

/// Spawns one task per dispatched id, at most `max_concurrent` running.
#[derive(Clone)]
pub struct Dispatcher {
    orchestrator: WorkflowOrchestrator,
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl Dispatcher {
    pub fn new(orchestrator: WorkflowOrchestrator, max_concurrent: usize) -> Self {
        let capacity = max_concurrent.max(1);
        Self {
            orchestrator,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn orchestrator(&self) -> &WorkflowOrchestrator {
        &self.orchestrator
    }

    /// Queue `id` for processing. The handle resolves to the final record
    /// when this dispatch did the work.
    pub fn dispatch(&self, id: Uuid) -> JoinHandle<Option<DocumentRecord>> {
        let orchestrator = self.orchestrator.clone();
        let permits = self.permits.clone();

        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                tracing::warn!(record_id = %id, "Dispatcher closed, dropping record");
                return None;
            };

            let worker = orchestrator.clone();
            match tokio::spawn(async move { worker.process(id).await }).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(record_id = %id, error = %e, "Workflow task aborted");
                    orchestrator.fail(id, &WorkflowError::Aborted(e.to_string())).await;
                    None
                }
            }
        })
    }

    /// Workflows currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.permits.available_permits())
    }
}
