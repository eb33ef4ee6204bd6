//! Recovery of records stranded by a crashed worker or a store outage.
//!
//! # Design Decisions
//! - Staleness is judged on `updated_at`; a live workflow always finishes with an update
//! - The move back to `CREATED` is conditional on `PROCESSING`, so a worker that
//!   finishes during the sweep keeps its result
//! - `CREATED` records older than the cutoff are redispatched as well; the
//!   processing lock keeps a record that is merely queued from running twice
//! - Reclaimed records go through the normal dispatcher

use std::time::Duration;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time;
use uuid::Uuid;

use crate::records::{DocumentRecord, DocumentStatus, RecordUpdate};
use crate::workflow::dispatcher::Dispatcher;
use crate::workflow::error::WorkflowError;
use crate::workflow::persistence::GuardedStore;

pub struct ReclaimSweep {
    store: GuardedStore,
    dispatcher: Dispatcher,
    stale_after: chrono::Duration,
    interval: Duration,
}

impl ReclaimSweep {
    pub fn new(store: GuardedStore, dispatcher: Dispatcher, stale_after: Duration, interval: Duration) -> Self {
        Self {
            store,
            dispatcher,
            stale_after: chrono::Duration::from_std(stale_after).unwrap_or(chrono::Duration::MAX),
            interval,
        }
    }

    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.stale_after).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Move stale `PROCESSING` records back to `CREATED`. Returns their ids.
    ///
    /// A record whose move fails is logged and left `PROCESSING` for the next sweep.
    pub async fn reclaim_stale(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, WorkflowError> {
        let cutoff = self.cutoff(now);
        let stale: Vec<DocumentRecord> = self
            .store
            .list_by_status(DocumentStatus::Processing)
            .await?
            .into_iter()
            .filter(|r| r.updated_at < cutoff)
            .collect();

        let mut reclaimed = Vec::with_capacity(stale.len());
        for record in stale {
            let moved = self
                .store
                .conditional_update(
                    record.id,
                    RecordUpdate::status(DocumentStatus::Created),
                    DocumentStatus::Processing,
                )
                .await;
            match moved {
                Ok(Some(_)) => {
                    tracing::warn!(
                        record_id = %record.id,
                        stuck_since = %record.updated_at,
                        "Reclaimed stale processing record"
                    );
                    reclaimed.push(record.id);
                }
                Ok(None) => {}
                Err(e) => {
                    let error = WorkflowError::from(e);
                    tracing::error!(record_id = %record.id, error = %error, "Failed to reclaim processing record");
                }
            }
        }
        Ok(reclaimed)
    }

    /// `CREATED` records untouched since before the cutoff.
    ///
    /// These were accepted but never locked, e.g. `prepare` hit a store outage.
    pub async fn stranded(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, WorkflowError> {
        let cutoff = self.cutoff(now);
        Ok(self
            .store
            .list_by_status(DocumentStatus::Created)
            .await?
            .into_iter()
            .filter(|r| r.updated_at < cutoff)
            .map(|r| r.id)
            .collect())
    }

    /// Collect stranded and reclaimed records and dispatch them all.
    ///
    /// A failed listing is logged; whatever the other one found still goes out.
    pub async fn sweep_once(&self) -> Vec<JoinHandle<Option<DocumentRecord>>> {
        let now = Utc::now();
        let mut ids = Vec::new();

        // Listed before reclaiming so a record reclaimed below is not counted twice.
        match self.stranded(now).await {
            Ok(found) => ids.extend(found),
            Err(e) => tracing::error!(error = %e, "Failed to list stranded records"),
        }
        match self.reclaim_stale(now).await {
            Ok(found) => ids.extend(found),
            Err(e) => tracing::error!(error = %e, "Failed to list processing records"),
        }

        ids.into_iter().map(|id| self.dispatcher.dispatch(id)).collect()
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            stale_after_secs = self.stale_after.num_seconds(),
            "Reclaim sweep starting"
        );

        let mut ticker = time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let handles = self.sweep_once().await;
                    if !handles.is_empty() {
                        tracing::info!(count = handles.len(), "Redispatched stale records");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Reclaim sweep received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
