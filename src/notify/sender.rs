//! Signed status notifications.
//!
//! `NotificationSender` is handed to the workflow; it never blocks and never
//! fails. Events go over an unbounded channel to a `DeliveryWorker`, which
//! fans them out into one lane per record.
//!
//! # Design Decisions
//! - A lane posts its record's events strictly in order
//! - Lanes run concurrently, so a slow subscriber only delays its own records
//! - A lane closes after its record's terminal event; the breaker stays shared

use std::collections::HashMap;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use uuid::Uuid;

use crate::config::NotificationConfig;
use crate::notify::signing::{sign, SigningError};
use crate::notify::transport::{DeliveryError, NotificationTransport};
use crate::observability::metrics;
use crate::records::{DocumentRecord, DocumentStatus};
use crate::resilience::{ResilienceError, ResilienceGuard};

/// Body posted to the subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub id: Uuid,
    pub reference_code: String,
    pub status: DocumentStatus,
    pub updated_at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(record: &DocumentRecord, status: DocumentStatus) -> Self {
        Self {
            id: record.id,
            reference_code: record.reference_code.clone(),
            status,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug)]
struct Delivery {
    url: String,
    event: NotificationEvent,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to encode event: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error(transparent)]
    Delivery(#[from] ResilienceError<DeliveryError>),
}

/// Fire-and-forget handle used by the workflow.
#[derive(Debug, Clone)]
pub struct NotificationSender {
    tx: mpsc::UnboundedSender<Delivery>,
    default_url: Option<String>,
}

impl NotificationSender {
    /// Queue a `status` event for `record`.
    ///
    /// The record's own URL wins over the default; with neither this is a no-op.
    pub fn notify(&self, record: &DocumentRecord, status: DocumentStatus) {
        let Some(url) = record
            .notification_url
            .as_deref()
            .or(self.default_url.as_deref())
            .filter(|u| !u.trim().is_empty())
        else {
            tracing::debug!(record_id = %record.id, status = %status, "No notification URL, skipping");
            metrics::record_notification("skipped");
            return;
        };

        let delivery = Delivery {
            url: url.to_string(),
            event: NotificationEvent::new(record, status),
        };
        if self.tx.send(delivery).is_err() {
            tracing::warn!(record_id = %record.id, status = %status, "Delivery worker stopped, notification dropped");
            metrics::record_notification("dropped");
        }
    }
}

/// Signs and posts single events.
struct Courier {
    transport: Arc<dyn NotificationTransport>,
    guard: ResilienceGuard,
    secret: String,
    signature_header: String,
}

impl Courier {
    async fn deliver(&self, url: &str, event: &NotificationEvent) -> Result<(), NotifyError> {
        let body = serde_json::to_vec(event)?;
        let signature = sign(self.secret.as_bytes(), &body)?;
        let headers = [(self.signature_header.clone(), signature)];

        self.guard
            .call(|| self.transport.deliver(url, &body, &headers))
            .await?;
        Ok(())
    }

    async fn drain(self: Arc<Self>, mut lane: mpsc::UnboundedReceiver<Delivery>) {
        while let Some(Delivery { url, event }) = lane.recv().await {
            match self.deliver(&url, &event).await {
                Ok(()) => {
                    tracing::info!(record_id = %event.id, status = %event.status, url = %url, "Notification delivered");
                    metrics::record_notification("delivered");
                }
                Err(e) => {
                    tracing::error!(record_id = %event.id, status = %event.status, url = %url, error = %e, "Notification failed");
                    metrics::record_notification("failed");
                }
            }
        }
    }
}

/// Routes queued notifications into per-record lanes.
pub struct DeliveryWorker {
    courier: Arc<Courier>,
    rx: mpsc::UnboundedReceiver<Delivery>,
}

/// Build a connected sender and worker.
pub fn channel(
    transport: Arc<dyn NotificationTransport>,
    guard: ResilienceGuard,
    config: &NotificationConfig,
) -> (NotificationSender, DeliveryWorker) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sender = NotificationSender {
        tx,
        default_url: config.default_url.clone(),
    };
    let worker = DeliveryWorker {
        courier: Arc::new(Courier {
            transport,
            guard,
            secret: config.secret.clone(),
            signature_header: config.signature_header.clone(),
        }),
        rx,
    };
    (sender, worker)
}

impl DeliveryWorker {
    /// Sign and post one event through the notification breaker.
    pub async fn deliver(&self, url: &str, event: &NotificationEvent) -> Result<(), NotifyError> {
        self.courier.deliver(url, event).await
    }

    /// Deliver until every sender is dropped and every lane has drained.
    pub async fn run(mut self) {
        let mut lanes: HashMap<Uuid, mpsc::UnboundedSender<Delivery>> = HashMap::new();
        let mut tasks = JoinSet::new();

        while let Some(delivery) = self.rx.recv().await {
            let id = delivery.event.id;
            let last = delivery.event.status.is_terminal();

            let lane = lanes.entry(id).or_insert_with(|| {
                let (tx, rx) = mpsc::unbounded_channel();
                tasks.spawn(self.courier.clone().drain(rx));
                tx
            });
            if lane.send(delivery).is_err() {
                tracing::error!(record_id = %id, "Delivery lane gone, notification dropped");
                metrics::record_notification("dropped");
                lanes.remove(&id);
            } else if last {
                lanes.remove(&id);
            }

            while let Some(finished) = tasks.try_join_next() {
                if let Err(e) = finished {
                    tracing::error!(error = %e, "Delivery lane panicked");
                }
            }
        }

        drop(lanes);
        while let Some(finished) = tasks.join_next().await {
            if let Err(e) = finished {
                tracing::error!(error = %e, "Delivery lane panicked");
            }
        }
        tracing::debug!("Delivery worker finished");
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
