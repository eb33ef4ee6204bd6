//! Service wiring.
//!
//! # Responsibilities
//! - Build one breaker/guard per protected-call class from config
//! - Connect the notification sender to its delivery worker
//! - Assemble orchestrator, dispatcher and reclaim sweep
//!
//! # Design Decisions
//! - Transports and the store are injected, so tests swap in fakes
//! - The delivery worker is spawned here; it stops when the last sender drops

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::authority::{AuthorityClient, AuthorityTransport, EndpointResolver};
use crate::config::DispatchConfig;
use crate::notify::{self, NotificationTransport};
use crate::records::RecordStore;
use crate::resilience::{CircuitBreaker, ResilienceGuard};
use crate::workflow::{
    Dispatcher, GuardedStore, PayloadXmlBuilder, ReclaimSweep, ResultInterpreter, StateManager,
    WorkflowOrchestrator,
};

/// Breaker names, also used as metric labels.
pub const AUTHORITY_BREAKER: &str = "authority";
pub const NOTIFICATION_BREAKER: &str = "notification";
pub const STORE_BREAKER: &str = "store";

/// Everything the intake surface and background loops need.
pub struct Services {
    pub store: Arc<dyn RecordStore>,
    pub dispatcher: Dispatcher,
    pub breakers: Vec<Arc<CircuitBreaker>>,
    pub reclaim: ReclaimSweep,
    pub delivery: JoinHandle<()>,
}

impl Services {
    /// Wire the core around the given collaborators. Must run inside a Tokio runtime.
    pub fn build(
        config: &DispatchConfig,
        store: Arc<dyn RecordStore>,
        authority_transport: Arc<dyn AuthorityTransport>,
        notification_transport: Arc<dyn NotificationTransport>,
    ) -> Self {
        let authority_guard = ResilienceGuard::from_settings(AUTHORITY_BREAKER, &config.authority.retry);
        let notification_guard = ResilienceGuard::from_settings(NOTIFICATION_BREAKER, &config.notification.retry);
        let store_guard = ResilienceGuard::from_settings(STORE_BREAKER, &config.store.retry);

        let breakers = vec![
            authority_guard.breaker().clone(),
            notification_guard.breaker().clone(),
            store_guard.breaker().clone(),
        ];

        let (notifier, worker) = notify::channel(notification_transport, notification_guard, &config.notification);
        let delivery = worker.spawn();

        let guarded = GuardedStore::new(store.clone(), store_guard);
        let authority = AuthorityClient::new(
            authority_transport,
            EndpointResolver::new(&config.authority.endpoints),
            authority_guard,
        );
        let builder = Arc::new(PayloadXmlBuilder::new(
            config.authority.artifact_root.clone(),
            config.authority.artifact_namespace.clone(),
        ));

        let orchestrator = WorkflowOrchestrator::new(
            StateManager::new(guarded.clone(), notifier.clone()),
            builder,
            authority,
            ResultInterpreter::new(guarded.clone(), notifier),
        );
        let dispatcher = Dispatcher::new(orchestrator, config.workers.max_concurrent);

        let reclaim = ReclaimSweep::new(
            guarded,
            dispatcher.clone(),
            Duration::from_secs(config.workers.stale_after_secs),
            Duration::from_secs(config.workers.reclaim_interval_secs),
        );

        tracing::info!(
            jurisdictions = config.authority.endpoints.len(),
            max_concurrent = config.workers.max_concurrent,
            notifications = config.notification.default_url.is_some(),
            "Services initialized"
        );

        Self {
            store,
            dispatcher,
            breakers,
            reclaim,
            delivery,
        }
    }
}
