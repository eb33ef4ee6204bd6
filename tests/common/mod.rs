//! Shared fakes and fixtures for integration tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use uuid::Uuid;

use authority_dispatch::authority::{AuthorityTransport, TransportError};
use authority_dispatch::config::{DispatchConfig, ResilienceSettings};
use authority_dispatch::lifecycle::Services;
use authority_dispatch::notify::{DeliveryError, NotificationEvent, NotificationTransport};
use authority_dispatch::records::{
    create_record, DocumentRecord, DocumentStatus, MemoryRecordStore, NewDocument, RecordStore, RecordUpdate,
    StoreError,
};

pub const SUBSCRIBER_URL: &str = "http://subscriber.test/hook";
pub const SECRET: &str = "test-secret";

/// Fast, deterministic resilience settings.
pub fn fast_retry(max_attempts: u32, failure_threshold: u32) -> ResilienceSettings {
    ResilienceSettings {
        failure_threshold,
        reset_timeout_secs: 60,
        retry_timeout_secs: 2,
        initial_delay_ms: 1,
        max_delay_ms: 5,
        max_attempts,
        jitter: false,
    }
}

pub fn test_config() -> DispatchConfig {
    let mut config = DispatchConfig::default();
    config.authority.retry = fast_retry(2, 5);
    config.notification.retry = fast_retry(2, 5);
    config.store.retry = fast_retry(2, 5);

    let mut endpoints = BTreeMap::new();
    endpoints.insert("SP".to_string(), "http://authority.test/sp".to_string());
    config.authority.endpoints = endpoints;

    config.notification.secret = SECRET.to_string();
    config.notification.default_url = Some(SUBSCRIBER_URL.to_string());
    config.rate_limit.enabled = false;
    config.observability.metrics_enabled = false;
    config.workers.stale_after_secs = 60;
    config
}

// --- Authority fixtures --------------------------------------------------

pub fn authorized_envelope() -> String {
    r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope">
  <soap:Body>
    <nfeResultMsg xmlns="http://www.portalfiscal.inf.br/nfe/wsdl/NFeAutorizacao4">
      <nfeAutorizacaoLoteResult>
        <retEnviNFe xmlns="http://www.portalfiscal.inf.br/nfe" versao="4.00">
          <cStat>104</cStat><xMotivo>Lote processado</xMotivo>
          <protNFe versao="4.00"><infProt>
            <chNFe>35240112345678000199550010000000011000000010</chNFe>
            <dhRecbto>2024-01-01T12:00:00-03:00</dhRecbto>
            <nProt>135240000000001</nProt>
            <cStat>100</cStat><xMotivo>Autorizado o uso da NF-e</xMotivo>
          </infProt></protNFe>
        </retEnviNFe>
      </nfeAutorizacaoLoteResult>
    </nfeResultMsg>
  </soap:Body>
</soap:Envelope>"#
        .to_string()
}

pub fn rejected_envelope() -> String {
    r#"<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope"><soap:Body><nfeResultMsg xmlns="http://www.portalfiscal.inf.br/nfe/wsdl/NFeAutorizacao4"><nfeAutorizacaoLoteResult><retEnviNFe xmlns="http://www.portalfiscal.inf.br/nfe"><cStat>225</cStat><xMotivo>Falha no Schema XML</xMotivo></retEnviNFe></nfeAutorizacaoLoteResult></nfeResultMsg></soap:Body></soap:Envelope>"#
        .to_string()
}

pub type Reply = Result<String, TransportError>;

/// Authority transport answering from a script; the fallback repeats forever.
pub struct ScriptedAuthority {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    delay: Duration,
    calls: AtomicU32,
    artifacts: Mutex<Vec<(String, String)>>,
}

impl ScriptedAuthority {
    pub fn always(reply: Reply) -> Arc<Self> {
        Self::scripted(Vec::new(), reply)
    }

    pub fn scripted(script: Vec<Reply>, fallback: Reply) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
            artifacts: Mutex::new(Vec::new()),
        })
    }

    pub fn slow(reply: Reply, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: reply,
            delay,
            calls: AtomicU32::new(0),
            artifacts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(artifact, destination)` per call.
    pub fn submissions(&self) -> Vec<(String, String)> {
        self.artifacts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthorityTransport for ScriptedAuthority {
    async fn submit(&self, artifact: &str, destination: &str) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.artifacts
            .lock()
            .unwrap()
            .push((artifact.to_string(), destination.to_string()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

// --- Notification fakes --------------------------------------------------

/// Notification transport that records every delivered event.
#[derive(Default)]
pub struct RecordingNotifications {
    delivered: Mutex<Vec<(String, NotificationEvent, Vec<(String, String)>)>>,
    arrived: Notify,
}

impl RecordingNotifications {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.delivered.lock().unwrap().iter().map(|(_, e, _)| e.clone()).collect()
    }

    pub fn deliveries(&self) -> Vec<(String, NotificationEvent, Vec<(String, String)>)> {
        self.delivered.lock().unwrap().clone()
    }

    /// Wait until at least `n` events arrived; panics after five seconds.
    pub async fn wait_for(&self, n: usize) -> Vec<NotificationEvent> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let notified = self.arrived.notified();
            let events = self.events();
            if events.len() >= n {
                return events;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                panic!("expected {n} notifications, got {}", self.events().len());
            }
        }
    }
}

#[async_trait]
impl NotificationTransport for RecordingNotifications {
    async fn deliver(&self, url: &str, body: &[u8], headers: &[(String, String)]) -> Result<(), DeliveryError> {
        let event: NotificationEvent =
            serde_json::from_slice(body).map_err(|e| DeliveryError::Network(e.to_string()))?;
        self.delivered
            .lock()
            .unwrap()
            .push((url.to_string(), event, headers.to_vec()));
        self.arrived.notify_waiters();
        Ok(())
    }
}

// --- Failing store -------------------------------------------------------

/// A memory store with switchable faults.
pub struct FlakyStore {
    inner: Arc<MemoryRecordStore>,
    outage: AtomicBool,
    broken_cas: Mutex<Option<Uuid>>,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryRecordStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            outage: AtomicBool::new(false),
            broken_cas: Mutex::new(None),
        })
    }

    /// Fail every call while set.
    pub fn set_outage(&self, down: bool) {
        self.outage.store(down, Ordering::SeqCst);
    }

    /// Fail conditional updates of `id` only.
    pub fn break_cas_for(&self, id: Option<Uuid>) {
        *self.broken_cas.lock().unwrap() = id;
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.outage.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("db down".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn get(&self, id: Uuid) -> Result<Option<DocumentRecord>, StoreError> {
        self.check()?;
        self.inner.get(id).await
    }

    async fn insert(&self, record: DocumentRecord) -> Result<DocumentRecord, StoreError> {
        self.check()?;
        self.inner.insert(record).await
    }

    async fn update(&self, id: Uuid, update: RecordUpdate) -> Result<DocumentRecord, StoreError> {
        self.check()?;
        self.inner.update(id, update).await
    }

    async fn conditional_update(
        &self,
        id: Uuid,
        update: RecordUpdate,
        expected: DocumentStatus,
    ) -> Result<Option<DocumentRecord>, StoreError> {
        self.check()?;
        if *self.broken_cas.lock().unwrap() == Some(id) {
            return Err(StoreError::Unavailable("db down".into()));
        }
        self.inner.conditional_update(id, update, expected).await
    }

    async fn list_by_status(&self, status: DocumentStatus) -> Result<Vec<DocumentRecord>, StoreError> {
        self.check()?;
        self.inner.list_by_status(status).await
    }
}

// --- Wiring helpers ------------------------------------------------------

pub struct Harness {
    pub services: Services,
    pub store: Arc<MemoryRecordStore>,
    pub authority: Arc<ScriptedAuthority>,
    pub notifications: Arc<RecordingNotifications>,
}

pub fn harness(config: &DispatchConfig, authority: Arc<ScriptedAuthority>) -> Harness {
    let store = Arc::new(MemoryRecordStore::new());
    let notifications = RecordingNotifications::new();
    let services = Services::build(config, store.clone(), authority.clone(), notifications.clone());
    Harness {
        services,
        store,
        authority,
        notifications,
    }
}

/// A harness whose services see `FlakyStore`; `Harness::store` is the healthy inner store.
pub fn flaky_harness(config: &DispatchConfig, authority: Arc<ScriptedAuthority>) -> (Harness, Arc<FlakyStore>) {
    let store = Arc::new(MemoryRecordStore::new());
    let flaky = FlakyStore::new(store.clone());
    let notifications = RecordingNotifications::new();
    let services = Services::build(config, flaky.clone(), authority.clone(), notifications.clone());
    let harness = Harness {
        services,
        store,
        authority,
        notifications,
    };
    (harness, flaky)
}

impl Harness {
    pub async fn create(&self, jurisdiction: &str) -> DocumentRecord {
        create_record(
            self.store.as_ref(),
            NewDocument {
                jurisdiction: jurisdiction.to_string(),
                notification_url: None,
                payload: json!({"ide": {"nNF": 1, "serie": "1"}, "det": [{"prod": "Widget"}]}),
            },
        )
        .await
        .unwrap()
    }

    /// Insert a record last touched an hour ago with the given status.
    pub async fn insert_stale(&self, status: DocumentStatus) -> DocumentRecord {
        let an_hour_ago = chrono::Utc::now() - chrono::Duration::hours(1);
        let mut record = NewDocument {
            jurisdiction: "SP".to_string(),
            notification_url: None,
            payload: json!({"ide": {"nNF": 7}}),
        }
        .into_record(
            Uuid::new_v4(),
            authority_dispatch::records::generate_reference_code(an_hour_ago),
            an_hour_ago,
        );
        record.status = status;
        self.store.insert(record).await.unwrap()
    }

    pub async fn record(&self, id: Uuid) -> DocumentRecord {
        self.store.get(id).await.unwrap().unwrap()
    }
}

// --- Mock subscriber -----------------------------------------------------

/// One request received by the mock subscriber.
#[derive(Debug, Clone)]
pub struct Received {
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Start a programmable subscriber on an ephemeral port.
///
/// `respond` picks the status for the n-th request (0-based).
pub async fn start_subscriber<F, Fut>(respond: F) -> (SocketAddr, Arc<Mutex<Vec<Received>>>)
where
    F: Fn(u32) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StatusCode> + Send + 'static,
{
    let received = Arc::new(Mutex::new(Vec::new()));
    let hits = Arc::new(AtomicU32::new(0));
    let respond = Arc::new(respond);

    let sink = received.clone();
    let app = Router::new().route(
        "/hook",
        post(move |headers: HeaderMap, body: Bytes| {
            let sink = sink.clone();
            let hits = hits.clone();
            let respond = respond.clone();
            async move {
                let n = hits.fetch_add(1, Ordering::SeqCst);
                let status = respond(n).await;
                if status.is_success() {
                    sink.lock().unwrap().push(Received { headers, body });
                }
                status
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, received)
}
