//! Resilient authority submission.

use std::sync::Arc;
use serde_json::Value;
use thiserror::Error;

use crate::authority::endpoints::EndpointResolver;
use crate::authority::envelope::{extract, ExtractionError};
use crate::authority::response::parse_result;
use crate::authority::transport::{AuthorityTransport, TransportError};
use crate::records::DocumentRecord;
use crate::resilience::{ResilienceError, ResilienceGuard};

#[derive(Debug, Error)]
pub enum AuthorityError {
    #[error("no authority endpoint configured for jurisdiction '{0}'")]
    UnsupportedJurisdiction(String),

    #[error(transparent)]
    Transport(#[from] ResilienceError<TransportError>),

    #[error("unreadable authority response: {0}")]
    Extraction(#[from] ExtractionError),
}

/// Submits artifacts through the authority breaker.
#[derive(Clone)]
pub struct AuthorityClient {
    transport: Arc<dyn AuthorityTransport>,
    endpoints: EndpointResolver,
    guard: ResilienceGuard,
}

impl AuthorityClient {
    pub fn new(transport: Arc<dyn AuthorityTransport>, endpoints: EndpointResolver, guard: ResilienceGuard) -> Self {
        Self {
            transport,
            endpoints,
            guard,
        }
    }

    pub fn guard(&self) -> &ResilienceGuard {
        &self.guard
    }

    /// Submit `artifact` for `record` and return the interpreted result.
    pub async fn submit(&self, artifact: &str, record: &DocumentRecord) -> Result<Value, AuthorityError> {
        let endpoint = self
            .endpoints
            .resolve(&record.jurisdiction)
            .ok_or_else(|| AuthorityError::UnsupportedJurisdiction(record.jurisdiction.clone()))?;

        tracing::info!(
            record_id = %record.id,
            jurisdiction = %record.jurisdiction,
            endpoint = %endpoint,
            "Submitting to authority"
        );

        let envelope = self
            .guard
            .call(|| self.transport.submit(artifact, endpoint))
            .await?;

        let document = extract(&envelope).inspect_err(|e| {
            tracing::error!(record_id = %record.id, error = %e, envelope_len = envelope.len(), "Envelope extraction failed");
        })?;
        let result = parse_result(&document)?;

        let outcome = result.get("status").and_then(Value::as_str).unwrap_or("unknown");
        tracing::info!(record_id = %record.id, outcome, "Authority responded");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{DocumentStatus, NewDocument};
    use crate::resilience::{BackoffConfig, BreakerConfig, CircuitBreaker};
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use uuid::Uuid;

    struct Scripted {
        replies: Mutex<Vec<Result<String, TransportError>>>,
        destinations: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AuthorityTransport for Scripted {
        async fn submit(&self, _artifact: &str, destination: &str) -> Result<String, TransportError> {
            self.destinations.lock().unwrap().push(destination.to_string());
            self.replies.lock().unwrap().remove(0)
        }
    }

    fn client(replies: Vec<Result<String, TransportError>>) -> (AuthorityClient, Arc<Scripted>) {
        let transport = Arc::new(Scripted {
            replies: Mutex::new(replies),
            destinations: Mutex::new(Vec::new()),
        });
        let mut endpoints = BTreeMap::new();
        endpoints.insert("SP".to_string(), "http://sp.example/ws".to_string());
        let guard = ResilienceGuard::new(
            Arc::new(CircuitBreaker::new("authority", BreakerConfig::default())),
            BackoffConfig {
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
                max_attempts: 2,
                jitter: false,
            },
        );
        (
            AuthorityClient::new(transport.clone(), EndpointResolver::new(&endpoints), guard),
            transport,
        )
    }

    fn record(jurisdiction: &str) -> DocumentRecord {
        let mut rec = NewDocument {
            jurisdiction: jurisdiction.into(),
            notification_url: None,
            payload: json!({}),
        }
        .into_record(Uuid::new_v4(), "REF".into(), Utc::now());
        rec.status = DocumentStatus::Processing;
        rec
    }

    fn authorized_envelope() -> String {
        r#"<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope"><soap:Body><nfeResultMsg xmlns="http://www.portalfiscal.inf.br/nfe/wsdl/NFeAutorizacao4"><nfeAutorizacaoLoteResult><retEnviNFe xmlns="http://www.portalfiscal.inf.br/nfe"><protNFe><infProt><cStat>100</cStat><nProt>1352</nProt></infProt></protNFe></retEnviNFe></nfeAutorizacaoLoteResult></nfeResultMsg></soap:Body></soap:Envelope>"#.to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_then_success() {
        let (client, transport) = client(vec![
            Err(TransportError::Network("connection reset".into())),
            Ok(authorized_envelope()),
        ]);

        let result = client.submit("<NFe/>", &record("sp")).await.unwrap();
        assert_eq!(result["status"], json!("AUTHORIZED"));
        assert_eq!(result["protocol"], json!("1352"));
        assert_eq!(
            *transport.destinations.lock().unwrap(),
            vec!["http://sp.example/ws", "http://sp.example/ws"]
        );
        assert_eq!(client.guard().breaker().failure_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_jurisdiction_is_not_attempted() {
        let (client, transport) = client(vec![]);
        let err = client.submit("<NFe/>", &record("XX")).await.unwrap_err();
        assert!(matches!(err, AuthorityError::UnsupportedJurisdiction(j) if j == "XX"));
        assert!(transport.destinations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_envelope_is_extraction_error() {
        let (client, _) = client(vec![Ok("<html>maintenance</html>".into())]);
        let err = client.submit("<NFe/>", &record("SP")).await.unwrap_err();
        assert!(matches!(err, AuthorityError::Extraction(ExtractionError::Unrecognized)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_carries_last_transport_error() {
        let (client, _) = client(vec![
            Err(TransportError::Network("a".into())),
            Err(TransportError::Network("b".into())),
            Err(TransportError::Status { status: 503, body: "busy".into() }),
        ]);
        let err = client.submit("<NFe/>", &record("SP")).await.unwrap_err();
        match err {
            AuthorityError::Transport(ResilienceError::Exhausted { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(source, TransportError::Status { status: 503, .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
