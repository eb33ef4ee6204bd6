//! Wire transport for authority submissions.

use std::time::Duration;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;

use crate::authority::envelope::{SOAP12_NS, WSDL_NS};
use crate::resilience::DeadlineElapsed;

/// Longest response body kept in a status error.
const MAX_ERROR_BODY: usize = 512;

/// A failed submission attempt. Every variant is retried.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authority returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("timed out: {0}")]
    Timeout(String),
}

impl From<DeadlineElapsed> for TransportError {
    fn from(e: DeadlineElapsed) -> Self {
        TransportError::Timeout(e.to_string())
    }
}

/// Sends an artifact to an authority endpoint and returns the raw envelope.
#[async_trait]
pub trait AuthorityTransport: Send + Sync {
    async fn submit(&self, artifact: &str, destination: &str) -> Result<String, TransportError>;
}

/// SOAP 1.2 over HTTP.
#[derive(Debug, Clone)]
pub struct SoapTransport {
    client: reqwest::Client,
    soap_action: String,
}

impl SoapTransport {
    pub fn new(soap_action: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self {
            client,
            soap_action: soap_action.into(),
        })
    }

    fn content_type(&self) -> String {
        format!("application/soap+xml; charset=utf-8; action=\"{}\"", self.soap_action)
    }
}

/// Wrap `artifact` in a SOAP 1.2 request envelope.
pub fn wrap_envelope(artifact: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><soap12:Envelope xmlns:soap12="{SOAP12_NS}"><soap12:Body><nfeDadosMsg xmlns="{WSDL_NS}">{}</nfeDadosMsg></soap12:Body></soap12:Envelope>"#,
        strip_declaration(artifact)
    )
}

fn strip_declaration(xml: &str) -> &str {
    let trimmed = xml.trim_start();
    if trimmed.starts_with("<?xml") {
        if let Some(end) = trimmed.find("?>") {
            return trimmed[end + 2..].trim_start();
        }
    }
    trimmed
}

#[async_trait]
impl AuthorityTransport for SoapTransport {
    async fn submit(&self, artifact: &str, destination: &str) -> Result<String, TransportError> {
        let response = self
            .client
            .post(destination)
            .header(CONTENT_TYPE, self.content_type())
            .body(wrap_envelope(artifact))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(e.to_string())
                } else {
                    TransportError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if !status.is_success() {
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}
