//! Wire transport for subscriber notifications.

use std::time::Duration;
use async_trait::async_trait;
use thiserror::Error;

use crate::resilience::DeadlineElapsed;

/// A failed delivery attempt. Every variant is retried.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    #[error("network error: {0}")]
    Network(String),

    #[error("subscriber returned HTTP {0}")]
    Status(u16),

    #[error("timed out: {0}")]
    Timeout(String),
}

impl From<DeadlineElapsed> for DeliveryError {
    fn from(e: DeadlineElapsed) -> Self {
        DeliveryError::Timeout(e.to_string())
    }
}

/// Posts a notification body. Non-2xx responses are errors.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn deliver(&self, url: &str, body: &[u8], headers: &[(String, String)]) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone)]
pub struct HttpNotificationTransport {
    client: reqwest::Client,
}

impl HttpNotificationTransport {
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NotificationTransport for HttpNotificationTransport {
    async fn deliver(&self, url: &str, body: &[u8], headers: &[(String, String)]) -> Result<(), DeliveryError> {
        let mut request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_vec());
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DeliveryError::Timeout(e.to_string())
            } else {
                DeliveryError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Status(status.as_u16()))
        }
    }
}
