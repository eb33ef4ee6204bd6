//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the dispatcher.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::resilience::{BackoffConfig, BreakerConfig};

/// Root configuration for the dispatch service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DispatchConfig {
    /// Intake HTTP server settings.
    pub server: ServerConfig,

    /// Authority submission settings.
    pub authority: AuthorityConfig,

    /// Subscriber notification settings.
    pub notification: NotificationConfig,

    /// Persistence write resilience.
    pub store: StoreConfig,

    /// Workflow worker settings.
    pub workers: WorkerConfig,

    /// Intake rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Intake server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Total time allowed for one intake request, in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Circuit breaker and backoff knobs shared by every protected-call class.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResilienceSettings {
    /// Failures before the circuit opens.
    pub failure_threshold: u32,

    /// Seconds an open circuit waits before admitting a probe.
    pub reset_timeout_secs: u64,

    /// Deadline for a single attempt, in seconds.
    pub retry_timeout_secs: u64,

    /// First retry delay in milliseconds.
    pub initial_delay_ms: u64,

    /// Maximum retry delay in milliseconds.
    pub max_delay_ms: u64,

    /// Retries issued before giving up.
    pub max_attempts: u32,

    /// Randomize each delay.
    pub jitter: bool,
}

impl Default for ResilienceSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_secs: 60,
            retry_timeout_secs: 10,
            initial_delay_ms: 1000,
            max_delay_ms: 10_000,
            max_attempts: 4,
            jitter: true,
        }
    }
}

impl ResilienceSettings {
    pub fn breaker_config(&self) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.failure_threshold,
            reset_timeout: Duration::from_secs(self.reset_timeout_secs),
            retry_timeout: Duration::from_secs(self.retry_timeout_secs),
        }
    }

    pub fn backoff_config(&self) -> BackoffConfig {
        BackoffConfig {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            max_attempts: self.max_attempts,
            jitter: self.jitter,
        }
    }
}

/// Authority submission configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthorityConfig {
    /// Breaker/backoff for submissions.
    pub retry: ResilienceSettings,

    /// Jurisdiction code → authorization endpoint URL.
    pub endpoints: BTreeMap<String, String>,

    /// SOAP action advertised on each submission.
    pub soap_action: String,

    /// Root element of the built artifact.
    pub artifact_root: String,

    /// Namespace declared on the artifact root.
    pub artifact_namespace: Option<String>,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        let mut endpoints = BTreeMap::new();
        endpoints.insert("SP".to_string(), "http://localhost:8080/ws/NFeAutorizacao4.asmx".to_string());
        endpoints.insert("RJ".to_string(), "http://localhost:8080/ws/NFeAutorizacao4.asmx".to_string());

        Self {
            retry: ResilienceSettings::default(),
            endpoints,
            soap_action: "http://www.portalfiscal.inf.br/nfe/wsdl/NFeAutorizacao4/nfeAutorizacaoLote"
                .to_string(),
            artifact_root: "NFe".to_string(),
            artifact_namespace: Some("http://www.portalfiscal.inf.br/nfe".to_string()),
        }
    }
}

/// Subscriber notification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Breaker/backoff for deliveries.
    pub retry: ResilienceSettings,

    /// Shared secret for the payload signature.
    pub secret: String,

    /// Delivery URL used when a record has no override.
    pub default_url: Option<String>,

    /// HTTP timeout per delivery, in seconds.
    pub timeout_secs: u64,

    /// Header carrying the hex signature.
    pub signature_header: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            retry: ResilienceSettings::default(),
            // WARNING: placeholder, override with CLIENT_WEBHOOK_SECRET in production.
            secret: "default-secret".to_string(),
            default_url: None,
            timeout_secs: 10,
            signature_header: "x-webhook-signature".to_string(),
        }
    }
}

/// Persistence write resilience.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub retry: ResilienceSettings,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retry: ResilienceSettings {
                failure_threshold: 10,
                reset_timeout_secs: 30,
                retry_timeout_secs: 5,
                initial_delay_ms: 200,
                max_delay_ms: 2000,
                max_attempts: 3,
                jitter: true,
            },
        }
    }
}

/// Workflow worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Maximum workflows running at once.
    pub max_concurrent: usize,

    /// Seconds between stale-processing sweeps.
    pub reclaim_interval_secs: u64,

    /// A `PROCESSING` record untouched for this many seconds is reclaimed.
    pub stale_after_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 32,
            reclaim_interval_secs: 60,
            stale_after_secs: 900,
        }
    }
}

/// Per-issuer intake rate limiting.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests allowed per issuer per window.
    pub requests_per_window: u32,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_window: 10,
            window_secs: 5,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: DispatchConfig = toml::from_str(
            r#"
            [authority.retry]
            max_attempts = 2

            [authority.endpoints]
            MG = "https://authority.example/mg"

            [notification]
            default_url = "https://hooks.example/dispatch"
            "#,
        )
        .unwrap();

        assert_eq!(config.authority.retry.max_attempts, 2);
        assert_eq!(config.authority.retry.failure_threshold, 5);
        assert_eq!(config.authority.endpoints.len(), 1);
        assert_eq!(config.notification.default_url.as_deref(), Some("https://hooks.example/dispatch"));
        assert_eq!(config.notification.signature_header, "x-webhook-signature");
        assert_eq!(config.store.retry.max_attempts, 3);
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_settings_convert_to_runtime_configs() {
        let settings = ResilienceSettings {
            failure_threshold: 3,
            reset_timeout_secs: 20,
            retry_timeout_secs: 2,
            initial_delay_ms: 50,
            max_delay_ms: 400,
            max_attempts: 6,
            jitter: false,
        };

        let breaker = settings.breaker_config();
        assert_eq!(breaker.failure_threshold, 3);
        assert_eq!(breaker.reset_timeout, Duration::from_secs(20));
        assert_eq!(breaker.retry_timeout, Duration::from_secs(2));

        let backoff = settings.backoff_config();
        assert_eq!(backoff.initial_delay, Duration::from_millis(50));
        assert_eq!(backoff.max_delay, Duration::from_millis(400));
        assert_eq!(backoff.max_attempts, 6);
        assert!(!backoff.jitter);
    }

    #[test]
    fn test_log_format_parses_lowercase() {
        let config: ObservabilityConfig = toml::from_str(r#"log_format = "json""#).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
