//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds and timeouts > 0, delays ordered)
//! - Check that addresses and URLs parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DispatchConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;
use url::Url;

use crate::config::schema::{DispatchConfig, ResilienceSettings};

/// One rejected configuration field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a loaded configuration.
pub fn validate_config(config: &DispatchConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("server.bind_address", "not a socket address"));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be greater than 0"));
    }

    validate_resilience("authority.retry", &config.authority.retry, &mut errors);
    validate_resilience("notification.retry", &config.notification.retry, &mut errors);
    validate_resilience("store.retry", &config.store.retry, &mut errors);

    if config.authority.endpoints.is_empty() {
        errors.push(ValidationError::new("authority.endpoints", "at least one jurisdiction is required"));
    }
    for (jurisdiction, endpoint) in &config.authority.endpoints {
        if !is_http_url(endpoint) {
            errors.push(ValidationError::new(
                format!("authority.endpoints.{jurisdiction}"),
                format!("invalid URL '{endpoint}'"),
            ));
        }
    }
    if config.authority.artifact_root.trim().is_empty() {
        errors.push(ValidationError::new("authority.artifact_root", "must not be empty"));
    }

    if config.notification.secret.is_empty() {
        errors.push(ValidationError::new("notification.secret", "must not be empty"));
    }
    if let Some(url) = &config.notification.default_url {
        if !is_http_url(url) {
            errors.push(ValidationError::new("notification.default_url", format!("invalid URL '{url}'")));
        }
    }
    if config.notification.timeout_secs == 0 {
        errors.push(ValidationError::new("notification.timeout_secs", "must be greater than 0"));
    }
    if config.notification.signature_header.trim().is_empty() {
        errors.push(ValidationError::new("notification.signature_header", "must not be empty"));
    }

    if config.workers.max_concurrent == 0 {
        errors.push(ValidationError::new("workers.max_concurrent", "must be greater than 0"));
    }
    if config.workers.reclaim_interval_secs == 0 {
        errors.push(ValidationError::new("workers.reclaim_interval_secs", "must be greater than 0"));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.requests_per_window == 0 {
            errors.push(ValidationError::new("rate_limit.requests_per_window", "must be greater than 0"));
        }
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError::new("rate_limit.window_secs", "must be greater than 0"));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "not a socket address"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_resilience(section: &str, settings: &ResilienceSettings, errors: &mut Vec<ValidationError>) {
    if settings.failure_threshold == 0 {
        errors.push(ValidationError::new(format!("{section}.failure_threshold"), "must be greater than 0"));
    }
    if settings.max_attempts == 0 {
        errors.push(ValidationError::new(format!("{section}.max_attempts"), "must be greater than 0"));
    }
    if settings.retry_timeout_secs == 0 {
        errors.push(ValidationError::new(format!("{section}.retry_timeout_secs"), "must be greater than 0"));
    }
    if settings.max_delay_ms < settings.initial_delay_ms {
        errors.push(ValidationError::new(
            format!("{section}.max_delay_ms"),
            "must not be smaller than initial_delay_ms",
        ));
    }
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}
