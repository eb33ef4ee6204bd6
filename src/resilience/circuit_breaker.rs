//! Circuit breaker for outbound dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: a single probe is allowed through
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= failure_threshold
//! Open → Half-Open: reset_timeout elapsed since the last failure (checked in can_retry)
//! Half-Open → Closed: probe succeeds
//! Half-Open → Open: probe fails, regardless of failure_count
//! ```
//!
//! # Design Decisions
//! - One breaker per protected-call class, shared via `Arc` and guarded by a mutex
//! - The failure counter is not reset when a half-open probe fails
//! - Timestamps use `tokio::time::Instant` so paused-clock tests can advance time

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use serde::Serialize;
use tokio::time::Instant;

use crate::observability::metrics;

/// Most recent failure messages kept for diagnostics.
const MAX_ERROR_LOG: usize = 64;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Gauge encoding: 0 closed, 1 half-open, 2 open.
    pub fn as_gauge(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        };
        f.write_str(name)
    }
}

/// Breaker thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Failures before the circuit opens.
    pub failure_threshold: u32,
    /// Time an open circuit waits before admitting a probe.
    pub reset_timeout: Duration,
    /// Deadline applied to each individual attempt.
    pub retry_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
            retry_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    last_failure: Option<Instant>,
    error_log: Vec<String>,
}

/// Point-in-time view of a breaker, exposed on the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub recent_errors: Vec<String>,
}

/// Failure-tracking gate for one class of outbound calls.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure: None,
                error_log: Vec::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    // A panic while holding the lock cannot leave the counters half-written,
    // so a poisoned mutex is still safe to read.
    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a call may proceed. May move Open → Half-Open.
    pub fn can_retry(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let reset_elapsed = inner
                    .last_failure
                    .map_or(true, |at| at.elapsed() > self.config.reset_timeout);
                if reset_elapsed {
                    inner.state = CircuitState::HalfOpen;
                    tracing::info!(breaker = %self.name, "Circuit half-open, admitting probe");
                    metrics::record_circuit_state(&self.name, CircuitState::HalfOpen);
                }
                reset_elapsed
            }
        }
    }

    /// Record a failed call.
    pub fn record_failure(&self, message: impl Into<String>) {
        let mut inner = self.lock();
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.last_failure = Some(Instant::now());
        inner.error_log.push(message.into());
        if inner.error_log.len() > MAX_ERROR_LOG {
            let overflow = inner.error_log.len() - MAX_ERROR_LOG;
            inner.error_log.drain(..overflow);
        }

        let reopen = inner.state == CircuitState::HalfOpen;
        let trip = inner.state == CircuitState::Closed
            && inner.failure_count >= self.config.failure_threshold;

        if reopen || trip {
            inner.state = CircuitState::Open;
            tracing::warn!(
                breaker = %self.name,
                failure_count = inner.failure_count,
                probe_failed = reopen,
                "Circuit opened"
            );
            metrics::record_circuit_state(&self.name, CircuitState::Open);
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.state = CircuitState::Closed;
            tracing::info!(breaker = %self.name, "Circuit closed after successful probe");
            metrics::record_circuit_state(&self.name, CircuitState::Closed);
        }
        inner.failure_count = 0;
        inner.error_log.clear();
        inner.last_failure = None;
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    /// Failure messages recorded since the last success, oldest first.
    pub fn error_log(&self) -> Vec<String> {
        self.lock().error_log.clone()
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            recent_errors: inner.error_log.clone(),
        }
    }
}
