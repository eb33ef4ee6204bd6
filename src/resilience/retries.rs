//! Retry-with-circuit-breaker execution.
//!
//! # Responsibilities
//! - Gate every attempt on the protected-call class's breaker
//! - Feed attempt outcomes back into the breaker
//! - Sleep between attempts according to a per-call backoff schedule
//!
//! # Design Decisions
//! - One loop for every outbound call: authority, notifications, persistence
//! - Bounded by backoff exhaustion, not wall-clock time
//! - An open breaker fails fast with its recent error log; no further retries
//! - Callers may classify errors; a non-transient one returns at once and is
//!   not counted against the breaker

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

use crate::config::ResilienceSettings;
use crate::observability::metrics;
use crate::resilience::backoff::{Backoff, BackoffConfig};
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::timeouts::{with_deadline, DeadlineElapsed};

/// Why a protected call gave up.
#[derive(Debug, Error)]
pub enum ResilienceError<E> {
    /// The breaker rejected the call.
    #[error("circuit '{breaker}' is open: [{}]", .errors.join("; "))]
    CircuitOpen {
        breaker: String,
        errors: Vec<String>,
    },

    /// Every scheduled attempt failed; carries the last failure.
    #[error("gave up after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: E,
    },

    /// The failure was classified as non-transient and not retried.
    #[error(transparent)]
    Permanent(E),
}

impl<E> ResilienceError<E> {
    /// The final underlying failure, if the call was attempted.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            ResilienceError::CircuitOpen { .. } => None,
            ResilienceError::Exhausted { source, .. } | ResilienceError::Permanent(source) => Some(source),
        }
    }
}

/// Run `operation` until it succeeds, the breaker opens, or `backoff` runs out.
pub async fn execute<T, E, F, Fut>(
    operation: F,
    breaker: &CircuitBreaker,
    backoff: &mut Backoff,
) -> Result<T, ResilienceError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    execute_classified(operation, breaker, backoff, |_| true).await
}

/// Like [`execute`], but an error for which `is_transient` is false is
/// returned as [`ResilienceError::Permanent`] without touching the breaker.
pub async fn execute_classified<T, E, F, Fut, C>(
    mut operation: F,
    breaker: &CircuitBreaker,
    backoff: &mut Backoff,
    is_transient: C,
) -> Result<T, ResilienceError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    C: Fn(&E) -> bool,
{
    loop {
        if !breaker.can_retry() {
            tracing::warn!(breaker = %breaker.name(), "Circuit open, rejecting call");
            return Err(ResilienceError::CircuitOpen {
                breaker: breaker.name().to_string(),
                errors: breaker.error_log(),
            });
        }

        match operation().await {
            Ok(value) => {
                breaker.record_success();
                backoff.reset();
                return Ok(value);
            }
            Err(err) if !is_transient(&err) => {
                tracing::debug!(breaker = %breaker.name(), error = %err, "Non-transient failure, not retrying");
                return Err(ResilienceError::Permanent(err));
            }
            Err(err) => {
                breaker.record_failure(err.to_string());
                let Some(delay) = backoff.next_delay() else {
                    tracing::error!(
                        breaker = %breaker.name(),
                        attempts = backoff.attempt() + 1,
                        error = %err,
                        "Retries exhausted"
                    );
                    return Err(ResilienceError::Exhausted {
                        attempts: backoff.attempt() + 1,
                        source: err,
                    });
                };

                tracing::warn!(
                    breaker = %breaker.name(),
                    attempt = backoff.attempt(),
                    delay = ?delay,
                    error = %err,
                    "Attempt failed, retrying"
                );
                metrics::record_retry(breaker.name());
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// A breaker plus the backoff schedule used by every call through it.
///
/// Clones share the breaker. Each [`ResilienceGuard::call`] gets its own
/// [`Backoff`] so concurrent calls never spend each other's attempts.
#[derive(Debug, Clone)]
pub struct ResilienceGuard {
    breaker: Arc<CircuitBreaker>,
    backoff: BackoffConfig,
}

impl ResilienceGuard {
    pub fn new(breaker: Arc<CircuitBreaker>, backoff: BackoffConfig) -> Self {
        Self { breaker, backoff }
    }

    /// Build a guard with a fresh breaker named after the protected operation.
    pub fn from_settings(name: &str, settings: &ResilienceSettings) -> Self {
        let breaker = CircuitBreaker::new(name, settings.breaker_config());
        Self::new(Arc::new(breaker), settings.backoff_config())
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Run `operation` with the breaker's per-attempt deadline applied.
    pub async fn call<T, E, F, Fut>(&self, operation: F) -> Result<T, ResilienceError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display + From<DeadlineElapsed>,
    {
        self.call_classified(operation, |_| true).await
    }

    /// [`ResilienceGuard::call`] where only errors passing `is_transient` are retried.
    pub async fn call_classified<T, E, F, Fut, C>(&self, mut operation: F, is_transient: C) -> Result<T, ResilienceError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display + From<DeadlineElapsed>,
        C: Fn(&E) -> bool,
    {
        let deadline = self.breaker.config().retry_timeout;
        let mut backoff = Backoff::new(self.backoff);
        execute_classified(
            || with_deadline(deadline, operation()),
            &self.breaker,
            &mut backoff,
            is_transient,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::circuit_breaker::{BreakerConfig, CircuitState};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Debug, Error)]
    enum FlakyError {
        #[error("flaky failure #{0}")]
        Failed(u32),
        #[error(transparent)]
        Deadline(#[from] DeadlineElapsed),
    }

    fn breaker(threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(
            "flaky",
            BreakerConfig {
                failure_threshold: threshold,
                reset_timeout: Duration::from_secs(60),
                retry_timeout: Duration::from_secs(1),
            },
        )
    }

    fn backoff(max_attempts: u32) -> Backoff {
        Backoff::new(BackoffConfig {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            max_attempts,
            jitter: false,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let cb = breaker(10);
        let mut schedule = backoff(5);

        let result = execute(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(FlakyError::Failed(n))
                    } else {
                        Ok(n)
                    }
                }
            },
            &cb,
            &mut schedule,
        )
        .await;

        assert_eq!(result.ok(), Some(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(cb.failure_count(), 0);
        assert_eq!(schedule.attempt(), 0, "backoff resets on success");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_failure() {
        let calls = AtomicU32::new(0);
        let cb = breaker(10);
        let mut schedule = backoff(2);

        let result: Result<(), _> = execute(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err(FlakyError::Failed(n)) }
            },
            &cb,
            &mut schedule,
        )
        .await;

        match result {
            Err(ResilienceError::Exhausted { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert_eq!(source.to_string(), "flaky failure #3");
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(cb.error_log().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_breaker_fails_fast_with_error_log() {
        let calls = AtomicU32::new(0);
        let cb = breaker(2);
        let mut schedule = backoff(10);

        let result: Result<(), _> = execute(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err(FlakyError::Failed(n)) }
            },
            &cb,
            &mut schedule,
        )
        .await;

        match result {
            Err(ResilienceError::CircuitOpen { breaker, errors }) => {
                assert_eq!(breaker, "flaky");
                assert_eq!(errors, vec!["flaky failure #1", "flaky failure #2"]);
            }
            other => panic!("expected open circuit, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_transient_error_skips_breaker_and_backoff() {
        let calls = AtomicU32::new(0);
        let cb = breaker(1);
        let mut schedule = backoff(5);

        let result: Result<(), _> = execute_classified(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err(FlakyError::Failed(n)) }
            },
            &cb,
            &mut schedule,
            |e| !matches!(e, FlakyError::Failed(_)),
        )
        .await;

        assert!(matches!(result, Err(ResilienceError::Permanent(FlakyError::Failed(1)))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failure_count(), 0);
        assert_eq!(schedule.attempt(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_applies_per_attempt_deadline() {
        let guard = ResilienceGuard::new(
            Arc::new(breaker(10)),
            BackoffConfig {
                initial_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(10),
                max_attempts: 1,
                jitter: false,
            },
        );

        let result: Result<(), ResilienceError<FlakyError>> = guard
            .call(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await;

        let err = result.expect_err("slow attempts must time out");
        assert!(matches!(
            err.last_error(),
            Some(FlakyError::Deadline(DeadlineElapsed(d))) if *d == Duration::from_secs(1)
        ));
        assert_eq!(guard.breaker().failure_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_clones_share_breaker_but_not_backoff() {
        let guard = ResilienceGuard::new(
            Arc::new(breaker(100)),
            BackoffConfig {
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
                max_attempts: 1,
                jitter: false,
            },
        );
        let other = guard.clone();

        for g in [&guard, &other] {
            let result: Result<(), ResilienceError<FlakyError>> =
                g.call(|| async { Err(FlakyError::Failed(0)) }).await;
            assert!(matches!(result, Err(ResilienceError::Exhausted { attempts: 2, .. })));
        }
        assert_eq!(guard.breaker().failure_count(), 4);
    }
}
