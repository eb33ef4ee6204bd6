//! Exponential backoff with jitter.
//!
//! A [`Backoff`] is a delay schedule for one protected operation invocation.
//! It is not shared between concurrent invocations; the shared state of a
//! protected-call class lives in its circuit breaker.

use std::time::Duration;
use rand::Rng;

/// Schedule parameters for [`Backoff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Number of delays issued before the schedule is exhausted.
    pub max_attempts: u32,
    /// Scale each delay by a uniform random factor in `[0, 0.5]`.
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            max_attempts: 5,
            jitter: true,
        }
    }
}

/// Stateful delay generator: `min(initial × 2^attempt, max)`.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    /// Create a fresh schedule.
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Number of delays issued so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// True once `max_attempts` delays have been issued.
    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.config.max_attempts
    }

    /// Next delay, or `None` when exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }

        let mut delay = calculate_backoff(
            self.attempt,
            self.config.initial_delay,
            self.config.max_delay,
        );

        if self.config.jitter {
            let factor: f64 = rand::thread_rng().gen_range(0.0..=0.5);
            delay = delay.mul_f64(factor);
        }

        self.attempt += 1;
        Some(delay)
    }

    /// Restart the schedule after a success.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Calculate the un-jittered delay for a zero-based attempt.
pub fn calculate_backoff(attempt: u32, initial: Duration, max: Duration) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    initial.checked_mul(factor).unwrap_or(max).min(max)
}
