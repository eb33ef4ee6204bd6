//! Per-attempt deadline enforcement.
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - A timed-out attempt is an ordinary failure for the retry loop
//! - Error types opt in by implementing `From<DeadlineElapsed>`

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// An attempt ran past its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("attempt exceeded its {0:?} deadline")]
pub struct DeadlineElapsed(pub Duration);

/// Run `attempt`, failing with `DeadlineElapsed` if it outlives `deadline`.
pub async fn with_deadline<T, E, F>(deadline: Duration, attempt: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<DeadlineElapsed>,
{
    match tokio::time::timeout(deadline, attempt).await {
        Ok(result) => result,
        Err(_) => Err(DeadlineElapsed(deadline).into()),
    }
}
