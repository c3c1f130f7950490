//! Retrying fallible async operations with jittered backoff

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Fixed delay plus the upper bound of random jitter, in milliseconds.
const INCREMENTS: [(u64, u64); 9] = [
    (250, 250),
    (500, 500),
    (1_000, 1_000),
    (2_000, 1_000),
    (4_000, 1_000),
    (8_000, 1_000),
    (16_000, 1_000),
    (32_000, 2_000),
    (64_000, 2_000),
];

/// Failure of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<E> {
    /// Transient; the operation may be tried again.
    Retry(E),
    /// Final; retrying stops and this error is returned.
    Abort(E),
}

impl<E> Attempt<E> {
    pub fn into_inner(self) -> E {
        match self {
            Attempt::Retry(e) | Attempt::Abort(e) => e,
        }
    }
}

/// Delay before retry number `attempt`, clamped to the last increment.
pub fn incremental_backoff(attempt: usize) -> Duration {
    let (fixed, jitter) = INCREMENTS[attempt.min(INCREMENTS.len() - 1)];
    let extra = rand::thread_rng().gen_range(0..jitter);
    Duration::from_millis(fixed + extra)
}

/// Sleeps for [`incremental_backoff`] of `attempt`.
pub async fn sleep_incremental(attempt: usize) {
    tokio::time::sleep(incremental_backoff(attempt)).await;
}

/// Runs `op` up to `retries` times (at least once), backing off between
/// attempts, until it succeeds or aborts. Returns the last error otherwise.
pub async fn retry_n<T, E, F, Fut>(retries: usize, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Attempt<E>>>,
    E: std::fmt::Display,
{
    let retries = retries.max(1);
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(Attempt::Abort(e)) => {
                debug!(attempt, error = %e, "operation aborted");
                return Err(e);
            }
            Err(Attempt::Retry(e)) => {
                if attempt + 1 >= retries {
                    warn!(attempts = retries, error = %e, "retries exhausted");
                    return Err(e);
                }
                debug!(attempt, error = %e, "attempt failed, backing off");
                sleep_incremental(attempt).await;
                attempt += 1;
            }
        }
    }
}

/// Runs `op` with a constant `delay` between attempts until it succeeds or
/// aborts.
pub async fn retry_unlimited<T, E, F, Fut>(delay: Duration, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Attempt<E>>>,
    E: std::fmt::Display,
{
    let mut attempts: u64 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(Attempt::Abort(e)) => return Err(e),
            Err(Attempt::Retry(e)) => {
                attempts += 1;
                debug!(attempts, error = %e, "attempt failed, retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
}
