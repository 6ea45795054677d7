//! Retry/backoff policy for catalog fetches.
//!
//! Transient errors (429, network failures) are retried with exponential
//! backoff plus random jitter so repeated clients do not re-synchronize
//! against the platform's throttle window. Permanent errors (404, parse
//! failures, unexpected statuses) propagate immediately.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::StoreError;

/// Executes `operation`, retrying transient errors with backoff + jitter.
///
/// The wait before retry `n` (1-based) is `backoff_base_secs * 2^(n-1)`
/// seconds plus up to one extra base interval of jitter. When the platform
/// supplied a `Retry-After` value, it acts as a floor on the computed delay.
/// `max_retries` counts additional attempts after the first; `0` disables
/// retrying entirely.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_transient() || attempt >= max_retries {
            return Err(err);
        }

        let delay_secs = backoff_delay_secs(backoff_base_secs, attempt, &err);
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %err,
            "transient catalog fetch error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}

/// Computes the delay before the next attempt.
///
/// `attempt` is 0-based (0 = delay before the first retry). The shift is
/// clamped to keep the multiplication from overflowing on extreme configs.
fn backoff_delay_secs(backoff_base_secs: u64, attempt: u32, err: &StoreError) -> u64 {
    let exponential = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
    let jitter = if backoff_base_secs == 0 {
        0
    } else {
        rand::rng().random_range(0..=backoff_base_secs)
    };
    let delay = exponential.saturating_add(jitter);

    match err {
        StoreError::RateLimited {
            retry_after_secs, ..
        } => delay.max(*retry_after_secs),
        _ => delay,
    }
}
