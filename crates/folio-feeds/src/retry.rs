//! Retry with exponential back-off and jitter for the feed clients.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries on
//! transient errors (network failures, 5xx, 429). Everything else is
//! returned on the first failure.

use std::future::Future;
use std::time::Duration;

use crate::error::FeedError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:** timeouts, connection failures, HTTP 5xx, HTTP 429.
///
/// **Not retriable:** 404, 401/403, other 4xx, malformed bodies, and input
/// that was rejected before a request was sent.
pub(crate) fn is_retriable(err: &FeedError) -> bool {
    match err {
        FeedError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        FeedError::UnexpectedStatus { status, .. } => *status >= 500,
        FeedError::RateLimited { .. } => true,
        FeedError::NotFound { .. }
        | FeedError::Unauthorized { .. }
        | FeedError::InvalidInput { .. }
        | FeedError::Deserialize { .. }
        | FeedError::Parse { .. } => false,
    }
}

const MAX_DELAY_MS: u64 = 30_000;

/// Delay before retry number `attempt` (1-based), or `None` when the error
/// should be returned as is.
///
/// Back-off is `backoff_base_ms * 2^(attempt-1)` ± 25 % jitter, capped at
/// 30 s. A 429 waits at least its `Retry-After`; a `Retry-After` longer than
/// the cap is not retried at all.
pub(crate) fn retry_delay_ms(err: &FeedError, attempt: u32, backoff_base_ms: u64) -> Option<u64> {
    if !is_retriable(err) {
        return None;
    }
    let computed = backoff_base_ms.saturating_mul(1u64 << attempt.saturating_sub(1).min(10));
    let capped = computed.min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;

    match err {
        FeedError::RateLimited { retry_after_secs } => {
            let requested = retry_after_secs.saturating_mul(1000);
            (requested <= MAX_DELAY_MS).then_some(jittered.max(requested))
        }
        _ => Some(jittered),
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// See [`retry_delay_ms`] for the wait between attempts. Non-retriable errors
/// are returned immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, FeedError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FeedError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= max_retries {
                    return Err(err);
                }
                let Some(delay_ms) = retry_delay_ms(&err, attempt + 1, backoff_base_ms) else {
                    return Err(err);
                };
                attempt += 1;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient feed error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
