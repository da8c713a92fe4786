//! Bounded retry with backoff for transient store failures.

use std::future::Future;
use std::time::Duration;

use tracklet_core::AppResult;

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(50);

/// Runs a store operation, retrying transient failures with doubling backoff.
///
/// Only [`tracklet_core::AppError::StoreUnavailable`] retries; every other
/// error, and the last transient error once attempts are exhausted, surfaces
/// to the caller as terminal.
pub async fn with_backoff<T, F, Fut>(mut operation: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut delay = INITIAL_BACKOFF;
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() && attempt < MAX_ATTEMPTS => {
                tracing::warn!(%error, attempt, "transient store failure, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
