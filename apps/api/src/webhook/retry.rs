use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Runs `op` up to `max_attempts` times, sleeping `delay` between attempts.
///
/// Stops early on success or on an error `retryable` rejects. `op` receives
/// the 1-based attempt number. Errors from the last attempt are returned as is.
pub async fn retry_with_delay<T, E, F, Fut, R>(
    max_attempts: u32,
    delay: Duration,
    mut op: F,
    retryable: R,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && retryable(&e) => {
                warn!(
                    attempt,
                    max_attempts,
                    "Attempt failed, retrying in {}ms: {e}",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
