use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::Result;

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY_MS: u64 = 1000;

/// Bounded exponential backoff for transient external-call failures.
///
/// Retries only errors marked transient, up to three attempts with delays of
/// 1 s, then 2 s. This is the client-boundary retry; it is unrelated to the
/// project's own iteration budget.
pub async fn with_retry<T, F, Fut>(operation: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                let delay = Duration::from_millis(BASE_DELAY_MS * 2u64.pow(attempt - 1));
                warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
