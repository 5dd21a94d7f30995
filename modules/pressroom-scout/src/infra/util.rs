use std::future::Future;
use std::time::Duration;

use crate::error::ScoutError;

/// Await `fut` for at most `limit`. Elapsed time becomes `ScoutError::Timeout`.
pub async fn with_timeout<T>(
    operation: &'static str,
    limit: Duration,
    fut: impl Future<Output = anyhow::Result<T>>,
) -> Result<T, ScoutError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ScoutError::Other(e)),
        Err(_) => Err(ScoutError::Timeout {
            operation,
            millis: limit.as_millis(),
        }),
    }
}

/// Cooperative rate limiting between automation actions.
pub async fn pace(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
