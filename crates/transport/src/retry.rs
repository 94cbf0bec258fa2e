//! C2-level retry policy (§7): fixed linear backoff applied only to
//! transient errors — connect failure, 5xx, read timeout, and 429 (after
//! backoff). Everything else, including cancellation, is not retried.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            retry_delay: Duration::from_millis(0),
        }
    }

    /// Run `op`, retrying up to `max_retries` times with a fixed linear
    /// backoff (`retry_delay` between every attempt, not exponential) when
    /// the error is retryable per [`crate::error::TransportError::is_retryable`].
    pub async fn run<F, Fut, T>(&self, mut op: F) -> Result<T, crate::error::TransportError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, crate::error::TransportError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_retries && err.is_retryable() => {
                    attempt += 1;
                    tracing::debug!(attempt, error = %err, "retrying transient transport error");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
