use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::config::UploadSection;

use super::{RemoteError, RemoteResult};

/// Linear backoff: the wait before retry `n` is `backoff * n`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
        }
    }

    pub fn no_delay(attempts: u32) -> Self {
        Self::new(attempts, Duration::ZERO)
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }

    /// Runs `operation` until it succeeds, fails with a non-transient error,
    /// or the attempts run out. The last error is returned.
    pub async fn run<F, Fut, T>(&self, label: &str, mut operation: F) -> RemoteResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        for attempt in 1..=self.attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.attempts => {
                    let wait = self.delay_for(attempt);
                    warn!(stage = label, attempt, wait = ?wait, error = %err, "retrying operation");
                    if !wait.is_zero() {
                        sleep(wait).await;
                    }
                }
                Err(err) => return Err(err),
            }
        }
        Err(RemoteError::Network(format!(
            "operation {label} exhausted retries"
        )))
    }
}

impl From<&UploadSection> for RetryPolicy {
    fn from(section: &UploadSection) -> Self {
        let backoff = if section.backoff_seconds.is_finite() && section.backoff_seconds > 0.0 {
            Duration::from_secs_f64(section.backoff_seconds)
        } else {
            Duration::ZERO
        };
        Self::new(section.max_attempts, backoff)
    }
}
