use model::execution::pipeline::RetrySettings;
use std::{fmt::Display, future::Future, time::Duration};
use tokio::time::sleep;
use tracing::{error, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        RetryPolicy::new(
            settings.max_attempts,
            Duration::try_from_secs_f64(settings.backoff_seconds).unwrap_or_default(),
        )
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_base,
        }
    }

    /// Wait after failed attempt `attempt` (1-based): `base * 2^(attempt - 1)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.backoff_base.saturating_mul(1u32 << exponent)
    }

    /// Executes the operation, sleeping with `tokio::time::sleep` between attempts.
    pub async fn run<F, Fut, T, E>(&self, label: &str, op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run_with_sleep(label, op, sleep).await
    }

    /// Same as [`RetryPolicy::run`] with an injected sleep, so tests can observe the waits.
    pub async fn run_with_sleep<F, Fut, T, E, S, SFut>(
        &self,
        label: &str,
        mut op: F,
        mut sleep_fn: S,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        S: FnMut(Duration) -> SFut,
        SFut: Future<Output = ()>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(result) => return Ok(result),
                Err(err) if attempt >= max_attempts => {
                    error!(
                        operation = label,
                        attempts = max_attempts,
                        error = %err,
                        "All attempts failed"
                    );
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        operation = label,
                        attempt,
                        max_attempts,
                        wait_secs = delay.as_secs_f64(),
                        error = %err,
                        "Attempt failed, retrying"
                    );
                    sleep_fn(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Free-function form of [`RetryPolicy::run`].
pub async fn with_retry<F, Fut, T, E>(op: F, policy: &RetryPolicy, label: &str) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    policy.run(label, op).await
}
