use pengajuan_core::models::ExternalResult;
use std::future::Future;
use std::time::Duration;

/// Bounded exponential backoff for read-only downstream calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay after the failed attempt `attempt` (1-based): `base * 2^attempt`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor)
    }
}

/// Runs an operation until it succeeds, hits an authorization failure, or
/// runs out of attempts. The last result is returned either way.
#[derive(Clone, Copy, Debug, Default)]
pub struct RetryingFetcher {
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub async fn fetch_with_retry<F, Fut>(&self, mut operation: F) -> ExternalResult
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = ExternalResult>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let result = operation(attempt).await;

            if result.is_success() {
                if attempt > 1 {
                    tracing::info!(attempt, "Downstream call succeeded after retry");
                }
                return result;
            }

            // 401/403 are terminal.
            if result.is_authorization_failure() {
                tracing::warn!(
                    attempt,
                    status = ?result.status(),
                    "Downstream call rejected credentials, not retrying"
                );
                return result;
            }

            if attempt >= max_attempts {
                tracing::error!(
                    attempts = attempt,
                    status = ?result.status(),
                    message = %result.message(),
                    "Downstream call failed after all attempts"
                );
                return result;
            }

            let delay = self.policy.backoff_delay(attempt);
            tracing::warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                status = ?result.status(),
                message = %result.message(),
                "Downstream call failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
