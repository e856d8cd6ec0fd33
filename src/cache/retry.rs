//! Retry policy for optimistic transactions.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::cache::CacheError;
use crate::config::settings::RemoveRetryConfig;

/// How often and how patiently an aborted transaction is retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts; `None` retries until the transaction commits.
    pub max_attempts: Option<u32>,
    pub base_delay: Duration,
    pub backoff_multiplier: f64,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Retry forever without waiting between attempts.
    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            base_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            max_delay: Duration::ZERO,
        }
    }

    /// Whether another attempt may start after `attempts` attempts were aborted.
    pub fn allows(&self, attempts: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts < max)
    }

    /// Backoff before retry number `attempt` (0-based), capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_secs_f64();
        let delay = base * self.backoff_multiplier.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    /// `delay_for` with jitter in `[delay / 2, delay]` so competing writers spread out.
    pub fn jittered_delay_for(&self, attempt: u32) -> Duration {
        let delay = self.delay_for(attempt);
        if delay.is_zero() {
            return delay;
        }
        let nanos = delay.as_nanos() as u64;
        Duration::from_nanos(rand::rng().random_range(nanos / 2..=nanos))
    }

    /// Drive an optimistic transaction on `identifier` until it commits.
    ///
    /// Each call to `attempt` runs one WATCH/MULTI/EXEC round and yields
    /// `Ok(None)` when EXEC was discarded. Errors end the loop at once.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &'static str,
        identifier: &str,
        mut attempt: F,
    ) -> Result<T, CacheError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, CacheError>>,
    {
        let mut aborted = 0u32;
        loop {
            if let Some(committed) = attempt().await? {
                if aborted > 0 {
                    tracing::debug!(operation, identifier, aborted, "Transaction committed after retries");
                }
                return Ok(committed);
            }

            aborted += 1;
            if !self.allows(aborted) {
                tracing::error!(operation, identifier, attempts = aborted, "Giving up on contended transaction");
                return Err(CacheError::ContentionExceeded {
                    identifier: identifier.to_string(),
                    attempts: aborted,
                });
            }

            let delay = self.jittered_delay_for(aborted - 1);
            tracing::warn!(
                operation,
                identifier,
                attempt = aborted,
                delay_ms = delay.as_millis() as u64,
                "Transaction aborted by a concurrent write, retrying"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RemoveRetryConfig::default())
    }
}

impl From<&RemoveRetryConfig> for RetryPolicy {
    fn from(config: &RemoveRetryConfig) -> Self {
        Self {
            max_attempts: (config.max_attempts > 0).then_some(config.max_attempts),
            base_delay: Duration::from_millis(config.base_delay_ms),
            backoff_multiplier: config.backoff_multiplier,
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}
