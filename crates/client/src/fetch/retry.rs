//! Bounded exponential-backoff retry around a [`Fetcher`].

use std::time::Duration;

use inventory_core::AppConfig;

use super::outcome::FetchOutcome;
use super::url::NormalizedUrl;
use super::Fetcher;

/// Retry settings for transient fetch failures.
///
/// `max_retries` counts retries after the first attempt, so a fetcher that
/// always fails transiently is called `max_retries + 1` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Delay before the first retry. Doubles on each following retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for RetryPolicy {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_retries: config.http_max_retries,
            base_delay: config.retry_base_delay(),
            max_delay: config.retry_max_delay(),
        }
    }
}

impl RetryPolicy {
    /// Total number of fetch attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`, capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Fetch `url`, retrying transient failures with backoff.
    ///
    /// `Success` and `PermanentFailure` return immediately. Once the retries
    /// are spent the last `TransientFailure` is returned.
    pub async fn fetch_with_retry<F>(&self, fetcher: &F, url: &NormalizedUrl, timeout: Duration) -> FetchOutcome
    where
        F: Fetcher + ?Sized,
    {
        let mut attempt: u32 = 1;
        loop {
            match fetcher.fetch(url, timeout).await {
                FetchOutcome::TransientFailure { reason } if attempt <= self.max_retries => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        url = %url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "transient fetch failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                FetchOutcome::TransientFailure { reason } => {
                    tracing::warn!(url = %url, attempts = attempt, reason = %reason, "fetch retries exhausted");
                    return FetchOutcome::transient(format!("{reason} (after {attempt} attempts)"));
                }
                outcome => return outcome,
            }
        }
    }
}
