//! Request execution: one rate-limiter token per logical call, then a bounded
//! retry loop with exponential backoff on transient HTTP failures.

use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

use crate::config::{Config, RetryConfig};
use crate::error::{GmailError, Result};
use crate::rate_limiter::RateLimiter;

/// Decides which failures are retried and how long to wait between attempts
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_wait: Duration,
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_wait: config.base_wait(),
            retryable_statuses: config.retryable_statuses.clone(),
        }
    }

    /// A failure is retryable only when the server answered with one of the
    /// configured statuses. Network, auth and validation errors are terminal.
    pub fn is_retryable(&self, error: &GmailError) -> bool {
        error
            .status()
            .is_some_and(|status| self.retryable_statuses.contains(&status))
    }

    /// Wait before the retry that follows failed attempt `attempt` (0-based)
    ///
    /// A server-supplied Retry-After wins; otherwise `base_wait * 2^attempt`.
    /// A Retry-After too large to represent falls back to the schedule.
    pub fn backoff(&self, attempt: u32, error: &GmailError) -> Duration {
        error
            .retry_after()
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or_else(|| self.base_wait.saturating_mul(2u32.saturating_pow(attempt)))
    }
}

/// Runs API calls under the shared rate limiter with retry
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    limiter: RateLimiter,
    policy: RetryPolicy,
}

impl RequestExecutor {
    pub fn new(limiter: RateLimiter, policy: RetryPolicy) -> Self {
        Self { limiter, policy }
    }

    /// Build an executor with its own limiter from configuration
    pub fn from_config(config: &Config) -> Self {
        let limiter = RateLimiter::with_capacity(
            config.rate_limit.requests_per_second,
            config.rate_limit.capacity(),
        );
        Self::new(limiter, RetryPolicy::from_config(&config.retry))
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute one logical API call
    ///
    /// `operation` is invoked at most `max_retries + 1` times. The limiter is
    /// consulted once, before the first attempt; retries are paced only by the
    /// backoff schedule.
    ///
    /// # Errors
    /// - Terminal failures are returned as-is after the first attempt
    /// - Retryable failures that outlast the budget become
    ///   [`GmailError::RetriesExhausted`]
    pub async fn execute<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.limiter.acquire().await;

        let max_retries = self.policy.max_retries;
        let mut last_error: Option<GmailError> = None;

        for attempt in 0..=max_retries {
            let error = match operation().await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            if !self.policy.is_retryable(&error) {
                error!("Gmail API error [{}]: {}", label, error);
                return Err(error);
            }

            if attempt >= max_retries {
                error!(
                    "HTTP {} [{}] after {} retries, giving up",
                    error.status().unwrap_or_default(),
                    label,
                    max_retries
                );
                return Err(GmailError::RetriesExhausted {
                    operation: label.to_string(),
                    attempts: attempt + 1,
                    source: Box::new(error),
                });
            }

            let wait = self.policy.backoff(attempt, &error);
            warn!(
                "HTTP {} [{}], retrying in {:.1}s (attempt {}/{})",
                error.status().unwrap_or_default(),
                label,
                wait.as_secs_f64(),
                attempt + 1,
                max_retries
            );
            tokio::time::sleep(wait).await;
            last_error = Some(error);
        }

        // Every iteration returns or records an error, so only a broken loop gets here
        Err(last_error.unwrap_or_else(|| {
            GmailError::Unknown(format!("Unexpected retry loop exit [{}]", label))
        }))
    }
}
