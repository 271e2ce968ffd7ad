//! Retry with exponential backoff against a single endpoint
//!
//! This module provides a retry mechanism with configurable exponential backoff
//! for handling transient failures before the caller moves on to another endpoint.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use tracing::warn;

use crate::error::{Result, ServiceError};
use crate::util::as_millis_u64;

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 means a single attempt)
    pub max_retries: u32,

    /// Delay before the first retry
    pub initial_interval: Duration,

    /// Upper bound for any single delay
    pub max_interval: Duration,

    /// Multiplier applied to the delay after each retry
    pub multiplier: f64,

    /// Jitter applied to each delay (0.0 keeps delays exact)
    pub randomization_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            multiplier: 2.0,
            randomization_factor: 0.0,
        }
    }
}

impl fmt::Display for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RetryConfig {{ max_retries: {}, initial_interval: {:?}, max_interval: {:?}, multiplier: {}, randomization_factor: {} }}",
            self.max_retries,
            self.initial_interval,
            self.max_interval,
            self.multiplier,
            self.randomization_factor
        )
    }
}

impl RetryConfig {
    /// Attempts made against one endpoint before giving up on it
    pub fn attempts_per_endpoint(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.multiplier < 1.0 {
            return Err(ServiceError::configuration("retry multiplier must be at least 1.0"));
        }
        if !(0.0..=1.0).contains(&self.randomization_factor) {
            return Err(ServiceError::configuration(
                "retry randomization factor must be within 0.0..=1.0",
            ));
        }
        if self.initial_interval > self.max_interval {
            return Err(ServiceError::configuration(
                "initial retry interval exceeds the maximum interval",
            ));
        }
        Ok(())
    }
}

/// Executor for retry operations with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    /// Retry configuration
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create a new retry executor with the specified configuration
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    fn backoff(&self) -> ExponentialBackoff {
        // No elapsed-time cap: the retry count alone bounds the loop
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.config.initial_interval)
            .with_multiplier(self.config.multiplier)
            .with_max_interval(self.config.max_interval)
            .with_randomization_factor(self.config.randomization_factor)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Execute a fallible operation with retries according to the configuration.
    ///
    /// The operation receives the 1-based attempt number. The error of the
    /// final attempt is returned unchanged.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut backoff = self.backoff();
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if self.should_retry(&err) && attempt <= self.config.max_retries => {
                    let delay = backoff.next_backoff().unwrap_or(self.config.max_interval);

                    warn!(
                        attempt,
                        max_retries = self.config.max_retries,
                        backoff_ms = as_millis_u64(delay),
                        error = %err,
                        "Attempt failed, retrying"
                    );

                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Determine if an error should be retried
    fn should_retry(&self, error: &ServiceError) -> bool {
        error.is_retryable()
    }

    /// Get the current retry configuration
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_interval: Duration::from_millis(10),
            max_interval: Duration::from_millis(100),
            ..RetryConfig::default()
        }
    }

    #[tokio::test]
    async fn test_successful_operation() {
        let retry = RetryExecutor::new(fast_config(2));
        let result = retry.execute(|_| async { Ok::<_, ServiceError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_on_failure() {
        let attempt_count = Arc::new(AtomicUsize::new(0));
        let retry = RetryExecutor::new(fast_config(2));
        let counter = Arc::clone(&attempt_count);

        let result = retry
            .execute(move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ServiceError::network("Test failure"))
                    } else {
                        Ok::<_, ServiceError>(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_retry_on_validation_error() {
        let attempt_count = Arc::new(AtomicUsize::new(0));
        let retry = RetryExecutor::new(fast_config(2));
        let counter = Arc::clone(&attempt_count);

        let result: Result<()> = retry
            .execute(move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ServiceError::validation("Invalid input"))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempt_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_max_retries_exceeded_returns_last_error() {
        let retry = RetryExecutor::new(fast_config(2));

        let result: Result<()> = retry
            .execute(|attempt| async move {
                Err(ServiceError::network(format!("failure {}", attempt)))
            })
            .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("failure 3"));
    }

    #[tokio::test]
    async fn test_backoff_delays_grow() {
        let retry = RetryExecutor::new(RetryConfig {
            max_retries: 2,
            initial_interval: Duration::from_millis(40),
            max_interval: Duration::from_secs(1),
            ..RetryConfig::default()
        });

        let start = Instant::now();
        let _: Result<()> = retry
            .execute(|_| async { Err(ServiceError::timeout(10, "slow")) })
            .await;

        // 40ms + 80ms with no jitter
        assert!(start.elapsed() >= Duration::from_millis(120));
    }

    #[test]
    fn test_config_validation() {
        assert!(RetryConfig::default().validate().is_ok());
        let bad = RetryConfig {
            multiplier: 0.5,
            ..RetryConfig::default()
        };
        assert!(bad.validate().is_err());
        assert_eq!(RetryConfig::default().attempts_per_endpoint(), 3);
    }
}
