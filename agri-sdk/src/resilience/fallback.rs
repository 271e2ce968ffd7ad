//! Retry-then-fallback across endpoints
//!
//! Each endpoint gets its full retry budget before the next one is tried.
//! The first success ends the run; when every endpoint is exhausted the
//! error of the very last attempt is returned.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use super::{Attempt, AttemptOutcome, RetryConfig, RetryExecutor};
use crate::core::Operation;
use crate::endpoints::Endpoint;
use crate::error::{ErrorContext, Result, ServiceError};
use crate::services::common::ClientMetrics;

/// Sequences attempts across endpoints and retries
#[derive(Debug, Clone)]
pub struct FallbackOrchestrator {
    retry: RetryExecutor,
    metrics: Arc<ClientMetrics>,
}

impl FallbackOrchestrator {
    pub fn new(retry_config: RetryConfig, metrics: Arc<ClientMetrics>) -> Self {
        Self {
            retry: RetryExecutor::new(retry_config),
            metrics,
        }
    }

    pub fn retry_config(&self) -> &RetryConfig {
        self.retry.config()
    }

    /// Run `attempt` against `endpoints` in order.
    ///
    /// `attempt` is called once per network attempt with the endpoint to
    /// use; it should build its request from scratch each time.
    pub async fn run<T, F, Fut>(
        &self,
        operation: Operation,
        endpoints: &[Endpoint],
        mut attempt: F,
    ) -> Result<T>
    where
        F: FnMut(Endpoint) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if endpoints.is_empty() {
            return Err(ServiceError::configuration("no endpoints to try")
                .with_context(ErrorContext::for_operation(operation.as_str())));
        }

        let mut total_attempts = 0u32;
        let mut last_failure: Option<(Endpoint, ServiceError)> = None;

        for (position, endpoint) in endpoints.iter().enumerate() {
            if position > 0 {
                self.metrics.record_fallback();
                info!(
                    operation = %operation,
                    endpoint = %endpoint.url(),
                    role = %endpoint.role(),
                    "Falling back to next endpoint"
                );
            }

            let result = self
                .retry
                .execute(|number| {
                    total_attempts += 1;
                    let call = attempt(endpoint.clone());
                    let endpoint = endpoint.clone();
                    let metrics = Arc::clone(&self.metrics);
                    async move {
                        let started_at = Utc::now();
                        let start = Instant::now();
                        let result = call.await;
                        let record = Attempt {
                            operation,
                            endpoint,
                            number,
                            started_at,
                            elapsed: start.elapsed(),
                            outcome: AttemptOutcome::from_result(&result),
                        };
                        metrics.record_attempt(&record);
                        record.log();
                        result
                    }
                })
                .await;

            match result {
                Ok(value) => return Ok(value),
                Err(err) if err.is_permanent() => {
                    return Err(err.with_context(
                        ErrorContext::for_operation(operation.as_str())
                            .endpoint(endpoint.url())
                            .attempts(total_attempts),
                    ));
                }
                Err(err) => {
                    warn!(
                        operation = %operation,
                        endpoint = %endpoint.url(),
                        attempts = self.retry.config().attempts_per_endpoint(),
                        error = %err,
                        "Endpoint exhausted its retry budget"
                    );
                    last_failure = Some((endpoint.clone(), err));
                }
            }
        }

        match last_failure {
            Some((endpoint, err)) => {
                let mut context = ErrorContext::for_operation(operation.as_str())
                    .endpoint(endpoint.url())
                    .attempts(total_attempts);
                if let Some(status) = err.status_code() {
                    context = context.status_code(status);
                }
                Err(err.with_context(context))
            }
            None => Err(ServiceError::configuration("no attempt was made")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn orchestrator(max_retries: u32) -> FallbackOrchestrator {
        FallbackOrchestrator::new(
            RetryConfig {
                max_retries,
                initial_interval: Duration::from_millis(1),
                max_interval: Duration::from_millis(5),
                ..RetryConfig::default()
            },
            Arc::new(ClientMetrics::default()),
        )
    }

    fn endpoints() -> Vec<Endpoint> {
        vec![
            Endpoint::primary("https://a.example/api"),
            Endpoint::fallback("https://b.example/api"),
            Endpoint::local("http://localhost:5000/api"),
        ]
    }

    #[tokio::test]
    async fn test_short_circuits_on_first_success() {
        let calls = AtomicU32::new(0);
        let result = orchestrator(2)
            .run(Operation::Predict, &endpoints(), |endpoint| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, ServiceError>(endpoint.url().to_string()) }
            })
            .await;

        assert_eq!(result.unwrap(), "https://a.example/api");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausts_every_endpoint_and_keeps_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = orchestrator(2)
            .run(Operation::Weather, &endpoints(), |endpoint| {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err(ServiceError::network(format!("#{} at {}", n, endpoint.url()))) }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 9);
        assert!(err.to_string().contains("#9 at http://localhost:5000/api"));
        assert_eq!(err.context().and_then(|c| c.attempts), Some(9));
        assert_eq!(err.endpoint(), Some("http://localhost:5000/api"));
    }

    #[tokio::test]
    async fn test_falls_back_after_retries() {
        let calls = AtomicU32::new(0);
        let result = orchestrator(1)
            .run(Operation::Chat, &endpoints(), |endpoint| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if endpoint.url().contains("b.example") {
                        Ok("answered")
                    } else {
                        Err(ServiceError::timeout(100, "slow"))
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "answered");
        // two attempts on the primary, one on the fallback
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = orchestrator(2)
            .run(Operation::Upload, &endpoints(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ServiceError::validation("bad MIME type")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_endpoint_list() {
        let result: Result<()> = orchestrator(2)
            .run(Operation::Stats, &[], |_| async { Ok(()) })
            .await;
        assert_eq!(result.unwrap_err().kind(), crate::error::ErrorKind::Configuration);
    }
}
