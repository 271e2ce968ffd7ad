//! Resilience patterns for the backend client
//!
//! - Retry with exponential backoff against one endpoint
//! - Fallback across endpoints once an endpoint's retries are spent
//! - Attempt records describing every network attempt

mod fallback;
mod retry;

pub use fallback::FallbackOrchestrator;
pub use retry::{RetryConfig, RetryExecutor};

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::core::Operation;
use crate::endpoints::Endpoint;
use crate::error::{ErrorKind, Result};
use crate::util::as_millis_u64;

/// Result of one network attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure { kind: ErrorKind, detail: String },
}

impl AttemptOutcome {
    pub fn from_result<T>(result: &Result<T>) -> Self {
        match result {
            Ok(_) => AttemptOutcome::Success,
            Err(err) => AttemptOutcome::Failure {
                kind: err.kind(),
                detail: err.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success)
    }
}

/// One network attempt inside an orchestration run.
///
/// Built when the attempt finishes, logged and counted, then dropped.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub operation: Operation,
    pub endpoint: Endpoint,
    /// 1-based attempt number against this endpoint
    pub number: u32,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub outcome: AttemptOutcome,
}

impl Attempt {
    pub fn log(&self) {
        match &self.outcome {
            AttemptOutcome::Success => debug!(
                operation = %self.operation,
                endpoint = %self.endpoint.url(),
                attempt = self.number,
                elapsed_ms = as_millis_u64(self.elapsed),
                "Attempt succeeded"
            ),
            AttemptOutcome::Failure { kind, detail } => debug!(
                operation = %self.operation,
                endpoint = %self.endpoint.url(),
                attempt = self.number,
                elapsed_ms = as_millis_u64(self.elapsed),
                kind = %kind,
                error = %detail,
                "Attempt failed"
            ),
        }
    }
}
