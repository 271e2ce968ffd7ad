//! Common utilities for service clients
//!
//! This module provides the HTTP client factory and per-client counters.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::{header, Client};

use crate::error::{Result, ServiceError};
use crate::resilience::Attempt;

/// UserAgent structure for identifying the client to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgent {
    /// Application name
    pub app_name: String,

    /// Version string
    pub version: String,

    /// Optional extra info
    pub extra: Option<String>,
}

impl Default for UserAgent {
    fn default() -> Self {
        Self {
            app_name: "Agri-Assist".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            extra: Some("agri-sdk".to_string()),
        }
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_name, self.version)?;

        if let Some(ref extra) = self.extra {
            write!(f, " ({})", extra)?;
        }

        Ok(())
    }
}

/// Build a standard HTTP client with default settings.
///
/// No client-wide timeout is set; every request carries its own.
pub fn build_http_client(
    user_agent: &UserAgent,
    extra_headers: &HashMap<String, String>,
    connect_timeout: Option<Duration>,
) -> Result<Client> {
    let mut headers = header::HeaderMap::new();

    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_str(&user_agent.to_string())
            .map_err(|e| ServiceError::configuration(format!("Invalid user agent: {}", e)))?,
    );

    for (key, value) in extra_headers {
        let name = header::HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| ServiceError::configuration(format!("Invalid header name: {}", e)))?;
        let value = header::HeaderValue::from_str(value)
            .map_err(|e| ServiceError::configuration(format!("Invalid header value: {}", e)))?;
        headers.insert(name, value);
    }

    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .gzip(true);

    if let Some(timeout) = connect_timeout {
        builder = builder.connect_timeout(timeout);
    }

    builder
        .build()
        .map_err(|e| ServiceError::configuration(format!("Failed to build HTTP client: {}", e)))
}

/// Counters shared by all clones of one client
#[derive(Debug, Default)]
pub struct ClientMetrics {
    /// Network attempts made by orchestrated operations
    attempts: AtomicU64,

    /// Attempts that succeeded
    successes: AtomicU64,

    /// Attempts that failed
    failures: AtomicU64,

    /// Times an orchestration moved on to another endpoint
    fallbacks: AtomicU64,

    /// Connectivity probes sent
    probes: AtomicU64,

    /// Operations answered from demo fixtures
    demo_responses: AtomicU64,
}

impl ClientMetrics {
    pub fn record_attempt(&self, attempt: &Attempt) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        if attempt.outcome.is_success() {
            self.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_probe(&self) {
        self.probes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_demo_response(&self) {
        self.demo_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn probes(&self) -> u64 {
        self.probes.load(Ordering::Relaxed)
    }

    pub fn demo_responses(&self) -> u64 {
        self.demo_responses.load(Ordering::Relaxed)
    }

    /// Get all metrics as a map
    pub fn as_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert("attempts".to_string(), self.attempts.load(Ordering::Relaxed).to_string());
        map.insert("successes".to_string(), self.successes.load(Ordering::Relaxed).to_string());
        map.insert("failures".to_string(), self.failures.load(Ordering::Relaxed).to_string());
        map.insert("fallbacks".to_string(), self.fallbacks.load(Ordering::Relaxed).to_string());
        map.insert("probes".to_string(), self.probes.load(Ordering::Relaxed).to_string());
        map.insert("demo_responses".to_string(), self.demo_responses().to_string());

        map
    }
}
