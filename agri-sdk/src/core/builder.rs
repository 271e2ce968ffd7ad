//! Client builder implementation
//!
//! Provides the builder used to create and configure `AgriClient` instances.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::{HttpExecutor, RequestExecutor};
use crate::config::{ClientConfig, ServiceConfig};
use crate::demo::DemoMode;
use crate::endpoints::Endpoint;
use crate::error::Result;
use crate::resilience::RetryConfig;
use crate::services::common::{build_http_client, UserAgent};
use crate::services::AgriClient;

/// Builder for `AgriClient`
#[derive(Default)]
pub struct ClientBuilder {
    /// Base configuration; defaults when not set
    config: Option<ClientConfig>,

    /// Replaces the configured endpoints
    endpoints: Option<Vec<Endpoint>>,

    /// Replaces the configured retry policy
    retry_config: Option<RetryConfig>,

    /// Shared demo switch; a fresh one when not set
    demo_mode: Option<DemoMode>,

    /// Transport override, mainly for tests
    executor: Option<Arc<dyn RequestExecutor>>,

    /// Custom headers to include with all requests
    custom_headers: HashMap<String, String>,

    /// Replaces the configured user agent
    user_agent: Option<UserAgent>,

    /// TCP connect timeout of the HTTP client
    connect_timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Create a new client builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn endpoints(mut self, endpoints: Vec<Endpoint>) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Configure retry behavior
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = Some(config);
        self
    }

    /// Share a demo switch with other clients or the UI
    pub fn demo_mode(mut self, demo: DemoMode) -> Self {
        self.demo_mode = Some(demo);
        self
    }

    /// Send requests through `executor` instead of HTTP
    pub fn executor(mut self, executor: Arc<dyn RequestExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Add a custom header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, user_agent: UserAgent) -> Self {
        self.user_agent = Some(user_agent);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Validate the assembled configuration and build the client
    pub fn build(self) -> Result<AgriClient> {
        let mut config = self.config.unwrap_or_default();
        if let Some(endpoints) = self.endpoints {
            config.endpoints = endpoints;
        }
        if let Some(retry) = self.retry_config {
            config.retry = retry;
        }
        if let Some(user_agent) = self.user_agent {
            config.user_agent = user_agent;
        }
        config.validate()?;

        let executor = match self.executor {
            Some(executor) => executor,
            None => {
                let client = build_http_client(&config.user_agent, &self.custom_headers, self.connect_timeout)?;
                Arc::new(HttpExecutor::new(client))
            }
        };

        AgriClient::from_parts(config, executor, self.demo_mode.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_builder_overrides_config() {
        let client = ClientBuilder::new()
            .endpoints(vec![Endpoint::fallback("http://10.0.0.2:5000/api")])
            .retry_config(RetryConfig {
                max_retries: 0,
                ..RetryConfig::default()
            })
            .header("X-Farm-Id", "demo-farm")
            .build()
            .unwrap();

        assert_eq!(client.registry().len(), 1);
        assert_eq!(client.config().retry.max_retries, 0);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let err = ClientBuilder::new().endpoints(Vec::new()).build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = ClientBuilder::new()
            .header("bad header", "x")
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_shared_demo_switch() {
        let demo = DemoMode::new();
        let client = ClientBuilder::new().demo_mode(demo.clone()).build().unwrap();

        demo.request_activation().confirm();
        assert!(client.demo_mode().is_active());
    }
}
