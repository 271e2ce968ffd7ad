//! Configuration management for the backend client
//!
//! This module provides utilities for loading and validating client
//! configuration, with support for environment variables.

use std::collections::HashMap;
use std::env;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;

use crate::core::Operation;
use crate::endpoints::{
    Endpoint, EndpointRegistry, EndpointRole, DEFAULT_FALLBACK_URL, DEFAULT_PRIMARY_URL,
    LOCAL_API_ENV_PREFIX,
};
use crate::error::{Result, ServiceError};
use crate::resilience::RetryConfig;
use crate::services::common::UserAgent;
use crate::util::parse_duration;

/// Longest probe timeout allowed; probes must stay cheap
pub const MAX_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Get a string configuration value
    fn get_string(&self, key: &str) -> Result<String>;
}

/// Extension methods for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    /// Get an integer configuration value
    fn get_int(&self, key: &str) -> Result<i64> {
        let value = self.get_string(key)?;
        value.trim().parse::<i64>().map_err(|e| {
            ServiceError::configuration(format!("Invalid integer for key {}: {}", key, e))
        })
    }

    /// Get a float configuration value
    fn get_float(&self, key: &str) -> Result<f64> {
        let value = self.get_string(key)?;
        value.trim().parse::<f64>().map_err(|e| {
            ServiceError::configuration(format!("Invalid float for key {}: {}", key, e))
        })
    }

    /// Get a boolean configuration value
    fn get_bool(&self, key: &str) -> Result<bool> {
        let value = self.get_string(key)?;
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(true),
            "false" | "no" | "0" | "off" => Ok(false),
            _ => Err(ServiceError::configuration(format!(
                "Invalid boolean value for key {}: {}",
                key, value
            ))),
        }
    }

    /// Get a duration; a bare number is milliseconds, units ("15s", "500ms") are accepted
    fn get_duration_ms(&self, key: &str) -> Result<Duration> {
        let value = self.get_string(key)?;
        let value = value.trim();
        if let Ok(ms) = value.parse::<u64>() {
            return Ok(Duration::from_millis(ms));
        }
        parse_duration(value).ok_or_else(|| {
            ServiceError::configuration(format!("Invalid duration for key {}: {}", key, value))
        })
    }

    /// Get a string configuration value with a default
    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.get_string(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get a value only when the key is present; a present but invalid value is an error
    fn get_optional<T>(&self, key: &str, read: impl Fn(&Self, &str) -> Result<T>) -> Result<Option<T>> {
        match self.get_string(key) {
            Ok(_) => read(self, key).map(Some),
            Err(_) => Ok(None),
        }
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    /// Optional prefix for environment variables
    prefix: Option<String>,

    /// Optional namespace for variables
    namespace: Option<String>,
}

impl EnvConfigProvider {
    /// Create a new environment variable config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prefix for environment variables
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set a namespace for environment variables
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Format a configuration key as an environment variable
    fn format_key(&self, key: &str) -> String {
        let mut env_key = String::new();

        if let Some(ref prefix) = self.prefix {
            env_key.push_str(prefix);
            env_key.push('_');
        }

        if let Some(ref namespace) = self.namespace {
            env_key.push_str(namespace);
            env_key.push('_');
        }

        env_key.push_str(&key.to_uppercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_"));

        env_key
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        let env_key = self.format_key(key);

        env::var(&env_key).map_err(|e| match e {
            env::VarError::NotPresent => {
                ServiceError::configuration(format!("Environment variable not set: {}", env_key))
            }
            env::VarError::NotUnicode(_) => ServiceError::configuration(format!(
                "Environment variable is not valid unicode: {}",
                env_key
            )),
        })
    }
}

/// In-memory config provider for testing or static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    /// Configuration values
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    /// Create a new empty memory config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a configuration value
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: ToString,
    {
        self.values.insert(key.into(), value.to_string());
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| ServiceError::configuration(format!("Configuration key not found: {}", key)))
    }
}

/// A composite config provider that tries multiple providers in order
#[derive(Default)]
pub struct CompositeConfigProvider {
    /// Ordered list of config providers to try
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl CompositeConfigProvider {
    /// Create a new composite config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider to the chain
    pub fn add_provider(&mut self, provider: impl ConfigProvider + 'static) {
        self.providers.push(Box::new(provider));
    }

    /// Builder-style variant of `add_provider`
    pub fn with_provider(mut self, provider: impl ConfigProvider + 'static) -> Self {
        self.add_provider(provider);
        self
    }
}

impl ConfigProvider for CompositeConfigProvider {
    fn get_string(&self, key: &str) -> Result<String> {
        self.providers
            .iter()
            .find_map(|provider| provider.get_string(key).ok())
            .ok_or_else(|| {
                ServiceError::configuration(format!(
                    "Configuration key not found in any provider: {}",
                    key
                ))
            })
    }
}

/// Global default configuration provider (`AGRI_*` environment variables)
pub static DEFAULT_PROVIDER: Lazy<Arc<EnvConfigProvider>> =
    Lazy::new(|| Arc::new(EnvConfigProvider::new().with_prefix("AGRI")));

/// Trait for service-specific configuration
pub trait ServiceConfig: Debug + Send + Sync {
    /// Validate this configuration
    fn validate(&self) -> Result<()>;

    /// Service name
    fn service_name(&self) -> &str;
}

/// Per-operation time budgets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationTimeouts {
    pub predict: Duration,
    pub weather: Duration,
    pub chat: Duration,
    pub upload: Duration,
    pub detect: Duration,
    pub stats: Duration,
    pub calendar: Duration,
    pub record: Duration,
    pub analytics: Duration,
}

impl Default for OperationTimeouts {
    fn default() -> Self {
        Self {
            predict: Duration::from_secs(15),
            weather: Duration::from_secs(15),
            chat: Duration::from_secs(30),
            upload: Duration::from_secs(30),
            detect: Duration::from_secs(30),
            stats: Duration::from_secs(10),
            calendar: Duration::from_secs(15),
            record: Duration::from_secs(10),
            analytics: Duration::from_secs(10),
        }
    }
}

impl OperationTimeouts {
    /// Time budget of `operation`; probes use the probe timeout instead
    pub fn for_operation(&self, operation: Operation) -> Option<Duration> {
        match operation {
            Operation::Predict => Some(self.predict),
            Operation::Weather => Some(self.weather),
            Operation::Chat => Some(self.chat),
            Operation::Upload => Some(self.upload),
            Operation::Detect => Some(self.detect),
            Operation::Stats => Some(self.stats),
            Operation::Calendar => Some(self.calendar),
            Operation::Record => Some(self.record),
            Operation::Analytics => Some(self.analytics),
            Operation::Probe => None,
        }
    }

    fn slot(&mut self, operation: Operation) -> Option<&mut Duration> {
        match operation {
            Operation::Predict => Some(&mut self.predict),
            Operation::Weather => Some(&mut self.weather),
            Operation::Chat => Some(&mut self.chat),
            Operation::Upload => Some(&mut self.upload),
            Operation::Detect => Some(&mut self.detect),
            Operation::Stats => Some(&mut self.stats),
            Operation::Calendar => Some(&mut self.calendar),
            Operation::Record => Some(&mut self.record),
            Operation::Analytics => Some(&mut self.analytics),
            Operation::Probe => None,
        }
    }

    const CONFIGURABLE: [Operation; 9] = [
        Operation::Predict,
        Operation::Weather,
        Operation::Chat,
        Operation::Upload,
        Operation::Detect,
        Operation::Stats,
        Operation::Calendar,
        Operation::Record,
        Operation::Analytics,
    ];
}

/// Configuration of the backend client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Candidate endpoints; ordered by role when the registry is built
    pub endpoints: Vec<Endpoint>,

    /// Path probed to test reachability
    pub probe_path: String,

    /// Timeout of a selection probe
    pub probe_timeout: Duration,

    /// How long a successful selection is reused (zero disables caching)
    pub probe_cache_ttl: Duration,

    /// Probe for the best endpoint before each orchestrated call
    pub probe_before_call: bool,

    /// Timeout of each probe in a network diagnostic
    pub diagnostic_timeout: Duration,

    /// Per-operation request timeouts
    pub timeouts: OperationTimeouts,

    /// Retry policy applied to each endpoint
    pub retry: RetryConfig,

    /// Simulated latency of demo responses
    pub demo_delay: Duration,

    /// User agent sent with every request
    pub user_agent: UserAgent,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: crate::endpoints::default_endpoints(),
            probe_path: "dashboard-stats".to_string(),
            probe_timeout: MAX_PROBE_TIMEOUT,
            probe_cache_ttl: Duration::from_secs(30),
            probe_before_call: true,
            diagnostic_timeout: Duration::from_secs(10),
            timeouts: OperationTimeouts::default(),
            retry: RetryConfig::default(),
            demo_delay: Duration::from_millis(1500),
            user_agent: UserAgent::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a config provider.
    ///
    /// Missing keys keep their defaults. An endpoint URL set to an empty
    /// string removes that endpoint.
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let mut config = Self::default();

        let primary = provider.get_string_or("primary_url", DEFAULT_PRIMARY_URL);
        let fallback = provider.get_string_or("fallback_url", DEFAULT_FALLBACK_URL);
        let local = provider.get_string("local_url").unwrap_or_else(|_| {
            config_rs::get_local_api_url(LOCAL_API_ENV_PREFIX)
        });

        config.endpoints = [
            (primary, EndpointRole::Primary),
            (fallback, EndpointRole::Fallback),
            (local, EndpointRole::Local),
        ]
        .into_iter()
        .filter(|(url, _)| !url.trim().is_empty())
        .map(|(url, role)| Endpoint::new(url, role))
        .collect();

        config.probe_path = provider
            .get_string_or("probe_path", &config.probe_path)
            .trim_matches('/')
            .to_string();

        if let Some(timeout) = provider.get_optional("probe_timeout_ms", |p, k| p.get_duration_ms(k))? {
            config.probe_timeout = timeout;
        }
        if let Some(ttl) = provider.get_optional("probe_cache_ttl_ms", |p, k| p.get_duration_ms(k))? {
            config.probe_cache_ttl = ttl;
        }
        if let Some(enabled) = provider.get_optional("probe_before_call", |p, k| p.get_bool(k))? {
            config.probe_before_call = enabled;
        }
        if let Some(timeout) =
            provider.get_optional("diagnostic_timeout_ms", |p, k| p.get_duration_ms(k))?
        {
            config.diagnostic_timeout = timeout;
        }

        for operation in OperationTimeouts::CONFIGURABLE {
            let key = format!("timeout_{}_ms", operation.as_str());
            if let Some(timeout) = provider.get_optional(&key, |p, k| p.get_duration_ms(k))? {
                if let Some(slot) = config.timeouts.slot(operation) {
                    *slot = timeout;
                }
            }
        }

        if let Some(retries) = provider.get_optional("max_retries", |p, k| p.get_int(k))? {
            config.retry.max_retries = u32::try_from(retries).map_err(|_| {
                ServiceError::configuration(format!("max_retries out of range: {}", retries))
            })?;
        }
        if let Some(initial) =
            provider.get_optional("initial_backoff_ms", |p, k| p.get_duration_ms(k))?
        {
            config.retry.initial_interval = initial;
        }
        if let Some(max) = provider.get_optional("max_backoff_ms", |p, k| p.get_duration_ms(k))? {
            config.retry.max_interval = max;
        }
        if let Some(multiplier) =
            provider.get_optional("backoff_multiplier", |p, k| p.get_float(k))?
        {
            config.retry.multiplier = multiplier;
        }
        if let Some(delay) = provider.get_optional("demo_delay_ms", |p, k| p.get_duration_ms(k))? {
            config.demo_delay = delay;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `AGRI_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_provider(&**DEFAULT_PROVIDER)
    }

    /// Timeout for an orchestrated operation
    pub fn timeout_for(&self, operation: Operation) -> Duration {
        self.timeouts
            .for_operation(operation)
            .unwrap_or(self.probe_timeout)
    }

    /// Build the endpoint registry described by this configuration
    pub fn registry(&self) -> Result<EndpointRegistry> {
        EndpointRegistry::new(self.endpoints.clone())
    }
}

impl ServiceConfig for ClientConfig {
    fn validate(&self) -> Result<()> {
        self.registry()?;

        if self.probe_path.trim().is_empty() {
            return Err(ServiceError::configuration("probe path is required"));
        }

        if self.probe_timeout.is_zero() || self.probe_timeout > MAX_PROBE_TIMEOUT {
            return Err(ServiceError::configuration(format!(
                "probe timeout must be between 1ms and {:?}, got {:?}",
                MAX_PROBE_TIMEOUT, self.probe_timeout
            )));
        }

        if self.diagnostic_timeout.is_zero() {
            return Err(ServiceError::configuration("diagnostic timeout must be positive"));
        }

        for operation in OperationTimeouts::CONFIGURABLE {
            if self.timeout_for(operation).is_zero() {
                return Err(ServiceError::configuration(format!(
                    "timeout for {} must be positive",
                    operation
                )));
            }
        }

        self.retry.validate()
    }

    fn service_name(&self) -> &str {
        "agri-backend"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_config_provider() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("key1", "value1");
        provider.set("key2", "123");

        assert_eq!(provider.get_string("key1").unwrap(), "value1");
        assert_eq!(provider.get_int("key2").unwrap(), 123);
        assert!(provider.get_string("key3").is_err());
    }

    #[test]
    fn test_env_config_provider_format_key() {
        let provider = EnvConfigProvider::new().with_prefix("AGRI").with_namespace("TEST");

        assert_eq!(provider.format_key("primary_url"), "AGRI_TEST_PRIMARY_URL");
        assert_eq!(provider.format_key("probe-path"), "AGRI_TEST_PROBE_PATH");
    }

    #[test]
    fn test_composite_config_provider() {
        let mut mem1 = MemoryConfigProvider::new();
        mem1.set("key1", "value1");

        let mut mem2 = MemoryConfigProvider::new();
        mem2.set("key1", "shadowed");
        mem2.set("key2", "value2");

        let provider = CompositeConfigProvider::new()
            .with_provider(mem1)
            .with_provider(mem2);

        assert_eq!(provider.get_string("key1").unwrap(), "value1");
        assert_eq!(provider.get_string("key2").unwrap(), "value2");
        assert!(provider.get_string("key3").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoints.len(), 3);
        assert_eq!(config.endpoints[0].url(), DEFAULT_PRIMARY_URL);
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
        assert_eq!(config.timeout_for(Operation::Chat), Duration::from_secs(30));
        assert_eq!(config.timeout_for(Operation::Probe), Duration::from_secs(5));
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.demo_delay, Duration::from_millis(1500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_provider_overrides() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("primary_url", "http://10.0.0.1:5000/api");
        provider.set("fallback_url", "");
        provider.set("local_url", "http://localhost:5001/api");
        provider.set("timeout_chat_ms", "45s");
        provider.set("timeout_predict_ms", "2500");
        provider.set("max_retries", "0");
        provider.set("probe_before_call", "off");
        provider.set("demo_delay_ms", "10ms");
        provider.set("timeout_analytics_ms", "3s");

        let config = ClientConfig::from_provider(&provider).unwrap();
        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.endpoints[1].role(), EndpointRole::Local);
        assert_eq!(config.timeouts.chat, Duration::from_secs(45));
        assert_eq!(config.timeouts.predict, Duration::from_millis(2500));
        assert_eq!(config.retry.max_retries, 0);
        assert!(!config.probe_before_call);
        assert_eq!(config.demo_delay, Duration::from_millis(10));
        assert_eq!(config.timeout_for(Operation::Analytics), Duration::from_secs(3));
    }

    #[test]
    fn test_invalid_values_are_configuration_errors() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("probe_timeout_ms", "9000");
        let err = ClientConfig::from_provider(&provider).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);

        let mut provider = MemoryConfigProvider::new();
        provider.set("max_retries", "lots");
        assert!(ClientConfig::from_provider(&provider).is_err());

        let mut provider = MemoryConfigProvider::new();
        provider.set("primary_url", "");
        provider.set("fallback_url", "");
        provider.set("local_url", "");
        assert!(ClientConfig::from_provider(&provider).is_err());
    }

    #[test]
    fn test_oversized_duration_is_configuration_error() {
        let mut provider = MemoryConfigProvider::new();
        provider.set("timeout_weather_ms", "18446744073709551615m");
        let err = ClientConfig::from_provider(&provider).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }
}
