//! Shared fixtures for the scenario tests

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::MockServer;

use crate::config::ClientConfig;
use crate::endpoints::{Endpoint, EndpointRole};
use crate::resilience::RetryConfig;
use crate::services::AgriClient;

const ROLES: [EndpointRole; 3] = [EndpointRole::Primary, EndpointRole::Fallback, EndpointRole::Local];

/// Base URL of a mock deployment
pub fn api_url(server: &MockServer) -> String {
    format!("{}/api", server.uri())
}

/// Config with one endpoint per server (primary, fallback, local) and
/// millisecond backoff
pub fn config_for(servers: &[&MockServer]) -> ClientConfig {
    ClientConfig {
        endpoints: servers
            .iter()
            .zip(ROLES)
            .map(|(server, role)| Endpoint::new(api_url(server), role))
            .collect(),
        probe_before_call: false,
        probe_cache_ttl: Duration::ZERO,
        demo_delay: Duration::from_millis(5),
        retry: RetryConfig {
            max_retries: 2,
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(4),
            ..RetryConfig::default()
        },
        ..ClientConfig::default()
    }
}

pub fn client_for(servers: &[&MockServer]) -> AgriClient {
    AgriClient::with_config(config_for(servers)).expect("test config is valid")
}

pub fn prediction_body() -> Value {
    json!({
        "success": true,
        "prediction": {"crop": "Maize", "confidence": 0.87, "emoji": "🌽"},
        "crop_info": {
            "season": "Kharif",
            "duration": "90-120 days",
            "yield": "5-7 tons/hectare",
            "market_price": "₹1800-2200/quintal",
            "tips": "Needs well-drained soil."
        }
    })
}

pub fn crop_inputs() -> crate::models::CropInputs {
    crate::models::CropInputs {
        nitrogen: 90.0,
        phosphorus: 42.0,
        potassium: 43.0,
        temperature: 20.9,
        humidity: 82.0,
        ph: 6.5,
        rainfall: 202.9,
    }
}
