//! Endpoint registry
//!
//! The backend is reachable through several base URLs: a primary cloud
//! host, a secondary cloud host and a host on the local network. The
//! registry holds them in trial order; the prober picks which one leads.

mod prober;

pub use prober::{ConnectivityProber, DiagnosticReport, EndpointStatus, ProbeOutcome};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Primary cloud deployment
pub const DEFAULT_PRIMARY_URL: &str = "https://web-production-af45d.up.railway.app/api";

/// Secondary cloud deployment
pub const DEFAULT_FALLBACK_URL: &str = "https://web-production-d6596.up.railway.app/api";

/// Environment prefix used to resolve the local-network endpoint
pub const LOCAL_API_ENV_PREFIX: &str = "AGRI_LOCAL_API";

/// Trust role of an endpoint; also its trial priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointRole {
    Primary,
    Fallback,
    Local,
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointRole::Primary => write!(f, "primary"),
            EndpointRole::Fallback => write!(f, "fallback"),
            EndpointRole::Local => write!(f, "local"),
        }
    }
}

/// One candidate base URL for the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    url: String,
    role: EndpointRole,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, role: EndpointRole) -> Self {
        let url = url.into();
        let url = url.trim().trim_end_matches('/').to_string();
        Self { url, role }
    }

    pub fn primary(url: impl Into<String>) -> Self {
        Self::new(url, EndpointRole::Primary)
    }

    pub fn fallback(url: impl Into<String>) -> Self {
        Self::new(url, EndpointRole::Fallback)
    }

    pub fn local(url: impl Into<String>) -> Self {
        Self::new(url, EndpointRole::Local)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn role(&self) -> EndpointRole {
        self.role
    }

    /// Full URL for a path below this endpoint
    pub fn join(&self, path: &str) -> String {
        format!("{}/{}", self.url, path.trim_start_matches('/'))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.url, self.role)
    }
}

/// The standard three endpoints, with the local one resolved from the environment
pub fn default_endpoints() -> Vec<Endpoint> {
    vec![
        Endpoint::primary(DEFAULT_PRIMARY_URL),
        Endpoint::fallback(DEFAULT_FALLBACK_URL),
        Endpoint::local(config_rs::get_local_api_url(LOCAL_API_ENV_PREFIX)),
    ]
}

/// Immutable, priority-ordered set of endpoints
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    endpoints: Arc<[Endpoint]>,
}

impl EndpointRegistry {
    /// Validate and order the endpoints.
    ///
    /// Endpoints are stable-sorted by role, so declaration order is kept
    /// among endpoints sharing a role.
    pub fn new(mut endpoints: Vec<Endpoint>) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(ServiceError::configuration("at least one endpoint is required"));
        }

        for endpoint in &endpoints {
            let parsed = url::Url::parse(endpoint.url()).map_err(|e| {
                ServiceError::configuration(format!("invalid endpoint URL '{}': {}", endpoint.url(), e))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ServiceError::configuration(format!(
                    "endpoint URL '{}' must use http or https",
                    endpoint.url()
                )));
            }
        }

        endpoints.sort_by_key(|e| e.role());
        Ok(Self {
            endpoints: endpoints.into(),
        })
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Never true; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// The first Primary endpoint, or the first endpoint when none is Primary
    pub fn primary(&self) -> &Endpoint {
        self.endpoints
            .iter()
            .find(|e| e.role() == EndpointRole::Primary)
            .unwrap_or(&self.endpoints[0])
    }

    pub fn contains(&self, endpoint: &Endpoint) -> bool {
        self.endpoints.iter().any(|e| e == endpoint)
    }

    /// `best` first, then every other endpoint in priority order
    pub fn ordered_from(&self, best: &Endpoint) -> Vec<Endpoint> {
        let mut ordered = Vec::with_capacity(self.endpoints.len());
        if self.contains(best) {
            ordered.push(best.clone());
        }
        ordered.extend(self.endpoints.iter().filter(|e| *e != best).cloned());
        ordered
    }
}
