//! Connectivity probing and network diagnostics

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{Endpoint, EndpointRegistry, EndpointRole};
use crate::core::{Operation, RequestExecutor, RequestSpec};
use crate::error::{ErrorKind, Result};
use crate::services::common::ClientMetrics;
use crate::util::{as_millis_u64, measure_time_async};

#[derive(Debug, Clone)]
struct CachedSelection {
    endpoint: Endpoint,
    selected_at: Instant,
}

/// Picks the best reachable endpoint with cheap, short-timeout probes
pub struct ConnectivityProber {
    executor: Arc<dyn RequestExecutor>,
    metrics: Arc<ClientMetrics>,
    probe_path: String,
    probe_timeout: Duration,
    diagnostic_timeout: Duration,
    cache_ttl: Duration,
    cache: Mutex<Option<CachedSelection>>,
}

impl fmt::Debug for ConnectivityProber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectivityProber")
            .field("probe_path", &self.probe_path)
            .field("probe_timeout", &self.probe_timeout)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl ConnectivityProber {
    pub fn new(
        executor: Arc<dyn RequestExecutor>,
        metrics: Arc<ClientMetrics>,
        probe_path: impl Into<String>,
        probe_timeout: Duration,
        diagnostic_timeout: Duration,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            executor,
            metrics,
            probe_path: probe_path.into(),
            probe_timeout,
            diagnostic_timeout,
            cache_ttl,
            cache: Mutex::new(None),
        }
    }

    fn cache(&self) -> MutexGuard<'_, Option<CachedSelection>> {
        // The cache holds plain data; a poisoned lock is still usable
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn cached(&self, registry: &EndpointRegistry) -> Option<Endpoint> {
        if self.cache_ttl.is_zero() {
            return None;
        }
        let cache = self.cache();
        cache
            .as_ref()
            .filter(|c| c.selected_at.elapsed() < self.cache_ttl && registry.contains(&c.endpoint))
            .map(|c| c.endpoint.clone())
    }

    /// Forget the cached selection
    pub fn invalidate(&self) {
        *self.cache() = None;
    }

    /// Send one probe to `endpoint` and report its round-trip time
    pub async fn probe(&self, endpoint: &Endpoint) -> Result<Duration> {
        self.probe_within(endpoint, self.probe_timeout).await
    }

    async fn probe_within(&self, endpoint: &Endpoint, timeout: Duration) -> Result<Duration> {
        self.metrics.record_probe();
        let spec = RequestSpec::get(Operation::Probe, self.probe_path.clone(), timeout);
        let (result, elapsed) = measure_time_async(|| self.executor.execute(endpoint, &spec)).await;
        result.map(|_| elapsed)
    }

    /// First endpoint, in priority order, whose probe succeeds.
    ///
    /// Later endpoints are not contacted once one answers. When nothing
    /// answers the primary endpoint is returned so callers still have a
    /// target; that default is not cached.
    pub async fn select_best_endpoint(&self, registry: &EndpointRegistry) -> Endpoint {
        if let Some(endpoint) = self.cached(registry) {
            debug!(endpoint = %endpoint.url(), "Using cached endpoint selection");
            return endpoint;
        }

        for endpoint in registry.endpoints() {
            match self.probe(endpoint).await {
                Ok(elapsed) => {
                    info!(
                        endpoint = %endpoint.url(),
                        role = %endpoint.role(),
                        elapsed_ms = as_millis_u64(elapsed),
                        "Selected endpoint"
                    );
                    if !self.cache_ttl.is_zero() {
                        *self.cache() = Some(CachedSelection {
                            endpoint: endpoint.clone(),
                            selected_at: Instant::now(),
                        });
                    }
                    return endpoint.clone();
                }
                Err(err) => {
                    debug!(endpoint = %endpoint.url(), error = %err, "Probe failed");
                }
            }
        }

        let primary = registry.primary().clone();
        warn!(endpoint = %primary.url(), "No endpoint answered the probe, defaulting to primary");
        primary
    }

    /// Probe every endpoint and report what each one did
    pub async fn diagnose(&self, registry: &EndpointRegistry) -> DiagnosticReport {
        let probes = registry.endpoints().iter().map(|endpoint| async move {
            let outcome = match self.probe_within(endpoint, self.diagnostic_timeout).await {
                Ok(elapsed) => ProbeOutcome::Reachable {
                    response_time_ms: as_millis_u64(elapsed),
                },
                Err(err) => ProbeOutcome::Unreachable {
                    kind: err.kind(),
                    error: err.to_string(),
                },
            };
            EndpointStatus {
                url: endpoint.url().to_string(),
                role: endpoint.role(),
                outcome,
            }
        });

        let results = join_all(probes).await;

        DiagnosticReport {
            checked_at: Utc::now(),
            probe_path: self.probe_path.clone(),
            results,
        }
    }
}

/// What a single diagnostic probe observed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Reachable {
        response_time_ms: u64,
    },
    Unreachable {
        #[serde(serialize_with = "serialize_kind")]
        kind: ErrorKind,
        error: String,
    },
}

fn serialize_kind<S: serde::Serializer>(kind: &ErrorKind, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.collect_str(kind)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointStatus {
    pub url: String,
    pub role: EndpointRole,
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
}

impl EndpointStatus {
    pub fn is_reachable(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Reachable { .. })
    }
}

/// Per-endpoint reachability at one point in time
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub checked_at: DateTime<Utc>,
    pub probe_path: String,
    pub results: Vec<EndpointStatus>,
}

impl DiagnosticReport {
    pub fn reachable_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_reachable()).count()
    }

    pub fn is_online(&self) -> bool {
        self.reachable_count() > 0
    }

    /// Highest-priority reachable endpoint
    pub fn best(&self) -> Option<&EndpointStatus> {
        self.results.iter().find(|r| r.is_reachable())
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Network diagnostic ({}) probing /{}",
            self.checked_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.probe_path
        )?;
        for status in &self.results {
            match &status.outcome {
                ProbeOutcome::Reachable { response_time_ms } => writeln!(
                    f,
                    "  [ok]   {:<8} {} ({} ms)",
                    status.role, status.url, response_time_ms
                )?,
                ProbeOutcome::Unreachable { kind, error } => writeln!(
                    f,
                    "  [fail] {:<8} {} ({}: {})",
                    status.role, status.url, kind, error
                )?,
            }
        }
        write!(
            f,
            "{} of {} endpoints reachable",
            self.reachable_count(),
            self.results.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MockRequestExecutor;
    use crate::error::ServiceError;
    use serde_json::json;

    fn registry() -> EndpointRegistry {
        EndpointRegistry::new(vec![
            Endpoint::primary("https://a.example/api"),
            Endpoint::fallback("https://b.example/api"),
            Endpoint::local("http://localhost:5000/api"),
        ])
        .unwrap()
    }

    fn prober(executor: MockRequestExecutor, ttl: Duration) -> ConnectivityProber {
        ConnectivityProber::new(
            Arc::new(executor),
            Arc::new(ClientMetrics::default()),
            "dashboard-stats",
            Duration::from_secs(5),
            Duration::from_secs(10),
            ttl,
        )
    }

    #[tokio::test]
    async fn test_first_success_stops_probing() {
        let mut executor = MockRequestExecutor::new();
        executor
            .expect_execute()
            .withf(|endpoint, spec| {
                endpoint.role() == EndpointRole::Primary
                    && spec.path == "dashboard-stats"
                    && spec.timeout <= Duration::from_secs(5)
            })
            .times(1)
            .returning(|_, _| Ok(json!({"success": true})));

        let best = prober(executor, Duration::ZERO)
            .select_best_endpoint(&registry())
            .await;
        assert_eq!(best.role(), EndpointRole::Primary);
    }

    #[tokio::test]
    async fn test_skips_unreachable_endpoints_in_order() {
        let mut executor = MockRequestExecutor::new();
        let mut seq = mockall::Sequence::new();
        executor
            .expect_execute()
            .withf(|endpoint, _| endpoint.role() == EndpointRole::Primary)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(ServiceError::network("refused")));
        executor
            .expect_execute()
            .withf(|endpoint, _| endpoint.role() == EndpointRole::Fallback)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(json!({})));

        let best = prober(executor, Duration::ZERO)
            .select_best_endpoint(&registry())
            .await;
        assert_eq!(best.url(), "https://b.example/api");
    }

    #[tokio::test]
    async fn test_defaults_to_primary_without_caching_it() {
        let mut executor = MockRequestExecutor::new();
        executor
            .expect_execute()
            .times(6)
            .returning(|_, _| Err(ServiceError::timeout(5000, "no answer")));

        let prober = prober(executor, Duration::from_secs(60));
        let registry = registry();
        assert_eq!(prober.select_best_endpoint(&registry).await.role(), EndpointRole::Primary);
        // not cached: the second selection probes everything again
        assert_eq!(prober.select_best_endpoint(&registry).await.role(), EndpointRole::Primary);
    }

    #[tokio::test]
    async fn test_selection_is_cached_within_ttl() {
        let mut executor = MockRequestExecutor::new();
        executor
            .expect_execute()
            .times(1)
            .returning(|_, _| Ok(json!({"success": true})));

        let prober = prober(executor, Duration::from_secs(60));
        let registry = registry();
        prober.select_best_endpoint(&registry).await;
        let again = prober.select_best_endpoint(&registry).await;
        assert_eq!(again.role(), EndpointRole::Primary);
    }

    #[tokio::test]
    async fn test_diagnose_reports_every_endpoint() {
        let mut executor = MockRequestExecutor::new();
        executor
            .expect_execute()
            .withf(|_, spec| spec.timeout == Duration::from_secs(10))
            .times(3)
            .returning(|endpoint, _| {
                if endpoint.role() == EndpointRole::Local {
                    Ok(json!({"success": true}))
                } else {
                    Err(ServiceError::network("dns failure"))
                }
            });

        let report = prober(executor, Duration::ZERO).diagnose(&registry()).await;
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.reachable_count(), 1);
        assert_eq!(report.best().map(|s| s.role), Some(EndpointRole::Local));
        assert!(report.to_string().contains("1 of 3 endpoints reachable"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["results"][0]["status"], "unreachable");
        assert_eq!(json["results"][0]["kind"], "network_unreachable");
    }
}
