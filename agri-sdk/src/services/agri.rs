//! Agri Assist backend client
//!
//! Every operation goes through the same pipeline: choose the leading
//! endpoint with a probe, run retry-then-fallback attempts, and normalize
//! the payload inside each attempt. In demo mode the pipeline is skipped
//! and fixed data is served instead.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::core::{ClientBuilder, ImageUpload, Operation, RequestExecutor, RequestSpec, ServiceClient};
use crate::demo::{fixtures, DemoMode};
use crate::endpoints::{ConnectivityProber, DiagnosticReport, Endpoint, EndpointRegistry};
use crate::error::Result;
use crate::models::{
    month_name, AnalyticsSummary, CanonicalWeatherReading, ChatReply, ChatRequest, CropCalendar,
    CropInputs, CropPrediction, DashboardStats, DiseaseDiagnosis, MonthActivities,
    PredictionRecord, RecordAck, WeatherQuery,
};
use crate::normalize::{
    normalize_analytics, normalize_chat, normalize_crop_calendar, normalize_dashboard_stats,
    normalize_month_activities, normalize_prediction, normalize_record_ack, normalize_weather,
};
use crate::resilience::FallbackOrchestrator;
use crate::services::common::ClientMetrics;
use crate::workflow::DetectionWorkflow;

/// Client for the crop prediction, weather, chat and plant disease backend.
///
/// Cheap to clone; clones share the probe cache, counters and demo switch.
#[derive(Clone)]
pub struct AgriClient {
    config: Arc<ClientConfig>,
    registry: EndpointRegistry,
    executor: Arc<dyn RequestExecutor>,
    prober: Arc<ConnectivityProber>,
    orchestrator: FallbackOrchestrator,
    demo: DemoMode,
    metrics: Arc<ClientMetrics>,
}

impl std::fmt::Debug for AgriClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgriClient")
            .field("endpoints", &self.registry.endpoints())
            .field("demo", &self.demo.is_active())
            .finish()
    }
}

impl AgriClient {
    /// Create a client configured from `AGRI_*` environment variables
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::from_env()?)
    }

    /// Create a client with an explicit configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        ClientBuilder::new().config(config).build()
    }

    /// Create a new builder for the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_parts(
        config: ClientConfig,
        executor: Arc<dyn RequestExecutor>,
        demo: DemoMode,
    ) -> Result<Self> {
        let registry = config.registry()?;
        let metrics = Arc::new(ClientMetrics::default());
        let prober = Arc::new(ConnectivityProber::new(
            Arc::clone(&executor),
            Arc::clone(&metrics),
            config.probe_path.clone(),
            config.probe_timeout,
            config.diagnostic_timeout,
            config.probe_cache_ttl,
        ));
        let orchestrator = FallbackOrchestrator::new(config.retry.clone(), Arc::clone(&metrics));

        Ok(Self {
            config: Arc::new(config),
            registry,
            executor,
            prober,
            orchestrator,
            demo,
            metrics,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Handle to this client's demo switch
    pub fn demo_mode(&self) -> &DemoMode {
        &self.demo
    }

    pub fn client_metrics(&self) -> &ClientMetrics {
        &self.metrics
    }

    /// Forget the cached endpoint selection so the next call probes again
    pub fn reset_endpoint_selection(&self) {
        self.prober.invalidate();
    }

    async fn endpoints_in_order(&self) -> Vec<Endpoint> {
        if !self.config.probe_before_call {
            return self.registry.endpoints().to_vec();
        }
        let best = self.prober.select_best_endpoint(&self.registry).await;
        self.registry.ordered_from(&best)
    }

    async fn serve_demo<T>(&self, operation: Operation, fixture: impl FnOnce() -> T) -> T {
        tokio::time::sleep(self.config.demo_delay).await;
        self.metrics.record_demo_response();
        debug!(operation = %operation, "Serving demo response");
        fixture()
    }

    /// Orchestrate one request; `build` is called afresh for every attempt
    async fn orchestrate<T, B, N>(&self, operation: Operation, build: B, normalize: N) -> Result<T>
    where
        B: Fn() -> RequestSpec,
        N: Fn(&Value) -> Result<T>,
    {
        let endpoints = self.endpoints_in_order().await;
        let executor = self.executor.as_ref();
        let normalize = &normalize;

        self.orchestrator
            .run(operation, &endpoints, move |endpoint| {
                let spec = build();
                async move {
                    let raw = executor.execute(&endpoint, &spec).await?;
                    normalize(&raw)
                }
            })
            .await
    }

    /// Recommend a crop for the given soil and climate readings
    pub async fn predict_crop(&self, inputs: &CropInputs) -> Result<CropPrediction> {
        inputs.validate()?;
        if self.demo.is_active() {
            return Ok(self.serve_demo(Operation::Predict, fixtures::prediction).await);
        }

        let body = json!({
            "nitrogen": inputs.nitrogen,
            "phosphorus": inputs.phosphorus,
            "potassium": inputs.potassium,
            "temperature": inputs.temperature,
            "humidity": inputs.humidity,
            "ph": inputs.ph,
            "rainfall": inputs.rainfall,
        });
        let timeout = self.config.timeout_for(Operation::Predict);
        self.orchestrate(
            Operation::Predict,
            || RequestSpec::post_json(Operation::Predict, "predict", body.clone(), timeout),
            normalize_prediction,
        )
        .await
    }

    /// Current conditions, a three-day forecast and advisories for a location
    pub async fn get_weather(&self, query: &WeatherQuery) -> Result<CanonicalWeatherReading> {
        query.validate()?;
        if self.demo.is_active() {
            return Ok(self.serve_demo(Operation::Weather, fixtures::weather).await);
        }

        let body = json!({ "latitude": query.latitude, "longitude": query.longitude });
        let timeout = self.config.timeout_for(Operation::Weather);
        self.orchestrate(
            Operation::Weather,
            || RequestSpec::post_json(Operation::Weather, "weather", body.clone(), timeout),
            normalize_weather,
        )
        .await
    }

    /// Ask the farming assistant a question
    pub async fn send_chat_message(&self, request: &ChatRequest) -> Result<ChatReply> {
        request.validate()?;
        if self.demo.is_active() {
            return Ok(self.serve_demo(Operation::Chat, fixtures::chat_reply).await);
        }

        let body = serde_json::to_value(request)?;
        let timeout = self.config.timeout_for(Operation::Chat);
        self.orchestrate(
            Operation::Chat,
            || RequestSpec::post_json(Operation::Chat, "chatbot", body.clone(), timeout),
            normalize_chat,
        )
        .await
    }

    /// Upload a plant photo and analyze it for disease.
    ///
    /// Upload and analysis are retried together against each endpoint.
    /// Failures carry the phase they happened in.
    pub async fn detect_disease(&self, image: ImageUpload) -> Result<DiseaseDiagnosis> {
        if self.demo.is_active() {
            return Ok(self.serve_demo(Operation::Detect, fixtures::disease).await);
        }

        let endpoints = self.endpoints_in_order().await;
        let workflow = DetectionWorkflow::new(
            self.executor.as_ref(),
            self.config.timeout_for(Operation::Upload),
            self.config.timeout_for(Operation::Detect),
        );
        let workflow = &workflow;
        let image = &image;

        self.orchestrator
            .run(Operation::Detect, &endpoints, move |endpoint| async move {
                workflow.run(&endpoint, image).await
            })
            .await
    }

    pub async fn get_dashboard_stats(&self) -> Result<DashboardStats> {
        if self.demo.is_active() {
            return Ok(self.serve_demo(Operation::Stats, fixtures::dashboard_stats).await);
        }

        let timeout = self.config.timeout_for(Operation::Stats);
        self.orchestrate(
            Operation::Stats,
            || RequestSpec::get(Operation::Stats, "dashboard-stats", timeout),
            normalize_dashboard_stats,
        )
        .await
    }

    /// Planting and harvest windows of every crop the backend knows
    pub async fn get_crop_calendar(&self) -> Result<CropCalendar> {
        if self.demo.is_active() {
            return Ok(self.serve_demo(Operation::Calendar, fixtures::crop_calendar).await);
        }

        let timeout = self.config.timeout_for(Operation::Calendar);
        self.orchestrate(
            Operation::Calendar,
            || RequestSpec::get(Operation::Calendar, "crop-calendar", timeout),
            normalize_crop_calendar,
        )
        .await
    }

    /// What to plant and harvest in `month` (1..=12)
    pub async fn get_crop_calendar_for_month(&self, month: u32) -> Result<MonthActivities> {
        month_name(month)?;
        if self.demo.is_active() {
            return self
                .serve_demo(Operation::Calendar, || fixtures::month_activities(month))
                .await;
        }

        let timeout = self.config.timeout_for(Operation::Calendar);
        let path = format!("crop-calendar/month/{}", month);
        self.orchestrate(
            Operation::Calendar,
            || RequestSpec::get(Operation::Calendar, path.clone(), timeout),
            |raw| normalize_month_activities(raw, month),
        )
        .await
    }

    /// Report the outcome of a prediction to the backend's analytics
    pub async fn record_prediction(&self, record: &PredictionRecord) -> Result<RecordAck> {
        record.validate()?;
        if self.demo.is_active() {
            return Ok(self.serve_demo(Operation::Record, fixtures::record_ack).await);
        }

        let body = serde_json::to_value(record)?;
        let timeout = self.config.timeout_for(Operation::Record);
        self.orchestrate(
            Operation::Record,
            || RequestSpec::post_json(Operation::Record, "record-prediction", body.clone(), timeout),
            normalize_record_ack,
        )
        .await
    }

    /// Prediction performance overall, per region and per crop
    pub async fn get_analytics(&self) -> Result<AnalyticsSummary> {
        if self.demo.is_active() {
            return Ok(self.serve_demo(Operation::Analytics, fixtures::analytics).await);
        }

        let timeout = self.config.timeout_for(Operation::Analytics);
        self.orchestrate(
            Operation::Analytics,
            || RequestSpec::get(Operation::Analytics, "analytics", timeout),
            normalize_analytics,
        )
        .await
    }

    /// Probe every endpoint and report reachability; never served from demo data
    pub async fn run_network_diagnostic(&self) -> DiagnosticReport {
        let report = self.prober.diagnose(&self.registry).await;
        info!(
            reachable = report.reachable_count(),
            total = report.results.len(),
            "Network diagnostic finished"
        );
        report
    }
}

#[async_trait]
impl ServiceClient for AgriClient {
    fn name(&self) -> &str {
        "agri-assist"
    }

    fn base_url(&self) -> &str {
        self.registry.primary().url()
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    async fn health_check(&self) -> Result<bool> {
        match self.prober.probe(self.registry.primary()).await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!(error = %e, "Agri backend health check failed");
                Ok(false)
            }
        }
    }

    fn metrics(&self) -> Option<HashMap<String, String>> {
        Some(self.metrics.as_map())
    }
}
