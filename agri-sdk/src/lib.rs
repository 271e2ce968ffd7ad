//! # Agri SDK
//!
//! A resilient client for the Agri Assist backend: crop prediction,
//! weather, the farming assistant chat and plant disease detection.
//!
//! This crate provides:
//!
//! - Endpoint selection across primary, fallback and local deployments
//! - Per-operation timeouts, retries with backoff and endpoint fallback
//! - Normalization of inconsistent payloads into one set of models
//! - A classified error type that tells callers how to recover
//! - An offline demo mode serving fixed responses
//!
//! ## Architecture
//!
//! - `AgriClient`: the public entry point, one method per operation
//! - `RequestExecutor`: a single HTTP exchange against one endpoint
//! - `ConnectivityProber`: picks the endpoint that leads each call
//! - `FallbackOrchestrator`: retries and falls back across endpoints
//! - `ServiceError`: the classified error every operation returns

pub mod config;
pub mod core;
pub mod demo;
pub mod endpoints;
pub mod error;
pub mod models;
pub mod normalize;
pub mod resilience;
pub mod services;
pub mod workflow;

mod util;

pub use crate::config::{ClientConfig, ConfigProvider, ServiceConfig};
pub use crate::core::{ClientBuilder, ImageUpload, Operation, RequestExecutor, RequestSpec, ServiceClient};
pub use crate::demo::{ActivationRequest, DemoMode};
pub use crate::endpoints::{DiagnosticReport, Endpoint, EndpointRegistry, EndpointRole};
pub use crate::error::{ErrorContext, ErrorKind, Guidance, Phase, Result, ServiceError};
pub use crate::models::*;
pub use crate::resilience::{FallbackOrchestrator, RetryConfig};
pub use crate::services::{AgriClient, UserAgent};

#[cfg(test)]
mod tests;

/// Create a new default client builder
pub fn client() -> ClientBuilder {
    ClientBuilder::new()
}
