//! Core abstractions for the Agri SDK
//!
//! This module provides the fundamental trait interfaces and request types:
//!
//! - `ServiceClient`: The base trait for service clients
//! - `RequestExecutor`: Performs exactly one HTTP exchange against one endpoint
//! - `RequestSpec`: What to send, where, and how long to wait
//! - `ClientBuilder`: Builder pattern for creating clients

pub mod builder;
mod http;

pub use builder::ClientBuilder;
pub use http::HttpExecutor;

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::endpoints::Endpoint;
use crate::error::Result;

/// Logical operations the client performs; each has its own timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Probe,
    Predict,
    Weather,
    Chat,
    Upload,
    Detect,
    Stats,
    Calendar,
    Record,
    Analytics,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Probe => "probe",
            Operation::Predict => "predict",
            Operation::Weather => "weather",
            Operation::Chat => "chat",
            Operation::Upload => "upload",
            Operation::Detect => "detect",
            Operation::Stats => "stats",
            Operation::Calendar => "calendar",
            Operation::Record => "record",
            Operation::Analytics => "analytics",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An image to send as a multipart upload
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
    pub field_name: String,
}

impl ImageUpload {
    /// A JPEG upload under the field name the backend expects
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            file_name: "plant_image.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            field_name: "image".to_string(),
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("field_name", &self.field_name)
            .finish()
    }
}

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(ImageUpload),
}

/// One request, built fresh for every attempt
#[derive(Debug, PartialEq)]
pub struct RequestSpec {
    pub operation: Operation,
    pub method: Method,
    pub path: String,
    pub body: RequestBody,
    pub timeout: Duration,
}

impl RequestSpec {
    pub fn get(operation: Operation, path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            operation,
            method: Method::GET,
            path: path.into(),
            body: RequestBody::Empty,
            timeout,
        }
    }

    pub fn post_json(
        operation: Operation,
        path: impl Into<String>,
        body: Value,
        timeout: Duration,
    ) -> Self {
        Self {
            operation,
            method: Method::POST,
            path: path.into(),
            body: RequestBody::Json(body),
            timeout,
        }
    }

    pub fn multipart(
        operation: Operation,
        path: impl Into<String>,
        upload: ImageUpload,
        timeout: Duration,
    ) -> Self {
        Self {
            operation,
            method: Method::POST,
            path: path.into(),
            body: RequestBody::Multipart(upload),
            timeout,
        }
    }
}

/// Base trait for service clients
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// The client name/identifier
    fn name(&self) -> &str;

    /// The base URL calls start from when nothing better is known
    fn base_url(&self) -> &str;

    /// Service version
    fn version(&self) -> &str;

    /// Health check for the service
    async fn health_check(&self) -> Result<bool>;

    /// Returns the client's counters
    fn metrics(&self) -> Option<HashMap<String, String>>;
}

/// Single-attempt execution of one request against one endpoint.
///
/// Implementations never retry and never look at other endpoints. A 2xx
/// body is returned parsed, with its `success` envelope already checked.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, endpoint: &Endpoint, spec: &RequestSpec) -> Result<Value>;
}
