//! Error handling for the Agri SDK
//!
//! This module provides the classified error used by every operation:
//! - Categorizes failures by kind (transport, timeout, server, payload, application)
//! - Tags failures of the two-phase image workflow with the phase they occurred in
//! - Adds context (operation, endpoint, attempts) without hiding the classification
//! - Maps a classification to the guidance a caller should show

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::util::truncate_string;

pub mod mapping;

/// Result type for Agri SDK operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Longest server body kept in an error's display text
const DISPLAY_BODY_LIMIT: usize = 200;

/// Phase of the two-phase image analysis workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Uploading the image to obtain a transfer token
    Upload,
    /// Running disease detection on the uploaded image
    Analysis,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Upload => write!(f, "upload"),
            Phase::Analysis => write!(f, "analysis"),
        }
    }
}

/// Flat discriminant of a classified error, for matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NetworkUnreachable,
    Timeout,
    ServerError,
    MalformedResponse,
    ApplicationError,
    Validation,
    Configuration,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NetworkUnreachable => "network_unreachable",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ServerError => "server_error",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::ApplicationError => "application_error",
            ErrorKind::Validation => "validation",
            ErrorKind::Configuration => "configuration",
        };
        f.write_str(name)
    }
}

/// What a caller should tell the user about a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Guidance {
    /// No backend could be reached; offline demo mode is an option
    CheckConnectivity,
    /// The backend (or the client) refused the input
    InputRejected,
    /// The image reached the analyzer but no usable diagnosis came back
    AnalysisInconclusive,
    /// The backend answered but is failing
    ServiceUnavailable,
}

impl Guidance {
    /// Default user-facing text for this guidance
    pub fn message(&self) -> &'static str {
        match self {
            Guidance::CheckConnectivity => {
                "No connection to the service. Check your network or switch to demo mode."
            }
            Guidance::InputRejected => "The request was rejected. Check the values you entered.",
            Guidance::AnalysisInconclusive => {
                "The image could not be analyzed. Try a clearer photo of the affected leaf."
            }
            Guidance::ServiceUnavailable => "The service is having problems. Please try again later.",
        }
    }
}

impl fmt::Display for Guidance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Main error type for the Agri SDK
#[derive(Error, Debug)]
pub enum ServiceError {
    /// DNS, connection refused, TLS and other transport failures
    #[error("Network unreachable: {0}")]
    NetworkUnreachable(String),

    /// No response within the operation's time budget
    #[error("Request timed out after {timeout_ms}ms: {detail}")]
    Timeout { timeout_ms: u64, detail: String },

    /// Non-2xx HTTP status
    #[error("Server error {status}: {}", truncate_string(.body, DISPLAY_BODY_LIMIT))]
    ServerError { status: u16, body: String },

    /// A 2xx body that could not be read as the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The backend answered `success: false`
    #[error("Application error: {message}")]
    ApplicationError { message: String },

    /// Input rejected before any request was made
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failure inside one phase of the image workflow
    #[error("{phase} phase failed: {inner}")]
    WithPhase {
        phase: Phase,
        inner: Box<ServiceError>,
    },

    /// Errors with additional context
    #[error("{inner}")]
    WithContext {
        inner: Box<ServiceError>,
        context: ErrorContext,
    },
}

impl ServiceError {
    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        ServiceError::NetworkUnreachable(message.into())
    }

    /// Create a timeout error
    pub fn timeout(timeout_ms: u64, detail: impl Into<String>) -> Self {
        ServiceError::Timeout {
            timeout_ms,
            detail: detail.into(),
        }
    }

    /// Create a server error from an HTTP status and body
    pub fn server(status: u16, body: impl Into<String>) -> Self {
        ServiceError::ServerError {
            status,
            body: body.into(),
        }
    }

    /// Create a malformed response error
    pub fn malformed(message: impl Into<String>) -> Self {
        ServiceError::MalformedResponse(message.into())
    }

    /// Create an application error from a `success: false` body
    pub fn application(message: impl Into<String>) -> Self {
        ServiceError::ApplicationError {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        ServiceError::Configuration(message.into())
    }

    /// Tag this error with a workflow phase.
    ///
    /// An error that already carries a phase keeps it.
    pub fn in_phase(self, phase: Phase) -> Self {
        if self.phase().is_some() {
            return self;
        }
        ServiceError::WithPhase {
            phase,
            inner: Box::new(self),
        }
    }

    /// Add context to an existing error
    pub fn with_context(self, context: ErrorContext) -> Self {
        ServiceError::WithContext {
            inner: Box::new(self),
            context,
        }
    }

    /// Add a single context key/value to an existing error
    pub fn with_context_value(self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        let mut context = ErrorContext::new();
        context.add(key, value);
        self.with_context(context)
    }

    /// The innermost classified error, with phase and context stripped
    pub fn root(&self) -> &ServiceError {
        match self {
            ServiceError::WithPhase { inner, .. } | ServiceError::WithContext { inner, .. } => {
                inner.root()
            }
            other => other,
        }
    }

    /// Flat classification of the innermost error
    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            ServiceError::NetworkUnreachable(_) => ErrorKind::NetworkUnreachable,
            ServiceError::Timeout { .. } => ErrorKind::Timeout,
            ServiceError::ServerError { .. } => ErrorKind::ServerError,
            ServiceError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            ServiceError::ApplicationError { .. } => ErrorKind::ApplicationError,
            ServiceError::Validation(_) => ErrorKind::Validation,
            // root() never returns a wrapper
            ServiceError::Configuration(_)
            | ServiceError::WithPhase { .. }
            | ServiceError::WithContext { .. } => ErrorKind::Configuration,
        }
    }

    /// Workflow phase the error occurred in, if any
    pub fn phase(&self) -> Option<Phase> {
        match self {
            ServiceError::WithPhase { phase, .. } => Some(*phase),
            ServiceError::WithContext { inner, .. } => inner.phase(),
            _ => None,
        }
    }

    /// The outermost context attached to this error
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            ServiceError::WithContext { context, .. } => Some(context),
            ServiceError::WithPhase { inner, .. } => inner.context(),
            _ => None,
        }
    }

    /// Endpoint the failing request was sent to, if recorded
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            ServiceError::WithContext { inner, context } => {
                context.endpoint.as_deref().or_else(|| inner.endpoint())
            }
            ServiceError::WithPhase { inner, .. } => inner.endpoint(),
            _ => None,
        }
    }

    /// Request ID of the failing request, if recorded
    pub fn request_id(&self) -> Option<&str> {
        match self {
            ServiceError::WithContext { inner, context } => {
                context.request_id.as_deref().or_else(|| inner.request_id())
            }
            ServiceError::WithPhase { inner, .. } => inner.request_id(),
            _ => None,
        }
    }

    /// Get the HTTP status code if available
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ServiceError::ServerError { status, .. } => Some(*status),
            ServiceError::WithContext { inner, context } => {
                inner.status_code().or(context.status_code)
            }
            ServiceError::WithPhase { inner, .. } => inner.status_code(),
            _ => None,
        }
    }

    /// Message the server gave for the failure, if any
    pub fn server_message(&self) -> Option<String> {
        match self.root() {
            ServiceError::ApplicationError { message } => Some(message.clone()),
            ServiceError::ServerError { body, .. } => mapping::extract_error_message(body),
            _ => None,
        }
    }

    /// Check if this is a retryable error.
    ///
    /// Anything the network or the backend produced is worth another
    /// attempt; problems with the request itself are not.
    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Validation | ErrorKind::Configuration)
    }

    /// Check if this is a permanent error (not retryable)
    pub fn is_permanent(&self) -> bool {
        !self.is_retryable()
    }

    /// What the caller should tell the user
    pub fn guidance(&self) -> Guidance {
        let in_analysis = self.phase() == Some(Phase::Analysis);
        match self.kind() {
            ErrorKind::NetworkUnreachable | ErrorKind::Timeout => Guidance::CheckConnectivity,
            ErrorKind::Validation => Guidance::InputRejected,
            ErrorKind::Configuration => Guidance::ServiceUnavailable,
            _ if in_analysis => Guidance::AnalysisInconclusive,
            ErrorKind::ApplicationError => Guidance::InputRejected,
            ErrorKind::ServerError => match self.status_code() {
                Some(status) if (400..500).contains(&status) => Guidance::InputRejected,
                _ => Guidance::ServiceUnavailable,
            },
            ErrorKind::MalformedResponse => Guidance::ServiceUnavailable,
        }
    }
}

/// Error context information
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Operation that failed (e.g. "predict")
    pub operation: Option<String>,

    /// Time the context was recorded
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// HTTP status code if applicable
    pub status_code: Option<u16>,

    /// Request ID sent with the failing request
    pub request_id: Option<String>,

    /// Endpoint that was called
    pub endpoint: Option<String>,

    /// Network attempts made before giving up
    pub attempts: Option<u32>,

    /// Additional context data
    pub data: HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            operation: None,
            timestamp: chrono::Utc::now(),
            status_code: None,
            request_id: None,
            endpoint: None,
            attempts: None,
            data: HashMap::new(),
        }
    }
}

impl ErrorContext {
    /// Create a new error context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new error context for a specific operation
    pub fn for_operation(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Self::default()
        }
    }

    /// Add an HTTP status code
    pub fn status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Add a request ID
    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Add an endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Record the number of attempts
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }

    /// Add a context value
    pub fn add<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: fmt::Display,
    {
        self.data.insert(key.into(), value.to_string());
    }
}

impl ServiceError {
    /// Classify a reqwest failure of a request that had `timeout_ms` to complete
    pub fn transport(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            ServiceError::timeout(timeout_ms, format!("Transport timed out: {}", err))
        } else if err.is_decode() {
            ServiceError::malformed(format!("Response decode error: {}", err))
        } else if let Some(status) = err.status() {
            ServiceError::server(status.as_u16(), err.to_string())
        } else if err.is_connect() {
            ServiceError::network(format!("Connection error: {}", err))
        } else if err.is_redirect() {
            ServiceError::network(format!("Too many redirects: {}", err))
        } else {
            ServiceError::network(format!("HTTP transport error: {}", err))
        }
    }
}

/// Convert serde_json errors to ServiceError
impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::malformed(format!("JSON error: {}", err))
    }
}
