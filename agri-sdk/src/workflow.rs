//! Two-phase disease detection
//!
//! An image is uploaded first, and the encoded image the backend hands back
//! is then sent for analysis. Both calls go to the same endpoint and are
//! retried together as one unit. Errors carry the phase they came from.

use std::fmt;
use std::time::Duration;

use serde_json::json;
use tracing::debug;

use crate::core::{ImageUpload, Operation, RequestExecutor, RequestSpec};
use crate::endpoints::Endpoint;
use crate::error::{Phase, Result, ServiceError};
use crate::models::DiseaseDiagnosis;
use crate::normalize::{normalize_disease, normalize_upload};

const UPLOAD_PATH: &str = "upload-image";
const DETECTION_PATH: &str = "disease-detection";

/// Encoded image returned by the upload phase.
///
/// Consumed by the analysis phase, so it cannot be reused across runs.
pub struct UploadToken(String);

impl UploadToken {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for UploadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UploadToken(<{} chars>)", self.0.len())
    }
}

/// Upload then analyze against one endpoint
pub struct DetectionWorkflow<'a> {
    executor: &'a dyn RequestExecutor,
    upload_timeout: Duration,
    detect_timeout: Duration,
}

impl<'a> DetectionWorkflow<'a> {
    pub fn new(executor: &'a dyn RequestExecutor, upload_timeout: Duration, detect_timeout: Duration) -> Self {
        Self {
            executor,
            upload_timeout,
            detect_timeout,
        }
    }

    /// Upload phase; every failure is tagged `Phase::Upload`
    pub async fn upload(&self, endpoint: &Endpoint, image: &ImageUpload) -> Result<UploadToken> {
        if image.is_empty() {
            return Err(ServiceError::validation("image is empty").in_phase(Phase::Upload));
        }
        let spec = RequestSpec::multipart(Operation::Upload, UPLOAD_PATH, image.clone(), self.upload_timeout);
        let raw = self
            .executor
            .execute(endpoint, &spec)
            .await
            .map_err(|e| e.in_phase(Phase::Upload))?;
        let encoded = normalize_upload(&raw).map_err(|e| e.in_phase(Phase::Upload))?;
        debug!(endpoint = %endpoint.url(), encoded_len = encoded.len(), "Image uploaded");
        Ok(UploadToken(encoded))
    }

    /// Analysis phase; every failure is tagged `Phase::Analysis`
    pub async fn analyze(&self, endpoint: &Endpoint, token: UploadToken) -> Result<DiseaseDiagnosis> {
        let spec = RequestSpec::post_json(
            Operation::Detect,
            DETECTION_PATH,
            json!({ "image_base64": token.into_inner() }),
            self.detect_timeout,
        );
        let raw = self
            .executor
            .execute(endpoint, &spec)
            .await
            .map_err(|e| e.in_phase(Phase::Analysis))?;
        normalize_disease(&raw).map_err(|e| e.in_phase(Phase::Analysis))
    }

    /// Both phases in order; the analysis phase never starts if the upload fails
    pub async fn run(&self, endpoint: &Endpoint, image: &ImageUpload) -> Result<DiseaseDiagnosis> {
        let token = self.upload(endpoint, image).await?;
        self.analyze(endpoint, token).await
    }
}
