//! reqwest-backed request executor

use std::time::Instant;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{ImageUpload, RequestBody, RequestExecutor, RequestSpec};
use crate::endpoints::Endpoint;
use crate::error::{mapping, ErrorContext, Result, ServiceError};
use crate::util::{as_millis_u64, generate_request_id, truncate_string};

/// Header carrying the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Longest body excerpt written to debug logs
const LOG_BODY_LIMIT: usize = 256;

/// Executes requests with a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
}

impl HttpExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn multipart_form(upload: &ImageUpload) -> Result<Form> {
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type)
            .map_err(|e| {
                ServiceError::validation(format!("invalid MIME type '{}': {}", upload.mime_type, e))
            })?;
        Ok(Form::new().part(upload.field_name.clone(), part))
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self, endpoint: &Endpoint, spec: &RequestSpec) -> Result<Value> {
        let request_id = generate_request_id();
        let result = self.exchange(endpoint, spec, &request_id).await;
        result.map_err(|e| {
            e.with_context(
                ErrorContext::for_operation(spec.operation.as_str())
                    .endpoint(endpoint.url())
                    .request_id(request_id),
            )
        })
    }
}

impl HttpExecutor {
    async fn exchange(&self, endpoint: &Endpoint, spec: &RequestSpec, request_id: &str) -> Result<Value> {
        let url = endpoint.join(&spec.path);
        let timeout_ms = as_millis_u64(spec.timeout);

        let mut builder = self
            .client
            .request(spec.method.clone(), &url)
            .header(REQUEST_ID_HEADER, request_id);

        builder = match &spec.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(body),
            RequestBody::Multipart(upload) => builder.multipart(Self::multipart_form(upload)?),
        };

        debug!(
            operation = %spec.operation,
            method = %spec.method,
            url = %url,
            request_id = %request_id,
            timeout_ms,
            "Sending request"
        );

        let start = Instant::now();

        // Headers and body share one budget. Dropping the future on expiry
        // abandons the connection; the socket may close later.
        let exchange = async {
            let response = builder.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = match tokio::time::timeout(spec.timeout, exchange).await {
            Ok(Ok(exchange)) => exchange,
            Ok(Err(e)) => return Err(ServiceError::transport(e, timeout_ms)),
            Err(_) => {
                return Err(ServiceError::timeout(
                    timeout_ms,
                    format!("{} {} did not respond", spec.method, url),
                ))
            }
        };

        debug!(
            operation = %spec.operation,
            url = %url,
            status = status.as_u16(),
            elapsed_ms = as_millis_u64(start.elapsed()),
            body = %truncate_string(&body, LOG_BODY_LIMIT),
            "Received response"
        );

        if !status.is_success() {
            debug!(category = mapping::classify_http_error(status), "Request rejected");
            return Err(mapping::map_http_error(status, &body));
        }

        let json: Value = serde_json::from_str(&body).map_err(|e| {
            ServiceError::malformed(format!(
                "{} returned a body that is not JSON ({}): {}",
                url,
                e,
                truncate_string(&body, 80)
            ))
        })?;

        mapping::check_envelope(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Operation;
    use crate::error::ErrorKind;
    use std::time::Duration;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn endpoint(server: &MockServer) -> Endpoint {
        Endpoint::primary(format!("{}/api", server.uri()))
    }

    #[tokio::test]
    async fn test_failure_carries_sent_request_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/dashboard-stats"))
            .and(header_exists(REQUEST_ID_HEADER))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let executor = HttpExecutor::new(Client::new());
        let spec = RequestSpec::get(Operation::Stats, "dashboard-stats", Duration::from_secs(2));
        let err = executor.execute(&endpoint(&server), &spec).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert_eq!(err.status_code(), Some(503));
        let id = err.request_id().expect("request id recorded");
        assert!(uuid::Uuid::parse_str(id).is_ok());
        assert_eq!(err.endpoint(), Some(endpoint(&server).url()));
    }

    #[tokio::test]
    async fn test_transport_timeout_reports_request_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client = Client::builder().timeout(Duration::from_millis(20)).build().unwrap();
        let executor = HttpExecutor::new(client);
        let spec = RequestSpec::get(Operation::Calendar, "crop-calendar", Duration::from_millis(1500));
        let err = executor.execute(&endpoint(&server), &spec).await.unwrap_err();

        match err.root() {
            ServiceError::Timeout { timeout_ms, .. } => assert_eq!(*timeout_ms, 1500),
            other => panic!("expected a timeout, got {:?}", other),
        }
        assert!(err.request_id().is_some());
    }
}
