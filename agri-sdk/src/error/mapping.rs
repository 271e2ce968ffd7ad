//! Error mapping for backend responses
//!
//! This module converts HTTP statuses and response envelopes from the
//! backend into the normalized ServiceError type.

use reqwest::StatusCode;
use serde_json::Value;

use super::ServiceError;

/// Message used when a `success: false` body carries no `error` text
const GENERIC_FAILURE: &str = "The server reported the request as unsuccessful";

/// Map a non-2xx HTTP response to a ServiceError
pub fn map_http_error(status: StatusCode, body: &str) -> ServiceError {
    let body = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        body.to_string()
    };
    ServiceError::server(status.as_u16(), body)
}

/// Check the `success` envelope of a 2xx body.
///
/// `success: false` becomes an ApplicationError carrying the server's
/// `error` text. Bodies without a `success` key are accepted as they are.
pub fn check_envelope(json: Value) -> Result<Value, ServiceError> {
    match json.get("success") {
        Some(Value::Bool(false)) => {
            let message = error_message_from(&json).unwrap_or_else(|| GENERIC_FAILURE.to_string());
            Err(ServiceError::application(message))
        }
        Some(Value::Bool(true)) | None => Ok(json),
        Some(other) => Err(ServiceError::malformed(format!(
            "`success` must be a boolean, got {}",
            other
        ))),
    }
}

/// Extract the server's error message from a raw body, if it is JSON
pub fn extract_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| error_message_from(&json))
}

fn error_message_from(json: &Value) -> Option<String> {
    let error = json.get("error").or_else(|| json.get("message"))?;
    match error {
        Value::String(message) => Some(message.clone()),
        Value::Object(fields) => fields
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string),
        _ => None,
    }
}

/// Helper function to classify HTTP errors by category, for log fields
pub fn classify_http_error(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "bad_request",
        401 | 403 => "unauthorized",
        404 => "not_found",
        408 => "timeout",
        413 => "payload_too_large",
        429 => "rate_limit",
        500..=599 => "server",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_false_uses_server_message() {
        let err = check_envelope(json!({"success": false, "error": "Missing nitrogen"})).unwrap_err();
        assert_eq!(err.server_message().as_deref(), Some("Missing nitrogen"));
    }

    #[test]
    fn test_envelope_false_without_message() {
        let err = check_envelope(json!({"success": false})).unwrap_err();
        assert_eq!(err.server_message().as_deref(), Some(GENERIC_FAILURE));
    }

    #[test]
    fn test_envelope_missing_success_is_accepted() {
        let body = json!({"response": "hi"});
        assert_eq!(check_envelope(body.clone()).unwrap(), body);
    }

    #[test]
    fn test_envelope_non_boolean_success() {
        let err = check_envelope(json!({"success": "yes"})).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_map_http_error() {
        let err = map_http_error(StatusCode::BAD_REQUEST, r#"{"error": "No message"}"#);
        assert_eq!(err.status_code(), Some(400));
        assert_eq!(err.server_message().as_deref(), Some("No message"));

        let err = map_http_error(StatusCode::SERVICE_UNAVAILABLE, "");
        assert!(err.to_string().contains("Service Unavailable"));
    }

    #[test]
    fn test_nested_error_object() {
        let msg = extract_error_message(r#"{"error": {"message": "model offline"}}"#);
        assert_eq!(msg.as_deref(), Some("model offline"));
        assert_eq!(extract_error_message("<html>502</html>"), None);
    }
}
