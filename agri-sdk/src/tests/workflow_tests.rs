//! Upload-then-analyze disease detection over HTTP

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::core::ImageUpload;
    use crate::error::{ErrorKind, Guidance, Phase};
    use crate::models::Severity;
    use crate::tests::support::client_for;

    fn image() -> ImageUpload {
        ImageUpload::jpeg(vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10])
    }

    #[tokio::test]
    async fn test_upload_failure_never_starts_analysis() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        for server in [&primary, &fallback] {
            Mock::given(method("POST"))
                .and(path("/api/upload-image"))
                .respond_with(ResponseTemplate::new(413).set_body_json(json!({"success": false, "error": "Image too large"})))
                .expect(3)
                .mount(server)
                .await;
            Mock::given(method("POST"))
                .and(path("/api/disease-detection"))
                .respond_with(ResponseTemplate::new(200))
                .expect(0)
                .mount(server)
                .await;
        }

        let client = client_for(&[&primary, &fallback]);
        let err = client.detect_disease(image()).await.unwrap_err();

        assert_eq!(err.phase(), Some(Phase::Upload));
        assert_eq!(err.status_code(), Some(413));
        assert_eq!(err.server_message().as_deref(), Some("Image too large"));
        assert_eq!(err.guidance(), Guidance::InputRejected);
    }

    #[tokio::test]
    async fn test_failed_analysis_repeats_whole_workflow() {
        let primary = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/upload-image"))
            .and(header_exists("x-request-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "image_base64": "/9j/4AAQ"})))
            .expect(3)
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/disease-detection"))
            .and(body_json(json!({"image_base64": "/9j/4AAQ"})))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .expect(3)
            .mount(&primary)
            .await;

        let client = client_for(&[&primary]);
        let err = client.detect_disease(image()).await.unwrap_err();

        assert_eq!(err.phase(), Some(Phase::Analysis));
        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert_eq!(err.guidance(), Guidance::AnalysisInconclusive);
    }

    #[tokio::test]
    async fn test_detection_succeeds() {
        let primary = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/upload-image"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "image_base64": "/9j/4AAQ"})))
            .expect(1)
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/disease-detection"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "disease": {"name": "Early Blight", "confidence": 0.78, "severity": "High", "emoji": "🍂"},
                "diagnosis": {
                    "description": "Concentric rings on older leaves.",
                    "treatment": "Remove infected leaves and apply fungicide.",
                    "prevention": "Water at the base of the plant."
                }
            })))
            .expect(1)
            .mount(&primary)
            .await;

        let client = client_for(&[&primary]);
        let diagnosis = client.detect_disease(image()).await.unwrap();

        assert_eq!(diagnosis.disease_name, "Early Blight");
        assert_eq!(diagnosis.severity, Severity::High);
        assert!((diagnosis.confidence_pct - 78.0).abs() < 1e-9);
    }
}
