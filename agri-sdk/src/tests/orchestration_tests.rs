//! Retry and fallback behavior across endpoints

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::error::{ErrorKind, Guidance};
    use crate::models::ChatRequest;
    use crate::services::AgriClient;
    use crate::tests::support::{api_url, client_for, config_for, crop_inputs, prediction_body};

    #[tokio::test]
    async fn test_every_endpoint_exhausted_in_order() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;
        let local = MockServer::start().await;

        for server in [&primary, &fallback, &local] {
            Mock::given(method("POST"))
                .and(path("/api/predict"))
                .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
                .expect(3)
                .mount(server)
                .await;
        }

        let client = client_for(&[&primary, &fallback, &local]);
        let err = client.predict_crop(&crop_inputs()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(err.guidance(), Guidance::ServiceUnavailable);
        // the reported failure is the last attempt, made against the local endpoint
        let context = err.context().expect("orchestrated errors carry context");
        assert_eq!(context.attempts, Some(9));
        assert_eq!(err.endpoint(), Some(api_url(&local).as_str()));
        assert!(err.request_id().is_some());
        assert_eq!(client.client_metrics().attempts(), 9);
    }

    #[tokio::test]
    async fn test_first_success_stops_fallback() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;
        let local = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/predict"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&primary)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/predict"))
            .and(body_json(json!({
                "nitrogen": 90.0,
                "phosphorus": 42.0,
                "potassium": 43.0,
                "temperature": 20.9,
                "humidity": 82.0,
                "ph": 6.5,
                "rainfall": 202.9
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(prediction_body()))
            .expect(1)
            .mount(&fallback)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(prediction_body()))
            .expect(0)
            .mount(&local)
            .await;

        let client = client_for(&[&primary, &fallback, &local]);
        let prediction = client.predict_crop(&crop_inputs()).await.unwrap();

        assert_eq!(prediction.crop, "Maize");
        assert_eq!(prediction.info.duration_days.map(|d| d.min_days), Some(90));
    }

    #[tokio::test]
    async fn test_success_false_surfaces_server_message() {
        let primary = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chatbot"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": false, "error": "Model is warming up"})),
            )
            .expect(3)
            .mount(&primary)
            .await;

        let client = client_for(&[&primary]);
        let err = client
            .send_chat_message(&ChatRequest::new("Which fertilizer for tomatoes?"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ApplicationError);
        assert_eq!(err.server_message().as_deref(), Some("Model is warming up"));
        assert_eq!(err.guidance(), Guidance::InputRejected);
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out_and_falls_back() {
        let slow = MockServer::start().await;
        let fast = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/dashboard-stats"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .expect(1)
            .mount(&slow)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/dashboard-stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "stats": {
                    "total_predictions": {"value": "13,550+", "growth": "+14.2%"},
                    "farmers_helped": {"value": "3,835", "growth": "+8.1%"},
                    "crop_varieties": {"value": "22", "growth": "+19.0%"},
                    "success_rate": {"value": "95.3%", "growth": "+4.4%"}
                },
                "last_updated": "2025-06-01T10:00:00"
            })))
            .expect(1)
            .mount(&fast)
            .await;

        let mut config = config_for(&[&slow, &fast]);
        config.retry.max_retries = 0;
        config.timeouts.stats = Duration::from_millis(50);
        let client = AgriClient::with_config(config).unwrap();

        let stats = client.get_dashboard_stats().await.unwrap();
        assert_eq!(stats.farmers_helped.value, "3,835");
    }

    #[tokio::test]
    async fn test_analytics_falls_back_after_failing_primary() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/analytics"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({"success": false, "error": "Failed to fetch analytics"})),
            )
            .expect(3)
            .mount(&primary)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/analytics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "analytics": {
                    "overview": {
                        "total_predictions": {"value": "1,248", "growth": "+23.5%"},
                        "accuracy_rate": {"value": "94.1%", "growth": "+2.3%"},
                        "farmers_helped": {"value": "892", "growth": "+18.2%"},
                        "crop_varieties": {"value": "45", "growth": "+12.0%"}
                    },
                    "regional_performance": {"Punjab": {"predictions": 267, "accuracy": 94.5}},
                    "crop_accuracy": {"Rice": 96.2, "Wheat": 94.8},
                    "success_metrics": {
                        "prediction_accuracy": 94.1,
                        "farmer_satisfaction": 96.8,
                        "yield_improvement": 23.4,
                        "cost_reduction": 15.7
                    }
                },
                "last_updated": "2025-06-01T10:00:00"
            })))
            .expect(1)
            .mount(&fallback)
            .await;

        let client = client_for(&[&primary, &fallback]);
        let summary = client.get_analytics().await.unwrap();

        assert_eq!(summary.overview.total_predictions.value, "1,248");
        assert_eq!(summary.regional_performance["Punjab"].predictions, 267);
        assert_eq!(summary.most_accurate_crop(), Some(("Rice", 96.2)));
        assert_eq!(client.client_metrics().attempts(), 4);
    }

    #[tokio::test]
    async fn test_unreachable_backend_suggests_connectivity_check() {
        let mut config = config_for(&[]);
        config.endpoints = vec![crate::endpoints::Endpoint::primary("http://127.0.0.1:9/api")];
        config.retry.max_retries = 1;
        let client = AgriClient::with_config(config).unwrap();

        let err = client.get_crop_calendar().await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NetworkUnreachable | ErrorKind::Timeout));
        assert_eq!(err.guidance(), Guidance::CheckConnectivity);
        assert_eq!(client.client_metrics().attempts(), 2);
    }

    #[tokio::test]
    async fn test_month_calendar_rejected_month() {
        let primary = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/crop-calendar/month/6"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "month": "Jun",
                "month_number": 6,
                "crops_to_plant": [{"crop": "Rice", "emoji": "🌾", "duration": "120-150 days", "season": "Kharif"}],
                "crops_to_harvest": []
            })))
            .expect(1)
            .mount(&primary)
            .await;

        let client = client_for(&[&primary]);
        let june = client.get_crop_calendar_for_month(6).await.unwrap();
        assert_eq!(june.crops_to_plant.len(), 1);

        let err = client.get_crop_calendar_for_month(0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
