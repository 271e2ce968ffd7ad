use std::collections::BTreeMap;

use serde_json::Value;

use super::{number, object, stat_card, text};
use crate::error::{Result, ServiceError};
use crate::models::{AnalyticsOverview, AnalyticsSummary, RegionalPerformance, SuccessMetrics};

const WHAT: &str = "analytics";

fn required(json: &Value, keys: &[&str], field: &str) -> Result<f64> {
    number(json, keys).ok_or_else(|| ServiceError::malformed(format!("{}: missing `{}`", WHAT, field)))
}

/// Entries of the object under `key`; absent means empty
fn entries<'a>(json: &'a Value, key: &str) -> Result<Vec<(&'a String, &'a Value)>> {
    match json.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(map)) => Ok(map.iter().collect()),
        Some(_) => Err(ServiceError::malformed(format!("{}: `{}` is not an object", WHAT, key))),
    }
}

fn regional_performance(analytics: &Value) -> Result<BTreeMap<String, RegionalPerformance>> {
    entries(analytics, "regional_performance")?
        .into_iter()
        .map(|(region, data)| {
            let predictions = required(data, &["predictions"], "predictions")?;
            Ok((
                region.clone(),
                RegionalPerformance {
                    predictions: predictions.max(0.0).round() as u64,
                    accuracy_pct: required(data, &["accuracy"], "accuracy")?,
                },
            ))
        })
        .collect()
}

fn crop_accuracy(analytics: &Value) -> Result<BTreeMap<String, f64>> {
    let Some(by_crop) = analytics.get("crop_accuracy").filter(|v| !v.is_null()) else {
        return Ok(BTreeMap::new());
    };
    entries(analytics, "crop_accuracy")?
        .into_iter()
        .map(|(crop, _)| {
            let pct = number(by_crop, &[crop.as_str()]).ok_or_else(|| {
                ServiceError::malformed(format!("{}: accuracy of {} is not a number", WHAT, crop))
            })?;
            Ok((crop.clone(), pct))
        })
        .collect()
}

/// `{success, analytics: {overview, regional_performance, crop_accuracy,
/// success_metrics}, last_updated}` from `/analytics`
pub fn normalize_analytics(raw: &Value) -> Result<AnalyticsSummary> {
    let analytics = object(raw, "analytics", WHAT)?;
    let overview = object(analytics, "overview", WHAT)?;
    let metrics = object(analytics, "success_metrics", WHAT)?;

    Ok(AnalyticsSummary {
        overview: AnalyticsOverview {
            total_predictions: stat_card(overview, "total_predictions", WHAT)?,
            accuracy_rate: stat_card(overview, "accuracy_rate", WHAT)?,
            farmers_helped: stat_card(overview, "farmers_helped", WHAT)?,
            crop_varieties: stat_card(overview, "crop_varieties", WHAT)?,
        },
        regional_performance: regional_performance(analytics)?,
        crop_accuracy: crop_accuracy(analytics)?,
        success_metrics: SuccessMetrics {
            prediction_accuracy_pct: required(metrics, &["prediction_accuracy"], "prediction_accuracy")?,
            farmer_satisfaction_pct: required(metrics, &["farmer_satisfaction"], "farmer_satisfaction")?,
            yield_improvement_pct: required(metrics, &["yield_improvement"], "yield_improvement")?,
            cost_reduction_pct: required(metrics, &["cost_reduction"], "cost_reduction")?,
        },
        last_updated: text(raw, &["last_updated"]).or_else(|| text(analytics, &["last_updated"])),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "success": true,
            "analytics": {
                "overview": {
                    "total_predictions": {"value": "1,248", "growth": "+23.5%"},
                    "accuracy_rate": {"value": "94.1%", "growth": "+2.3%"},
                    "farmers_helped": {"value": "892", "growth": "+18.2%"},
                    "crop_varieties": {"value": "45", "growth": "+12.0%"}
                },
                "regional_performance": {
                    "Punjab": {"predictions": 267, "accuracy": 94.5},
                    "Karnataka": {"predictions": 298, "accuracy": 93.8}
                },
                "crop_accuracy": {"Rice": 96.2, "Cotton": 92.1},
                "success_metrics": {
                    "prediction_accuracy": 94.06,
                    "farmer_satisfaction": 96.8,
                    "yield_improvement": 23.4,
                    "cost_reduction": 15.7
                }
            },
            "last_updated": "2025-06-01T10:00:00"
        })
    }

    #[test]
    fn test_normalize_analytics() {
        let summary = normalize_analytics(&payload()).unwrap();

        assert_eq!(summary.overview.total_predictions.value, "1,248");
        assert_eq!(summary.overview.accuracy_rate.growth, "+2.3%");
        assert_eq!(summary.regional_performance["Punjab"].predictions, 267);
        assert_eq!(summary.regional_performance.keys().next().map(String::as_str), Some("Karnataka"));
        assert_eq!(summary.most_accurate_crop(), Some(("Rice", 96.2)));
        assert_eq!(summary.success_metrics.cost_reduction_pct, 15.7);
        assert_eq!(summary.last_updated.as_deref(), Some("2025-06-01T10:00:00"));
    }

    #[test]
    fn test_breakdowns_are_optional() {
        let mut raw = payload();
        let analytics = raw["analytics"].as_object_mut().unwrap();
        analytics.remove("regional_performance");
        analytics.remove("crop_accuracy");

        let summary = normalize_analytics(&raw).unwrap();
        assert!(summary.regional_performance.is_empty());
        assert_eq!(summary.most_accurate_crop(), None);
    }

    #[test]
    fn test_incomplete_analytics_is_malformed() {
        let err = normalize_analytics(&json!({"success": true})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);

        let mut raw = payload();
        raw["analytics"]["success_metrics"]
            .as_object_mut()
            .unwrap()
            .remove("farmer_satisfaction");
        assert!(normalize_analytics(&raw).is_err());

        let mut raw = payload();
        raw["analytics"]["crop_accuracy"] = json!({"Rice": "high"});
        assert!(normalize_analytics(&raw).is_err());

        let mut raw = payload();
        raw["analytics"]["regional_performance"] = json!(["Punjab"]);
        assert!(normalize_analytics(&raw).is_err());
    }
}
