//! Response normalization
//!
//! Backend deployments disagree on field names and on which optional
//! fields they send. These functions turn any known variant into the
//! canonical models, or fail with `MalformedResponse`.

mod analytics;
mod calendar;
mod prediction;
mod weather;

pub use analytics::normalize_analytics;
pub use calendar::{normalize_crop_calendar, normalize_month_activities};
pub use prediction::{normalize_disease, normalize_prediction, normalize_upload};
pub use weather::{normalize_weather, normalize_weather_on, synthesize_advisories, synthesize_forecast_day};

use serde_json::Value;

use crate::error::{Result, ServiceError};
use crate::models::{ChatReply, DashboardStats, RecordAck, StatCard};

/// First numeric value among `keys`; numeric strings are accepted
pub(crate) fn number(json: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match json.get(*key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    })
    .filter(|n| n.is_finite())
}

/// First non-empty string among `keys`
pub(crate) fn text(json: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match json.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Object stored under `key`, or a MalformedResponse naming it
pub(crate) fn object<'a>(json: &'a Value, key: &str, what: &str) -> Result<&'a Value> {
    match json.get(key) {
        Some(value @ Value::Object(_)) => Ok(value),
        Some(_) => Err(ServiceError::malformed(format!("{}: `{}` is not an object", what, key))),
        None => Err(ServiceError::malformed(format!("{}: missing `{}`", what, key))),
    }
}

/// Strings of the array under `key`; absent means empty
pub(crate) fn string_list(json: &Value, key: &str) -> Vec<String> {
    json.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Confidence as a percentage in 0..=100; values up to 1 are read as fractions
pub(crate) fn confidence_pct(raw: f64) -> f64 {
    let pct = if raw <= 1.0 { raw * 100.0 } else { raw };
    pct.clamp(0.0, 100.0)
}

/// `{success, response, lang?}` from `/chatbot`
pub fn normalize_chat(raw: &Value) -> Result<ChatReply> {
    let response = text(raw, &["response", "reply", "message"])
        .ok_or_else(|| ServiceError::malformed("chat reply: missing `response`"))?;
    Ok(ChatReply {
        response,
        lang: text(raw, &["lang", "language"]),
    })
}

/// `{value, growth}` card under `key`; `what` names the payload in errors
fn stat_card(stats: &Value, key: &str, what: &str) -> Result<StatCard> {
    let card = object(stats, key, what)?;
    Ok(StatCard {
        value: text(card, &["value"])
            .ok_or_else(|| ServiceError::malformed(format!("{}: `{}` has no value", what, key)))?,
        growth: text(card, &["growth"]).unwrap_or_default(),
    })
}

const WHAT_STATS: &str = "dashboard stats";

/// `{success, stats: {...}, last_updated}` from `/dashboard-stats`
pub fn normalize_dashboard_stats(raw: &Value) -> Result<DashboardStats> {
    let stats = object(raw, "stats", WHAT_STATS)?;
    Ok(DashboardStats {
        total_predictions: stat_card(stats, "total_predictions", WHAT_STATS)?,
        farmers_helped: stat_card(stats, "farmers_helped", WHAT_STATS)?,
        crop_varieties: stat_card(stats, "crop_varieties", WHAT_STATS)?,
        success_rate: stat_card(stats, "success_rate", WHAT_STATS)?,
        last_updated: text(raw, &["last_updated"]),
    })
}

/// `{success, message}` from `/record-prediction`
pub fn normalize_record_ack(raw: &Value) -> Result<RecordAck> {
    Ok(RecordAck {
        message: text(raw, &["message"]).unwrap_or_else(|| "Prediction recorded".to_string()),
    })
}
