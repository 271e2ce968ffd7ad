use serde_json::Value;

use super::{confidence_pct, number, object, text};
use crate::error::{Result, ServiceError};
use crate::models::{CropInfo, CropPrediction, DayRange, DiseaseDiagnosis, Severity};

static EMPTY: Value = Value::Null;

/// `{success, prediction: {crop, confidence, emoji}, crop_info: {...}}` from `/predict`
pub fn normalize_prediction(raw: &Value) -> Result<CropPrediction> {
    let prediction = object(raw, "prediction", "prediction")?;
    let crop = text(prediction, &["crop", "name"])
        .ok_or_else(|| ServiceError::malformed("prediction: missing `crop`"))?;
    let confidence = number(prediction, &["confidence"])
        .ok_or_else(|| ServiceError::malformed("prediction: missing or non-numeric `confidence`"))?;

    // Older deployments omit crop_info entirely
    let info = match raw.get("crop_info") {
        Some(info @ Value::Object(_)) => info,
        _ => &EMPTY,
    };
    let duration = text(info, &["duration"]).unwrap_or_default();

    Ok(CropPrediction {
        crop,
        confidence_pct: confidence_pct(confidence),
        emoji: text(prediction, &["emoji"]).unwrap_or_default(),
        info: CropInfo {
            season: text(info, &["season"]).unwrap_or_default(),
            duration_days: DayRange::parse(&duration),
            duration,
            yield_estimate: text(info, &["yield", "yield_estimate"]).unwrap_or_default(),
            market_price: text(info, &["market_price", "marketPrice"]).unwrap_or_default(),
            tips: text(info, &["tips"]).unwrap_or_default(),
        },
    })
}

/// `{success, image_base64}` from `/upload-image`
pub fn normalize_upload(raw: &Value) -> Result<String> {
    match raw.get("image_base64") {
        Some(Value::String(encoded)) if !encoded.is_empty() => Ok(encoded.clone()),
        Some(_) => Err(ServiceError::malformed("upload: `image_base64` is empty or not a string")),
        None => Err(ServiceError::malformed("upload: missing `image_base64`")),
    }
}

/// `{success, disease: {...}, diagnosis: {...}}` from `/disease-detection`
pub fn normalize_disease(raw: &Value) -> Result<DiseaseDiagnosis> {
    let disease = object(raw, "disease", "disease detection")?;
    let diagnosis = match raw.get("diagnosis") {
        Some(diagnosis @ Value::Object(_)) => diagnosis,
        _ => &EMPTY,
    };

    let disease_name = text(disease, &["name"])
        .ok_or_else(|| ServiceError::malformed("disease detection: missing `name`"))?;
    let confidence = number(disease, &["confidence"])
        .ok_or_else(|| ServiceError::malformed("disease detection: missing or non-numeric `confidence`"))?;
    let severity_label = text(disease, &["severity"])
        .ok_or_else(|| ServiceError::malformed("disease detection: missing `severity`"))?;
    let severity = Severity::parse(&severity_label).ok_or_else(|| {
        ServiceError::malformed(format!("disease detection: unknown severity `{}`", severity_label))
    })?;

    Ok(DiseaseDiagnosis {
        disease_name,
        confidence_pct: confidence_pct(confidence),
        severity,
        emoji: text(disease, &["emoji"]).unwrap_or_default(),
        description: text(diagnosis, &["description"]).unwrap_or_default(),
        treatment: text(diagnosis, &["treatment"]).unwrap_or_default(),
        prevention: text(diagnosis, &["prevention"]).unwrap_or_default(),
    })
}
