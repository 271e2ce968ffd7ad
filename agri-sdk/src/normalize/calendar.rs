use serde_json::Value;

use super::{string_list, text};
use crate::error::{Result, ServiceError};
use crate::models::{
    month_name, CalendarEvent, CropCalendar, CropCalendarEntry, MonthActivities, MonthCrop,
    WeatherRecommendation,
};

fn calendar_entry(item: &Value) -> Result<CropCalendarEntry> {
    let crop = text(item, &["crop", "name"])
        .ok_or_else(|| ServiceError::malformed("crop calendar: entry without `crop`"))?;
    Ok(CropCalendarEntry {
        crop,
        emoji: text(item, &["emoji"]).unwrap_or_default(),
        season: text(item, &["season"]).unwrap_or_default(),
        planting_months: string_list(item, "plantingMonths"),
        harvest_months: string_list(item, "harvestMonths"),
        duration: text(item, &["duration"]).unwrap_or_default(),
        tips: text(item, &["tips"]).unwrap_or_default(),
        yield_estimate: text(item, &["yield", "yield_estimate"]).unwrap_or_default(),
        market_price: text(item, &["market_price", "marketPrice"]).unwrap_or_default(),
    })
}

fn calendar_events(raw: &Value) -> Result<Vec<CalendarEvent>> {
    let Some(items) = raw.get("upcoming_events") else {
        return Ok(Vec::new());
    };
    let items = items
        .as_array()
        .ok_or_else(|| ServiceError::malformed("crop calendar: `upcoming_events` is not an array"))?;

    items
        .iter()
        .map(|item| {
            let title = text(item, &["title"])
                .ok_or_else(|| ServiceError::malformed("crop calendar: event without `title`"))?;
            Ok(CalendarEvent {
                id: text(item, &["id"]).unwrap_or_else(|| title.to_lowercase().replace(' ', "_")),
                title,
                date: text(item, &["date"]).unwrap_or_default(),
                kind: text(item, &["type", "kind"]).unwrap_or_default(),
                crop: text(item, &["crop"]).unwrap_or_default(),
                description: text(item, &["description"]).unwrap_or_default(),
                emoji: text(item, &["emoji"]).unwrap_or_default(),
            })
        })
        .collect()
}

fn weather_recommendation(raw: &Value) -> Option<WeatherRecommendation> {
    let rec = raw.get("weather_recommendation").filter(|v| v.is_object())?;
    Some(WeatherRecommendation {
        title: text(rec, &["title"]).unwrap_or_default(),
        description: text(rec, &["description"])?,
        favorable: rec.get("favorable").and_then(Value::as_bool).unwrap_or(true),
    })
}

/// `{success, crop_calendar: [...], upcoming_events, seasons, months,
/// weather_recommendation, current_month, last_updated}` from `/crop-calendar`.
/// Only `crop_calendar` is required.
pub fn normalize_crop_calendar(raw: &Value) -> Result<CropCalendar> {
    let items = raw
        .get("crop_calendar")
        .and_then(Value::as_array)
        .ok_or_else(|| ServiceError::malformed("crop calendar: missing `crop_calendar` array"))?;

    Ok(CropCalendar {
        entries: items.iter().map(calendar_entry).collect::<Result<_>>()?,
        upcoming_events: calendar_events(raw)?,
        seasons: string_list(raw, "seasons"),
        months: string_list(raw, "months"),
        weather_recommendation: weather_recommendation(raw),
        current_month: text(raw, &["current_month"]),
        last_updated: text(raw, &["last_updated"]),
    })
}

fn month_crops(raw: &Value, key: &str) -> Result<Vec<MonthCrop>> {
    let Some(items) = raw.get(key) else {
        return Ok(Vec::new());
    };
    let items = items
        .as_array()
        .ok_or_else(|| ServiceError::malformed(format!("month activities: `{}` is not an array", key)))?;

    items
        .iter()
        .map(|item| {
            Ok(MonthCrop {
                crop: text(item, &["crop", "name"]).ok_or_else(|| {
                    ServiceError::malformed(format!("month activities: `{}` entry without `crop`", key))
                })?,
                emoji: text(item, &["emoji"]).unwrap_or_default(),
                duration: text(item, &["duration"]).unwrap_or_default(),
                season: text(item, &["season"]).unwrap_or_default(),
            })
        })
        .collect()
}

/// `{success, month, month_number, crops_to_plant, crops_to_harvest}` from
/// `/crop-calendar/month/{n}`. `requested` fills in fields the backend left out.
pub fn normalize_month_activities(raw: &Value, requested: u32) -> Result<MonthActivities> {
    let month_number = match raw.get("month_number").and_then(Value::as_u64) {
        Some(n) => u32::try_from(n)
            .ok()
            .filter(|n| (1..=12).contains(n))
            .ok_or_else(|| ServiceError::malformed(format!("month activities: month_number {} out of range", n)))?,
        None => requested,
    };
    let month = match text(raw, &["month"]) {
        Some(month) => month,
        None => month_name(month_number)?.to_string(),
    };

    Ok(MonthActivities {
        month,
        month_number,
        crops_to_plant: month_crops(raw, "crops_to_plant")?,
        crops_to_harvest: month_crops(raw, "crops_to_harvest")?,
    })
}
