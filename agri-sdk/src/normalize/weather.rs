//! Weather normalization
//!
//! Two upstream shapes are accepted:
//!
//! - legacy: `{success, weather: {temperature, humidity, description}}`
//! - current: `{success, location, current, forecast, agricultural_advisory}`
//!
//! Missing forecast days and advisories are synthesized from the current
//! reading. Synthesized forecast days are a display fallback, not a
//! prediction, and are flagged `synthetic`.

use chrono::{Days, Local, NaiveDate};
use serde_json::Value;

use super::{number, text};
use crate::error::{Result, ServiceError};
use crate::models::{
    Advisory, AdvisoryKind, CanonicalWeatherReading, CurrentConditions, ForecastDay, Location,
    WeatherSchema,
};

/// Forecast entries in every canonical reading
pub const FORECAST_DAYS: usize = 3;

const DEFAULT_CONDITION: &str = "clear";
const UNKNOWN_CITY: &str = "Current Location";

const HEAT_THRESHOLD_C: f64 = 35.0;
const COLD_THRESHOLD_C: f64 = 10.0;
const HUMID_THRESHOLD_PCT: f64 = 80.0;
const DRY_THRESHOLD_PCT: f64 = 40.0;

/// Normalize a weather payload using today's local date for synthesized days
pub fn normalize_weather(raw: &Value) -> Result<CanonicalWeatherReading> {
    normalize_weather_on(raw, Local::now().date_naive())
}

/// Normalize a weather payload; synthesized days count from `today`
pub fn normalize_weather_on(raw: &Value, today: NaiveDate) -> Result<CanonicalWeatherReading> {
    let (schema, location, current) = match (raw.get("current"), raw.get("weather")) {
        (Some(current @ Value::Object(_)), _) => {
            (WeatherSchema::Current, location(raw), current_conditions(current)?)
        }
        (_, Some(legacy @ Value::Object(_))) => {
            (WeatherSchema::Legacy, unknown_location(), legacy_conditions(legacy)?)
        }
        _ => {
            return Err(ServiceError::malformed(
                "weather: expected a `current` or `weather` object",
            ))
        }
    };

    let mut forecast: Vec<ForecastDay> = raw
        .get("forecast")
        .and_then(Value::as_array)
        .map(|days| {
            days.iter()
                .filter_map(|day| upstream_forecast_day(day, &current.condition, today))
                .take(FORECAST_DAYS)
                .collect()
        })
        .unwrap_or_default();

    while forecast.len() < FORECAST_DAYS {
        let days_ahead = forecast.len() as u32 + 1;
        forecast.push(synthesize_forecast_day(&current, today, days_ahead));
    }

    let mut advisories: Vec<Advisory> = raw
        .get("agricultural_advisory")
        .or_else(|| raw.get("advisories"))
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(upstream_advisory).collect())
        .unwrap_or_default();

    if advisories.is_empty() {
        advisories = synthesize_advisories(&current);
    }

    Ok(CanonicalWeatherReading {
        location,
        current,
        forecast,
        advisories,
        schema,
    })
}

fn unknown_location() -> Location {
    Location {
        city: UNKNOWN_CITY.to_string(),
        country: String::new(),
    }
}

fn location(raw: &Value) -> Location {
    match raw.get("location") {
        Some(loc @ Value::Object(_)) => Location {
            city: text(loc, &["city", "name"]).unwrap_or_else(|| UNKNOWN_CITY.to_string()),
            country: text(loc, &["country"]).unwrap_or_default(),
        },
        Some(Value::String(city)) if !city.trim().is_empty() => Location {
            city: city.trim().to_string(),
            country: String::new(),
        },
        _ => unknown_location(),
    }
}

fn required(json: &Value, keys: &[&str], what: &str) -> Result<f64> {
    number(json, keys)
        .ok_or_else(|| ServiceError::malformed(format!("weather: missing or non-numeric `{}`", what)))
}

fn current_conditions(current: &Value) -> Result<CurrentConditions> {
    Ok(CurrentConditions {
        temperature_c: required(current, &["temperature", "temp"], "temperature")?,
        humidity_pct: required(current, &["humidity"], "humidity")?,
        condition: text(current, &["condition", "description"])
            .unwrap_or_else(|| DEFAULT_CONDITION.to_string()),
        wind_kph: number(current, &["windSpeed", "wind_speed", "windKph", "wind_kph"]).unwrap_or(0.0),
        precipitation_mm: number(current, &["precipitation", "precipitation_mm", "rain"]).unwrap_or(0.0),
    })
}

fn legacy_conditions(weather: &Value) -> Result<CurrentConditions> {
    Ok(CurrentConditions {
        temperature_c: required(weather, &["temperature", "temp"], "temperature")?.round(),
        humidity_pct: required(weather, &["humidity"], "humidity")?,
        condition: text(weather, &["description", "condition"])
            .unwrap_or_else(|| DEFAULT_CONDITION.to_string()),
        wind_kph: 0.0,
        precipitation_mm: 0.0,
    })
}

fn resolve_date(label: &str, today: NaiveDate) -> Option<NaiveDate> {
    match label.trim().to_lowercase().as_str() {
        "today" => Some(today),
        "tomorrow" => today.checked_add_days(Days::new(1)),
        _ => NaiveDate::parse_from_str(label.trim(), "%Y-%m-%d").ok(),
    }
}

fn upstream_forecast_day(day: &Value, fallback_condition: &str, today: NaiveDate) -> Option<ForecastDay> {
    let max = number(day, &["maxTemp", "max_temp", "max"])?;
    let min = number(day, &["minTemp", "min_temp", "min"])?;
    let label = text(day, &["date", "day"]).unwrap_or_default();
    Some(ForecastDay {
        date: resolve_date(&label, today),
        label,
        max_temp_c: max,
        min_temp_c: min,
        condition: text(day, &["condition", "description"])
            .unwrap_or_else(|| fallback_condition.to_string()),
        synthetic: false,
    })
}

/// Display fallback for day `days_ahead` (1-based) derived from current conditions
pub fn synthesize_forecast_day(current: &CurrentConditions, today: NaiveDate, days_ahead: u32) -> ForecastDay {
    let base = current.temperature_c;
    let delta = if days_ahead == 2 { 1.0 } else { -1.0 };
    let date = today.checked_add_days(Days::new(u64::from(days_ahead)));
    ForecastDay {
        label: date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
        date,
        max_temp_c: (base + delta).round(),
        min_temp_c: (base - 5.0 - f64::from(days_ahead)).round(),
        condition: current.condition.clone(),
        synthetic: true,
    }
}

fn upstream_advisory(item: &Value) -> Option<Advisory> {
    Some(Advisory {
        kind: AdvisoryKind::Upstream,
        title: text(item, &["title"])?,
        description: text(item, &["description", "text"]).unwrap_or_default(),
    })
}

fn advisory(kind: AdvisoryKind, title: &str, description: &str) -> Advisory {
    Advisory {
        kind,
        title: title.to_string(),
        description: description.to_string(),
    }
}

/// Threshold-based advisories; never empty
pub fn synthesize_advisories(current: &CurrentConditions) -> Vec<Advisory> {
    let mut advisories = Vec::new();

    if current.temperature_c > HEAT_THRESHOLD_C {
        advisories.push(advisory(
            AdvisoryKind::HeatStress,
            "High Temperature Alert",
            "Provide shade and water more frequently.",
        ));
    } else if current.temperature_c < COLD_THRESHOLD_C {
        advisories.push(advisory(
            AdvisoryKind::ColdStress,
            "Cold Weather Warning",
            "Protect sensitive crops from frost.",
        ));
    }

    if current.humidity_pct > HUMID_THRESHOLD_PCT {
        advisories.push(advisory(
            AdvisoryKind::FungalRisk,
            "High Humidity",
            "Watch for fungal diseases; improve ventilation.",
        ));
    } else if current.humidity_pct < DRY_THRESHOLD_PCT {
        advisories.push(advisory(
            AdvisoryKind::LowHumidity,
            "Low Humidity",
            "Mulch and irrigate to retain soil moisture.",
        ));
    }

    if current.precipitation_mm > 0.0 {
        advisories.push(advisory(
            AdvisoryKind::Drainage,
            "Rain Advisory",
            "Check drainage; avoid field operations in heavy rain.",
        ));
    }

    if advisories.is_empty() {
        advisories.push(advisory(
            AdvisoryKind::RoutineFieldWork,
            "General Advice",
            "Good time for routine field work and monitoring.",
        ));
    }

    advisories
}
