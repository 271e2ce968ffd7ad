//! Request inputs and canonical result models
//!
//! Every operation returns one of these shapes no matter which endpoint or
//! upstream schema variant produced the data.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Soil and climate readings for a crop recommendation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropInputs {
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity, percent
    pub humidity: f64,
    pub ph: f64,
    /// Millimetres
    pub rainfall: f64,
}

impl CropInputs {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("nitrogen", self.nitrogen),
            ("phosphorus", self.phosphorus),
            ("potassium", self.potassium),
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("ph", self.ph),
            ("rainfall", self.rainfall),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ServiceError::validation(format!("{} must be a finite number", name)));
            }
        }
        if !(0.0..=100.0).contains(&self.humidity) {
            return Err(ServiceError::validation("humidity must be between 0 and 100"));
        }
        if !(0.0..=14.0).contains(&self.ph) {
            return Err(ServiceError::validation("ph must be between 0 and 14"));
        }
        Ok(())
    }
}

/// Inclusive range of days parsed from labels like "120-150 days"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRange {
    pub min_days: u32,
    pub max_days: u32,
}

impl DayRange {
    /// Parse "120-150 days", "90 days", "12-18 months" or "2 weeks"
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim().to_lowercase();
        let (numbers, unit) = label.split_once(char::is_whitespace)?;
        let per_unit = match unit.trim() {
            "day" | "days" => 1,
            "week" | "weeks" => 7,
            "month" | "months" => 30,
            _ => return None,
        };
        let (min, max) = match numbers.split_once(['-', '–']) {
            Some((a, b)) => (a.trim().parse::<u32>().ok()?, b.trim().parse::<u32>().ok()?),
            None => {
                let n = numbers.trim().parse::<u32>().ok()?;
                (n, n)
            }
        };
        if min > max {
            return None;
        }
        Some(Self {
            min_days: min.checked_mul(per_unit)?,
            max_days: max.checked_mul(per_unit)?,
        })
    }
}

/// Agronomic details of a recommended crop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropInfo {
    pub season: String,
    /// Duration label as the backend wrote it
    pub duration: String,
    pub duration_days: Option<DayRange>,
    pub yield_estimate: String,
    pub market_price: String,
    pub tips: String,
}

/// Recommended crop for a set of inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropPrediction {
    pub crop: String,
    /// Always within 0..=100
    pub confidence_pct: f64,
    pub emoji: String,
    pub info: CropInfo,
}

impl CropPrediction {
    /// Confidence as a fraction in 0..=1
    pub fn confidence(&self) -> f64 {
        self.confidence_pct / 100.0
    }
}

/// Coordinates for a weather lookup
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherQuery {
    pub latitude: f64,
    pub longitude: f64,
}

impl WeatherQuery {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ServiceError::validation("latitude must be between -90 and 90"));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ServiceError::validation("longitude must be between -180 and 180"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub condition: String,
    pub wind_kph: f64,
    pub precipitation_mm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    /// Calendar date, when the upstream gave one that parses
    pub date: Option<NaiveDate>,
    /// Label as shown to users ("Today", "2025-06-02")
    pub label: String,
    pub max_temp_c: f64,
    pub min_temp_c: f64,
    pub condition: String,
    /// Derived from current conditions rather than forecast upstream
    pub synthetic: bool,
}

/// Category of an agricultural advisory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryKind {
    HeatStress,
    ColdStress,
    FungalRisk,
    LowHumidity,
    Drainage,
    RoutineFieldWork,
    /// Written by the backend
    Upstream,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub kind: AdvisoryKind,
    pub title: String,
    pub description: String,
}

/// Which upstream weather schema a reading was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherSchema {
    /// `{weather: {temperature, humidity, description}}`
    Legacy,
    /// `{location, current, forecast, agricultural_advisory}`
    Current,
}

/// Normalized weather reading.
///
/// `forecast` always has exactly three entries and `advisories` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalWeatherReading {
    pub location: Location,
    pub current: CurrentConditions,
    pub forecast: Vec<ForecastDay>,
    pub advisories: Vec<Advisory>,
    pub schema: WeatherSchema,
}

/// A message for the farming assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concise: Option<bool>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            lang: None,
            concise: None,
        }
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn concise(mut self, concise: bool) -> Self {
        self.concise = Some(concise);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.message.trim().is_empty() {
            return Err(ServiceError::validation("message must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub lang: Option<String>,
}

/// Severity of a detected plant disease
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    /// Case-insensitive parse of the backend's severity label
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "none" | "healthy" => Some(Severity::None),
            "low" | "mild" => Some(Severity::Low),
            "medium" | "moderate" => Some(Severity::Medium),
            "high" | "severe" => Some(Severity::High),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::None => "None",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseDiagnosis {
    pub disease_name: String,
    pub confidence_pct: f64,
    pub severity: Severity,
    pub emoji: String,
    pub description: String,
    pub treatment: String,
    pub prevention: String,
}

impl DiseaseDiagnosis {
    pub fn is_healthy(&self) -> bool {
        self.severity == Severity::None
    }
}

/// One headline figure on the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatCard {
    pub value: String,
    pub growth: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_predictions: StatCard,
    pub farmers_helped: StatCard,
    pub crop_varieties: StatCard,
    pub success_rate: StatCard,
    pub last_updated: Option<String>,
}

/// Planting and harvest window of one crop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropCalendarEntry {
    pub crop: String,
    pub emoji: String,
    pub season: String,
    pub planting_months: Vec<String>,
    pub harvest_months: Vec<String>,
    pub duration: String,
    pub tips: String,
    pub yield_estimate: String,
    pub market_price: String,
}

impl CropCalendarEntry {
    pub fn plants_in(&self, month: &str) -> bool {
        self.planting_months.iter().any(|m| m.eq_ignore_ascii_case(month))
    }

    pub fn harvests_in(&self, month: &str) -> bool {
        self.harvest_months.iter().any(|m| m.eq_ignore_ascii_case(month))
    }
}

/// A dated farm task shown next to the calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    /// Free text ("This month", "Weekly")
    pub date: String,
    /// sowing, harvest, irrigation, fertilizer
    pub kind: String,
    pub crop: String,
    pub description: String,
    pub emoji: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherRecommendation {
    pub title: String,
    pub description: String,
    pub favorable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropCalendar {
    pub entries: Vec<CropCalendarEntry>,
    pub upcoming_events: Vec<CalendarEvent>,
    /// Season filter values ("All", "Kharif", ...)
    pub seasons: Vec<String>,
    /// Short month names in calendar order
    pub months: Vec<String>,
    pub weather_recommendation: Option<WeatherRecommendation>,
    pub current_month: Option<String>,
    pub last_updated: Option<String>,
}

/// A crop to plant or harvest in a given month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthCrop {
    pub crop: String,
    pub emoji: String,
    pub duration: String,
    pub season: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthActivities {
    /// Short month name ("Jun")
    pub month: String,
    /// 1..=12
    pub month_number: u32,
    pub crops_to_plant: Vec<MonthCrop>,
    pub crops_to_harvest: Vec<MonthCrop>,
}

impl MonthActivities {
    pub fn activities_count(&self) -> usize {
        self.crops_to_plant.len() + self.crops_to_harvest.len()
    }
}

/// Short month names used by the crop calendar
pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Short name of month `number` (1..=12)
pub fn month_name(number: u32) -> Result<&'static str> {
    number
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .copied()
        .ok_or_else(|| ServiceError::validation(format!("month must be 1-12, got {}", number)))
}

/// Outcome of a prediction, reported back for analytics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub crop: String,
    /// Fraction in 0..=1
    pub confidence: f64,
    pub success: bool,
}

impl PredictionRecord {
    pub fn validate(&self) -> Result<()> {
        if self.crop.trim().is_empty() {
            return Err(ServiceError::validation("crop must not be empty"));
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(ServiceError::validation("confidence must be a fraction between 0 and 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordAck {
    pub message: String,
}

/// Headline analytics figures, preformatted by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsOverview {
    pub total_predictions: StatCard,
    pub accuracy_rate: StatCard,
    pub farmers_helped: StatCard,
    pub crop_varieties: StatCard,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionalPerformance {
    pub predictions: u64,
    pub accuracy_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuccessMetrics {
    pub prediction_accuracy_pct: f64,
    pub farmer_satisfaction_pct: f64,
    pub yield_improvement_pct: f64,
    pub cost_reduction_pct: f64,
}

/// Prediction performance as aggregated from recorded outcomes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub overview: AnalyticsOverview,
    /// Keyed by state or region name
    pub regional_performance: BTreeMap<String, RegionalPerformance>,
    /// Accuracy percentage per crop
    pub crop_accuracy: BTreeMap<String, f64>,
    pub success_metrics: SuccessMetrics,
    pub last_updated: Option<String>,
}

impl AnalyticsSummary {
    /// Crop with the highest recorded accuracy
    pub fn most_accurate_crop(&self) -> Option<(&str, f64)> {
        self.crop_accuracy
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(crop, pct)| (crop.as_str(), *pct))
    }
}
