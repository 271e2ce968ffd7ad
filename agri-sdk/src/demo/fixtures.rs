//! Fixed responses served in demo mode

use std::collections::BTreeMap;

use chrono::{Datelike, Days, Local, NaiveDate, Utc};

use crate::error::Result;
use crate::models::{
    month_name, Advisory, AdvisoryKind, AnalyticsOverview, AnalyticsSummary, CalendarEvent,
    CanonicalWeatherReading, ChatReply, CropCalendar, CropCalendarEntry, CropInfo, CropPrediction,
    CurrentConditions, DashboardStats, DayRange, DiseaseDiagnosis, ForecastDay, Location,
    MonthActivities, MonthCrop, RecordAck, RegionalPerformance, Severity, StatCard,
    SuccessMetrics, WeatherRecommendation, WeatherSchema, MONTH_NAMES,
};

const DEMO_GREETING: &str = "Hello! I'm your AI farming assistant. Based on current conditions, \
I recommend checking soil moisture levels and considering organic fertilizers for better crop \
health. How can I help you today?";

pub fn prediction() -> CropPrediction {
    CropPrediction {
        crop: "Rice".to_string(),
        confidence_pct: 92.0,
        emoji: "🌾".to_string(),
        info: CropInfo {
            season: "Kharif".to_string(),
            duration: "120-150 days".to_string(),
            duration_days: DayRange::parse("120-150 days"),
            yield_estimate: "4-6 tons/hectare".to_string(),
            market_price: "₹18-22 per kg".to_string(),
            tips: "Ensure proper water management during flowering stage. Apply nitrogen \
                   fertilizer in split doses for better yield."
                .to_string(),
        },
    }
}

fn forecast_day(today: NaiveDate, offset: u64, label: &str, max: f64, min: f64, condition: &str) -> ForecastDay {
    ForecastDay {
        date: today.checked_add_days(Days::new(offset)),
        label: label.to_string(),
        max_temp_c: max,
        min_temp_c: min,
        condition: condition.to_string(),
        synthetic: false,
    }
}

pub fn weather() -> CanonicalWeatherReading {
    weather_on(Local::now().date_naive())
}

pub fn weather_on(today: NaiveDate) -> CanonicalWeatherReading {
    CanonicalWeatherReading {
        location: Location {
            city: "Pune".to_string(),
            country: "India".to_string(),
        },
        current: CurrentConditions {
            temperature_c: 28.0,
            humidity_pct: 65.0,
            condition: "Partly Cloudy".to_string(),
            wind_kph: 12.0,
            precipitation_mm: 0.0,
        },
        forecast: vec![
            forecast_day(today, 0, "Today", 32.0, 24.0, "Sunny"),
            forecast_day(today, 1, "Tomorrow", 30.0, 22.0, "Cloudy"),
            forecast_day(today, 2, "Day After", 31.0, 23.0, "Partly Cloudy"),
        ],
        advisories: vec![Advisory {
            kind: AdvisoryKind::Upstream,
            title: "Irrigation Advisory".to_string(),
            description: "Good conditions for field activities. Light irrigation recommended."
                .to_string(),
        }],
        schema: WeatherSchema::Current,
    }
}

pub fn chat_reply() -> ChatReply {
    ChatReply {
        response: DEMO_GREETING.to_string(),
        lang: None,
    }
}

pub fn disease() -> DiseaseDiagnosis {
    DiseaseDiagnosis {
        disease_name: "Healthy Plant".to_string(),
        confidence_pct: 95.0,
        severity: Severity::None,
        emoji: "✅".to_string(),
        description: "Your plant appears to be healthy with no signs of disease.".to_string(),
        treatment: "Continue current care routine.".to_string(),
        prevention: "Maintain proper watering and ensure good air circulation.".to_string(),
    }
}

fn card(value: &str, growth: &str) -> StatCard {
    StatCard {
        value: value.to_string(),
        growth: growth.to_string(),
    }
}

pub fn dashboard_stats() -> DashboardStats {
    DashboardStats {
        total_predictions: card("1,247", "+23%"),
        farmers_helped: card("892", "+18%"),
        crop_varieties: card("45", "+12%"),
        success_rate: card("94.2%", "+5%"),
        last_updated: Some(Utc::now().to_rfc3339()),
    }
}

fn months(names: &[&str]) -> Vec<String> {
    names.iter().map(|m| m.to_string()).collect()
}

fn calendar_entries() -> Vec<CropCalendarEntry> {
    vec![
        CropCalendarEntry {
            crop: "Rice".to_string(),
            emoji: "🌾".to_string(),
            season: "Kharif".to_string(),
            planting_months: months(&["Jun", "Jul", "Aug"]),
            harvest_months: months(&["Oct", "Nov", "Dec"]),
            duration: "120-150 days".to_string(),
            tips: "Plant during monsoon. Requires flooded fields.".to_string(),
            yield_estimate: "3-4 tons/hectare".to_string(),
            market_price: "₹2000-2500/quintal".to_string(),
        },
        CropCalendarEntry {
            crop: "Wheat".to_string(),
            emoji: "🌾".to_string(),
            season: "Rabi".to_string(),
            planting_months: months(&["Nov", "Dec", "Jan"]),
            harvest_months: months(&["Mar", "Apr", "May"]),
            duration: "120-150 days".to_string(),
            tips: "Plant in winter. Requires cool weather for growth.".to_string(),
            yield_estimate: "2-3 tons/hectare".to_string(),
            market_price: "₹2100-2600/quintal".to_string(),
        },
    ]
}

fn event(id: &str, title: &str, date: &str, kind: &str, crop: &str, description: &str, emoji: &str) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        title: title.to_string(),
        date: date.to_string(),
        kind: kind.to_string(),
        crop: crop.to_string(),
        description: description.to_string(),
        emoji: emoji.to_string(),
    }
}

/// Sowing and harvest events of `month` followed by the recurring tasks
fn upcoming_events(entries: &[CropCalendarEntry], month: &str) -> Vec<CalendarEvent> {
    let mut events = Vec::new();
    for entry in entries {
        let id = entry.crop.to_lowercase();
        if entry.plants_in(month) {
            events.push(event(
                &format!("plant_{}", id),
                &format!("{} Planting", entry.crop),
                "This month",
                "sowing",
                &entry.crop,
                &format!("Optimal time for {} planting in {} season", id, entry.season),
                &entry.emoji,
            ));
        }
        if entry.harvests_in(month) {
            events.push(event(
                &format!("harvest_{}", id),
                &format!("{} Harvest", entry.crop),
                "This month",
                "harvest",
                &entry.crop,
                &format!("Harvest time for {} crop", id),
                &entry.emoji,
            ));
        }
    }
    events.push(event(
        "irrigation_check",
        "Irrigation System Check",
        "Weekly",
        "irrigation",
        "All crops",
        "Regular check of irrigation systems and water supply",
        "💧",
    ));
    events.push(event(
        "fertilizer_application",
        "Fertilizer Application",
        "Monthly",
        "fertilizer",
        "Active crops",
        "Apply appropriate fertilizers based on crop growth stage",
        "🌱",
    ));
    events
}

pub fn crop_calendar() -> CropCalendar {
    let now = Local::now();
    let entries = calendar_entries();
    let current_month = month_name(now.month()).ok();
    CropCalendar {
        upcoming_events: current_month
            .map(|month| upcoming_events(&entries, month))
            .unwrap_or_default(),
        entries,
        seasons: months(&["All", "Kharif", "Rabi", "Zaid"]),
        months: months(&MONTH_NAMES),
        weather_recommendation: Some(WeatherRecommendation {
            title: "Weather-Based Recommendations".to_string(),
            description: "Current conditions are favorable for field activities. Monitor weather \
                          forecasts for planning."
                .to_string(),
            favorable: true,
        }),
        current_month: current_month.map(str::to_string),
        last_updated: Some(now.to_rfc3339()),
    }
}

fn month_crop(entry: &CropCalendarEntry) -> MonthCrop {
    MonthCrop {
        crop: entry.crop.clone(),
        emoji: entry.emoji.clone(),
        duration: entry.duration.clone(),
        season: entry.season.clone(),
    }
}

/// Planting and harvest activities of the demo calendar for `month` (1..=12)
pub fn month_activities(month: u32) -> Result<MonthActivities> {
    let name = month_name(month)?;
    let entries = calendar_entries();
    Ok(MonthActivities {
        month: name.to_string(),
        month_number: month,
        crops_to_plant: entries.iter().filter(|e| e.plants_in(name)).map(month_crop).collect(),
        crops_to_harvest: entries.iter().filter(|e| e.harvests_in(name)).map(month_crop).collect(),
    })
}

pub fn analytics() -> AnalyticsSummary {
    let regions = [
        ("Maharashtra", 342, 95.1),
        ("Karnataka", 298, 93.8),
        ("Punjab", 267, 94.5),
        ("Uttar Pradesh", 340, 93.2),
    ];
    let crops = [
        ("Rice", 96.2),
        ("Wheat", 94.8),
        ("Cotton", 92.1),
        ("Sugarcane", 95.5),
        ("Maize", 93.7),
    ];

    AnalyticsSummary {
        overview: AnalyticsOverview {
            total_predictions: card("1,247", "+23.5%"),
            accuracy_rate: card("94.2%", "+2.3%"),
            farmers_helped: card("892", "+18.2%"),
            crop_varieties: card("45", "+12.0%"),
        },
        regional_performance: regions
            .into_iter()
            .map(|(region, predictions, accuracy_pct)| {
                (region.to_string(), RegionalPerformance { predictions, accuracy_pct })
            })
            .collect::<BTreeMap<_, _>>(),
        crop_accuracy: crops
            .into_iter()
            .map(|(crop, pct)| (crop.to_string(), pct))
            .collect(),
        success_metrics: SuccessMetrics {
            prediction_accuracy_pct: 94.2,
            farmer_satisfaction_pct: 96.8,
            yield_improvement_pct: 23.4,
            cost_reduction_pct: 15.7,
        },
        last_updated: Some(Utc::now().to_rfc3339()),
    }
}

pub fn record_ack() -> RecordAck {
    RecordAck {
        message: "Prediction recorded (demo mode)".to_string(),
    }
}
