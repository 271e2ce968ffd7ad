//! # Agri CLI
//!
//! Command-line interface for the Agri Assist backend: crop prediction,
//! weather, the farming assistant, disease detection and the crop calendar.

mod logging;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use agri_sdk::{
    AgriClient, ChatRequest, ClientConfig, CropInputs, ImageUpload, PredictionRecord, ServiceError,
    WeatherQuery,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use logging::{init_logging, LoggingConfig};

#[derive(Parser, Debug)]
#[command(name = "agri-cli")]
#[command(about = "Command-line interface for the Agri Assist backend")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Serve offline demo responses instead of calling the backend
    #[arg(long, global = true)]
    demo: bool,

    /// Enable demo mode without asking for confirmation
    #[arg(short, long, global = true, requires = "demo")]
    yes: bool,

    /// Write logs as JSON (also AGRI_JSON_LOGS)
    #[arg(long, global = true)]
    json_logs: bool,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Recommend a crop for soil and climate readings
    Predict {
        #[arg(short = 'n', long)]
        nitrogen: f64,
        #[arg(short = 'p', long)]
        phosphorus: f64,
        #[arg(short = 'k', long)]
        potassium: f64,
        /// Degrees Celsius
        #[arg(short, long)]
        temperature: f64,
        /// Relative humidity, percent
        #[arg(long)]
        humidity: f64,
        #[arg(long)]
        ph: f64,
        /// Millimetres
        #[arg(short, long)]
        rainfall: f64,
    },
    /// Current weather, forecast and advisories
    Weather {
        #[arg(long, default_value_t = 19.076, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, default_value_t = 72.8777, allow_hyphen_values = true)]
        lon: f64,
    },
    /// Ask the farming assistant
    Chat {
        message: String,
        /// Reply language code (e.g. "hi")
        #[arg(long)]
        lang: Option<String>,
        /// Ask for a short answer
        #[arg(long)]
        concise: bool,
    },
    /// Check a plant photo for disease
    Detect {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
        /// MIME type of the image
        #[arg(long, default_value = "image/jpeg")]
        mime: String,
    },
    /// Dashboard statistics
    Stats,
    /// Crop calendar, or the activities of one month
    Calendar {
        /// Month number (1-12)
        #[arg(short, long)]
        month: Option<u32>,
    },
    /// Report a prediction outcome
    Record {
        #[arg(long)]
        crop: String,
        /// Fraction between 0 and 1
        #[arg(long)]
        confidence: f64,
        /// Mark the prediction as unsuccessful
        #[arg(long)]
        failed: bool,
    },
    /// Prediction accuracy by region and crop
    Analytics,
    /// Probe every backend endpoint
    Diagnose,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render result")?;
    println!("{}", rendered);
    Ok(())
}

/// Ask on stdin before enabling demo mode
fn confirm_demo() -> Result<bool> {
    let mut stderr = io::stderr();
    write!(stderr, "Enable offline demo mode? Responses will be sample data. [y/N] ")?;
    stderr.flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn read_image(path: &Path, mime: String) -> Result<ImageUpload> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut upload = ImageUpload::jpeg(bytes).with_mime_type(mime);
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        upload = upload.with_file_name(name);
    }
    Ok(upload)
}

fn report_failure(err: &ServiceError) -> ExitCode {
    eprintln!("error: {}", err);
    if let Some(phase) = err.phase() {
        eprintln!("  phase: {}", phase);
    }
    if let Some(message) = err.server_message() {
        eprintln!("  server said: {}", message);
    }
    eprintln!("  hint: {}", err.guidance());
    ExitCode::FAILURE
}

async fn run(client: &AgriClient, command: Commands) -> Result<std::result::Result<(), ServiceError>> {
    let outcome = match command {
        Commands::Predict {
            nitrogen,
            phosphorus,
            potassium,
            temperature,
            humidity,
            ph,
            rainfall,
        } => {
            let inputs = CropInputs {
                nitrogen,
                phosphorus,
                potassium,
                temperature,
                humidity,
                ph,
                rainfall,
            };
            client.predict_crop(&inputs).await.map(|r| print_json(&r))
        }
        Commands::Weather { lat, lon } => client
            .get_weather(&WeatherQuery::new(lat, lon))
            .await
            .map(|r| print_json(&r)),
        Commands::Chat {
            message,
            lang,
            concise,
        } => {
            let mut request = ChatRequest::new(message);
            if let Some(lang) = lang {
                request = request.lang(lang);
            }
            if concise {
                request = request.concise(true);
            }
            client.send_chat_message(&request).await.map(|r| print_json(&r))
        }
        Commands::Detect { image, mime } => {
            let upload = read_image(&image, mime)?;
            client.detect_disease(upload).await.map(|r| print_json(&r))
        }
        Commands::Stats => client.get_dashboard_stats().await.map(|r| print_json(&r)),
        Commands::Calendar { month: Some(month) } => client
            .get_crop_calendar_for_month(month)
            .await
            .map(|r| print_json(&r)),
        Commands::Calendar { month: None } => {
            client.get_crop_calendar().await.map(|r| print_json(&r))
        }
        Commands::Record {
            crop,
            confidence,
            failed,
        } => {
            let record = PredictionRecord {
                crop,
                confidence,
                success: !failed,
            };
            client.record_prediction(&record).await.map(|r| print_json(&r))
        }
        Commands::Analytics => client.get_analytics().await.map(|r| print_json(&r)),
        Commands::Diagnose => {
            let report = client.run_network_diagnostic().await;
            eprintln!("{}", report);
            Ok(print_json(&report))
        }
    };

    match outcome {
        Ok(printed) => {
            printed?;
            Ok(Ok(()))
        }
        Err(err) => Ok(Err(err)),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    config_rs::load_env_file();

    let logging = LoggingConfig {
        json_format: cli.json_logs || config_rs::get_flag("AGRI_JSON_LOGS"),
        ..LoggingConfig::default()
    }
    .with_verbosity(cli.verbose);
    init_logging(&logging)?;

    let config = ClientConfig::from_env().context("Invalid AGRI_* configuration")?;
    let client = AgriClient::with_config(config).context("Failed to build client")?;

    info!(
        endpoints = client.registry().len(),
        primary = %client.registry().primary(),
        "Agri CLI starting"
    );

    if cli.demo {
        let request = client.demo_mode().request_activation();
        if cli.yes || confirm_demo()? {
            request.confirm();
        } else {
            request.cancel();
            eprintln!("Demo mode not enabled, using the live backend");
        }
    }

    match run(&client, cli.command).await? {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => Ok(report_failure(&err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_predict_arguments() {
        let cli = Cli::try_parse_from([
            "agri-cli", "predict", "-n", "90", "-p", "42", "-k", "43", "--temperature", "20.9",
            "--humidity", "82", "--ph", "6.5", "--rainfall", "202.9",
        ])
        .unwrap();

        match cli.command {
            Commands::Predict { nitrogen, ph, .. } => {
                assert_eq!(nitrogen, 90.0);
                assert_eq!(ph, 6.5);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_yes_requires_demo() {
        assert!(Cli::try_parse_from(["agri-cli", "--yes", "stats"]).is_err());

        let cli = Cli::try_parse_from(["agri-cli", "stats", "--demo", "--yes", "-vv"]).unwrap();
        assert!(cli.demo && cli.yes);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_calendar_month_is_optional() {
        let cli = Cli::try_parse_from(["agri-cli", "calendar", "--month", "6"]).unwrap();
        assert!(matches!(cli.command, Commands::Calendar { month: Some(6) }));

        let cli = Cli::try_parse_from(["agri-cli", "weather", "--lat", "-33.9", "--lon", "18.4"]).unwrap();
        assert!(matches!(cli.command, Commands::Weather { .. }));
    }

    #[test]
    fn test_parses_analytics() {
        let cli = Cli::try_parse_from(["agri-cli", "--demo", "-y", "analytics"]).unwrap();
        assert!(matches!(cli.command, Commands::Analytics));
        assert!(Cli::try_parse_from(["agri-cli", "analytics", "--month", "3"]).is_err());
    }
}
