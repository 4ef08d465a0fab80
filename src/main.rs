use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use dengueradar::config::Config;
use dengueradar::core::RiskLevel;
use dengueradar::db::SharedDatabase;
use dengueradar::engines::environment::{EnvironmentalFactor, EnvironmentalFactorSet};
use dengueradar::engines::symptoms::{Symptom, SymptomSet};
use dengueradar::engines::trend::{TrendAnalyzer, TrendOutcome};
use dengueradar::location::CityDirectory;
use dengueradar::notifications::Notifier;
use dengueradar::provider::{FallbackWeather, MockWeather};
use dengueradar::service::AssessmentService;

#[derive(Parser)]
#[command(name = "dengueradar")]
#[command(version, about = "Dengue risk from weather, symptoms, surroundings and local case trends")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assess breeding conditions from the current weather in a city
    Weather { city: String },

    /// Score reported symptoms (e.g. fever headache joint_pain)
    Symptoms { keys: Vec<String> },

    /// Score household surroundings (e.g. stagnant_water poor_drainage)
    Environment { keys: Vec<String> },

    /// Alert tier and trend analytics from recorded local cases
    Trend {
        location: String,

        /// Trailing window in days (overrides the config)
        #[arg(long)]
        window_days: Option<u32>,
    },

    /// Show the assessment log
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Only show assessments at this level or worse (low, low_medium, medium, high, very_high)
        #[arg(long, value_parser = parse_level)]
        at_least: Option<RiskLevel>,
    },
}

fn parse_level(s: &str) -> Result<RiskLevel, String> {
    match s.to_ascii_lowercase().replace('-', "_").as_str() {
        "low" => Ok(RiskLevel::Low),
        "low_medium" => Ok(RiskLevel::LowMedium),
        "medium" => Ok(RiskLevel::Medium),
        "high" => Ok(RiskLevel::High),
        "very_high" => Ok(RiskLevel::VeryHigh),
        other => Err(format!("unknown risk level '{other}'")),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dengueradar=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config);
    tracing::debug!("Config: {:?}", config);

    let db_path = Path::new(&config.database.path);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    let db = SharedDatabase::open(db_path).context("Failed to open database")?;
    tracing::info!("Database opened at {}", config.database.path);

    // Seed case history once from the CSV export
    if let Some(ref csv_path) = config.database.cases_csv {
        let csv_path = Path::new(csv_path);
        if csv_path.exists() && db.case_record_count()? == 0 {
            match db.load_cases_from_csv(csv_path) {
                Ok(count) => tracing::info!("Loaded {count} case records from CSV"),
                Err(e) => tracing::warn!("Failed to load case CSV: {e}"),
            }
        }
    }

    let directory = match config.database.cities_csv.as_deref().map(Path::new) {
        Some(path) if path.exists() => CityDirectory::load_from_csv(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load cities CSV: {e}, using built-in list");
            CityDirectory::karnataka_defaults()
        }),
        _ => CityDirectory::karnataka_defaults(),
    };

    let mock = match config.weather.history_csv.as_deref().map(Path::new) {
        Some(path) if path.exists() => MockWeather::from_history_csv(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load weather history: {e}");
            MockWeather::builtin()
        }),
        _ => MockWeather::builtin(),
    };
    let weather = FallbackWeather::from_api_key(
        config.weather.api_key.as_deref(),
        &config.weather.base_url,
        Duration::from_secs(config.weather.timeout_seconds),
        mock,
    )?;

    let window_days = match cli.command {
        Command::Trend {
            window_days: Some(days),
            ..
        } => days,
        _ => config.trend.window_days,
    };
    let service = AssessmentService::new(
        weather,
        Box::new(directory),
        db,
        TrendAnalyzer::new(window_days, config.trend.fallback_records),
        Notifier::new(&config.notifications),
    );

    match cli.command {
        Command::Weather { city } => {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to create tokio runtime")?;
            let (observation, verdict) = rt.block_on(service.weather(&city))?;
            print_json(&serde_json::json!({
                "observation": observation,
                "verdict": verdict,
            }))?;
        }
        Command::Symptoms { keys } => {
            let symptoms = keys
                .iter()
                .map(|k| k.parse::<Symptom>())
                .collect::<Result<SymptomSet, _>>()?;
            print_json(&service.symptoms(&symptoms))?;
        }
        Command::Environment { keys } => {
            let factors = keys
                .iter()
                .map(|k| k.parse::<EnvironmentalFactor>())
                .collect::<Result<EnvironmentalFactorSet, _>>()?;
            print_json(&service.environment(&factors))?;
        }
        Command::Trend { location, .. } => {
            let today = chrono::Local::now().date_naive();
            let outcome = service.trend(&location, today)?;
            if let TrendOutcome::InvalidLocation { ref suggestions, .. } = outcome {
                tracing::warn!("Unknown location '{location}', did you mean {}?", suggestions.join(", "));
            }
            print_json(&outcome)?;
        }
        Command::History { limit, at_least } => {
            let records = match at_least {
                Some(level) => service.history_at_or_above(level, limit)?,
                None => service.history(limit)?,
            };
            if records.is_empty() {
                println!("No assessments recorded yet");
            }
            for r in records {
                let flag = if r.low_confidence { " (low confidence)" } else { "" };
                println!(
                    "{}  {} {:<11} {:<18} {}{flag}",
                    r.created_at,
                    r.risk_level.emoji(),
                    r.engine,
                    r.label,
                    r.subject
                );
            }
        }
    }
    service.wait_for_notifications();
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
