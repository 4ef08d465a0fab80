use serde::Deserialize;
use std::path::Path;

use crate::core::RiskLevel;
use crate::engines::trend::{DEFAULT_FALLBACK_RECORDS, DEFAULT_WINDOW_DAYS};
use crate::provider::DEFAULT_BASE_URL;

pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub weather: WeatherConfig,
    pub trend: TrendConfig,
    pub database: DatabaseConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_seconds: u64,
    pub history_csv: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TrendConfig {
    pub window_days: u32,
    pub fallback_records: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub min_level: RiskLevel,
    pub cooldown_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub cases_csv: Option<String>,
    pub cities_csv: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            weather: WeatherConfig::default(),
            trend: TrendConfig::default(),
            database: DatabaseConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.into(),
            timeout_seconds: 10,
            history_csv: Some("datasets/weather_history.csv".into()),
        }
    }
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            fallback_records: DEFAULT_FALLBACK_RECORDS,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_level: RiskLevel::High,
            cooldown_seconds: 30,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/dengueradar.db".into(),
            cases_csv: Some("datasets/dengue_cases.csv".into()),
            cities_csv: Some("datasets/cities.csv".into()),
        }
    }
}

impl Config {
    /// Load config from a TOML file. Falls back to defaults if file doesn't exist.
    /// `OPENWEATHER_API_KEY` in the environment wins over the file's key.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let mut config = Self::load_file(path.as_ref());
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.weather.api_key = Some(key.trim().to_string());
            }
        }
        config
    }

    fn load_file(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Config loaded from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {e}, using defaults", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}, using defaults", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [trend]
            window_days = 14

            [notifications]
            min_level = "Medium"
            "#,
        )
        .unwrap();
        assert_eq!(config.trend.window_days, 14);
        assert_eq!(config.trend.fallback_records, 30);
        assert_eq!(config.notifications.min_level, RiskLevel::Medium);
        assert_eq!(config.notifications.cooldown_seconds, 30);
        assert_eq!(config.weather.timeout_seconds, 10);
        assert_eq!(config.database.path, "data/dengueradar.db");
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = Config::load_file(Path::new("/nonexistent/dengueradar.toml"));
        assert_eq!(config.trend.window_days, DEFAULT_WINDOW_DAYS);
        assert!(config.notifications.enabled);
    }

    #[test]
    fn invalid_file_gives_defaults() {
        let path = std::env::temp_dir().join(format!("dengueradar_config_{}.toml", std::process::id()));
        std::fs::write(&path, "[trend\nwindow_days = ").unwrap();
        let config = Config::load_file(&path);
        assert_eq!(config.trend.window_days, DEFAULT_WINDOW_DAYS);
        let _ = std::fs::remove_file(&path);
    }
}
