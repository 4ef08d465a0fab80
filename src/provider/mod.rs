pub mod mock;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::reading::WeatherReading;

pub use mock::MockWeather;

pub const DEFAULT_BASE_URL: &str = "http://api.openweathermap.org/data/2.5/weather";

/// Keys shipped in sample configs. Treated as "no key configured".
const PLACEHOLDER_KEYS: &[&str] = &["demo_key", "your_actual_api_key_here"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherSource {
    Live,
    /// Historical or built-in data standing in for a live reading.
    Estimated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub city: String,
    pub country: String,
    pub description: String,
    pub reading: WeatherReading,
    pub pressure_hpa: Option<f64>,
    pub feels_like: Option<f64>,
    pub source: WeatherSource,
}

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("city '{0}' not found")]
    CityNotFound(String),
    #[error("weather API rejected the API key")]
    Unauthorized,
    #[error("weather API returned status {0}")]
    Status(u16),
    #[error("malformed weather response: {0}")]
    Malformed(String),
}

/// Source of current weather for a city.
pub trait WeatherProvider {
    fn current(&self, city: &str) -> impl Future<Output = Result<WeatherObservation, WeatherError>> + Send;
}

pub fn is_placeholder_key(key: &str) -> bool {
    let key = key.trim();
    key.is_empty() || PLACEHOLDER_KEYS.contains(&key)
}

/// OpenWeatherMap current-weather client.
pub struct OpenWeatherClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl OpenWeatherClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }
}

impl WeatherProvider for OpenWeatherClient {
    async fn current(&self, city: &str) -> Result<WeatherObservation, WeatherError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("q", city), ("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await?;

        match resp.status() {
            StatusCode::UNAUTHORIZED => return Err(WeatherError::Unauthorized),
            StatusCode::NOT_FOUND => return Err(WeatherError::CityNotFound(city.to_string())),
            status if !status.is_success() => return Err(WeatherError::Status(status.as_u16())),
            _ => {}
        }

        let body = resp.text().await?;
        parse_observation(&body)
    }
}

#[derive(Deserialize)]
struct OwmResponse {
    name: String,
    #[serde(default)]
    dt: Option<i64>,
    main: OwmMain,
    #[serde(default)]
    sys: Option<OwmSys>,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    #[serde(default)]
    rain: Option<OwmRain>,
}

#[derive(Deserialize)]
struct OwmMain {
    temp: f64,
    humidity: f64,
    #[serde(default)]
    pressure: Option<f64>,
    #[serde(default)]
    feels_like: Option<f64>,
}

#[derive(Deserialize)]
struct OwmSys {
    #[serde(default)]
    country: Option<String>,
}

#[derive(Deserialize)]
struct OwmCondition {
    description: String,
}

#[derive(Deserialize)]
struct OwmRain {
    #[serde(rename = "1h", default)]
    one_hour: Option<f64>,
}

/// Map an OpenWeatherMap JSON body onto an observation. Rain is the last
/// hour's total and defaults to 0 when the block is absent.
pub fn parse_observation(body: &str) -> Result<WeatherObservation, WeatherError> {
    let owm: OwmResponse =
        serde_json::from_str(body).map_err(|e| WeatherError::Malformed(e.to_string()))?;

    let observed_at = owm
        .dt
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .unwrap_or_else(Utc::now);
    let rainfall = owm.rain.and_then(|r| r.one_hour).unwrap_or(0.0);
    let reading = WeatherReading::new(owm.main.temp, owm.main.humidity, rainfall, observed_at)
        .map_err(|e| WeatherError::Malformed(e.to_string()))?;

    Ok(WeatherObservation {
        city: owm.name,
        country: owm.sys.and_then(|s| s.country).unwrap_or_default(),
        description: owm
            .weather
            .into_iter()
            .next()
            .map(|w| w.description)
            .unwrap_or_default(),
        reading,
        pressure_hpa: owm.main.pressure,
        feels_like: owm.main.feels_like,
        source: WeatherSource::Live,
    })
}

/// Tries a live provider first and degrades to estimated data.
///
/// An unknown city is a real answer and is passed through. Any other
/// failure is logged and answered from the mock.
pub struct FallbackWeather<P> {
    primary: Option<P>,
    mock: MockWeather,
}

impl<P: WeatherProvider + Sync> FallbackWeather<P> {
    pub fn new(primary: Option<P>, mock: MockWeather) -> Self {
        if primary.is_none() {
            tracing::warn!("Weather API key not configured, using estimated weather data");
        }
        Self { primary, mock }
    }

    pub fn has_live_source(&self) -> bool {
        self.primary.is_some()
    }
}

impl FallbackWeather<OpenWeatherClient> {
    /// Build from an optional API key. Placeholder keys skip the HTTP client.
    pub fn from_api_key(
        api_key: Option<&str>,
        base_url: &str,
        timeout: Duration,
        mock: MockWeather,
    ) -> Result<Self, WeatherError> {
        let primary = match api_key {
            Some(key) if !is_placeholder_key(key) => Some(OpenWeatherClient::new(base_url, key, timeout)?),
            _ => None,
        };
        Ok(Self::new(primary, mock))
    }
}

impl<P: WeatherProvider + Sync> WeatherProvider for FallbackWeather<P> {
    async fn current(&self, city: &str) -> Result<WeatherObservation, WeatherError> {
        let Some(primary) = &self.primary else {
            return self.mock.lookup(city);
        };
        match primary.current(city).await {
            Ok(observation) => Ok(observation),
            Err(WeatherError::CityNotFound(name)) => Err(WeatherError::CityNotFound(name)),
            Err(e) => {
                tracing::warn!("Live weather for {city} failed ({e}), using estimated data");
                self.mock.lookup(city)
            }
        }
    }
}
