use std::collections::HashMap;
use std::path::Path;

use crate::core::reading::WeatherReading;
use crate::db::StoreError;
use crate::db::import::CsvTable;

use super::{WeatherError, WeatherObservation, WeatherProvider, WeatherSource};

/// Typical conditions per city: (city, temperature C, humidity %, rainfall mm).
const BUILTIN: &[(&str, f64, f64, f64)] = &[
    ("Bangalore", 26.0, 75.0, 5.0),
    ("Mysore", 25.0, 80.0, 8.0),
    ("Hubli", 28.0, 70.0, 3.0),
    ("Mangalore", 29.0, 85.0, 12.0),
    ("Belgaum", 25.0, 83.0, 10.0),
];

const STANDARD_PRESSURE_HPA: f64 = 1013.25;

#[derive(Debug, Clone)]
struct HistoryRow {
    city: String,
    temperature: f64,
    humidity: f64,
    rainfall: f64,
}

/// Estimated weather from a history export, or from built-in values.
#[derive(Debug, Clone, Default)]
pub struct MockWeather {
    /// Lowercased city -> latest history row.
    latest: HashMap<String, HistoryRow>,
}

impl MockWeather {
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Load `City,Temperature(C),Humidity(%),Rainfall(mm)` rows. The last
    /// row for a city is the one used.
    pub fn from_history_csv(path: &Path) -> Result<Self, StoreError> {
        let table = CsvTable::read(path)?;
        let city_col = table.require("City")?;
        let temp_col = table.require("Temperature(C)")?;
        let hum_col = table.require("Humidity(%)")?;
        let rain_col = table.require("Rainfall(mm)")?;

        let mut latest = HashMap::new();
        let mut skipped = 0usize;
        for row in table.rows() {
            let field = |col: usize| row.get(col).and_then(|v| v.parse::<f64>().ok());
            let city = row.get(city_col).copied().unwrap_or_default();
            match (field(temp_col), field(hum_col), field(rain_col)) {
                (Some(temperature), Some(humidity), Some(rainfall)) if !city.is_empty() => {
                    latest.insert(
                        city.to_lowercase(),
                        HistoryRow {
                            city: city.to_string(),
                            temperature,
                            humidity,
                            rainfall,
                        },
                    );
                }
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!("Skipped {skipped} unreadable rows in {}", path.display());
        }
        tracing::info!("Loaded weather history for {} cities from {}", latest.len(), path.display());
        Ok(Self { latest })
    }

    pub fn lookup(&self, city: &str) -> Result<WeatherObservation, WeatherError> {
        let key = city.trim().to_lowercase();
        let (name, temperature, humidity, rainfall, description) = match self.latest.get(&key) {
            Some(row) => (row.city.clone(), row.temperature, row.humidity, row.rainfall, "partly cloudy"),
            None => {
                let (name, t, h, r) = BUILTIN
                    .iter()
                    .find(|(name, ..)| name.eq_ignore_ascii_case(&key))
                    .unwrap_or(&BUILTIN[0]);
                (name.to_string(), *t, *h, *r, "typical seasonal conditions")
            }
        };

        let reading = WeatherReading::now(temperature, humidity, rainfall)
            .map_err(|e| WeatherError::Malformed(format!("estimated weather for {name}: {e}")))?;
        Ok(WeatherObservation {
            city: name,
            country: "IN".to_string(),
            description: description.to_string(),
            reading,
            pressure_hpa: Some(STANDARD_PRESSURE_HPA),
            feels_like: None,
            source: WeatherSource::Estimated,
        })
    }
}

impl WeatherProvider for MockWeather {
    async fn current(&self, city: &str) -> Result<WeatherObservation, WeatherError> {
        self.lookup(city)
    }
}
