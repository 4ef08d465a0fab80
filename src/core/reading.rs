use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::EngineError;

/// A validated weather observation.
///
/// Construct through [`WeatherReading::new`]; out-of-range values are
/// rejected, never clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWeatherReading")]
pub struct WeatherReading {
    temperature: f64,
    humidity: f64,
    rainfall: f64,
    observed_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawWeatherReading {
    temperature: f64,
    humidity: f64,
    rainfall: f64,
    observed_at: DateTime<Utc>,
}

impl TryFrom<RawWeatherReading> for WeatherReading {
    type Error = EngineError;

    fn try_from(raw: RawWeatherReading) -> Result<Self, Self::Error> {
        WeatherReading::new(raw.temperature, raw.humidity, raw.rainfall, raw.observed_at)
    }
}

impl WeatherReading {
    pub fn new(
        temperature: f64,
        humidity: f64,
        rainfall: f64,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, EngineError> {
        if !temperature.is_finite() {
            return Err(EngineError::invalid(format!("temperature must be finite, got {temperature}")));
        }
        if !humidity.is_finite() || !(0.0..=100.0).contains(&humidity) {
            return Err(EngineError::invalid(format!("humidity must be within 0-100%, got {humidity}")));
        }
        if !rainfall.is_finite() || rainfall < 0.0 {
            return Err(EngineError::invalid(format!("rainfall must be >= 0 mm, got {rainfall}")));
        }
        Ok(Self {
            temperature,
            humidity,
            rainfall,
            observed_at,
        })
    }

    /// Reading observed right now.
    pub fn now(temperature: f64, humidity: f64, rainfall: f64) -> Result<Self, EngineError> {
        Self::new(temperature, humidity, rainfall, Utc::now())
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn humidity(&self) -> f64 {
        self.humidity
    }

    pub fn rainfall(&self) -> f64 {
        self.rainfall
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

/// City / district / state triplet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub district: String,
    pub state: String,
}

impl Location {
    pub fn new(city: impl Into<String>, district: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            district: district.into(),
            state: state.into(),
        }
    }
}

/// Accepted date layouts for case history rows.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"];

/// One day's reported case count for a location.
///
/// `date` is `None` when the source date was missing or unparseable; such
/// records still count towards totals but not towards trend analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub date: Option<NaiveDate>,
    pub case_count: u32,
}

impl CaseRecord {
    pub fn new(date: NaiveDate, case_count: u32) -> Self {
        Self {
            date: Some(date),
            case_count,
        }
    }

    pub fn undated(case_count: u32) -> Self {
        Self {
            date: None,
            case_count,
        }
    }

    /// Build a record from the raw `(date-string, count)` shape a case store
    /// hands over. Bad dates degrade to `None`; bad counts are rejected.
    pub fn from_raw(date: Option<&str>, case_count: i64) -> Result<Self, EngineError> {
        let case_count = u32::try_from(case_count)
            .map_err(|_| EngineError::invalid(format!("case count must be a non-negative integer, got {case_count}")))?;
        Ok(Self {
            date: date.and_then(parse_date),
            case_count,
        })
    }
}

/// Parse a date in any of the layouts seen in case exports.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    // Timestamps like "2024-07-01 00:00:00" keep only the date part
    let raw = raw.split_whitespace().next().unwrap_or(raw);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_rejects_humidity_above_100() {
        let err = WeatherReading::now(26.0, 101.0, 0.0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn reading_rejects_negative_rainfall() {
        assert!(WeatherReading::now(26.0, 80.0, -0.5).is_err());
    }

    #[test]
    fn reading_rejects_nan_temperature() {
        assert!(WeatherReading::now(f64::NAN, 80.0, 0.0).is_err());
    }

    #[test]
    fn reading_accepts_boundaries() {
        assert!(WeatherReading::now(-5.0, 0.0, 0.0).is_ok());
        assert!(WeatherReading::now(45.0, 100.0, 250.0).is_ok());
    }

    #[test]
    fn reading_deserialization_validates() {
        let json = r#"{"temperature":26.0,"humidity":150.0,"rainfall":1.0,"observed_at":"2024-07-01T00:00:00Z"}"#;
        assert!(serde_json::from_str::<WeatherReading>(json).is_err());

        let json = r#"{"temperature":26.0,"humidity":80.0,"rainfall":1.0,"observed_at":"2024-07-01T00:00:00Z"}"#;
        let reading: WeatherReading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.humidity(), 80.0);
    }

    #[test]
    fn parse_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 7, 15);
        assert_eq!(parse_date("2024-07-15"), expected);
        assert_eq!(parse_date("15-07-2024"), expected);
        assert_eq!(parse_date("15/07/2024"), expected);
        assert_eq!(parse_date("2024/07/15"), expected);
        assert_eq!(parse_date("2024-07-15 08:30:00"), expected);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("   "), None);
    }

    #[test]
    fn record_from_raw_keeps_bad_dates_as_undated() {
        let rec = CaseRecord::from_raw(Some("garbage"), 12).unwrap();
        assert_eq!(rec.date, None);
        assert_eq!(rec.case_count, 12);
    }

    #[test]
    fn record_from_raw_rejects_negative_count() {
        assert!(CaseRecord::from_raw(Some("2024-07-15"), -3).is_err());
    }
}
