use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::reading::WeatherReading;
use crate::core::{EngineKind, FactorScore, RiskLevel, RiskVerdict, VerdictDetails};

/// Classification of a single weather factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactorLevel {
    High,
    Moderate,
    /// Some rain, below the breeding threshold.
    Present,
    Low,
    /// No rain at all.
    Absent,
}

/// Outcome of one rule: its level and a human-readable explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorAssessment {
    pub name: String,
    pub level: FactorLevel,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherDetails {
    pub reading: WeatherReading,
    pub factors: Vec<FactorAssessment>,
    pub high_factor_count: usize,
}

impl WeatherDetails {
    pub fn level_of(&self, name: &str) -> Option<FactorLevel> {
        self.factors.iter().find(|f| f.name == name).map(|f| f.level)
    }
}

/// A threshold rule over one aspect of a weather reading.
pub trait WeatherRule {
    fn name(&self) -> &str;
    fn classify(&self, reading: &WeatherReading) -> (FactorLevel, String);
}

pub fn default_rules() -> Vec<Box<dyn WeatherRule + Send + Sync>> {
    vec![
        Box::new(TemperatureRule),
        Box::new(HumidityRule),
        Box::new(RainfallRule),
    ]
}

// --- Individual Rules ---

/// 25-30°C is the optimal breeding range for Aedes mosquitoes.
struct TemperatureRule;
impl WeatherRule for TemperatureRule {
    fn name(&self) -> &str { "temperature" }
    fn classify(&self, reading: &WeatherReading) -> (FactorLevel, String) {
        let t = reading.temperature();
        if (25.0..=30.0).contains(&t) {
            (
                FactorLevel::High,
                format!("Optimal temperature for dengue mosquito breeding: {t}°C (25-30°C range)"),
            )
        } else if (20.0..25.0).contains(&t) || (t > 30.0 && t <= 35.0) {
            (
                FactorLevel::Moderate,
                format!("Moderate temperature for mosquito activity: {t}°C"),
            )
        } else {
            (
                FactorLevel::Low,
                format!("Temperature not ideal for dengue transmission: {t}°C"),
            )
        }
    }
}

struct HumidityRule;
impl WeatherRule for HumidityRule {
    fn name(&self) -> &str { "humidity" }
    fn classify(&self, reading: &WeatherReading) -> (FactorLevel, String) {
        let h = reading.humidity();
        if h > 70.0 {
            (
                FactorLevel::High,
                format!("High humidity increases dengue risk: {h}% (>70% threshold)"),
            )
        } else {
            (FactorLevel::Low, format!("Humidity level acceptable: {h}%"))
        }
    }
}

/// More than 10mm of rain leaves standing water for breeding.
struct RainfallRule;
impl WeatherRule for RainfallRule {
    fn name(&self) -> &str { "rainfall" }
    fn classify(&self, reading: &WeatherReading) -> (FactorLevel, String) {
        let r = reading.rainfall();
        if r > 10.0 {
            (
                FactorLevel::High,
                format!("High rainfall creates breeding sites: {r}mm (>10mm threshold)"),
            )
        } else if r > 0.0 {
            (FactorLevel::Present, format!("Light rainfall detected: {r}mm"))
        } else {
            (FactorLevel::Absent, "No recent rainfall detected".to_string())
        }
    }
}

/// Applies the weather rules and combines them into a verdict.
pub struct WeatherEngine {
    rules: Vec<Box<dyn WeatherRule + Send + Sync>>,
}

impl Default for WeatherEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherEngine {
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
        }
    }

    pub fn assess(&self, reading: &WeatherReading) -> RiskVerdict {
        let factors: Vec<FactorAssessment> = self
            .rules
            .iter()
            .map(|rule| {
                let (level, explanation) = rule.classify(reading);
                FactorAssessment {
                    name: rule.name().to_string(),
                    level,
                    explanation,
                }
            })
            .collect();

        let factor_scores: Vec<FactorScore> = factors
            .iter()
            .map(|f| FactorScore::new(f.name.clone(), 1, f.level == FactorLevel::High))
            .collect();
        let high_factor_count = factors.iter().filter(|f| f.level == FactorLevel::High).count();

        let (risk_level, label, color_tag, message) = match high_factor_count {
            0 => (
                RiskLevel::Low,
                "Low",
                "success",
                "LOW DENGUE RISK - Weather conditions not optimal for mosquito breeding",
            ),
            1 => (
                RiskLevel::Medium,
                "Moderate",
                "warning",
                "MODERATE DENGUE RISK - Some conditions favor mosquito activity",
            ),
            _ => (
                RiskLevel::High,
                "High",
                "danger",
                "HIGH DENGUE RISK - Multiple favorable conditions for mosquito breeding detected!",
            ),
        };

        tracing::debug!(
            "Weather assessment: {high_factor_count} high factors -> {label} (t={}, h={}, r={})",
            reading.temperature(),
            reading.humidity(),
            reading.rainfall()
        );

        RiskVerdict {
            engine: EngineKind::Weather,
            risk_level,
            label: label.to_string(),
            numeric_score: high_factor_count as f64,
            color_tag: color_tag.to_string(),
            message: message.to_string(),
            recommendations: recommendations(risk_level),
            explanations: factors.iter().map(|f| f.explanation.clone()).collect(),
            factor_scores,
            low_confidence: false,
            details: VerdictDetails::Weather(WeatherDetails {
                reading: reading.clone(),
                factors,
                high_factor_count,
            }),
            computed_at: Utc::now(),
        }
    }
}

/// Classify a weather reading with the default rule set.
pub fn assess_weather(reading: &WeatherReading) -> RiskVerdict {
    WeatherEngine::new().assess(reading)
}

fn recommendations(level: RiskLevel) -> Vec<String> {
    let lines: &[&str] = match level {
        RiskLevel::High | RiskLevel::VeryHigh => &[
            "Remove all stagnant water sources immediately",
            "Use mosquito repellents and nets consistently",
            "Wear long-sleeved clothing, especially during dawn and dusk",
            "Seek medical attention immediately if fever develops",
            "Alert neighbors and community about high risk conditions",
        ],
        RiskLevel::Medium | RiskLevel::LowMedium => &[
            "Check for and remove stagnant water weekly",
            "Use mosquito repellents during peak mosquito hours",
            "Keep surroundings clean and well-ventilated",
            "Monitor for dengue symptoms (fever, headache, body pain)",
            "Maintain awareness of local dengue alerts",
        ],
        RiskLevel::Low => &[
            "Continue regular dengue prevention measures",
            "Maintain clean surroundings",
            "Stay alert for weather changes",
            "Keep updated with local health advisories",
        ],
    };
    lines.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(t: f64, h: f64, r: f64) -> WeatherReading {
        WeatherReading::now(t, h, r).unwrap()
    }

    fn details(verdict: &RiskVerdict) -> &WeatherDetails {
        match &verdict.details {
            VerdictDetails::Weather(d) => d,
            other => panic!("expected weather details, got {other:?}"),
        }
    }

    #[test]
    fn all_three_factors_high() {
        for (t, h, r) in [(25.0, 70.1, 10.1), (27.5, 85.0, 40.0), (30.0, 100.0, 11.0)] {
            let verdict = assess_weather(&reading(t, h, r));
            assert_eq!(verdict.risk_level, RiskLevel::High, "t={t} h={h} r={r}");
            assert_eq!(details(&verdict).high_factor_count, 3);
        }
    }

    #[test]
    fn mild_dry_day_is_low() {
        let verdict = assess_weather(&reading(22.0, 50.0, 0.0));
        assert_eq!(verdict.risk_level, RiskLevel::Low);
        assert_eq!(verdict.label, "Low");
        assert_eq!(verdict.color_tag, "success");
        let d = details(&verdict);
        assert_eq!(d.level_of("temperature"), Some(FactorLevel::Moderate));
        assert_eq!(d.level_of("humidity"), Some(FactorLevel::Low));
        assert_eq!(d.level_of("rainfall"), Some(FactorLevel::Absent));
    }

    #[test]
    fn monsoon_day_scenario() {
        let verdict = assess_weather(&reading(26.0, 80.0, 15.0));
        assert_eq!(verdict.risk_level, RiskLevel::High);
        assert!(verdict.message.contains("Multiple favorable conditions"));
        assert_eq!(verdict.numeric_score, 3.0);
        assert_eq!(verdict.recommendations.len(), 5);
    }

    #[test]
    fn single_high_factor_is_moderate() {
        let verdict = assess_weather(&reading(18.0, 90.0, 2.0));
        assert_eq!(verdict.risk_level, RiskLevel::Medium);
        assert_eq!(verdict.label, "Moderate");
        assert_eq!(verdict.color_tag, "warning");
        assert_eq!(details(&verdict).level_of("rainfall"), Some(FactorLevel::Present));
    }

    #[test]
    fn two_high_factors_is_high() {
        let verdict = assess_weather(&reading(28.0, 75.0, 0.0));
        assert_eq!(verdict.risk_level, RiskLevel::High);
    }

    #[test]
    fn explanation_for_every_factor() {
        let verdict = assess_weather(&reading(10.0, 20.0, 0.0));
        assert_eq!(verdict.explanations.len(), 3);
        assert!(verdict.explanations[0].contains("not ideal"));
        assert!(verdict.explanations[2].contains("No recent rainfall"));
    }

    #[test]
    fn temperature_band_edges() {
        let rule = TemperatureRule;
        assert_eq!(rule.classify(&reading(25.0, 0.0, 0.0)).0, FactorLevel::High);
        assert_eq!(rule.classify(&reading(30.0, 0.0, 0.0)).0, FactorLevel::High);
        assert_eq!(rule.classify(&reading(20.0, 0.0, 0.0)).0, FactorLevel::Moderate);
        assert_eq!(rule.classify(&reading(30.5, 0.0, 0.0)).0, FactorLevel::Moderate);
        assert_eq!(rule.classify(&reading(35.0, 0.0, 0.0)).0, FactorLevel::Moderate);
        assert_eq!(rule.classify(&reading(35.1, 0.0, 0.0)).0, FactorLevel::Low);
        assert_eq!(rule.classify(&reading(19.9, 0.0, 0.0)).0, FactorLevel::Low);
    }

    #[test]
    fn humidity_threshold_is_exclusive() {
        assert_eq!(HumidityRule.classify(&reading(0.0, 70.0, 0.0)).0, FactorLevel::Low);
        assert_eq!(HumidityRule.classify(&reading(0.0, 70.5, 0.0)).0, FactorLevel::High);
    }

    #[test]
    fn rainfall_threshold_is_exclusive() {
        assert_eq!(RainfallRule.classify(&reading(0.0, 0.0, 10.0)).0, FactorLevel::Present);
        assert_eq!(RainfallRule.classify(&reading(0.0, 0.0, 10.5)).0, FactorLevel::High);
    }

    #[test]
    fn identical_input_identical_verdict() {
        let r = reading(26.0, 80.0, 15.0);
        let a = assess_weather(&r);
        let mut b = assess_weather(&r);
        b.computed_at = a.computed_at;
        assert_eq!(a, b);
    }

    #[test]
    fn rule_names_unique() {
        let rules = default_rules();
        let mut names: Vec<&str> = rules.iter().map(|r| r.name()).collect();
        let len = names.len();
        names.sort();
        names.dedup();
        assert_eq!(len, names.len());
    }
}
