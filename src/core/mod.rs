pub mod error;
pub mod reading;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engines::environment::EnvironmentDetails;
use crate::engines::symptoms::SymptomDetails;
use crate::engines::trend::TrendAnalytics;
use crate::engines::weather::WeatherDetails;

/// Ordered risk tier shared by every engine. Engines attach their own
/// display label (e.g. "Critical Outbreak") to the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    LowMedium,
    Medium,
    High,
    VeryHigh,
}

impl RiskLevel {
    /// Stable integer rank, used for storage and range queries.
    pub fn rank(&self) -> u8 {
        match self {
            RiskLevel::Low => 0,
            RiskLevel::LowMedium => 1,
            RiskLevel::Medium => 2,
            RiskLevel::High => 3,
            RiskLevel::VeryHigh => 4,
        }
    }

    pub fn from_rank(rank: u8) -> Option<Self> {
        match rank {
            0 => Some(RiskLevel::Low),
            1 => Some(RiskLevel::LowMedium),
            2 => Some(RiskLevel::Medium),
            3 => Some(RiskLevel::High),
            4 => Some(RiskLevel::VeryHigh),
            _ => None,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RiskLevel::VeryHigh => "🔴",
            RiskLevel::High => "🟠",
            RiskLevel::Medium => "🟡",
            RiskLevel::LowMedium => "🔵",
            RiskLevel::Low => "🟢",
        }
    }
}

/// Which engine produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    Weather,
    Symptoms,
    Environment,
    Trend,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Weather => "weather",
            EngineKind::Symptoms => "symptoms",
            EngineKind::Environment => "environment",
            EngineKind::Trend => "trend",
        }
    }
}

/// Contribution of one weighted factor to a verdict's score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    pub name: String,
    pub weight: u32,
    pub present: bool,
    pub weighted_score: u32,
}

impl FactorScore {
    pub fn new(name: impl Into<String>, weight: u32, present: bool) -> Self {
        Self {
            name: name.into(),
            weight,
            present,
            weighted_score: if present { weight } else { 0 },
        }
    }
}

/// Engine-specific output carried alongside the common verdict fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerdictDetails {
    Weather(WeatherDetails),
    Symptoms(SymptomDetails),
    Environment(EnvironmentDetails),
    Trend(TrendAnalytics),
}

/// The uniform output of every engine. Always fully populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskVerdict {
    pub engine: EngineKind,
    pub risk_level: RiskLevel,
    /// Engine-specific tier name, e.g. "Low-Medium" or "High Alert".
    pub label: String,
    pub numeric_score: f64,
    /// Display hint only (bootstrap-style contextual class).
    pub color_tag: String,
    pub message: String,
    pub recommendations: Vec<String>,
    pub explanations: Vec<String>,
    pub factor_scores: Vec<FactorScore>,
    /// Set when the inputs were estimated or too sparse for full analytics.
    pub low_confidence: bool,
    pub details: VerdictDetails,
    pub computed_at: DateTime<Utc>,
}

impl RiskVerdict {
    /// Mark the verdict as computed from estimated or partial inputs.
    pub fn with_low_confidence(mut self) -> Self {
        self.low_confidence = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_levels_are_ordered() {
        assert!(RiskLevel::Low < RiskLevel::LowMedium);
        assert!(RiskLevel::LowMedium < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::VeryHigh);
    }

    #[test]
    fn rank_roundtrips_every_level() {
        for level in [
            RiskLevel::Low,
            RiskLevel::LowMedium,
            RiskLevel::Medium,
            RiskLevel::High,
            RiskLevel::VeryHigh,
        ] {
            assert_eq!(RiskLevel::from_rank(level.rank()), Some(level));
        }
        assert_eq!(RiskLevel::from_rank(5), None);
    }

    #[test]
    fn absent_factor_scores_zero() {
        let score = FactorScore::new("fever", 4, false);
        assert_eq!(score.weighted_score, 0);
        let score = FactorScore::new("fever", 4, true);
        assert_eq!(score.weighted_score, 4);
    }
}
