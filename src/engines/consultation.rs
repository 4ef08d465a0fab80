//! When and how urgently to see a doctor, derived from a verdict's tier and
//! the number of symptoms reported.

use serde::{Deserialize, Serialize};

use crate::core::RiskLevel;

/// Symptom count at which a consultation is always suggested.
const SHOW_AT_SYMPTOMS: usize = 3;
const IMMEDIATE_AT_SYMPTOMS: usize = 4;
const WITHIN_DAY_AT_SYMPTOMS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConsultationUrgency {
    #[serde(rename = "routine")]
    Routine,
    #[serde(rename = "within_24_hours")]
    Within24Hours,
    #[serde(rename = "immediate")]
    Immediate,
}

impl ConsultationUrgency {
    pub fn from_risk(level: RiskLevel, symptom_count: usize) -> Self {
        if level >= RiskLevel::VeryHigh || symptom_count >= IMMEDIATE_AT_SYMPTOMS {
            ConsultationUrgency::Immediate
        } else if level >= RiskLevel::High || symptom_count >= WITHIN_DAY_AT_SYMPTOMS {
            ConsultationUrgency::Within24Hours
        } else {
            ConsultationUrgency::Routine
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ConsultationUrgency::Immediate => {
                "🚨 Immediate medical attention required! Contact emergency services or visit nearest hospital."
            }
            ConsultationUrgency::Within24Hours => {
                "⚠️ Consult a doctor within 24 hours for proper evaluation and treatment."
            }
            ConsultationUrgency::Routine => "💡 Consider consulting a doctor for preventive care and health advice.",
        }
    }

    fn next_steps(&self) -> &'static [&'static str] {
        match self {
            ConsultationUrgency::Immediate => &[
                "Call emergency services (108) immediately",
                "Visit nearest hospital emergency room",
                "Inform family members about your condition",
                "Carry ID and medical records if available",
            ],
            ConsultationUrgency::Within24Hours => &[
                "Book an appointment with a general physician",
                "Monitor symptoms and note any changes",
                "Stay hydrated and take rest",
                "Avoid self-medication",
                "Consider telemedicine consultation if unable to visit",
            ],
            ConsultationUrgency::Routine => &[
                "Schedule a routine health checkup",
                "Discuss prevention strategies with doctor",
                "Review your health profile and risk factors",
                "Consider vaccination if recommended",
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationAdvice {
    /// Whether a doctor visit should be actively suggested.
    pub show_consultation: bool,
    pub urgency: ConsultationUrgency,
    pub message: String,
    pub next_steps: Vec<String>,
}

impl ConsultationAdvice {
    pub fn for_risk(level: RiskLevel, symptom_count: usize) -> Self {
        let urgency = ConsultationUrgency::from_risk(level, symptom_count);
        Self {
            show_consultation: level >= RiskLevel::High || symptom_count >= SHOW_AT_SYMPTOMS,
            urgency,
            message: urgency.message().to_string(),
            next_steps: urgency.next_steps().iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_drives_urgency_without_symptoms() {
        assert_eq!(ConsultationUrgency::from_risk(RiskLevel::VeryHigh, 0), ConsultationUrgency::Immediate);
        assert_eq!(ConsultationUrgency::from_risk(RiskLevel::High, 0), ConsultationUrgency::Within24Hours);
        assert_eq!(ConsultationUrgency::from_risk(RiskLevel::Medium, 0), ConsultationUrgency::Routine);
        assert_eq!(ConsultationUrgency::from_risk(RiskLevel::Low, 0), ConsultationUrgency::Routine);
    }

    #[test]
    fn symptom_count_boundaries() {
        assert_eq!(ConsultationUrgency::from_risk(RiskLevel::Low, 1), ConsultationUrgency::Routine);
        assert_eq!(ConsultationUrgency::from_risk(RiskLevel::Low, 2), ConsultationUrgency::Within24Hours);
        assert_eq!(ConsultationUrgency::from_risk(RiskLevel::Low, 3), ConsultationUrgency::Within24Hours);
        assert_eq!(ConsultationUrgency::from_risk(RiskLevel::Low, 4), ConsultationUrgency::Immediate);
    }

    #[test]
    fn shown_for_high_tiers_or_three_symptoms() {
        assert!(!ConsultationAdvice::for_risk(RiskLevel::Medium, 2).show_consultation);
        assert!(ConsultationAdvice::for_risk(RiskLevel::Medium, 3).show_consultation);
        assert!(ConsultationAdvice::for_risk(RiskLevel::High, 0).show_consultation);
        assert!(ConsultationAdvice::for_risk(RiskLevel::VeryHigh, 0).show_consultation);
    }

    #[test]
    fn next_steps_follow_urgency() {
        let advice = ConsultationAdvice::for_risk(RiskLevel::VeryHigh, 0);
        assert_eq!(advice.next_steps[0], "Call emergency services (108) immediately");
        assert!(advice.message.contains("Immediate medical attention"));

        let advice = ConsultationAdvice::for_risk(RiskLevel::Low, 0);
        assert_eq!(advice.next_steps.len(), 4);
        assert_eq!(advice.next_steps[0], "Schedule a routine health checkup");
    }

    #[test]
    fn urgency_serializes_as_snake_case() {
        let json = serde_json::to_string(&ConsultationUrgency::Within24Hours).unwrap();
        assert_eq!(json, "\"within_24_hours\"");
    }
}
