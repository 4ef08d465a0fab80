use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::error::EngineError;
use crate::core::{EngineKind, FactorScore, RiskLevel, RiskVerdict, VerdictDetails};
use crate::engines::consultation::ConsultationAdvice;
use crate::engines::score;

/// Dengue symptoms recognised by the symptom checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symptom {
    Fever,
    Headache,
    JointPain,
    MusclePain,
    Rash,
    Nausea,
    Vomiting,
    Bleeding,
}

impl Symptom {
    pub const ALL: [Symptom; 8] = [
        Symptom::Fever,
        Symptom::Headache,
        Symptom::JointPain,
        Symptom::MusclePain,
        Symptom::Rash,
        Symptom::Nausea,
        Symptom::Vomiting,
        Symptom::Bleeding,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Symptom::Fever => "fever",
            Symptom::Headache => "headache",
            Symptom::JointPain => "joint_pain",
            Symptom::MusclePain => "muscle_pain",
            Symptom::Rash => "rash",
            Symptom::Nausea => "nausea",
            Symptom::Vomiting => "vomiting",
            Symptom::Bleeding => "bleeding",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Symptom::Fever => "Fever",
            Symptom::Headache => "Headache",
            Symptom::JointPain => "Joint Pain",
            Symptom::MusclePain => "Muscle Pain",
            Symptom::Rash => "Rash",
            Symptom::Nausea => "Nausea",
            Symptom::Vomiting => "Vomiting",
            Symptom::Bleeding => "Bleeding",
        }
    }

    /// WHO-inspired weight.
    pub fn weight(&self) -> u32 {
        match self {
            Symptom::Fever => 4,
            Symptom::Headache => 2,
            Symptom::JointPain => 3,
            Symptom::MusclePain => 2,
            Symptom::Rash => 2,
            Symptom::Nausea => 1,
            Symptom::Vomiting => 2,
            Symptom::Bleeding => 4,
        }
    }

    /// Dengue warning signs call for urgent care whatever the score.
    pub fn is_warning_sign(&self) -> bool {
        matches!(self, Symptom::Bleeding | Symptom::Vomiting)
    }
}

impl fmt::Display for Symptom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Symptom {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace([' ', '-'], "_");
        Symptom::ALL
            .into_iter()
            .find(|symptom| symptom.key() == key)
            .ok_or_else(|| EngineError::invalid(format!("unknown symptom '{s}'")))
    }
}

/// The set of symptoms a person reports as present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomSet(BTreeSet<Symptom>);

impl SymptomSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(key, present)` pairs. Unknown keys are rejected.
    pub fn from_flags<I, K>(flags: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = (K, bool)>,
        K: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for (key, present) in flags {
            let symptom: Symptom = key.as_ref().parse()?;
            if present {
                set.insert(symptom);
            }
        }
        Ok(Self(set))
    }

    pub fn with(mut self, symptom: Symptom) -> Self {
        self.0.insert(symptom);
        self
    }

    pub fn contains(&self, symptom: Symptom) -> bool {
        self.0.contains(&symptom)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Present symptoms in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Symptom> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Symptom> for SymptomSet {
    fn from_iter<T: IntoIterator<Item = Symptom>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomDetails {
    pub present_symptoms: Vec<String>,
    pub warning_signs: Vec<String>,
    pub urgency: String,
    pub who_notes: Vec<String>,
    pub consultation: ConsultationAdvice,
}

/// Score a set of symptoms against the WHO-inspired weight table.
pub fn assess_symptoms(symptoms: &SymptomSet) -> RiskVerdict {
    let factor_scores: Vec<FactorScore> = Symptom::ALL
        .iter()
        .map(|s| FactorScore::new(s.key(), s.weight(), symptoms.contains(*s)))
        .collect();
    let total = score::total_score(&factor_scores);

    let risk_level = if total >= 8 || symptoms.contains(Symptom::Bleeding) {
        RiskLevel::High
    } else if total >= 5 || symptoms.len() >= 3 {
        RiskLevel::Medium
    } else if total >= 2 {
        RiskLevel::LowMedium
    } else {
        RiskLevel::Low
    };

    let present_symptoms: Vec<String> = symptoms.iter().map(|s| s.display_name().to_string()).collect();
    let warning_signs: Vec<String> = symptoms
        .iter()
        .filter(Symptom::is_warning_sign)
        .map(|s| s.display_name().to_string())
        .collect();

    let mut who_notes = Vec::new();
    if symptoms.contains(Symptom::Fever) {
        who_notes.push("Fever is the most common symptom of dengue".to_string());
    }
    if symptoms.contains(Symptom::JointPain) || symptoms.contains(Symptom::MusclePain) {
        who_notes.push("Body aches are characteristic of dengue fever".to_string());
    }
    if !warning_signs.is_empty() {
        who_notes.push("Warning signs detected - immediate medical care needed".to_string());
    }

    let (label, color_tag, urgency) = match risk_level {
        RiskLevel::High | RiskLevel::VeryHigh => ("High", "danger", "Immediate medical attention required"),
        RiskLevel::Medium => ("Medium", "warning", "Medical consultation recommended"),
        RiskLevel::LowMedium => ("Low-Medium", "info", "Monitor symptoms and consider medical advice"),
        RiskLevel::Low => ("Low", "success", "Continue preventive measures"),
    };

    let mut explanations = Vec::with_capacity(present_symptoms.len() + 1);
    for s in symptoms.iter() {
        explanations.push(format!("{} present (+{})", s.display_name(), s.weight()));
    }
    if symptoms.contains(Symptom::Bleeding) && total < 8 {
        explanations.push("Bleeding is a warning sign and forces a High rating regardless of score".to_string());
    }

    tracing::debug!("Symptom assessment: score={total}, present={} -> {label}", symptoms.len());

    RiskVerdict {
        engine: EngineKind::Symptoms,
        risk_level,
        label: label.to_string(),
        numeric_score: total as f64,
        color_tag: color_tag.to_string(),
        message: format!("{label} dengue likelihood (symptom score {total}). {urgency}."),
        recommendations: recommendations(risk_level),
        explanations,
        factor_scores,
        low_confidence: false,
        details: VerdictDetails::Symptoms(SymptomDetails {
            present_symptoms,
            warning_signs,
            urgency: urgency.to_string(),
            who_notes,
            consultation: ConsultationAdvice::for_risk(risk_level, symptoms.len()),
        }),
        computed_at: Utc::now(),
    }
}

fn recommendations(level: RiskLevel) -> Vec<String> {
    let lines: &[&str] = match level {
        RiskLevel::High | RiskLevel::VeryHigh => &[
            "SEEK IMMEDIATE MEDICAL ATTENTION",
            "Go to the nearest hospital or healthcare center",
            "Do not take aspirin or ibuprofen",
            "Monitor for signs of shock or severe bleeding",
            "Stay hydrated with oral rehydration solution",
        ],
        RiskLevel::Medium => &[
            "Consult a healthcare provider within 24 hours",
            "Monitor symptoms closely",
            "Rest and maintain fluid intake",
            "Avoid aspirin and NSAIDs",
            "Use paracetamol for fever if needed",
        ],
        RiskLevel::LowMedium => &[
            "Monitor symptoms for 24-48 hours",
            "Rest and stay hydrated",
            "Avoid mosquito bites",
            "Seek medical advice if symptoms worsen",
            "Maintain fever diary if present",
        ],
        RiskLevel::Low => &[
            "Continue dengue prevention measures",
            "Stay alert for symptom development",
            "Maintain good hygiene",
            "Avoid mosquito breeding sites",
        ],
    };
    lines.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::consultation::ConsultationUrgency;

    fn details(verdict: &RiskVerdict) -> &SymptomDetails {
        match &verdict.details {
            VerdictDetails::Symptoms(d) => d,
            other => panic!("expected symptom details, got {other:?}"),
        }
    }

    #[test]
    fn no_symptoms_is_low() {
        let verdict = assess_symptoms(&SymptomSet::new());
        assert_eq!(verdict.risk_level, RiskLevel::Low);
        assert_eq!(verdict.numeric_score, 0.0);
        assert!(details(&verdict).who_notes.is_empty());
    }

    #[test]
    fn consultation_uses_tier_and_symptom_count() {
        let verdict = assess_symptoms(&SymptomSet::new().with(Symptom::Bleeding));
        let advice = &details(&verdict).consultation;
        assert!(advice.show_consultation);
        assert_eq!(advice.urgency, ConsultationUrgency::Within24Hours);

        let set: SymptomSet = [Symptom::Fever, Symptom::Headache, Symptom::JointPain, Symptom::Rash]
            .into_iter()
            .collect();
        let verdict = assess_symptoms(&set);
        assert_eq!(details(&verdict).consultation.urgency, ConsultationUrgency::Immediate);

        let verdict = assess_symptoms(&SymptomSet::new());
        let advice = &details(&verdict).consultation;
        assert!(!advice.show_consultation);
        assert_eq!(advice.urgency, ConsultationUrgency::Routine);
    }

    #[test]
    fn bleeding_alone_forces_high() {
        let verdict = assess_symptoms(&SymptomSet::new().with(Symptom::Bleeding));
        assert_eq!(verdict.numeric_score, 4.0);
        assert_eq!(verdict.risk_level, RiskLevel::High);
        assert_eq!(details(&verdict).warning_signs, vec!["Bleeding"]);
    }

    #[test]
    fn fever_joint_pain_rash_is_high() {
        let set: SymptomSet = [Symptom::Fever, Symptom::JointPain, Symptom::Rash].into_iter().collect();
        let verdict = assess_symptoms(&set);
        assert_eq!(verdict.numeric_score, 9.0);
        assert_eq!(verdict.risk_level, RiskLevel::High);
        let d = details(&verdict);
        assert_eq!(d.present_symptoms, vec!["Fever", "Joint Pain", "Rash"]);
        assert!(d.warning_signs.is_empty());
        assert_eq!(d.who_notes.len(), 2);
    }

    #[test]
    fn three_mild_symptoms_is_medium() {
        let set: SymptomSet = [Symptom::Nausea, Symptom::Headache, Symptom::Rash].into_iter().collect();
        let verdict = assess_symptoms(&set);
        assert_eq!(verdict.risk_level, RiskLevel::Medium);
        assert_eq!(verdict.label, "Medium");
    }

    #[test]
    fn two_mild_symptoms_is_low_medium() {
        let set = SymptomSet::from_flags([("nausea", true), ("headache", true), ("muscle_pain", false)]).unwrap();
        // 1 + 2 = 3, two symptoms
        assert_eq!(assess_symptoms(&set).risk_level, RiskLevel::LowMedium);
    }

    #[test]
    fn single_headache_is_low_medium() {
        let verdict = assess_symptoms(&SymptomSet::new().with(Symptom::Headache));
        assert_eq!(verdict.risk_level, RiskLevel::LowMedium);
        assert_eq!(verdict.color_tag, "info");
    }

    #[test]
    fn nausea_alone_is_low() {
        let verdict = assess_symptoms(&SymptomSet::new().with(Symptom::Nausea));
        assert_eq!(verdict.risk_level, RiskLevel::Low);
    }

    #[test]
    fn vomiting_is_flagged_without_forcing_high() {
        let verdict = assess_symptoms(&SymptomSet::new().with(Symptom::Vomiting));
        assert_eq!(verdict.risk_level, RiskLevel::LowMedium);
        let d = details(&verdict);
        assert_eq!(d.warning_signs, vec!["Vomiting"]);
        assert!(d.who_notes.iter().any(|n| n.contains("Warning signs")));
    }

    #[test]
    fn unknown_symptom_key_rejected() {
        let err = SymptomSet::from_flags([("fever", true), ("sneezing", true)]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn keys_parse_loosely() {
        assert_eq!("Joint Pain".parse::<Symptom>().unwrap(), Symptom::JointPain);
        assert_eq!("muscle-pain".parse::<Symptom>().unwrap(), Symptom::MusclePain);
        assert_eq!(" FEVER ".parse::<Symptom>().unwrap(), Symptom::Fever);
    }

    #[test]
    fn serde_uses_snake_case_keys() {
        let set = SymptomSet::new().with(Symptom::JointPain);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["joint_pain"]"#);
    }

    #[test]
    fn identical_input_identical_verdict() {
        let set: SymptomSet = [Symptom::Fever, Symptom::Bleeding].into_iter().collect();
        let a = assess_symptoms(&set);
        let mut b = assess_symptoms(&set);
        b.computed_at = a.computed_at;
        assert_eq!(a, b);
    }
}
