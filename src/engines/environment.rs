use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::error::EngineError;
use crate::core::{EngineKind, FactorScore, RiskLevel, RiskVerdict, VerdictDetails};
use crate::engines::score;

/// Household and neighbourhood conditions that favour Aedes breeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentalFactor {
    StagnantWater,
    MosquitoIncrease,
    RecentTravel,
    SickContacts,
    PoorDrainage,
    WaterStorage,
    GardenPlants,
    ConstructionNearby,
    AcCooler,
    GarbageCollection,
}

impl EnvironmentalFactor {
    pub const ALL: [EnvironmentalFactor; 10] = [
        EnvironmentalFactor::StagnantWater,
        EnvironmentalFactor::MosquitoIncrease,
        EnvironmentalFactor::RecentTravel,
        EnvironmentalFactor::SickContacts,
        EnvironmentalFactor::PoorDrainage,
        EnvironmentalFactor::WaterStorage,
        EnvironmentalFactor::GardenPlants,
        EnvironmentalFactor::ConstructionNearby,
        EnvironmentalFactor::AcCooler,
        EnvironmentalFactor::GarbageCollection,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            EnvironmentalFactor::StagnantWater => "stagnant_water",
            EnvironmentalFactor::MosquitoIncrease => "mosquito_increase",
            EnvironmentalFactor::RecentTravel => "recent_travel",
            EnvironmentalFactor::SickContacts => "sick_contacts",
            EnvironmentalFactor::PoorDrainage => "poor_drainage",
            EnvironmentalFactor::WaterStorage => "water_storage",
            EnvironmentalFactor::GardenPlants => "garden_plants",
            EnvironmentalFactor::ConstructionNearby => "construction_nearby",
            EnvironmentalFactor::AcCooler => "ac_cooler",
            EnvironmentalFactor::GarbageCollection => "garbage_collection",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            EnvironmentalFactor::StagnantWater => "Stagnant water near home",
            EnvironmentalFactor::MosquitoIncrease => "Noticed increase in mosquitoes",
            EnvironmentalFactor::RecentTravel => "Recent travel to dengue-affected areas",
            EnvironmentalFactor::SickContacts => "Contact with dengue patients",
            EnvironmentalFactor::PoorDrainage => "Poor drainage in your area",
            EnvironmentalFactor::WaterStorage => "Uncovered water storage containers",
            EnvironmentalFactor::GardenPlants => "Many potted plants or garden",
            EnvironmentalFactor::ConstructionNearby => "Construction activity nearby",
            EnvironmentalFactor::AcCooler => "Air cooler or AC with water collection",
            EnvironmentalFactor::GarbageCollection => "Irregular garbage collection",
        }
    }

    pub fn weight(&self) -> u32 {
        match self {
            EnvironmentalFactor::StagnantWater => 3,
            EnvironmentalFactor::MosquitoIncrease
            | EnvironmentalFactor::RecentTravel
            | EnvironmentalFactor::SickContacts
            | EnvironmentalFactor::PoorDrainage
            | EnvironmentalFactor::WaterStorage => 2,
            EnvironmentalFactor::GardenPlants
            | EnvironmentalFactor::ConstructionNearby
            | EnvironmentalFactor::AcCooler
            | EnvironmentalFactor::GarbageCollection => 1,
        }
    }

    /// Section of targeted advice appended when this factor is present.
    fn advice(&self) -> (&'static str, &'static [&'static str]) {
        match self {
            EnvironmentalFactor::StagnantWater => (
                "WATER MANAGEMENT",
                &[
                    "Check and empty water from flower pots, buckets, containers",
                    "Clean bird baths and pet water dishes weekly",
                    "Fix leaky pipes and faucets immediately",
                    "Ensure proper drainage in garden areas",
                ],
            ),
            EnvironmentalFactor::MosquitoIncrease => (
                "MOSQUITO CONTROL",
                &[
                    "Use mosquito nets while sleeping",
                    "Apply EPA-approved repellents",
                    "Install screens on windows and doors",
                    "Use fans to create air circulation",
                ],
            ),
            EnvironmentalFactor::RecentTravel => (
                "TRAVEL PRECAUTIONS",
                &[
                    "Watch for fever for two weeks after returning",
                    "Keep using repellent after travel to avoid spreading infection",
                    "Mention your travel history when consulting a doctor",
                ],
            ),
            EnvironmentalFactor::SickContacts => (
                "CONTACT PRECAUTIONS",
                &[
                    "Keep dengue patients under mosquito nets, day and night",
                    "Monitor household members for fever and body aches",
                    "Remove breeding sites around the patient's home first",
                ],
            ),
            EnvironmentalFactor::PoorDrainage => (
                "PROPERTY MAINTENANCE",
                &[
                    "Clear blocked drains and gutters",
                    "Level uneven ground to prevent water pooling",
                    "Install proper drainage systems",
                    "Contact local authorities about public drainage issues",
                ],
            ),
            EnvironmentalFactor::WaterStorage => (
                "WATER STORAGE",
                &[
                    "Cover all water storage tanks and containers",
                    "Clean storage containers weekly",
                    "Use tight-fitting lids on water containers",
                    "Add mosquito dunks to permanent water features",
                ],
            ),
            EnvironmentalFactor::GardenPlants => (
                "GARDEN MANAGEMENT",
                &[
                    "Remove water from plant saucers daily",
                    "Trim overgrown vegetation",
                    "Use sand instead of water in plant saucers",
                    "Maintain proper plant spacing for air circulation",
                ],
            ),
            EnvironmentalFactor::ConstructionNearby => (
                "CONSTRUCTION SITES",
                &[
                    "Ask site managers to cover curing tanks and drain pooled water",
                    "Report waterlogged pits and debris to the local ward office",
                ],
            ),
            EnvironmentalFactor::AcCooler => (
                "COOLERS AND AC UNITS",
                &[
                    "Drain and dry air cooler tanks at least once a week",
                    "Empty AC drip trays and check outlet pipes for pooling",
                ],
            ),
            EnvironmentalFactor::GarbageCollection => (
                "WASTE MANAGEMENT",
                &[
                    "Dispose of tyres, cans and coconut shells that collect rainwater",
                    "Keep bins covered and request regular municipal pickup",
                ],
            ),
        }
    }
}

impl fmt::Display for EnvironmentalFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for EnvironmentalFactor {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace([' ', '-'], "_");
        EnvironmentalFactor::ALL
            .into_iter()
            .find(|factor| factor.key() == key)
            .ok_or_else(|| EngineError::invalid(format!("unknown environmental factor '{s}'")))
    }
}

/// The risk factors a household reports as present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentalFactorSet(BTreeSet<EnvironmentalFactor>);

impl EnvironmentalFactorSet {
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
            let factor: EnvironmentalFactor = key.as_ref().parse()?;
            if present {
                set.insert(factor);
            }
        }
        Ok(Self(set))
    }

    pub fn with(mut self, factor: EnvironmentalFactor) -> Self {
        self.0.insert(factor);
        self
    }

    pub fn contains(&self, factor: EnvironmentalFactor) -> bool {
        self.0.contains(&factor)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = EnvironmentalFactor> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<EnvironmentalFactor> for EnvironmentalFactorSet {
    fn from_iter<T: IntoIterator<Item = EnvironmentalFactor>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentFactor {
    pub factor: EnvironmentalFactor,
    pub description: String,
    pub weight: u32,
}

/// A titled block of advice lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSection {
    pub title: String,
    pub items: Vec<String>,
}

impl RecommendationSection {
    fn new(title: &str, items: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            items: items.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentDetails {
    pub max_score: u32,
    pub risk_percentage: f64,
    pub urgency: String,
    pub present_factors: Vec<PresentFactor>,
    pub high_weight_factors: Vec<PresentFactor>,
    pub medium_weight_factors: Vec<PresentFactor>,
    pub low_weight_factors: Vec<PresentFactor>,
    pub priority_actions: Vec<String>,
    pub detailed_recommendations: Vec<RecommendationSection>,
}

impl EnvironmentDetails {
    pub fn has_section(&self, title: &str) -> bool {
        self.detailed_recommendations.iter().any(|s| s.title == title)
    }
}

/// Order of the advice sections: breeding sites first, then household
/// precautions.
const SECTION_ORDER: [EnvironmentalFactor; 10] = [
    EnvironmentalFactor::StagnantWater,
    EnvironmentalFactor::MosquitoIncrease,
    EnvironmentalFactor::WaterStorage,
    EnvironmentalFactor::GardenPlants,
    EnvironmentalFactor::PoorDrainage,
    EnvironmentalFactor::RecentTravel,
    EnvironmentalFactor::SickContacts,
    EnvironmentalFactor::ConstructionNearby,
    EnvironmentalFactor::AcCooler,
    EnvironmentalFactor::GarbageCollection,
];

const IMMEDIATE_ACTIONS: &[&str] = &[
    "Conduct daily property inspections",
    "Coordinate with neighbors for area-wide prevention",
    "Contact local health authorities if needed",
    "Consider professional pest control consultation",
];

/// Score household risk factors and build targeted advice.
pub fn assess_environment(factors: &EnvironmentalFactorSet) -> RiskVerdict {
    let factor_scores: Vec<FactorScore> = EnvironmentalFactor::ALL
        .iter()
        .map(|f| FactorScore::new(f.key(), f.weight(), factors.contains(*f)))
        .collect();
    let total = score::total_score(&factor_scores);
    let max = score::max_score(&factor_scores);
    let risk_percentage = score::percentage(total, max);

    let (risk_level, label, color_tag, urgency) = tier(total);
    let priority_actions = priority_actions(risk_level);

    let mut detailed_recommendations: Vec<RecommendationSection> = SECTION_ORDER
        .iter()
        .copied()
        .filter(|f| factors.contains(*f))
        .map(|f| {
            let (title, items) = f.advice();
            RecommendationSection::new(title, items)
        })
        .collect();
    if risk_level >= RiskLevel::High {
        detailed_recommendations.push(RecommendationSection::new("IMMEDIATE ACTIONS", IMMEDIATE_ACTIONS));
    }

    let present_factors: Vec<PresentFactor> = factors
        .iter()
        .map(|f| PresentFactor {
            factor: f,
            description: f.description().to_string(),
            weight: f.weight(),
        })
        .collect();
    let bucket = |pred: fn(u32) -> bool| -> Vec<PresentFactor> {
        present_factors.iter().filter(|p| pred(p.weight)).cloned().collect()
    };
    let high_weight_factors = bucket(|w| w >= 3);
    let medium_weight_factors = bucket(|w| w == 2);
    let low_weight_factors = bucket(|w| w == 1);

    let explanations = present_factors
        .iter()
        .map(|p| format!("{} (+{})", p.description, p.weight))
        .collect();

    tracing::debug!("Environment assessment: score={total}/{max} -> {label}");

    RiskVerdict {
        engine: EngineKind::Environment,
        risk_level,
        label: label.to_string(),
        numeric_score: total as f64,
        color_tag: color_tag.to_string(),
        message: format!("{label} household dengue risk: score {total} of {max} ({risk_percentage}%). {urgency}."),
        recommendations: priority_actions.clone(),
        explanations,
        factor_scores,
        low_confidence: false,
        details: VerdictDetails::Environment(EnvironmentDetails {
            max_score: max,
            risk_percentage,
            urgency: urgency.to_string(),
            present_factors,
            high_weight_factors,
            medium_weight_factors,
            low_weight_factors,
            priority_actions,
            detailed_recommendations,
        }),
        computed_at: Utc::now(),
    }
}

fn tier(total: u32) -> (RiskLevel, &'static str, &'static str, &'static str) {
    if total >= 12 {
        (RiskLevel::VeryHigh, "Very High", "danger", "Immediate action required")
    } else if total >= 8 {
        (RiskLevel::High, "High", "warning", "Take action within 24 hours")
    } else if total >= 5 {
        (RiskLevel::Medium, "Medium", "info", "Take preventive action this week")
    } else if total >= 2 {
        (RiskLevel::LowMedium, "Low-Medium", "primary", "Continue preventive measures")
    } else {
        (RiskLevel::Low, "Low", "success", "Maintain current practices")
    }
}

fn priority_actions(level: RiskLevel) -> Vec<String> {
    let lines: &[&str] = match level {
        RiskLevel::VeryHigh => &[
            "URGENT: Remove all stagnant water immediately",
            "Apply mosquito control measures today",
            "Use personal protection consistently",
            "Consider professional pest control",
        ],
        RiskLevel::High => &[
            "Remove stagnant water sources",
            "Increase mosquito control measures",
            "Use repellents and protective clothing",
            "Improve drainage around property",
        ],
        RiskLevel::Medium => &[
            "Weekly inspection for breeding sites",
            "Cover water storage containers",
            "Use mosquito nets and repellents",
            "Maintain clean surroundings",
        ],
        RiskLevel::LowMedium => &[
            "Regular cleaning and maintenance",
            "Monitor for mosquito activity",
            "Keep water containers covered",
            "Maintain good sanitation",
        ],
        RiskLevel::Low => &[
            "Continue good practices",
            "Stay vigilant for changes",
            "Regular property maintenance",
            "Community awareness",
        ],
    };
    lines.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::EnvironmentalFactor::*;

    fn details(verdict: &RiskVerdict) -> &EnvironmentDetails {
        match &verdict.details {
            VerdictDetails::Environment(d) => d,
            other => panic!("expected environment details, got {other:?}"),
        }
    }

    fn set(factors: &[EnvironmentalFactor]) -> EnvironmentalFactorSet {
        factors.iter().copied().collect()
    }

    #[test]
    fn weights_sum_to_seventeen() {
        let total: u32 = EnvironmentalFactor::ALL.iter().map(|f| f.weight()).sum();
        assert_eq!(total, 17);
    }

    #[test]
    fn nothing_present_is_low() {
        let verdict = assess_environment(&EnvironmentalFactorSet::new());
        assert_eq!(verdict.risk_level, RiskLevel::Low);
        let d = details(&verdict);
        assert_eq!(d.risk_percentage, 0.0);
        assert!(d.detailed_recommendations.is_empty());
    }

    #[test]
    fn stagnant_water_and_mosquitoes_is_medium() {
        let verdict = assess_environment(&set(&[StagnantWater, MosquitoIncrease]));
        assert_eq!(verdict.numeric_score, 5.0);
        assert_eq!(verdict.risk_level, RiskLevel::Medium);
        let d = details(&verdict);
        assert!(d.has_section("WATER MANAGEMENT"));
        assert!(d.has_section("MOSQUITO CONTROL"));
        assert!(!d.has_section("WATER STORAGE"));
        assert!(!d.has_section("IMMEDIATE ACTIONS"));
        assert_eq!(d.risk_percentage, 29.4);
    }

    #[test]
    fn everything_present_is_very_high() {
        let verdict = assess_environment(&set(&EnvironmentalFactor::ALL));
        assert_eq!(verdict.numeric_score, 17.0);
        assert_eq!(verdict.risk_level, RiskLevel::VeryHigh);
        assert_eq!(verdict.label, "Very High");
        let d = details(&verdict);
        assert_eq!(d.risk_percentage, 100.0);
        // One section per factor plus the immediate actions block
        assert_eq!(d.detailed_recommendations.len(), 11);
        assert_eq!(d.detailed_recommendations.last().unwrap().title, "IMMEDIATE ACTIONS");
    }

    #[test]
    fn high_tier_appends_immediate_actions() {
        // 2 + 2 + 2 + 2 = 8
        let verdict = assess_environment(&set(&[RecentTravel, SickContacts, PoorDrainage, WaterStorage]));
        assert_eq!(verdict.risk_level, RiskLevel::High);
        let d = details(&verdict);
        let titles: Vec<&str> = d.detailed_recommendations.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "WATER STORAGE",
                "PROPERTY MAINTENANCE",
                "TRAVEL PRECAUTIONS",
                "CONTACT PRECAUTIONS",
                "IMMEDIATE ACTIONS"
            ]
        );
    }

    #[test]
    fn storage_and_garden_sections_precede_property_maintenance() {
        let verdict = assess_environment(&set(&[PoorDrainage, WaterStorage, GardenPlants]));
        let d = details(&verdict);
        let titles: Vec<&str> = d.detailed_recommendations.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["WATER STORAGE", "GARDEN MANAGEMENT", "PROPERTY MAINTENANCE"]);
    }

    #[test]
    fn section_order_lists_every_factor_once() {
        let ordered: BTreeSet<EnvironmentalFactor> = SECTION_ORDER.iter().copied().collect();
        assert_eq!(ordered.len(), EnvironmentalFactor::ALL.len());
    }

    #[test]
    fn tier_thresholds() {
        assert_eq!(tier(1).0, RiskLevel::Low);
        assert_eq!(tier(2).0, RiskLevel::LowMedium);
        assert_eq!(tier(4).0, RiskLevel::LowMedium);
        assert_eq!(tier(5).0, RiskLevel::Medium);
        assert_eq!(tier(8).0, RiskLevel::High);
        assert_eq!(tier(11).0, RiskLevel::High);
        assert_eq!(tier(12).0, RiskLevel::VeryHigh);
    }

    #[test]
    fn factors_grouped_by_weight() {
        let verdict = assess_environment(&set(&[StagnantWater, WaterStorage, AcCooler, GarbageCollection]));
        let d = details(&verdict);
        assert_eq!(d.high_weight_factors.len(), 1);
        assert_eq!(d.medium_weight_factors.len(), 1);
        assert_eq!(d.low_weight_factors.len(), 2);
        assert_eq!(d.present_factors.len(), 4);
    }

    #[test]
    fn adding_a_factor_never_lowers_the_rating() {
        // Walk every subset in a fixed order, adding one factor at a time
        for start in 0..EnvironmentalFactor::ALL.len() {
            let mut current = EnvironmentalFactorSet::new();
            let mut previous = assess_environment(&current);
            for offset in 0..EnvironmentalFactor::ALL.len() {
                let factor = EnvironmentalFactor::ALL[(start + offset) % EnvironmentalFactor::ALL.len()];
                current = current.with(factor);
                let next = assess_environment(&current);
                assert!(next.numeric_score >= previous.numeric_score);
                assert!(next.risk_level >= previous.risk_level);
                previous = next;
            }
        }
    }

    #[test]
    fn unknown_factor_rejected() {
        assert!(EnvironmentalFactorSet::from_flags([("stagnant_water", true), ("pets", false)]).is_err());
    }

    #[test]
    fn flags_skip_absent_factors() {
        let factors = EnvironmentalFactorSet::from_flags([("stagnant_water", true), ("ac_cooler", false)]).unwrap();
        assert_eq!(factors.len(), 1);
        assert!(factors.contains(StagnantWater));
    }
}
