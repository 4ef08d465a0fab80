//! Local case-trend analysis.
//!
//! Turns a location's case history into an alert tier plus trend analytics.
//! Records arrive unsorted and may carry unusable dates: those still count
//! towards totals but are left out of anything that depends on ordering
//! (week-over-week change, moving averages, weekday pattern).
//!
//! The alert tier is driven by the raw case total over the selected window.
//! When no record falls inside the window the analyzer falls back to the most
//! recent records available and says so through [`Provenance`].

use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::core::reading::CaseRecord;
use crate::core::{EngineKind, RiskLevel, RiskVerdict, VerdictDetails};
use crate::engines::consultation::ConsultationAdvice;
use crate::engines::score::round1;
use crate::location::LocationValidator;

pub const DEFAULT_WINDOW_DAYS: u32 = 30;
pub const DEFAULT_FALLBACK_RECORDS: usize = 30;

/// Records per side of the week-over-week comparison.
const TREND_SPAN: usize = 7;
const MIN_TREND_RECORDS: usize = 2 * TREND_SPAN;

/// Where the analysed records came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "days", rename_all = "snake_case")]
pub enum Provenance {
    /// Records dated within the last N days.
    LastDays(u32),
    /// Nothing in the window; the most recent records on file were used.
    RecentAvailable,
    NoData,
}

impl Provenance {
    pub fn describe(&self) -> String {
        match self {
            Provenance::LastDays(n) => format!("last {n} days"),
            Provenance::RecentAvailable => "recent available data".to_string(),
            Provenance::NoData => "no data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendStatus {
    RapidlyIncreasing,
    Increasing,
    Stable,
    Decreasing,
    RapidlyDecreasing,
    InsufficientData,
}

impl TrendStatus {
    pub fn from_change(change: f64) -> Self {
        if change > 20.0 {
            TrendStatus::RapidlyIncreasing
        } else if change > 5.0 {
            TrendStatus::Increasing
        } else if change < -20.0 {
            TrendStatus::RapidlyDecreasing
        } else if change < -5.0 {
            TrendStatus::Decreasing
        } else {
            TrendStatus::Stable
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrendStatus::RapidlyIncreasing => "Rapidly Increasing",
            TrendStatus::Increasing => "Increasing",
            TrendStatus::Stable => "Stable",
            TrendStatus::Decreasing => "Decreasing",
            TrendStatus::RapidlyDecreasing => "Rapidly Decreasing",
            TrendStatus::InsufficientData => "Insufficient Data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalytics {
    pub location: String,
    pub total_cases: u64,
    /// Records in the selection, undated ones included.
    pub records_used: usize,
    pub undated_records: usize,
    pub daily_average: f64,
    pub max_daily: u32,
    pub min_daily: u32,
    /// Population standard deviation of the daily counts.
    pub volatility: f64,
    /// Trailing 7-record averages over the dated selection, oldest first.
    pub moving_average_7: Vec<f64>,
    /// Percent change of the last 7 dated records against the 7 before.
    pub trend_change: f64,
    pub trend_status: TrendStatus,
    pub peak_weekday: Option<String>,
    pub provenance: Provenance,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    /// Doctor-visit advice for the alert tier.
    pub consultation: ConsultationAdvice,
}

impl TrendAnalytics {
    fn empty(location: &str) -> Self {
        Self {
            location: location.to_string(),
            total_cases: 0,
            records_used: 0,
            undated_records: 0,
            daily_average: 0.0,
            max_daily: 0,
            min_daily: 0,
            volatility: 0.0,
            moving_average_7: Vec::new(),
            trend_change: 0.0,
            trend_status: TrendStatus::InsufficientData,
            peak_weekday: None,
            provenance: Provenance::NoData,
            period_start: None,
            period_end: None,
            consultation: ConsultationAdvice::for_risk(RiskLevel::Low, 0),
        }
    }
}

/// Result of a location trend check. Invalid places and empty histories are
/// ordinary outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TrendOutcome {
    Assessed(RiskVerdict),
    /// No case records at all: a zeroed, low-confidence verdict.
    InsufficientData(RiskVerdict),
    InvalidLocation {
        query: String,
        suggestions: Vec<String>,
    },
}

impl TrendOutcome {
    pub fn verdict(&self) -> Option<&RiskVerdict> {
        match self {
            TrendOutcome::Assessed(v) | TrendOutcome::InsufficientData(v) => Some(v),
            TrendOutcome::InvalidLocation { .. } => None,
        }
    }

    pub fn analytics(&self) -> Option<&TrendAnalytics> {
        match self.verdict()?.details {
            VerdictDetails::Trend(ref analytics) => Some(analytics),
            _ => None,
        }
    }
}

/// The dated records chosen for analysis plus everything without a date.
struct Selection {
    dated: Vec<(NaiveDate, u32)>,
    undated: Vec<u32>,
    provenance: Provenance,
}

#[derive(Debug, Clone, Copy)]
pub struct TrendAnalyzer {
    pub window_days: u32,
    pub fallback_records: usize,
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            fallback_records: DEFAULT_FALLBACK_RECORDS,
        }
    }
}

impl TrendAnalyzer {
    pub fn new(window_days: u32, fallback_records: usize) -> Self {
        Self {
            window_days,
            fallback_records,
        }
    }

    pub fn assess(
        &self,
        query: &str,
        validator: &dyn LocationValidator,
        records: &[CaseRecord],
        today: NaiveDate,
    ) -> TrendOutcome {
        let check = validator.validate(query);
        let location = match (check.is_valid, check.canonical_name) {
            (true, Some(name)) => name,
            _ => {
                tracing::info!("Rejected location '{query}', suggesting {:?}", check.suggestions);
                return TrendOutcome::InvalidLocation {
                    query: query.trim().to_string(),
                    suggestions: check.suggestions,
                };
            }
        };

        let mut explanations = Vec::new();
        if let Some(details) = validator.details(&location) {
            explanations.push(format!("District: {}, State: {}", details.district, details.state));
        }

        if records.is_empty() {
            tracing::debug!("No case records for {location}");
            return TrendOutcome::InsufficientData(no_data_verdict(&location, explanations));
        }

        let selection = self.select(records, today);
        let analytics = analyze(&location, &selection);
        let dated_count = selection.dated.len();

        match selection.provenance {
            Provenance::RecentAvailable => explanations.push(format!(
                "Data period: recent available data (no records in the last {} days{})",
                self.window_days,
                match (analytics.period_start, analytics.period_end) {
                    (Some(start), Some(end)) => format!("; using records from {start} to {end}"),
                    _ => String::new(),
                }
            )),
            other => explanations.push(format!("Data period: {}", other.describe())),
        }
        if analytics.trend_status == TrendStatus::InsufficientData {
            explanations.push(format!(
                "Trend: insufficient data ({dated_count} dated records, {MIN_TREND_RECORDS} needed)"
            ));
        } else {
            explanations.push(format!(
                "Trend: {} ({:+.1}% vs previous {TREND_SPAN} records)",
                analytics.trend_status.label(),
                analytics.trend_change
            ));
        }
        if let Some(ref day) = analytics.peak_weekday {
            explanations.push(format!("Peak reporting day: {day}"));
        }
        if analytics.undated_records > 0 {
            explanations.push(format!(
                "{} records without a usable date counted in totals only",
                analytics.undated_records
            ));
        }

        let (risk_level, label, color_tag, headline) = tier(analytics.total_cases);
        let message = if risk_level == RiskLevel::Low {
            format!(
                "LOW RISK: Few or no recent dengue cases in {location} ({} cases, {})",
                analytics.total_cases,
                selection.provenance.describe()
            )
        } else {
            format!(
                "{headline}: {} dengue cases reported in {location} ({})",
                analytics.total_cases,
                selection.provenance.describe()
            )
        };

        let mut recommendations = base_recommendations(risk_level);
        match analytics.trend_status {
            TrendStatus::RapidlyIncreasing => recommendations.insert(
                1,
                format!(
                    "ALERT: Cases rose {:+.1}% week over week - step up prevention immediately",
                    analytics.trend_change
                ),
            ),
            TrendStatus::Decreasing | TrendStatus::RapidlyDecreasing => recommendations.push(format!(
                "Positive trend: cases fell {:.1}% week over week - keep up prevention measures",
                analytics.trend_change.abs()
            )),
            _ => {}
        }

        tracing::debug!(
            "Trend assessment for {location}: {} cases over {} records ({:?}) -> {label}",
            analytics.total_cases,
            analytics.records_used,
            selection.provenance
        );

        TrendOutcome::Assessed(RiskVerdict {
            engine: EngineKind::Trend,
            risk_level,
            label: label.to_string(),
            numeric_score: analytics.total_cases as f64,
            color_tag: color_tag.to_string(),
            message,
            recommendations,
            explanations,
            factor_scores: Vec::new(),
            low_confidence: dated_count < MIN_TREND_RECORDS,
            details: VerdictDetails::Trend(analytics),
            computed_at: Utc::now(),
        })
    }

    fn select(&self, records: &[CaseRecord], today: NaiveDate) -> Selection {
        let mut dated: Vec<(NaiveDate, u32)> = records
            .iter()
            .filter_map(|r| r.date.map(|d| (d, r.case_count)))
            .collect();
        dated.sort_by_key(|(date, _)| *date);
        let undated: Vec<u32> = records
            .iter()
            .filter(|r| r.date.is_none())
            .map(|r| r.case_count)
            .collect();

        // None when the window reaches past the earliest representable date
        let cutoff = today.checked_sub_signed(Duration::days(i64::from(self.window_days)));
        let in_window: Vec<(NaiveDate, u32)> = dated
            .iter()
            .copied()
            .filter(|(date, _)| cutoff.is_none_or(|c| *date > c) && *date <= today)
            .collect();

        if !in_window.is_empty() {
            return Selection {
                dated: in_window,
                undated,
                provenance: Provenance::LastDays(self.window_days),
            };
        }

        let start = dated.len().saturating_sub(self.fallback_records);
        Selection {
            dated: dated.split_off(start),
            undated,
            provenance: Provenance::RecentAvailable,
        }
    }
}

/// Assess a location's case history against the trailing `window_days`.
pub fn assess_location_trend(
    query: &str,
    validator: &dyn LocationValidator,
    records: &[CaseRecord],
    window_days: u32,
    today: NaiveDate,
) -> TrendOutcome {
    TrendAnalyzer::new(window_days, DEFAULT_FALLBACK_RECORDS).assess(query, validator, records, today)
}

fn analyze(location: &str, selection: &Selection) -> TrendAnalytics {
    let dated_counts: Vec<u32> = selection.dated.iter().map(|(_, c)| *c).collect();
    let counts: Vec<u32> = dated_counts
        .iter()
        .chain(selection.undated.iter())
        .copied()
        .collect();

    let total_cases: u64 = counts.iter().map(|&c| u64::from(c)).sum();
    let mean = if counts.is_empty() {
        0.0
    } else {
        total_cases as f64 / counts.len() as f64
    };
    let (trend_change, trend_status) = week_over_week(&dated_counts);

    TrendAnalytics {
        location: location.to_string(),
        total_cases,
        records_used: counts.len(),
        undated_records: selection.undated.len(),
        daily_average: round1(mean),
        max_daily: counts.iter().copied().max().unwrap_or(0),
        min_daily: counts.iter().copied().min().unwrap_or(0),
        volatility: round1(std_dev(&counts, mean)),
        moving_average_7: moving_average(&dated_counts, TREND_SPAN),
        trend_change: round1(trend_change),
        trend_status,
        peak_weekday: peak_weekday(&selection.dated).map(|d| weekday_name(d).to_string()),
        provenance: selection.provenance,
        period_start: selection.dated.first().map(|(d, _)| *d),
        period_end: selection.dated.last().map(|(d, _)| *d),
        consultation: ConsultationAdvice::for_risk(tier(total_cases).0, 0),
    }
}

fn week_over_week(counts: &[u32]) -> (f64, TrendStatus) {
    if counts.len() < MIN_TREND_RECORDS {
        return (0.0, TrendStatus::InsufficientData);
    }
    let n = counts.len();
    let recent: u64 = counts[n - TREND_SPAN..].iter().map(|&c| u64::from(c)).sum();
    let previous: u64 = counts[n - MIN_TREND_RECORDS..n - TREND_SPAN]
        .iter()
        .map(|&c| u64::from(c))
        .sum();

    let change = if previous > 0 {
        (recent as f64 - previous as f64) / previous as f64 * 100.0
    } else if recent > 0 {
        100.0
    } else {
        0.0
    };
    (change, TrendStatus::from_change(change))
}

fn moving_average(values: &[u32], span: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            let window = &values[(i + 1).saturating_sub(span)..=i];
            let sum: u64 = window.iter().map(|&c| u64::from(c)).sum();
            round1(sum as f64 / window.len() as f64)
        })
        .collect()
}

fn std_dev(values: &[u32], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values
        .iter()
        .map(|&v| {
            let diff = f64::from(v) - mean;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Weekday with the highest mean count; ties go to the earlier day (Monday first).
fn peak_weekday(dated: &[(NaiveDate, u32)]) -> Option<Weekday> {
    let mut buckets = [(0u64, 0u32); 7];
    for (date, count) in dated {
        let slot = &mut buckets[date.weekday().num_days_from_monday() as usize];
        slot.0 += u64::from(*count);
        slot.1 += 1;
    }

    let mut best: Option<(usize, f64)> = None;
    for (i, (sum, n)) in buckets.iter().enumerate() {
        if *n == 0 {
            continue;
        }
        let mean = *sum as f64 / f64::from(*n);
        if best.is_none_or(|(_, top)| mean > top) {
            best = Some((i, mean));
        }
    }
    best.map(|(i, _)| WEEKDAYS[i])
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Alert tier from the raw case total: (level, label, color, headline).
fn tier(total: u64) -> (RiskLevel, &'static str, &'static str, &'static str) {
    if total >= 300 {
        (RiskLevel::VeryHigh, "Critical Outbreak", "dark", "CRITICAL OUTBREAK")
    } else if total >= 150 {
        (RiskLevel::High, "High Alert", "danger", "HIGH ALERT")
    } else if total >= 50 {
        (RiskLevel::Medium, "Moderate", "warning", "MODERATE ALERT")
    } else if total >= 20 {
        (RiskLevel::LowMedium, "Watch", "info", "WATCH")
    } else {
        (RiskLevel::Low, "Low", "success", "LOW RISK")
    }
}

fn base_recommendations(level: RiskLevel) -> Vec<String> {
    let lines: &[&str] = match level {
        RiskLevel::VeryHigh => &[
            "EMERGENCY: Outbreak conditions reported in your area",
            "Remove ALL stagnant water sources today and re-check daily",
            "Sleep under mosquito nets and use repellents at all times",
            "Avoid outdoor activities during dawn and dusk",
            "Seek immediate medical attention for any fever",
            "Cooperate with municipal fogging and inspection teams",
            "Report suspected cases to health authorities",
        ],
        RiskLevel::High => &[
            "URGENT: Take immediate preventive action",
            "Remove ALL stagnant water sources",
            "Use mosquito nets and repellents consistently",
            "Avoid outdoor activities during dawn and dusk",
            "Seek immediate medical attention for any fever",
            "Alert neighbors about the dengue situation",
            "Report suspected cases to health authorities",
        ],
        RiskLevel::Medium => &[
            "CAUTION: Increase preventive measures",
            "Weekly inspection for stagnant water",
            "Use mosquito repellents regularly",
            "Keep windows and doors screened",
            "Monitor for dengue symptoms daily",
            "Educate family about dengue prevention",
        ],
        RiskLevel::LowMedium => &[
            "WATCH: Cases are being reported in your area",
            "Inspect your home weekly for stagnant water",
            "Use mosquito repellents in the early morning and evening",
            "Watch family members for fever or body aches",
            "Stay updated on local health bulletins",
        ],
        RiskLevel::Low => &[
            "PREVENTION: Continue protective measures",
            "Regular cleaning of water storage",
            "Proper waste management",
            "Community awareness participation",
            "Stay updated on local health bulletins",
        ],
    };
    lines.iter().map(|s| s.to_string()).collect()
}

fn no_data_verdict(location: &str, mut explanations: Vec<String>) -> RiskVerdict {
    explanations.push("Data period: no case records on file".to_string());
    RiskVerdict {
        engine: EngineKind::Trend,
        risk_level: RiskLevel::Low,
        label: "No Data".to_string(),
        numeric_score: 0.0,
        color_tag: "secondary".to_string(),
        message: format!("No recent dengue data available for {location}"),
        recommendations: [
            "Stay informed about dengue in your area",
            "Follow general dengue prevention guidelines",
            "Report any dengue-like symptoms to authorities",
            "Maintain good sanitation practices",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
        explanations,
        factor_scores: Vec::new(),
        low_confidence: true,
        details: VerdictDetails::Trend(TrendAnalytics::empty(location)),
        computed_at: Utc::now(),
    }
}
