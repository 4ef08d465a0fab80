use crate::core::FactorScore;

/// Sum of weights for the factors that are present.
pub fn total_score(scores: &[FactorScore]) -> u32 {
    scores.iter().map(|s| s.weighted_score).sum()
}

/// Highest score reachable if every factor were present.
pub fn max_score(scores: &[FactorScore]) -> u32 {
    scores.iter().map(|s| s.weight).sum()
}

/// Score as a percentage of the maximum, rounded to one decimal.
pub fn percentage(total: u32, max: u32) -> f64 {
    if max == 0 {
        return 0.0;
    }
    round1(total as f64 / max as f64 * 100.0)
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
