//! Wires the engines to their collaborators: weather provider, city
//! directory, case store, assessment log and desktop notifier.

use chrono::NaiveDate;

use crate::core::error::EngineError;
use crate::core::{RiskLevel, RiskVerdict};
use crate::db::{AssessmentRecord, CaseHistoryStore, SharedDatabase, StoreError};
use crate::engines::environment::{EnvironmentalFactorSet, assess_environment};
use crate::engines::symptoms::{SymptomSet, assess_symptoms};
use crate::engines::trend::{TrendAnalyzer, TrendOutcome};
use crate::engines::weather::assess_weather;
use crate::location::LocationValidator;
use crate::notifications::Notifier;
use crate::provider::{WeatherError, WeatherObservation, WeatherProvider, WeatherSource};

pub struct AssessmentService<P> {
    weather: P,
    locations: Box<dyn LocationValidator + Send + Sync>,
    db: SharedDatabase,
    trend: TrendAnalyzer,
    notifier: Notifier,
}

impl<P: WeatherProvider + Sync> AssessmentService<P> {
    pub fn new(
        weather: P,
        locations: Box<dyn LocationValidator + Send + Sync>,
        db: SharedDatabase,
        trend: TrendAnalyzer,
        notifier: Notifier,
    ) -> Self {
        Self {
            weather,
            locations,
            db,
            trend,
            notifier,
        }
    }

    /// Current weather for `city` and the verdict it produces. Estimated
    /// readings yield low-confidence verdicts.
    pub async fn weather(&self, city: &str) -> Result<(WeatherObservation, RiskVerdict), EngineError> {
        let observation = self.weather.current(city).await.map_err(|e| match e {
            WeatherError::CityNotFound(name) => {
                EngineError::WeatherUnavailable(format!("city '{name}' not found, check the spelling"))
            }
            other => EngineError::WeatherUnavailable(other.to_string()),
        })?;

        let mut verdict = assess_weather(&observation.reading);
        if observation.source == WeatherSource::Estimated {
            verdict = verdict.with_low_confidence();
            verdict
                .explanations
                .push("Reading estimated from historical data, live weather unavailable".to_string());
        }
        self.finish(&observation.city, &verdict);
        Ok((observation, verdict))
    }

    pub fn symptoms(&self, symptoms: &SymptomSet) -> RiskVerdict {
        let verdict = assess_symptoms(symptoms);
        self.finish("symptom check", &verdict);
        verdict
    }

    pub fn environment(&self, factors: &EnvironmentalFactorSet) -> RiskVerdict {
        let verdict = assess_environment(factors);
        self.finish("environment check", &verdict);
        verdict
    }

    /// Case trend for a free-text location, read from the case store under
    /// its canonical name.
    pub fn trend(&self, query: &str, today: NaiveDate) -> Result<TrendOutcome, StoreError> {
        let check = self.locations.validate(query);
        let records = match check.canonical_name {
            Some(ref name) if check.is_valid => self.db.case_history(name)?,
            _ => Vec::new(),
        };

        let outcome = self.trend.assess(query, self.locations.as_ref(), &records, today);
        if let (Some(verdict), Some(analytics)) = (outcome.verdict(), outcome.analytics()) {
            self.finish(&analytics.location, verdict);
        }
        Ok(outcome)
    }

    pub fn history(&self, limit: usize) -> Result<Vec<AssessmentRecord>, StoreError> {
        self.db.recent_assessments(limit)
    }

    /// Logged assessments rated `level` or worse, most severe first.
    pub fn history_at_or_above(&self, level: RiskLevel, limit: usize) -> Result<Vec<AssessmentRecord>, StoreError> {
        self.db.assessments_at_or_above(level, limit)
    }

    /// Wait for desktop notifications still being delivered.
    pub fn wait_for_notifications(&self) {
        let count = self.notifier.wait_pending();
        if count > 0 {
            tracing::debug!("Delivered {count} pending notifications");
        }
    }

    fn finish(&self, subject: &str, verdict: &RiskVerdict) {
        tracing::debug!(
            "{} assessment for {subject}: {} ({:?})",
            verdict.engine.as_str(),
            verdict.label,
            verdict.risk_level
        );
        if let Err(e) = self.db.record_assessment(subject, verdict) {
            tracing::warn!("Failed to record {} assessment: {e}", verdict.engine.as_str());
        }
        self.notifier.notify(subject, verdict);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotificationConfig;
    use crate::core::reading::CaseRecord;
    use crate::core::EngineKind;
    use crate::engines::environment::EnvironmentalFactor;
    use crate::engines::symptoms::Symptom;
    use crate::location::CityDirectory;
    use crate::provider::MockWeather;
    use chrono::Duration;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn service() -> AssessmentService<MockWeather> {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "dengueradar_service_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let _ = std::fs::remove_file(&path);
        let db = SharedDatabase::open(&path).unwrap();
        let notifier = Notifier::new(&NotificationConfig {
            enabled: false,
            min_level: RiskLevel::High,
            cooldown_seconds: 0,
        });
        AssessmentService::new(
            MockWeather::builtin(),
            Box::new(CityDirectory::karnataka_defaults()),
            db,
            TrendAnalyzer::default(),
            notifier,
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, 31).unwrap()
    }

    #[tokio::test]
    async fn estimated_weather_is_low_confidence() {
        let svc = service();
        let (obs, verdict) = svc.weather("Mangalore").await.unwrap();
        assert_eq!(obs.source, WeatherSource::Estimated);
        assert_eq!(verdict.engine, EngineKind::Weather);
        assert!(verdict.low_confidence);
        assert_eq!(svc.history(10).unwrap()[0].subject, "Mangalore");
    }

    #[test]
    fn engine_checks_are_logged() {
        let svc = service();
        let verdict = svc.symptoms(&SymptomSet::new().with(Symptom::Bleeding));
        assert_eq!(verdict.risk_level, RiskLevel::High);
        svc.environment(&EnvironmentalFactorSet::new().with(EnvironmentalFactor::StagnantWater));

        let history = svc.history(10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].engine, "environment");
        assert_eq!(history[1].verdict().unwrap().label, verdict.label);

        let severe = svc.history_at_or_above(RiskLevel::High, 10).unwrap();
        assert_eq!(severe.len(), 1);
        assert_eq!(severe[0].engine, "symptoms");
    }

    #[test]
    fn trend_reads_canonical_location() {
        let svc = service();
        let records: Vec<CaseRecord> = (0..10)
            .map(|i| CaseRecord::new(today() - Duration::days(i), 20))
            .collect();
        svc.db.insert_cases_batch("Bangalore", "Karnataka", &records).unwrap();

        let outcome = svc.trend("bengaluru", today()).unwrap();
        let verdict = outcome.verdict().unwrap();
        assert_eq!(verdict.label, "High Alert");
        assert_eq!(outcome.analytics().unwrap().total_cases, 200);
        assert_eq!(svc.history(1).unwrap()[0].subject, "Bangalore");
    }

    #[test]
    fn invalid_trend_location_is_not_logged() {
        let svc = service();
        let outcome = svc.trend("Atlantis", today()).unwrap();
        assert!(matches!(outcome, TrendOutcome::InvalidLocation { .. }));
        assert_eq!(svc.db.assessment_count().unwrap(), 0);
    }

    #[test]
    fn known_city_without_cases_is_insufficient() {
        let svc = service();
        let outcome = svc.trend("Udupi", today()).unwrap();
        assert!(matches!(outcome, TrendOutcome::InsufficientData(_)));
        assert_eq!(svc.db.assessment_count().unwrap(), 1);
    }
}
