//! Baseline surge predictor.
//!
//! Scales a fixed daily patient baseline by a multiplier drawn from a band
//! that depends on the snapshot's threat tier, then grades the result.

use async_trait::async_trait;
use chrono::Duration;
use medisurge_runtime::{ProviderResult, SurgePredictor};
use medisurge_types::{
    surge_percentage, AlertLevel, Condition, PredictionDraft, SurgePrediction, ThreatSnapshot,
    ThreatTier,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use crate::seeded_rng;

/// Expected patients on an ordinary day.
pub const BASELINE_PATIENTS: u32 = 120;

/// Forecast horizon, in hours.
const HORIZON_HOURS: std::ops::RangeInclusive<i64> = 48..=72;

pub struct BaselinePredictor {
    baseline: u32,
    rng: Mutex<StdRng>,
}

impl BaselinePredictor {
    pub fn new(seed: Option<u64>) -> Self {
        Self::with_baseline(BASELINE_PATIENTS, seed)
    }

    pub fn with_baseline(baseline: u32, seed: Option<u64>) -> Self {
        Self {
            baseline,
            rng: Mutex::new(seeded_rng(seed, 2)),
        }
    }

    pub fn baseline(&self) -> u32 {
        self.baseline
    }

    /// Decide every free parameter of a prediction for `snapshot`.
    pub fn draft(&self, snapshot: &ThreatSnapshot) -> PredictionDraft {
        let mut rng = self.rng.lock();

        let multiplier = rng.gen_range(multiplier_band(snapshot.alert_tier));
        let predicted_patients = (self.baseline as f64 * multiplier) as u32;
        let confidence = rng.gen_range(75.0..95.0);
        let primary_condition = primary_condition(snapshot, &mut rng);
        let alert_level = alert_level_for(
            surge_percentage(predicted_patients, self.baseline),
            confidence,
        );
        let surge_date = snapshot.timestamp + Duration::hours(rng.gen_range(HORIZON_HOURS));

        PredictionDraft {
            surge_date,
            predicted_patients,
            baseline_patients: self.baseline,
            confidence,
            primary_condition,
            alert_level,
        }
    }
}

/// Multiplier band over baseline for each threat tier.
fn multiplier_band(tier: ThreatTier) -> std::ops::Range<f64> {
    match tier {
        ThreatTier::Critical => 2.5..3.5,
        ThreatTier::High => 1.8..2.5,
        ThreatTier::Medium => 1.3..1.8,
        ThreatTier::Low => 0.9..1.2,
    }
}

fn primary_condition(snapshot: &ThreatSnapshot, rng: &mut StdRng) -> Condition {
    if snapshot.aqi > 200.0 {
        Condition::RespiratoryIllness
    } else if snapshot.temperature < 18.0 {
        Condition::ViralInfections
    } else {
        [
            Condition::RespiratoryIllness,
            Condition::Cardiovascular,
            Condition::Gastroenteritis,
        ]
        .choose(rng)
        .copied()
        .unwrap_or(Condition::RespiratoryIllness)
    }
}

/// Grade a forecast.
///
/// A surge above 150% with confidence above 80 is CRITICAL; above 100% with
/// confidence above 70 is HIGH; above 50% is MEDIUM.
pub fn alert_level_for(surge_percentage: f64, confidence: f64) -> AlertLevel {
    if surge_percentage > 150.0 && confidence > 80.0 {
        AlertLevel::Critical
    } else if surge_percentage > 100.0 && confidence > 70.0 {
        AlertLevel::High
    } else if surge_percentage > 50.0 {
        AlertLevel::Medium
    } else {
        AlertLevel::Low
    }
}

#[async_trait]
impl SurgePredictor for BaselinePredictor {
    async fn predict(&self, snapshot: &ThreatSnapshot) -> ProviderResult<SurgePrediction> {
        let prediction = SurgePrediction::from_snapshot(snapshot, self.draft(snapshot));
        info!(
            prediction_id = %prediction.id,
            predicted_patients = prediction.predicted_patients,
            surge_percentage = prediction.surge_percentage,
            confidence = prediction.confidence,
            condition = %prediction.primary_condition,
            alert_level = %prediction.alert_level,
            "Surge forecast"
        );
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medisurge_types::{EventIndicator, ThreatSignals};

    fn snapshot(aqi: f64, temperature: f64, days_to_festival: Option<u32>) -> ThreatSnapshot {
        ThreatSnapshot::assess(ThreatSignals {
            aqi,
            temperature,
            events: days_to_festival
                .map(|d| EventIndicator::upcoming("Diwali", d))
                .unwrap_or_default(),
            ..ThreatSignals::default()
        })
    }

    #[test]
    fn test_alert_level_thresholds() {
        assert_eq!(alert_level_for(183.3, 87.0), AlertLevel::Critical);
        assert_eq!(alert_level_for(183.3, 78.0), AlertLevel::High);
        assert_eq!(alert_level_for(120.0, 71.0), AlertLevel::High);
        assert_eq!(alert_level_for(120.0, 70.0), AlertLevel::Medium);
        assert_eq!(alert_level_for(50.0, 99.0), AlertLevel::Low);
        assert_eq!(alert_level_for(-10.0, 90.0), AlertLevel::Low);
    }

    #[tokio::test]
    async fn test_critical_snapshot_forecasts_large_surge() {
        let predictor = BaselinePredictor::new(Some(11));
        let snapshot = snapshot(250.0, 17.0, Some(1));
        assert_eq!(snapshot.alert_tier, ThreatTier::Critical);

        for _ in 0..50 {
            let prediction = predictor.predict(&snapshot).await.unwrap();
            assert!((300..420).contains(&prediction.predicted_patients));
            assert_eq!(prediction.baseline_patients, BASELINE_PATIENTS);
            assert_eq!(prediction.primary_condition, Condition::RespiratoryIllness);
            assert!(prediction.alert_level >= AlertLevel::High);
            assert!((75.0..=95.0).contains(&prediction.confidence));
            assert_eq!(prediction.snapshot_id, snapshot.id);

            let ahead = prediction.surge_date - snapshot.timestamp;
            assert!(ahead >= Duration::hours(48) && ahead <= Duration::hours(72));
        }
    }

    #[test]
    fn test_cold_weather_means_viral() {
        let predictor = BaselinePredictor::new(Some(5));
        let draft = predictor.draft(&snapshot(120.0, 16.0, None));
        assert_eq!(draft.primary_condition, Condition::ViralInfections);
    }

    #[test]
    fn test_low_tier_stays_near_baseline() {
        let predictor = BaselinePredictor::new(Some(8));
        let low = snapshot(60.0, 25.0, None);
        assert_eq!(low.alert_tier, ThreatTier::Low);

        for _ in 0..50 {
            let draft = predictor.draft(&low);
            assert!((108..144).contains(&draft.predicted_patients));
            assert_eq!(draft.alert_level, AlertLevel::Low);
        }
    }
}
