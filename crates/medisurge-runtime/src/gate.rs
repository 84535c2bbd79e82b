//! Escalation gates.
//!
//! Both gates are total functions over closed enums; they have no side
//! effects and cannot fail.

use medisurge_types::{AlertLevel, SurgePrediction, ThreatSnapshot, ThreatTier};

/// Whether a snapshot warrants a surge prediction.
pub fn should_predict(snapshot: &ThreatSnapshot) -> bool {
    tier_warrants_prediction(snapshot.alert_tier)
}

/// Whether a prediction warrants the full crisis response.
///
/// The gate looks at the prediction's own alert level, not at the tier of
/// the snapshot it came from.
pub fn should_respond(prediction: &SurgePrediction) -> bool {
    level_warrants_response(prediction.alert_level)
}

pub fn tier_warrants_prediction(tier: ThreatTier) -> bool {
    match tier {
        ThreatTier::Low => false,
        ThreatTier::Medium | ThreatTier::High | ThreatTier::Critical => true,
    }
}

pub fn level_warrants_response(level: AlertLevel) -> bool {
    match level {
        AlertLevel::Low | AlertLevel::Medium => false,
        AlertLevel::High | AlertLevel::Critical => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use medisurge_types::{
        AdmissionTrend, Condition, EventIndicator, PredictionDraft, SocialSignal, ThreatSignals,
        Trend,
    };
    use proptest::prelude::*;

    fn arb_signals() -> impl Strategy<Value = ThreatSignals> {
        (
            0.0f64..500.0,
            -10.0f64..45.0,
            0.0f64..100.0,
            any::<bool>(),
            0u32..10,
            0u32..1500,
            prop_oneof![
                Just(Trend::Increasing),
                Just(Trend::Stable),
                Just(Trend::Decreasing)
            ],
        )
            .prop_map(
                |(aqi, temperature, humidity, upcoming, days, mentions, trend)| ThreatSignals {
                    aqi,
                    temperature,
                    humidity,
                    events: if upcoming {
                        EventIndicator::upcoming("Diwali", days)
                    } else {
                        EventIndicator::none()
                    },
                    social: SocialSignal {
                        breathing_difficulty_mentions: mentions,
                        hospital_queries: 0,
                        sentiment_score: 0.0,
                    },
                    admissions: AdmissionTrend {
                        current_rate: 100,
                        baseline: 100,
                        trend,
                    },
                },
            )
    }

    fn arb_level() -> impl Strategy<Value = AlertLevel> {
        prop_oneof![
            Just(AlertLevel::Low),
            Just(AlertLevel::Medium),
            Just(AlertLevel::High),
            Just(AlertLevel::Critical),
        ]
    }

    proptest! {
        #[test]
        fn low_snapshots_never_predict(signals in arb_signals()) {
            let snapshot = ThreatSnapshot::assess(signals);
            prop_assert_eq!(
                should_predict(&snapshot),
                snapshot.alert_tier != ThreatTier::Low
            );
        }

        #[test]
        fn only_high_or_critical_predictions_respond(
            signals in arb_signals(),
            level in arb_level(),
        ) {
            let snapshot = ThreatSnapshot::assess(signals);
            let prediction = SurgePrediction::from_snapshot(&snapshot, PredictionDraft {
                surge_date: Utc::now(),
                predicted_patients: 200,
                baseline_patients: 120,
                confidence: 90.0,
                primary_condition: Condition::RespiratoryIllness,
                alert_level: level,
            });
            prop_assert_eq!(should_respond(&prediction), level >= AlertLevel::High);
        }
    }

    #[test]
    fn test_gate_on_prediction_not_snapshot() {
        // A CRITICAL snapshot may still yield a MEDIUM prediction.
        let snapshot = ThreatSnapshot::assess(ThreatSignals {
            aqi: 250.0,
            temperature: 17.0,
            events: EventIndicator::upcoming("Diwali", 1),
            ..ThreatSignals::default()
        });
        assert!(should_predict(&snapshot));

        let prediction = SurgePrediction::from_snapshot(
            &snapshot,
            PredictionDraft {
                surge_date: Utc::now(),
                predicted_patients: 190,
                baseline_patients: 120,
                confidence: 80.0,
                primary_condition: Condition::RespiratoryIllness,
                alert_level: AlertLevel::Medium,
            },
        );
        assert!(!should_respond(&prediction));
    }

    #[test]
    fn test_critical_level_responds() {
        assert!(level_warrants_response(AlertLevel::Critical));
        assert!(!tier_warrants_prediction(ThreatTier::Low));
    }
}
