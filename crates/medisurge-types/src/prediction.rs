//! Surge predictions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{PredictionId, SnapshotId};
use crate::threat::ThreatSnapshot;

/// Discrete severity of a surge prediction.
///
/// CRITICAL is a reachable level, ranked at or above HIGH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Low => write!(f, "LOW"),
            AlertLevel::Medium => write!(f, "MEDIUM"),
            AlertLevel::High => write!(f, "HIGH"),
            AlertLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Primary condition expected to drive the surge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = "Respiratory Illness")]
    RespiratoryIllness,
    #[serde(rename = "Viral Infections")]
    ViralInfections,
    #[serde(rename = "Cardiovascular")]
    Cardiovascular,
    #[serde(rename = "Gastroenteritis")]
    Gastroenteritis,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::RespiratoryIllness => write!(f, "Respiratory Illness"),
            Condition::ViralInfections => write!(f, "Viral Infections"),
            Condition::Cardiovascular => write!(f, "Cardiovascular"),
            Condition::Gastroenteritis => write!(f, "Gastroenteritis"),
        }
    }
}

/// Immutable forecast of a patient surge.
///
/// Every downstream agent result references the prediction by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurgePrediction {
    pub id: PredictionId,

    /// When the prediction was produced.
    pub created_at: DateTime<Utc>,

    /// When the surge is expected.
    pub surge_date: DateTime<Utc>,

    pub predicted_patients: u32,
    pub baseline_patients: u32,

    /// Increase over baseline, in percent, rounded to one decimal.
    pub surge_percentage: f64,

    /// Confidence in percent (0-100).
    pub confidence: f64,

    pub primary_condition: Condition,
    pub alert_level: AlertLevel,

    /// Snapshot this prediction was derived from.
    pub snapshot_id: SnapshotId,

    /// Contributing factors, copied from the snapshot.
    pub factors: BTreeMap<String, serde_json::Value>,
}

/// Inputs a predictor decides on; the rest is derived.
#[derive(Debug, Clone)]
pub struct PredictionDraft {
    pub surge_date: DateTime<Utc>,
    pub predicted_patients: u32,
    pub baseline_patients: u32,
    pub confidence: f64,
    pub primary_condition: Condition,
    pub alert_level: AlertLevel,
}

impl SurgePrediction {
    /// Build a prediction traceable to `snapshot`.
    pub fn from_snapshot(snapshot: &ThreatSnapshot, draft: PredictionDraft) -> Self {
        let surge_percentage = round1(surge_percentage(
            draft.predicted_patients,
            draft.baseline_patients,
        ));

        Self {
            id: PredictionId::generate(),
            created_at: Utc::now(),
            surge_date: draft.surge_date,
            predicted_patients: draft.predicted_patients,
            baseline_patients: draft.baseline_patients,
            surge_percentage,
            confidence: round1(draft.confidence.clamp(0.0, 100.0)),
            primary_condition: draft.primary_condition,
            alert_level: draft.alert_level,
            snapshot_id: snapshot.id,
            factors: snapshot_factors(snapshot),
        }
    }

    /// Patients expected above baseline (never negative).
    pub fn additional_patients(&self) -> u32 {
        self.predicted_patients.saturating_sub(self.baseline_patients)
    }
}

/// Percentage change of `predicted` over `baseline`.
pub fn surge_percentage(predicted: u32, baseline: u32) -> f64 {
    if baseline == 0 {
        return 0.0;
    }
    (predicted as f64 - baseline as f64) / baseline as f64 * 100.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn snapshot_factors(snapshot: &ThreatSnapshot) -> BTreeMap<String, serde_json::Value> {
    let mut factors = BTreeMap::new();
    factors.insert("snapshot_id".into(), serde_json::json!(snapshot.id));
    factors.insert("aqi".into(), serde_json::json!(snapshot.aqi));
    factors.insert("temperature".into(), serde_json::json!(snapshot.temperature));
    factors.insert("threat_tier".into(), serde_json::json!(snapshot.alert_tier));
    factors.insert(
        "events".into(),
        serde_json::to_value(&snapshot.events).unwrap_or(serde_json::Value::Null),
    );
    factors.insert(
        "social_sentiment_score".into(),
        serde_json::json!(snapshot.social.sentiment_score),
    );
    factors
}
