//! Per-cycle summaries of the monitoring loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CycleId, PredictionId, SnapshotId};
use crate::outcome::{AgentOutcome, FanOutResult};
use crate::prediction::{AlertLevel, SurgePrediction};
use crate::threat::{ThreatSnapshot, ThreatTier};

/// Overall status of a completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// Threat gate closed; nothing predicted.
    Quiet,
    /// Prediction made but below the response threshold.
    Watching,
    /// Fan-out ran and every agent succeeded.
    Responded,
    /// Fan-out ran and at least one agent failed.
    PartiallyResponded,
    /// Surveillance provider was unavailable.
    ScanFailed,
    /// Surge predictor was unavailable.
    PredictionFailed,
}

impl CycleStatus {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            CycleStatus::ScanFailed | CycleStatus::PredictionFailed
        )
    }
}

impl std::fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleStatus::Quiet => write!(f, "quiet"),
            CycleStatus::Watching => write!(f, "watching"),
            CycleStatus::Responded => write!(f, "responded"),
            CycleStatus::PartiallyResponded => write!(f, "partially_responded"),
            CycleStatus::ScanFailed => write!(f, "scan_failed"),
            CycleStatus::PredictionFailed => write!(f, "prediction_failed"),
        }
    }
}

/// One summary per monitoring-loop iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub cycle_id: CycleId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    pub snapshot_id: Option<SnapshotId>,
    pub snapshot_time: Option<DateTime<Utc>>,
    pub alert_tier: Option<ThreatTier>,

    pub prediction_id: Option<PredictionId>,
    pub alert_level: Option<AlertLevel>,

    pub prediction_triggered: bool,
    pub fan_out_triggered: bool,

    pub outcomes: Vec<AgentOutcome>,
    pub status: CycleStatus,

    /// Provider error that cut the cycle short, if any.
    pub error: Option<String>,
}

impl CycleSummary {
    /// Start a summary; the status is refined as the cycle progresses.
    pub fn begin(cycle_id: CycleId) -> Self {
        let now = Utc::now();
        Self {
            cycle_id,
            started_at: now,
            finished_at: now,
            snapshot_id: None,
            snapshot_time: None,
            alert_tier: None,
            prediction_id: None,
            alert_level: None,
            prediction_triggered: false,
            fan_out_triggered: false,
            outcomes: Vec::new(),
            status: CycleStatus::Quiet,
            error: None,
        }
    }

    pub fn with_snapshot(mut self, snapshot: &ThreatSnapshot) -> Self {
        self.snapshot_id = Some(snapshot.id);
        self.snapshot_time = Some(snapshot.timestamp);
        self.alert_tier = Some(snapshot.alert_tier);
        self
    }

    /// The threat gate opened; the predictor is about to be called.
    pub fn predicting(mut self) -> Self {
        self.prediction_triggered = true;
        self
    }

    pub fn with_prediction(mut self, prediction: &SurgePrediction) -> Self {
        self.prediction_triggered = true;
        self.prediction_id = Some(prediction.id);
        self.alert_level = Some(prediction.alert_level);
        self.status = CycleStatus::Watching;
        self
    }

    pub fn with_fan_out(mut self, result: FanOutResult) -> Self {
        self.fan_out_triggered = true;
        self.status = if result.fully_succeeded {
            CycleStatus::Responded
        } else {
            CycleStatus::PartiallyResponded
        };
        self.outcomes = result.outcomes;
        self
    }

    pub fn failed(mut self, status: CycleStatus, error: impl Into<String>) -> Self {
        self.status = status;
        self.error = Some(error.into());
        self
    }

    /// Stamp the finish time.
    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{AgentName, FailureKind};
    use crate::threat::ThreatSignals;

    #[test]
    fn test_quiet_cycle() {
        let snapshot = ThreatSnapshot::assess(ThreatSignals::default());
        let summary = CycleSummary::begin(CycleId::generate())
            .with_snapshot(&snapshot)
            .finish();

        assert_eq!(summary.status, CycleStatus::Quiet);
        assert!(!summary.prediction_triggered);
        assert!(!summary.fan_out_triggered);
        assert_eq!(summary.alert_tier, Some(ThreatTier::Low));
    }

    #[test]
    fn test_partial_response() {
        let prediction_id = PredictionId::generate();
        let result = FanOutResult::from_outcomes(
            prediction_id,
            vec![
                AgentOutcome::success(
                    AgentName::Resource,
                    prediction_id,
                    serde_json::json!({}),
                    Utc::now(),
                    1,
                ),
                AgentOutcome::failure(
                    AgentName::Insurance,
                    prediction_id,
                    FailureKind::Panicked,
                    "panic",
                    Utc::now(),
                    1,
                ),
            ],
        );

        let summary = CycleSummary::begin(CycleId::generate()).with_fan_out(result);
        assert_eq!(summary.status, CycleStatus::PartiallyResponded);
        assert_eq!(summary.failed_count(), 1);
    }

    #[test]
    fn test_failed_cycle_keeps_error() {
        let summary = CycleSummary::begin(CycleId::generate())
            .failed(CycleStatus::ScanFailed, "aqi monitor offline");
        assert!(summary.status.is_failure());
        assert_eq!(summary.error.as_deref(), Some("aqi monitor offline"));
    }

    #[test]
    fn test_failed_prediction_still_marks_trigger() {
        let summary = CycleSummary::begin(CycleId::generate())
            .predicting()
            .failed(CycleStatus::PredictionFailed, "predictor unavailable");
        assert!(summary.prediction_triggered);
        assert!(summary.prediction_id.is_none());
        assert!(summary.alert_level.is_none());
    }
}
