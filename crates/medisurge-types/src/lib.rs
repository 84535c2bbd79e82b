//! # MediSurge Types - Data Model for Crisis-Response Orchestration
//!
//! Shared, serialisable types used by the orchestration runtime, the
//! reference collaborators and the daemon:
//!
//! - [`ThreatSnapshot`] and [`ThreatClassifier`]: surveillance results and
//!   the pure scoring that derives their [`ThreatTier`]
//! - [`SurgePrediction`]: a forecast with an [`AlertLevel`]
//! - [`AgentOutcome`] and [`FanOutResult`]: per-agent results and their
//!   aggregation
//! - [`CycleSummary`]: one record per monitoring-loop iteration
//! - [`ActivityLogEntry`]: the append-only log record

pub mod activity;
pub mod cycle;
pub mod ids;
pub mod outcome;
pub mod prediction;
pub mod threat;

pub use activity::{ActivityLogEntry, AgentActivity, EntryKind, CYCLE_ACTION, ORCHESTRATOR_AGENT};
pub use cycle::{CycleStatus, CycleSummary};
pub use ids::{CycleId, EntryId, PredictionId, SnapshotId};
pub use outcome::{AgentName, AgentOutcome, AgentResult, FailureKind, FanOutResult, OutcomeStatus};
pub use prediction::{surge_percentage, AlertLevel, Condition, PredictionDraft, SurgePrediction};
pub use threat::{
    AdmissionTrend, EventIndicator, SocialSignal, ThreatClassifier, ThreatSignals, ThreatSnapshot,
    ThreatTier, Trend,
};
