//! Activity log entries.
//!
//! Entries are derived 1:1 from an [`AgentOutcome`] or a [`CycleSummary`]
//! and are never mutated once appended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cycle::CycleSummary;
use crate::ids::{CycleId, EntryId, PredictionId};
use crate::outcome::{AgentOutcome, AgentResult, OutcomeStatus};

/// Name under which cycle summaries are logged.
pub const ORCHESTRATOR_AGENT: &str = "Orchestrator";

/// Action recorded for cycle summaries.
pub const CYCLE_ACTION: &str = "crisis_response";

/// What an entry was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    AgentOutcome,
    CycleSummary,
}

/// One append-only record in the activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: EntryId,
    pub timestamp: DateTime<Utc>,
    pub kind: EntryKind,
    pub agent_name: String,
    pub action: String,
    pub status: OutcomeStatus,
    pub cycle_id: CycleId,
    pub prediction_id: Option<PredictionId>,
    pub execution_time_ms: u64,
    pub error: Option<String>,

    /// Agent payload or cycle statistics.
    pub details: serde_json::Value,
}

impl ActivityLogEntry {
    /// Entry for a single agent invocation.
    pub fn from_outcome(cycle_id: CycleId, outcome: &AgentOutcome) -> Self {
        let (details, error) = match &outcome.result {
            AgentResult::Success { payload } => (payload.clone(), None),
            AgentResult::Failure { kind, error } => {
                (serde_json::json!({ "failure_kind": kind }), Some(error.clone()))
            }
        };

        Self {
            id: EntryId::generate(),
            timestamp: Utc::now(),
            kind: EntryKind::AgentOutcome,
            agent_name: outcome.agent.to_string(),
            action: outcome.agent.action().to_string(),
            status: outcome.status(),
            cycle_id,
            prediction_id: Some(outcome.prediction_id),
            execution_time_ms: outcome.duration_ms,
            error,
            details,
        }
    }

    /// Entry summarising a whole cycle.
    pub fn from_summary(summary: &CycleSummary) -> Self {
        let failed: Vec<String> = summary
            .outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.agent.to_string())
            .collect();

        let status = if failed.is_empty() && !summary.status.is_failure() {
            OutcomeStatus::Success
        } else {
            OutcomeStatus::Failure
        };

        Self {
            id: EntryId::generate(),
            timestamp: Utc::now(),
            kind: EntryKind::CycleSummary,
            agent_name: ORCHESTRATOR_AGENT.to_string(),
            action: CYCLE_ACTION.to_string(),
            status,
            cycle_id: summary.cycle_id,
            prediction_id: summary.prediction_id,
            execution_time_ms: summary.duration_ms(),
            error: summary.error.clone(),
            details: serde_json::json!({
                "cycle_status": summary.status,
                "alert_tier": summary.alert_tier,
                "alert_level": summary.alert_level,
                "agents": summary.outcomes.len(),
                "failed_agents": failed,
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Per-agent aggregate over a window of entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentActivity {
    pub total_actions: u64,
    pub successful: u64,
    pub failed: u64,
}

impl AgentActivity {
    pub fn record(&mut self, entry: &ActivityLogEntry) {
        self.total_actions += 1;
        if entry.is_success() {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Success ratio in `[0.0, 1.0]`; zero when nothing was recorded.
    pub fn success_rate(&self) -> f64 {
        if self.total_actions == 0 {
            0.0
        } else {
            self.successful as f64 / self.total_actions as f64
        }
    }
}
