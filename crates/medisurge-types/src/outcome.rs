//! Response-agent outcomes and fan-out aggregation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::PredictionId;

/// The fixed set of response agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgentName {
    Resource,
    Insurance,
    StaffActivation,
    SupplyChain,
    Communication,
}

impl AgentName {
    /// Every response agent, in dispatch order.
    pub const ALL: [AgentName; 5] = [
        AgentName::Resource,
        AgentName::Insurance,
        AgentName::StaffActivation,
        AgentName::SupplyChain,
        AgentName::Communication,
    ];

    /// Verb recorded in the activity log for this agent's work.
    pub fn action(&self) -> &'static str {
        match self {
            AgentName::Resource => "allocate_resources",
            AgentName::Insurance => "pre_authorize",
            AgentName::StaffActivation => "activate_staff",
            AgentName::SupplyChain => "coordinate_supply",
            AgentName::Communication => "send_advisory",
        }
    }
}

impl std::fmt::Display for AgentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentName::Resource => write!(f, "Resource"),
            AgentName::Insurance => write!(f, "Insurance"),
            AgentName::StaffActivation => write!(f, "StaffActivation"),
            AgentName::SupplyChain => write!(f, "SupplyChain"),
            AgentName::Communication => write!(f, "Communication"),
        }
    }
}

/// Terminal status of one agent invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    Success,
    Failure,
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeStatus::Success => write!(f, "SUCCESS"),
            OutcomeStatus::Failure => write!(f, "FAILURE"),
        }
    }
}

/// Why an agent invocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The agent returned an error.
    Error,
    /// The agent did not finish within its timeout.
    Timeout,
    /// The agent panicked.
    Panicked,
    /// The agent task was cancelled before finishing.
    Cancelled,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Error => write!(f, "error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Panicked => write!(f, "panicked"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result payload or error description of an agent invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentResult {
    Success { payload: serde_json::Value },
    Failure { kind: FailureKind, error: String },
}

/// Outcome of one response agent for one prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub agent: AgentName,
    pub prediction_id: PredictionId,
    #[serde(flatten)]
    pub result: AgentResult,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl AgentOutcome {
    /// Successful outcome carrying the agent's payload.
    pub fn success(
        agent: AgentName,
        prediction_id: PredictionId,
        payload: serde_json::Value,
        started_at: DateTime<Utc>,
        duration_ms: u64,
    ) -> Self {
        Self {
            agent,
            prediction_id,
            result: AgentResult::Success { payload },
            started_at,
            duration_ms,
        }
    }

    /// Failed outcome.
    pub fn failure(
        agent: AgentName,
        prediction_id: PredictionId,
        kind: FailureKind,
        error: impl Into<String>,
        started_at: DateTime<Utc>,
        duration_ms: u64,
    ) -> Self {
        Self {
            agent,
            prediction_id,
            result: AgentResult::Failure {
                kind,
                error: error.into(),
            },
            started_at,
            duration_ms,
        }
    }

    pub fn status(&self) -> OutcomeStatus {
        match self.result {
            AgentResult::Success { .. } => OutcomeStatus::Success,
            AgentResult::Failure { .. } => OutcomeStatus::Failure,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == OutcomeStatus::Success
    }

    pub fn payload(&self) -> Option<&serde_json::Value> {
        match &self.result {
            AgentResult::Success { payload } => Some(payload),
            AgentResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.result {
            AgentResult::Success { .. } => None,
            AgentResult::Failure { error, .. } => Some(error),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.result {
            AgentResult::Success { .. } => None,
            AgentResult::Failure { kind, .. } => Some(*kind),
        }
    }
}

/// Aggregated result of dispatching one prediction to every response agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanOutResult {
    pub prediction_id: PredictionId,
    pub outcomes: Vec<AgentOutcome>,
    pub fully_succeeded: bool,
    pub failed_agents: Vec<AgentName>,
}

impl FanOutResult {
    /// Aggregate outcomes; outcomes are ordered by agent for stable output.
    pub fn from_outcomes(prediction_id: PredictionId, mut outcomes: Vec<AgentOutcome>) -> Self {
        outcomes.sort_by_key(|o| o.agent);

        let failed_agents: Vec<AgentName> = outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| o.agent)
            .collect();

        Self {
            prediction_id,
            fully_succeeded: failed_agents.is_empty(),
            failed_agents,
            outcomes,
        }
    }

    /// Outcome for a specific agent.
    pub fn outcome(&self, agent: AgentName) -> Option<&AgentOutcome> {
        self.outcomes.iter().find(|o| o.agent == agent)
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }
}
