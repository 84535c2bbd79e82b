//! Fan-out of one prediction to every response agent.
//!
//! Each agent runs in its own task behind a timeout and a panic boundary.
//! A failing branch becomes a FAILURE outcome; it never cancels, delays or
//! hides its siblings. Every outcome is logged from inside its own branch
//! as soon as it is known.

use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use medisurge_types::{
    ActivityLogEntry, AgentName, AgentOutcome, CycleId, FailureKind, FanOutResult,
    SurgePrediction,
};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::activity::ActivityLog;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::provider::ResponseAgent;

/// Exactly one response agent per [`AgentName`].
#[derive(Clone)]
pub struct ResponseRoster {
    agents: Vec<Arc<dyn ResponseAgent>>,
}

impl ResponseRoster {
    /// Build a roster, rejecting missing or duplicate agents.
    pub fn new(agents: Vec<Arc<dyn ResponseAgent>>) -> OrchestratorResult<Self> {
        let mut seen = BTreeSet::new();
        for agent in &agents {
            if !seen.insert(agent.name()) {
                return Err(OrchestratorError::InvalidRoster(format!(
                    "duplicate agent {}",
                    agent.name()
                )));
            }
        }

        let missing: Vec<String> = AgentName::ALL
            .iter()
            .filter(|name| !seen.contains(name))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(OrchestratorError::InvalidRoster(format!(
                "missing agents: {}",
                missing.join(", ")
            )));
        }

        let mut agents = agents;
        agents.sort_by_key(|a| a.name());
        Ok(Self { agents })
    }

    pub fn agents(&self) -> &[Arc<dyn ResponseAgent>] {
        &self.agents
    }

    pub fn get(&self, name: AgentName) -> Option<&Arc<dyn ResponseAgent>> {
        self.agents.iter().find(|a| a.name() == name)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl std::fmt::Debug for ResponseRoster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.agents.iter().map(|a| a.name()))
            .finish()
    }
}

/// Dispatches predictions to the roster and gathers every outcome.
pub struct FanOutCoordinator {
    roster: ResponseRoster,
    log: Arc<ActivityLog>,
    agent_timeout: Duration,
}

impl FanOutCoordinator {
    pub fn new(roster: ResponseRoster, log: Arc<ActivityLog>, agent_timeout: Duration) -> Self {
        Self {
            roster,
            log,
            agent_timeout,
        }
    }

    pub fn roster(&self) -> &ResponseRoster {
        &self.roster
    }

    /// Invoke every agent concurrently and wait for all of them.
    ///
    /// Always returns one outcome per roster agent.
    #[instrument(
        skip(self, prediction),
        fields(cycle_id = %cycle_id, prediction_id = %prediction.id, alert_level = %prediction.alert_level)
    )]
    pub async fn coordinate(&self, cycle_id: CycleId, prediction: &SurgePrediction) -> FanOutResult {
        let shared = Arc::new(prediction.clone());
        info!(agents = self.roster.len(), "Dispatching crisis response");

        let (names, branches): (Vec<AgentName>, Vec<_>) = self
            .roster
            .agents()
            .iter()
            .map(|agent| {
                let agent = Arc::clone(agent);
                let prediction = Arc::clone(&shared);
                let log = Arc::clone(&self.log);
                let timeout = self.agent_timeout;
                let name = agent.name();

                let branch = tokio::spawn(async move {
                    let outcome = invoke_agent(agent, &prediction, timeout).await;
                    log.record(ActivityLogEntry::from_outcome(cycle_id, &outcome))
                        .await;
                    outcome
                });
                (name, branch)
            })
            .unzip();

        let joined = join_all(branches).await;

        let mut outcomes = Vec::with_capacity(joined.len());
        for (name, joined) in names.into_iter().zip(joined) {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    // Branch died outside the agent call; log it here instead.
                    let kind = if e.is_panic() {
                        FailureKind::Panicked
                    } else {
                        FailureKind::Cancelled
                    };
                    let outcome = AgentOutcome::failure(
                        name,
                        shared.id,
                        kind,
                        format!("agent task aborted: {e}"),
                        Utc::now(),
                        0,
                    );
                    self.log
                        .record(ActivityLogEntry::from_outcome(cycle_id, &outcome))
                        .await;
                    outcome
                }
            };
            outcomes.push(outcome);
        }

        let result = FanOutResult::from_outcomes(shared.id, outcomes);
        if result.fully_succeeded {
            info!(succeeded = result.success_count(), "Crisis response complete");
        } else {
            warn!(
                succeeded = result.success_count(),
                failed = ?result.failed_agents,
                "Crisis response partially failed"
            );
        }
        result
    }
}

async fn invoke_agent(
    agent: Arc<dyn ResponseAgent>,
    prediction: &SurgePrediction,
    timeout: Duration,
) -> AgentOutcome {
    let name = agent.name();
    let started_at = Utc::now();
    let start = Instant::now();

    let call = AssertUnwindSafe(agent.respond(prediction)).catch_unwind();
    let result = tokio::time::timeout(timeout, call).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    let (kind, reason) = match result {
        Ok(Ok(Ok(payload))) => {
            debug!(agent = %name, duration_ms, "Agent succeeded");
            return AgentOutcome::success(name, prediction.id, payload, started_at, duration_ms);
        }
        Ok(Ok(Err(e))) => (FailureKind::Error, e.to_string()),
        Ok(Err(panic)) => (FailureKind::Panicked, panic_message(panic.as_ref())),
        Err(_) => (
            FailureKind::Timeout,
            format!("agent timed out after {}ms", timeout.as_millis()),
        ),
    };

    let err = OrchestratorError::AgentFailure {
        agent: name,
        kind,
        reason: reason.clone(),
    };
    warn!(agent = %name, duration_ms, error = %err, "Agent failed");

    AgentOutcome::failure(name, prediction.id, kind, reason, started_at, duration_ms)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("agent panicked: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("agent panicked: {msg}")
    } else {
        "agent panicked".to_string()
    }
}
