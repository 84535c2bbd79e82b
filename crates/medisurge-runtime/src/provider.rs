//! External collaborators consumed by the orchestration core.
//!
//! Surveillance, prediction and the five response agents live outside the
//! core. Each is an async trait object so hosts can plug in live feeds,
//! models or the reference implementations.

use async_trait::async_trait;
use medisurge_types::{AgentName, SurgePrediction, ThreatSnapshot};

use crate::error::ProviderResult;

/// Source of threat snapshots.
#[async_trait]
pub trait SurveillanceProvider: Send + Sync {
    /// Scan the monitored signals and return a classified snapshot.
    async fn scan(&self) -> ProviderResult<ThreatSnapshot>;
}

/// Produces surge forecasts from a snapshot.
#[async_trait]
pub trait SurgePredictor: Send + Sync {
    /// Forecast the patient surge implied by `snapshot`.
    async fn predict(&self, snapshot: &ThreatSnapshot) -> ProviderResult<SurgePrediction>;
}

/// One of the five crisis-response handlers.
#[async_trait]
pub trait ResponseAgent: Send + Sync {
    /// Which slot of the roster this agent fills.
    fn name(&self) -> AgentName;

    /// Act on a prediction and return the agent's structured result.
    ///
    /// Agents may carry external side effects, so the coordinator never
    /// cancels a call that has already started except through its timeout.
    async fn respond(&self, prediction: &SurgePrediction) -> ProviderResult<serde_json::Value>;
}
