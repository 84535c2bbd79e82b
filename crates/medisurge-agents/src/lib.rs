//! # MediSurge Agents - Reference Collaborators
//!
//! Simulated implementations of everything the orchestration core consumes:
//!
//! - [`SimulatedSurveillance`]: samples air quality, weather, festival
//!   calendar, social chatter and admission trends
//! - [`BaselinePredictor`]: forecasts a surge over a fixed patient baseline
//! - the five response agents in [`response`]
//!
//! Every collaborator takes an optional seed so runs can be reproduced.

pub mod predictor;
pub mod response;
pub mod surveillance;

use std::sync::Arc;

use medisurge_runtime::{OrchestratorResult, ResponseAgent, ResponseRoster};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub use predictor::{alert_level_for, BaselinePredictor, BASELINE_PATIENTS};
pub use response::{
    CommunicationAgent, InsuranceAgent, ResourceAgent, StaffActivationAgent, SupplyChainAgent,
};
pub use surveillance::SimulatedSurveillance;

/// The five reference response agents as a roster.
pub fn reference_roster(seed: Option<u64>) -> OrchestratorResult<ResponseRoster> {
    let agents: Vec<Arc<dyn ResponseAgent>> = vec![
        Arc::new(ResourceAgent::new()),
        Arc::new(InsuranceAgent::new(seed)),
        Arc::new(StaffActivationAgent::new(seed)),
        Arc::new(SupplyChainAgent::new(seed)),
        Arc::new(CommunicationAgent::new(seed)),
    ];
    ResponseRoster::new(agents)
}

/// Independent random stream per collaborator; entropy-seeded without a seed.
pub(crate) fn seeded_rng(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
        None => StdRng::from_entropy(),
    }
}
