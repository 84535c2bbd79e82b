//! Resource planning: staff, equipment and budget for the extra patients.

use async_trait::async_trait;
use medisurge_runtime::{ProviderResult, ResponseAgent};
use medisurge_types::{AgentName, PredictionId, SurgePrediction};
use serde::{Deserialize, Serialize};
use tracing::info;

// Requirements per 1000 additional patients.
const NURSES_PER_1000: u32 = 35;
const DOCTORS_PER_1000: u32 = 15;
const NEBULIZERS_PER_1000: u32 = 140;
const OXYGEN_PER_1000: u32 = 330;
const N95_PER_1000: u32 = 2000;
const VENTILATORS_PER_1000: u32 = 20;

/// Budget per additional patient, in rupees.
const COST_PER_PATIENT: u64 = 6_667;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationStrategy {
    pub priorities: Vec<String>,
    pub deployment_timeline: String,
    pub contingency_buffer: String,
}

impl Default for AllocationStrategy {
    fn default() -> Self {
        Self {
            priorities: vec![
                "Staff allocation - critical".into(),
                "Oxygen and respiratory equipment".into(),
                "PPE and protective equipment".into(),
            ],
            deployment_timeline: "24 hours before surge".into(),
            contingency_buffer: "15% additional supplies".into(),
        }
    }
}

/// What the resource agent asks the hospital to line up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePlan {
    pub prediction_id: PredictionId,
    pub additional_patients: u32,
    pub nurses_needed: u32,
    pub doctors_needed: u32,
    pub nebulizers: u32,
    pub oxygen_cylinders: u32,
    pub n95_masks: u32,
    pub ventilators: u32,
    pub estimated_cost: u64,
    pub allocation_strategy: AllocationStrategy,
}

impl ResourcePlan {
    pub fn for_prediction(prediction: &SurgePrediction) -> Self {
        let extra = prediction.additional_patients();
        let per_1000 = |ratio: u32| (extra as u64 * ratio as u64 / 1000) as u32;

        Self {
            prediction_id: prediction.id,
            additional_patients: extra,
            nurses_needed: per_1000(NURSES_PER_1000) + 1,
            doctors_needed: per_1000(DOCTORS_PER_1000) + 1,
            nebulizers: per_1000(NEBULIZERS_PER_1000),
            oxygen_cylinders: per_1000(OXYGEN_PER_1000),
            n95_masks: per_1000(N95_PER_1000),
            ventilators: per_1000(VENTILATORS_PER_1000),
            estimated_cost: extra as u64 * COST_PER_PATIENT,
            allocation_strategy: AllocationStrategy::default(),
        }
    }
}

/// Deterministic: the plan depends only on the prediction.
#[derive(Debug, Default)]
pub struct ResourceAgent;

impl ResourceAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResponseAgent for ResourceAgent {
    fn name(&self) -> AgentName {
        AgentName::Resource
    }

    async fn respond(&self, prediction: &SurgePrediction) -> ProviderResult<serde_json::Value> {
        let plan = ResourcePlan::for_prediction(prediction);
        info!(
            prediction_id = %plan.prediction_id,
            nurses = plan.nurses_needed,
            doctors = plan.doctors_needed,
            oxygen_cylinders = plan.oxygen_cylinders,
            estimated_cost = plan.estimated_cost,
            "Resources allocated"
        );
        Ok(serde_json::to_value(plan)?)
    }
}
