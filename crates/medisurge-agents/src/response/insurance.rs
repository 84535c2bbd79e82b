//! Insurance pre-authorisation for the predicted patient load.

use async_trait::async_trait;
use medisurge_runtime::{ProviderResult, ResponseAgent};
use medisurge_types::{AgentName, Condition, PredictionId, SurgePrediction};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::seeded_rng;

pub const PROVIDERS: [&str; 5] = [
    "Star Health",
    "ICICI Lombard",
    "HDFC Ergo",
    "Bajaj Allianz",
    "Max Bupa",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Treatment {
    EmergencyConsultation,
    NebulizerTherapy,
    OxygenSupport,
    VentilatorUse,
    IcuAdmission,
}

impl Treatment {
    /// Unit cost in rupees.
    pub fn cost(&self) -> u64 {
        match self {
            Treatment::EmergencyConsultation => 2_000,
            Treatment::NebulizerTherapy => 3_500,
            Treatment::OxygenSupport => 5_000,
            Treatment::VentilatorUse => 15_000,
            Treatment::IcuAdmission => 25_000,
        }
    }

    /// Treatments pre-authorised for a condition.
    pub fn for_condition(condition: Condition) -> Vec<Treatment> {
        use Treatment::*;
        match condition {
            Condition::RespiratoryIllness => vec![
                EmergencyConsultation,
                NebulizerTherapy,
                OxygenSupport,
                VentilatorUse,
            ],
            Condition::ViralInfections => vec![EmergencyConsultation, OxygenSupport],
            Condition::Cardiovascular => vec![EmergencyConsultation, IcuAdmission, OxygenSupport],
            Condition::Gastroenteritis => vec![EmergencyConsultation, OxygenSupport],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authorization {
    pub provider: String,
    pub patients: u32,
    pub approved: u32,
    pub pending: u32,
    pub estimated_cost: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreAuthorization {
    pub prediction_id: PredictionId,
    pub patient_count: u32,
    pub treatments_covered: Vec<Treatment>,
    pub total_estimated_cost: u64,
    pub authorizations: Vec<Authorization>,
    pub total_approved: u32,

    /// Approved share of all predicted patients, in percent.
    pub approval_rate: f64,
    pub processing_time: String,
}

/// Splits predicted patients evenly across partner insurers and submits
/// pre-authorisations; each insurer approves 82-92% of its share.
pub struct InsuranceAgent {
    rng: Mutex<StdRng>,
}

impl InsuranceAgent {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: Mutex::new(seeded_rng(seed, 11)),
        }
    }

    pub fn pre_authorize(&self, prediction: &SurgePrediction) -> PreAuthorization {
        let mut rng = self.rng.lock();

        let patients = prediction.predicted_patients;
        let treatments = Treatment::for_condition(prediction.primary_condition);
        let cost_per_patient: u64 = treatments.iter().map(Treatment::cost).sum();
        let total_cost = cost_per_patient * patients as u64;

        let share = patients / PROVIDERS.len() as u32;
        let authorizations: Vec<Authorization> = PROVIDERS
            .iter()
            .map(|provider| {
                let approved = (share as f64 * rng.gen_range(0.82..0.92)) as u32;
                Authorization {
                    provider: provider.to_string(),
                    patients: share,
                    approved,
                    pending: share - approved,
                    estimated_cost: total_cost / PROVIDERS.len() as u64,
                }
            })
            .collect();

        let total_approved: u32 = authorizations.iter().map(|a| a.approved).sum();
        let approval_rate = if patients == 0 {
            0.0
        } else {
            (total_approved as f64 / patients as f64 * 1000.0).round() / 10.0
        };

        PreAuthorization {
            prediction_id: prediction.id,
            patient_count: patients,
            treatments_covered: treatments,
            total_estimated_cost: total_cost,
            authorizations,
            total_approved,
            approval_rate,
            processing_time: "24-48 hours".into(),
        }
    }
}

#[async_trait]
impl ResponseAgent for InsuranceAgent {
    fn name(&self) -> AgentName {
        AgentName::Insurance
    }

    async fn respond(&self, prediction: &SurgePrediction) -> ProviderResult<serde_json::Value> {
        let result = self.pre_authorize(prediction);
        info!(
            prediction_id = %result.prediction_id,
            approved = result.total_approved,
            patients = result.patient_count,
            approval_rate = result.approval_rate,
            total_cost = result.total_estimated_cost,
            "Insurance pre-authorisations submitted"
        );
        Ok(serde_json::to_value(result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medisurge_runtime::testing::sample_prediction;
    use medisurge_types::AlertLevel;

    #[test]
    fn test_respiratory_costs() {
        let prediction = sample_prediction(AlertLevel::High, 340, 120);
        let result = InsuranceAgent::new(Some(1)).pre_authorize(&prediction);

        // 2000 + 3500 + 5000 + 15000 per patient
        assert_eq!(result.total_estimated_cost, 25_500 * 340);
        assert_eq!(result.treatments_covered.len(), 4);
        assert_eq!(result.authorizations.len(), 5);
    }

    #[test]
    fn test_approvals_within_band() {
        let prediction = sample_prediction(AlertLevel::High, 340, 120);
        let result = InsuranceAgent::new(Some(2)).pre_authorize(&prediction);

        for auth in &result.authorizations {
            assert_eq!(auth.patients, 68);
            assert_eq!(auth.approved + auth.pending, 68);
            assert!((55..=62).contains(&auth.approved));
        }
        assert!(result.approval_rate > 75.0 && result.approval_rate < 93.0);
    }

    #[test]
    fn test_unmapped_condition_falls_back() {
        assert_eq!(
            Treatment::for_condition(Condition::Gastroenteritis),
            vec![Treatment::EmergencyConsultation, Treatment::OxygenSupport]
        );
    }

    #[test]
    fn test_zero_patients() {
        let prediction = sample_prediction(AlertLevel::Low, 0, 120);
        let result = InsuranceAgent::new(Some(3)).pre_authorize(&prediction);
        assert_eq!(result.total_approved, 0);
        assert_eq!(result.approval_rate, 0.0);
    }
}
