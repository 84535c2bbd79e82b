//! Staff activation: calls in retired clinicians ahead of a surge.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medisurge_runtime::{ProviderResult, ResponseAgent};
use medisurge_types::{AgentName, Condition, PredictionId, SurgePrediction};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::seeded_rng;

const POOL_SIZE: u32 = 50;
const MIN_DOCTORS: u32 = 5;
const MIN_NURSES: u32 = 10;

/// Rupees per shift hour.
const HOURLY_COMPENSATION: u32 = 1_333;

const FIRST_NAMES: [&str; 10] = [
    "Dr. Rajesh", "Dr. Priya", "Dr. Amit", "Dr. Sneha", "Dr. Vikram", "Dr. Anjali", "Dr. Suresh",
    "Dr. Kavita", "Dr. Arun", "Dr. Meera",
];
const LAST_NAMES: [&str; 10] = [
    "Mehta", "Sharma", "Kumar", "Patel", "Singh", "Reddy", "Iyer", "Desai", "Gupta", "Nair",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Specialization {
    GeneralPhysician,
    RespiratorySpecialist,
    EmergencyMedicine,
    IcuSpecialist,
    Anesthesiologist,
    GeneralSurgeon,
}

impl Specialization {
    pub const ALL: [Specialization; 6] = [
        Specialization::GeneralPhysician,
        Specialization::RespiratorySpecialist,
        Specialization::EmergencyMedicine,
        Specialization::IcuSpecialist,
        Specialization::Anesthesiologist,
        Specialization::GeneralSurgeon,
    ];

    /// Specialisations worth calling in for a condition.
    pub fn relevant_to(condition: Condition) -> &'static [Specialization] {
        use Specialization::*;
        match condition {
            Condition::RespiratoryIllness => &[
                RespiratorySpecialist,
                EmergencyMedicine,
                IcuSpecialist,
                GeneralPhysician,
            ],
            Condition::ViralInfections => &[GeneralPhysician, EmergencyMedicine, IcuSpecialist],
            Condition::Cardiovascular => &[
                IcuSpecialist,
                EmergencyMedicine,
                Anesthesiologist,
                GeneralPhysician,
            ],
            Condition::Gastroenteritis => &[GeneralPhysician, EmergencyMedicine],
        }
    }
}

/// A retired clinician on the call-in list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetiredClinician {
    pub id: u32,
    pub name: String,
    pub specialization: Specialization,
    pub phone: String,
    pub distance_km: f64,
    pub crisis_hero_score: u32,
    pub available: bool,
    pub total_activations: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationStatus {
    Confirmed,
    Pending,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activation {
    pub staff_id: u32,
    pub staff_name: String,
    pub specialization: Specialization,
    pub distance_km: f64,
    pub shift_date: DateTime<Utc>,
    pub shift_hours: u32,
    pub compensation: u32,
    pub status: ActivationStatus,
    pub response_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffActivation {
    pub prediction_id: PredictionId,
    pub doctors_needed: u32,
    pub nurses_needed: u32,
    pub activations_sent: u32,
    pub confirmed: u32,
    pub pending: u32,
    pub declined: u32,

    /// Confirmed activations over total staff needed, in percent.
    pub coverage_rate: f64,
    pub activations: Vec<Activation>,
}

pub struct StaffActivationAgent {
    pool: Vec<RetiredClinician>,
    rng: Mutex<StdRng>,
}

impl StaffActivationAgent {
    pub fn new(seed: Option<u64>) -> Self {
        let mut rng = seeded_rng(seed, 12);
        let pool = generate_pool(&mut rng);
        Self {
            pool,
            rng: Mutex::new(rng),
        }
    }

    /// Call-in list, best responders first.
    pub fn pool(&self) -> &[RetiredClinician] {
        &self.pool
    }

    pub fn activate(&self, prediction: &SurgePrediction) -> StaffActivation {
        let patients = prediction.predicted_patients as u64;
        let doctors_needed = MIN_DOCTORS.max((patients * 15 / 1000) as u32);
        let nurses_needed = MIN_NURSES.max((patients * 35 / 1000) as u32);

        let relevant = Specialization::relevant_to(prediction.primary_condition);
        // Over-ask by 2x the doctors needed to absorb declines.
        let candidates = self
            .pool
            .iter()
            .filter(|c| c.available && relevant.contains(&c.specialization))
            .take((doctors_needed * 2) as usize);

        let mut rng = self.rng.lock();
        let activations: Vec<Activation> = candidates
            .map(|clinician| {
                let shift_hours = *[4, 6, 8].choose(&mut *rng).unwrap_or(&6);
                let status = *[
                    ActivationStatus::Confirmed,
                    ActivationStatus::Confirmed,
                    ActivationStatus::Pending,
                    ActivationStatus::Declined,
                ]
                .choose(&mut *rng)
                .unwrap_or(&ActivationStatus::Pending);

                Activation {
                    staff_id: clinician.id,
                    staff_name: clinician.name.clone(),
                    specialization: clinician.specialization,
                    distance_km: clinician.distance_km,
                    shift_date: prediction.surge_date,
                    shift_hours,
                    compensation: shift_hours * HOURLY_COMPENSATION,
                    status,
                    response_hours: round1(rng.gen_range(0.5..3.0)),
                }
            })
            .collect();

        let count = |status: ActivationStatus| {
            activations.iter().filter(|a| a.status == status).count() as u32
        };
        let confirmed = count(ActivationStatus::Confirmed);
        let needed = doctors_needed + nurses_needed;

        StaffActivation {
            prediction_id: prediction.id,
            doctors_needed,
            nurses_needed,
            activations_sent: activations.len() as u32,
            confirmed,
            pending: count(ActivationStatus::Pending),
            declined: count(ActivationStatus::Declined),
            coverage_rate: round1(confirmed as f64 / needed as f64 * 100.0),
            activations,
        }
    }
}

fn generate_pool(rng: &mut StdRng) -> Vec<RetiredClinician> {
    let mut pool: Vec<RetiredClinician> = (1..=POOL_SIZE)
        .map(|id| RetiredClinician {
            id,
            name: format!(
                "{} {}",
                FIRST_NAMES.choose(rng).copied().unwrap_or("Dr."),
                LAST_NAMES.choose(rng).copied().unwrap_or("Unknown")
            ),
            specialization: Specialization::ALL
                .choose(rng)
                .copied()
                .unwrap_or(Specialization::GeneralPhysician),
            phone: format!("+91-{}", rng.gen_range(7_000_000_000u64..=9_999_999_999)),
            distance_km: round1(rng.gen_range(1.0..15.0)),
            crisis_hero_score: rng.gen_range(50..=500),
            // Three in four are reachable.
            available: rng.gen_ratio(3, 4),
            total_activations: rng.gen_range(5..=50),
        })
        .collect();

    pool.sort_by(|a, b| b.crisis_hero_score.cmp(&a.crisis_hero_score));
    pool
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[async_trait]
impl ResponseAgent for StaffActivationAgent {
    fn name(&self) -> AgentName {
        AgentName::StaffActivation
    }

    async fn respond(&self, prediction: &SurgePrediction) -> ProviderResult<serde_json::Value> {
        let result = self.activate(prediction);
        info!(
            prediction_id = %result.prediction_id,
            sent = result.activations_sent,
            confirmed = result.confirmed,
            pending = result.pending,
            coverage_rate = result.coverage_rate,
            "Retired staff activation sent"
        );
        Ok(serde_json::to_value(result)?)
    }
}
