//! Medicine supply: checks hospital stock and alerts pharma partners.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use medisurge_runtime::{ProviderResult, ResponseAgent};
use medisurge_types::{AgentName, Condition, PredictionId, SurgePrediction};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::seeded_rng;

pub const HOSPITALS: [&str; 5] = [
    "Lilavati Hospital",
    "Hinduja Hospital",
    "Breach Candy Hospital",
    "Kokilaben Hospital",
    "Jaslok Hospital",
];

pub const PHARMA_PARTNERS: [&str; 5] = ["Cipla", "Sun Pharma", "Dr. Reddy's", "Lupin", "Mankind"];

/// A medicine and how much of it one patient needs, per 1000 patients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    pub medicine: &'static str,
    pub unit: &'static str,
    pub per_1000: u32,
}

const fn req(medicine: &'static str, unit: &'static str, per_1000: u32) -> Requirement {
    Requirement {
        medicine,
        unit,
        per_1000,
    }
}

const RESPIRATORY: [Requirement; 4] = [
    req("Salbutamol Inhalers", "doses", 2000),
    req("Corticosteroids", "units", 1500),
    req("Azithromycin", "courses", 500),
    req("Oxygen Cylinders", "cylinders", 330),
];
const VIRAL: [Requirement; 3] = [
    req("Paracetamol", "strips", 3000),
    req("Antivirals", "courses", 1000),
    req("IV Fluids", "bottles", 2000),
];
const CARDIOVASCULAR: [Requirement; 3] = [
    req("Aspirin", "strips", 1000),
    req("Beta Blockers", "strips", 1000),
    req("ACE Inhibitors", "strips", 1000),
];

/// Medicines stocked against a condition; unmapped conditions get the
/// respiratory set.
pub fn requirements_for(condition: Condition) -> &'static [Requirement] {
    match condition {
        Condition::ViralInfections => &VIRAL,
        Condition::Cardiovascular => &CARDIOVASCULAR,
        Condition::RespiratoryIllness | Condition::Gastroenteritis => &RESPIRATORY,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Sufficient,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicineStock {
    pub medicine: String,
    pub unit: String,
    pub required: u32,
    pub current_stock: u32,
    pub status: StockStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HospitalInventory {
    pub hospital: String,
    pub medicines: Vec<MedicineStock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerAlert {
    pub partner: String,
    pub medicines: Vec<String>,
    pub capacity_multiplier: f64,
    pub ready_by: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyForecast {
    pub prediction_id: PredictionId,
    pub condition: Condition,
    pub hospitals_checked: u32,
    pub total_required: u64,
    pub total_available: u64,
    pub shortage: u64,
    pub supply_status: StockStatus,
    pub inventory: Vec<HospitalInventory>,
    pub partner_alerts: Vec<PartnerAlert>,
    pub estimated_delivery: DateTime<Utc>,
}

/// Forecasts medicine demand per hospital and asks partners to ramp up.
pub struct SupplyChainAgent {
    rng: Mutex<StdRng>,
}

impl SupplyChainAgent {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: Mutex::new(seeded_rng(seed, 13)),
        }
    }

    pub fn forecast(&self, prediction: &SurgePrediction) -> SupplyForecast {
        let mut rng = self.rng.lock();
        let requirements = requirements_for(prediction.primary_condition);
        let patients = prediction.predicted_patients as u64;

        let inventory: Vec<HospitalInventory> = HOSPITALS
            .iter()
            .map(|hospital| HospitalInventory {
                hospital: hospital.to_string(),
                medicines: requirements
                    .iter()
                    .map(|r| {
                        let required = (patients * r.per_1000 as u64 / 1000) as u32;
                        let current_stock = rng.gen_range(0..=required);
                        // Stock covering at least half the need is sufficient.
                        let status = if current_stock as u64 * 2 >= required as u64 {
                            StockStatus::Sufficient
                        } else {
                            StockStatus::Low
                        };
                        MedicineStock {
                            medicine: r.medicine.to_string(),
                            unit: r.unit.to_string(),
                            required,
                            current_stock,
                            status,
                        }
                    })
                    .collect(),
            })
            .collect();

        let medicines: Vec<String> = requirements.iter().map(|r| r.medicine.to_string()).collect();
        let partner_alerts = PHARMA_PARTNERS
            .iter()
            .map(|partner| PartnerAlert {
                partner: partner.to_string(),
                medicines: medicines.clone(),
                capacity_multiplier: (rng.gen_range(1.2..2.0f64) * 10.0).round() / 10.0,
                ready_by: prediction.surge_date - Duration::hours(rng.gen_range(12..=36)),
                status: "alerted".into(),
            })
            .collect();

        let stocks = || inventory.iter().flat_map(|h| h.medicines.iter());
        let total_required: u64 = stocks().map(|m| m.required as u64).sum();
        let total_available: u64 = stocks().map(|m| m.current_stock as u64).sum();
        let shortage = total_required.saturating_sub(total_available);

        SupplyForecast {
            prediction_id: prediction.id,
            condition: prediction.primary_condition,
            hospitals_checked: HOSPITALS.len() as u32,
            total_required,
            total_available,
            shortage,
            supply_status: if shortage > 0 {
                StockStatus::Low
            } else {
                StockStatus::Sufficient
            },
            inventory,
            partner_alerts,
            estimated_delivery: prediction.surge_date - Duration::hours(12),
        }
    }
}

#[async_trait]
impl ResponseAgent for SupplyChainAgent {
    fn name(&self) -> AgentName {
        AgentName::SupplyChain
    }

    async fn respond(&self, prediction: &SurgePrediction) -> ProviderResult<serde_json::Value> {
        let forecast = self.forecast(prediction);
        if forecast.shortage > 0 {
            warn!(
                prediction_id = %forecast.prediction_id,
                shortage = forecast.shortage,
                required = forecast.total_required,
                "Medicine shortage forecast"
            );
        }
        info!(
            prediction_id = %forecast.prediction_id,
            partners = forecast.partner_alerts.len(),
            estimated_delivery = %forecast.estimated_delivery,
            "Pharma partners alerted"
        );
        Ok(serde_json::to_value(forecast)?)
    }
}
