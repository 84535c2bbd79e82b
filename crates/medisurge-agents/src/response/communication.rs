//! Public health advisories over every channel and language.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medisurge_runtime::{ProviderResult, ResponseAgent};
use medisurge_types::{AgentName, Condition, PredictionId, SurgePrediction};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::seeded_rng;

pub const CHANNELS: [&str; 4] = ["SMS", "WhatsApp", "Email", "Social Media"];
pub const LANGUAGES: [&str; 3] = ["English", "Hindi", "Marathi"];

const RECIPIENTS: std::ops::RangeInclusive<u32> = 40_000..=60_000;

/// Advisory body for a condition; `date` is the surge date as "Month DD".
pub fn advisory_text(condition: Condition, date: &str) -> String {
    match condition {
        Condition::ViralInfections => format!(
            "HEALTH ADVISORY: Viral infection risk rising around {date}. \
             Wash hands often, avoid crowded places, and watch for fever or body ache. \
             Stay hydrated and rest. Seek care if fever lasts beyond 3 days."
        ),
        _ => format!(
            "HEALTH ALERT: Poor air quality expected around {date}. \
             Stay indoors, keep windows closed, and wear N95 masks outside. \
             Keep inhalers ready. Seek care for breathing difficulty or chest pain."
        ),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub channel: String,
    pub language: String,
    pub recipients: u32,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryCampaign {
    pub prediction_id: PredictionId,
    pub condition: Condition,
    pub advisory: String,
    pub distributions: Vec<Distribution>,
    pub total_recipients: u32,
    pub sent_at: DateTime<Utc>,
}

pub struct CommunicationAgent {
    rng: Mutex<StdRng>,
}

impl CommunicationAgent {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: Mutex::new(seeded_rng(seed, 14)),
        }
    }

    pub fn campaign(&self, prediction: &SurgePrediction) -> AdvisoryCampaign {
        let total_recipients = self.rng.lock().gen_range(RECIPIENTS);
        let slots = (CHANNELS.len() * LANGUAGES.len()) as u32;
        let per_slot = total_recipients / slots;
        let remainder = total_recipients % slots;

        let distributions = CHANNELS
            .iter()
            .flat_map(|channel| LANGUAGES.iter().map(move |language| (channel, language)))
            .enumerate()
            .map(|(i, (channel, language))| Distribution {
                channel: channel.to_string(),
                language: language.to_string(),
                // The first slots absorb the remainder so the split is exact.
                recipients: per_slot + u32::from((i as u32) < remainder),
                status: "sent".into(),
            })
            .collect();

        let date = prediction.surge_date.format("%B %d").to_string();
        AdvisoryCampaign {
            prediction_id: prediction.id,
            condition: prediction.primary_condition,
            advisory: advisory_text(prediction.primary_condition, &date),
            distributions,
            total_recipients,
            sent_at: Utc::now(),
        }
    }
}

#[async_trait]
impl ResponseAgent for CommunicationAgent {
    fn name(&self) -> AgentName {
        AgentName::Communication
    }

    async fn respond(&self, prediction: &SurgePrediction) -> ProviderResult<serde_json::Value> {
        let campaign = self.campaign(prediction);
        info!(
            prediction_id = %campaign.prediction_id,
            recipients = campaign.total_recipients,
            channels = CHANNELS.len(),
            languages = LANGUAGES.len(),
            "Public advisory sent"
        );
        Ok(serde_json::to_value(campaign)?)
    }
}
