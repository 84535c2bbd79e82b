//! Simulated surveillance feed.

use async_trait::async_trait;
use medisurge_runtime::{ProviderResult, SurveillanceProvider};
use medisurge_types::{
    AdmissionTrend, EventIndicator, SocialSignal, ThreatSignals, ThreatSnapshot, Trend,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use crate::seeded_rng;

/// Festivals tracked by the event calendar.
pub const FESTIVALS: [&str; 4] = ["Diwali", "Holi", "Dussehra", "New Year"];

/// An event within this many days counts as upcoming.
const EVENT_HORIZON_DAYS: u32 = 3;

const ADMISSION_BASELINE: u32 = 100;

/// Samples the monitored data sources from plausible ranges.
pub struct SimulatedSurveillance {
    rng: Mutex<StdRng>,
}

impl SimulatedSurveillance {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: Mutex::new(seeded_rng(seed, 1)),
        }
    }

    /// Draw one set of raw readings.
    pub fn sample(&self) -> ThreatSignals {
        let mut rng = self.rng.lock();
        sample_signals(&mut rng)
    }
}

fn sample_signals(rng: &mut StdRng) -> ThreatSignals {
    let days_until = rng.gen_range(0..=10);
    let events = if days_until <= EVENT_HORIZON_DAYS {
        let name = FESTIVALS.choose(rng).copied().unwrap_or("Diwali");
        EventIndicator::upcoming(name, days_until)
    } else {
        EventIndicator::none()
    };

    let trend = [Trend::Increasing, Trend::Stable, Trend::Decreasing]
        .choose(rng)
        .copied()
        .unwrap_or_default();

    ThreatSignals {
        aqi: rng.gen_range(50.0..300.0),
        temperature: rng.gen_range(15.0..35.0),
        humidity: rng.gen_range(40.0..85.0),
        events,
        social: SocialSignal {
            breathing_difficulty_mentions: rng.gen_range(0..=1000),
            hospital_queries: rng.gen_range(0..=500),
            sentiment_score: rng.gen_range(-1.0..=1.0),
        },
        admissions: AdmissionTrend {
            current_rate: rng.gen_range(80..=150),
            baseline: ADMISSION_BASELINE,
            trend,
        },
    }
}

#[async_trait]
impl SurveillanceProvider for SimulatedSurveillance {
    async fn scan(&self) -> ProviderResult<ThreatSnapshot> {
        let snapshot = ThreatSnapshot::assess(self.sample());
        info!(
            aqi = %format_args!("{:.1}", snapshot.aqi),
            temperature = %format_args!("{:.1}", snapshot.temperature),
            event = snapshot.events.name.as_deref().unwrap_or("none"),
            alert_tier = %snapshot.alert_tier,
            "Surveillance scan complete"
        );
        Ok(snapshot)
    }
}
