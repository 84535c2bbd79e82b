//! Threat snapshots and the threat classifier.
//!
//! A [`ThreatSnapshot`] is the immutable result of one surveillance scan.
//! Its [`ThreatTier`] is always derived by [`ThreatClassifier`] when the
//! snapshot is assembled; callers never set it directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::SnapshotId;

/// Discrete severity of the raw environmental/social signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatTier {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for ThreatTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThreatTier::Low => write!(f, "LOW"),
            ThreatTier::Medium => write!(f, "MEDIUM"),
            ThreatTier::High => write!(f, "HIGH"),
            ThreatTier::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Upcoming mass-gathering indicator (festival calendar).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventIndicator {
    /// Whether a mass gathering is coming up.
    pub upcoming: bool,

    /// Name of the event, if any.
    pub name: Option<String>,

    /// Days until the event starts.
    pub days_until: Option<u32>,
}

impl EventIndicator {
    /// No event on the calendar.
    pub fn none() -> Self {
        Self::default()
    }

    /// An event starting in `days_until` days.
    pub fn upcoming(name: impl Into<String>, days_until: u32) -> Self {
        Self {
            upcoming: true,
            name: Some(name.into()),
            days_until: Some(days_until),
        }
    }
}

/// Summary of social-media health chatter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialSignal {
    pub breathing_difficulty_mentions: u32,
    pub hospital_queries: u32,

    /// Sentiment in `[-1.0, 1.0]`.
    pub sentiment_score: f64,
}

/// Direction of hospital admissions relative to baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    #[default]
    Stable,
    Decreasing,
}

/// Hospital admission pattern summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionTrend {
    pub current_rate: u32,
    pub baseline: u32,
    pub trend: Trend,
}

impl Default for AdmissionTrend {
    fn default() -> Self {
        Self {
            current_rate: 100,
            baseline: 100,
            trend: Trend::Stable,
        }
    }
}

/// Raw readings gathered by a surveillance scan, before classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatSignals {
    /// Air-quality index.
    pub aqi: f64,

    /// Temperature in degrees Celsius.
    pub temperature: f64,

    /// Relative humidity in percent.
    pub humidity: f64,

    pub events: EventIndicator,
    pub social: SocialSignal,
    pub admissions: AdmissionTrend,
}

impl Default for ThreatSignals {
    fn default() -> Self {
        Self {
            aqi: 50.0,
            temperature: 25.0,
            humidity: 50.0,
            events: EventIndicator::none(),
            social: SocialSignal::default(),
            admissions: AdmissionTrend::default(),
        }
    }
}

/// Immutable result of one surveillance scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatSnapshot {
    pub id: SnapshotId,
    pub timestamp: DateTime<Utc>,
    pub aqi: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub events: EventIndicator,
    pub social: SocialSignal,
    pub admissions: AdmissionTrend,
    pub alert_tier: ThreatTier,
}

impl ThreatSnapshot {
    /// Assemble a snapshot from raw signals, deriving its tier.
    pub fn assess(signals: ThreatSignals) -> Self {
        Self::assess_at(signals, Utc::now())
    }

    /// Assemble a snapshot with an explicit timestamp.
    pub fn assess_at(signals: ThreatSignals, timestamp: DateTime<Utc>) -> Self {
        let alert_tier = ThreatClassifier::classify(&signals);
        Self {
            id: SnapshotId::generate(),
            timestamp,
            aqi: signals.aqi,
            temperature: signals.temperature,
            humidity: signals.humidity,
            events: signals.events,
            social: signals.social,
            admissions: signals.admissions,
            alert_tier,
        }
    }
}

/// Pure mapping from raw signals to a [`ThreatTier`].
pub struct ThreatClassifier;

impl ThreatClassifier {
    /// Score at or above which the tier is CRITICAL.
    pub const CRITICAL_SCORE: u32 = 6;
    /// Score at or above which the tier is HIGH.
    pub const HIGH_SCORE: u32 = 4;
    /// Score at or above which the tier is MEDIUM.
    pub const MEDIUM_SCORE: u32 = 2;

    /// Additive threat score over all signal factors.
    pub fn score(signals: &ThreatSignals) -> u32 {
        let mut score = 0;

        score += if signals.aqi > 200.0 {
            3
        } else if signals.aqi > 150.0 {
            2
        } else if signals.aqi > 100.0 {
            1
        } else {
            0
        };

        // Cold weather
        if signals.temperature < 20.0 {
            score += 1;
        }

        if signals.events.upcoming && signals.events.days_until.unwrap_or(10) <= 2 {
            score += 2;
        }

        if signals.social.breathing_difficulty_mentions > 500 {
            score += 2;
        }

        if signals.admissions.trend == Trend::Increasing {
            score += 1;
        }

        score
    }

    /// Classify signals into a tier.
    pub fn classify(signals: &ThreatSignals) -> ThreatTier {
        Self::tier_for_score(Self::score(signals))
    }

    /// Map a raw score onto a tier.
    pub fn tier_for_score(score: u32) -> ThreatTier {
        if score >= Self::CRITICAL_SCORE {
            ThreatTier::Critical
        } else if score >= Self::HIGH_SCORE {
            ThreatTier::High
        } else if score >= Self::MEDIUM_SCORE {
            ThreatTier::Medium
        } else {
            ThreatTier::Low
        }
    }
}
