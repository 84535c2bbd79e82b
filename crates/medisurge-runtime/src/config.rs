//! Orchestration configuration.
//!
//! Defines loop cadence, agent timeouts and activity log storage.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OrchestratorError, OrchestratorResult};

/// Configuration for the monitoring loop and fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Normal cadence between scans, in seconds.
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,

    /// Short backoff after a surveillance failure, in seconds.
    #[serde(default = "default_backoff_interval")]
    pub backoff_interval_secs: u64,

    /// Per-agent timeout during fan-out, in seconds.
    #[serde(default = "default_agent_timeout")]
    pub agent_timeout_secs: u64,

    /// Capacity of the cycle notification channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Entries held locally while the activity store is unavailable.
    #[serde(default = "default_fallback_capacity")]
    pub fallback_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval(),
            backoff_interval_secs: default_backoff_interval(),
            agent_timeout_secs: default_agent_timeout(),
            event_capacity: default_event_capacity(),
            fallback_capacity: default_fallback_capacity(),
        }
    }
}

impl MonitorConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn backoff_interval(&self) -> Duration {
        Duration::from_secs(self.backoff_interval_secs)
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_timeout_secs)
    }

    /// Reject settings the loop cannot run with.
    pub fn validate(&self) -> OrchestratorResult<()> {
        if self.scan_interval_secs == 0 {
            return Err(OrchestratorError::Config(
                "scan_interval_secs must be greater than zero".into(),
            ));
        }
        if self.backoff_interval_secs == 0 {
            return Err(OrchestratorError::Config(
                "backoff_interval_secs must be greater than zero".into(),
            ));
        }
        if self.backoff_interval_secs > self.scan_interval_secs {
            return Err(OrchestratorError::Config(
                "backoff_interval_secs must not exceed scan_interval_secs".into(),
            ));
        }
        if self.agent_timeout_secs == 0 {
            return Err(OrchestratorError::Config(
                "agent_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(OrchestratorError::Config(
                "event_capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Activity log storage configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActivityConfig {
    /// In-memory storage (for development/testing)
    #[default]
    Memory,

    /// Append-only JSON-lines file
    File {
        /// Path of the log file
        path: PathBuf,
    },
}

// Default value helpers
fn default_scan_interval() -> u64 {
    15 * 60
}

fn default_backoff_interval() -> u64 {
    60
}

fn default_agent_timeout() -> u64 {
    30
}

fn default_event_capacity() -> usize {
    64
}

fn default_fallback_capacity() -> usize {
    1024
}
