//! Configuration for medisurge-daemon

use medisurge_runtime::{ActivityConfig, MonitorConfig};
use serde::{Deserialize, Serialize};

use crate::error::DaemonResult;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Monitoring loop configuration
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Activity log storage
    #[serde(default)]
    pub activity: ActivityConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Seed for the simulated collaborators; unseeded runs draw from entropy
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `MEDISURGE_`-prefixed environment variables.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `MEDISURGE_MONITOR__SCAN_INTERVAL_SECS=300`.
    pub fn load(path: Option<&str>) -> DaemonResult<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("MEDISURGE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: DaemonConfig = builder.build()?.try_deserialize()?;
        config.monitor.validate()?;
        Ok(config)
    }
}
