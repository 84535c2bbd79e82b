//! MediSurge daemon library
//!
//! Hosts the monitoring loop as a long-running process:
//! - Layered configuration (defaults, file, environment)
//! - Wiring of surveillance, predictor, response agents and activity store
//! - Cycle reporting and graceful shutdown

pub mod config;
pub mod error;
pub mod host;

pub use config::{DaemonConfig, LoggingConfig};
pub use error::{DaemonError, DaemonResult};
pub use host::{log_summary, Host};
