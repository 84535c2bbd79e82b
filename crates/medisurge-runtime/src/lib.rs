//! # MediSurge Runtime - Crisis-Response Orchestration Core
//!
//! This crate runs the perpetual monitoring loop that turns surveillance
//! scans into surge predictions and, when a prediction is severe enough,
//! fans it out to the five response agents.
//!
//! ## Pieces
//!
//! - **Gates** ([`gate`]): pure escalation decisions on threat tier and alert level
//! - **Providers** ([`provider`]): async traits for surveillance, prediction and response agents
//! - **Fan-out** ([`FanOutCoordinator`]): concurrent dispatch with per-agent timeout and panic isolation
//! - **Activity log** ([`ActivityLog`]): append-only record that degrades to a local buffer
//! - **Orchestrator** ([`Orchestrator`]): the loop handle with start/stop, status and cycle notifications
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use medisurge_runtime::{ActivityLog, MemoryActivityStore, MonitorConfig, Orchestrator, ResponseRoster};
//!
//! let log = Arc::new(ActivityLog::new(Arc::new(MemoryActivityStore::new()), 1024));
//! let orchestrator = Arc::new(Orchestrator::new(
//!     MonitorConfig::default(),
//!     surveillance,
//!     predictor,
//!     ResponseRoster::new(agents)?,
//!     log,
//! )?);
//!
//! orchestrator.start()?;
//! let mut cycles = orchestrator.subscribe();
//! while let Ok(summary) = cycles.recv().await {
//!     println!("{} -> {}", summary.cycle_id, summary.status);
//! }
//! ```

pub mod activity;
pub mod config;
pub mod error;
pub mod fanout;
pub mod gate;
pub mod monitor;
pub mod provider;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use activity::{
    open_store, ActivityLog, ActivityQuery, ActivityStore, FileActivityStore, MemoryActivityStore,
};
pub use config::{ActivityConfig, MonitorConfig};
pub use error::{
    ActivityError, ActivityResult, OrchestratorError, OrchestratorResult, ProviderError,
    ProviderResult,
};
pub use fanout::{FanOutCoordinator, ResponseRoster};
pub use monitor::{MonitorState, MonitorStatus, Orchestrator};
pub use provider::{ResponseAgent, SurgePredictor, SurveillanceProvider};
