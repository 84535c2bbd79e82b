//! Wiring and lifecycle of the hosted orchestrator

use std::future::Future;
use std::sync::Arc;

use medisurge_agents::{reference_roster, BaselinePredictor, SimulatedSurveillance};
use medisurge_runtime::{open_store, ActivityLog, Orchestrator};
use medisurge_types::{CycleStatus, CycleSummary};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use crate::config::DaemonConfig;
use crate::error::DaemonResult;

/// MediSurge daemon host
pub struct Host {
    config: DaemonConfig,
    orchestrator: Arc<Orchestrator>,
}

impl Host {
    /// Open the activity store and assemble the orchestrator with the
    /// reference collaborators.
    pub async fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let store = open_store(&config.activity).await?;
        info!(backend = store.backend(), "Activity store opened");

        let log = Arc::new(ActivityLog::new(store, config.monitor.fallback_capacity));
        let orchestrator = Orchestrator::new(
            config.monitor.clone(),
            Arc::new(SimulatedSurveillance::new(config.seed)),
            Arc::new(BaselinePredictor::new(config.seed)),
            reference_roster(config.seed)?,
            log,
        )?;

        Ok(Self {
            config,
            orchestrator: Arc::new(orchestrator),
        })
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Run a single cycle without starting the loop.
    pub async fn run_once(&self) -> CycleSummary {
        let summary = self.orchestrator.run_cycle().await;
        log_summary(&summary);
        summary
    }

    /// Start the loop and report each cycle until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F) -> DaemonResult<()>
    where
        F: Future<Output = ()>,
    {
        let mut cycles = self.orchestrator.subscribe();
        self.orchestrator.start()?;
        info!(
            scan_interval_secs = self.config.monitor.scan_interval_secs,
            agent_timeout_secs = self.config.monitor.agent_timeout_secs,
            "MediSurge monitoring started"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                received = cycles.recv() => match received {
                    Ok(summary) => log_summary(&summary),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Cycle subscriber lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        info!("MediSurge daemon shutting down");
        self.orchestrator.shutdown().await;
        Ok(())
    }
}

/// Report a finished cycle at a level matching its outcome.
pub fn log_summary(summary: &CycleSummary) {
    let tier = summary
        .alert_tier
        .map(|t| t.to_string())
        .unwrap_or_else(|| "-".into());
    let level = summary
        .alert_level
        .map(|l| l.to_string())
        .unwrap_or_else(|| "-".into());

    match summary.status {
        CycleStatus::Responded => info!(
            cycle_id = %summary.cycle_id,
            alert_tier = %tier,
            alert_level = %level,
            agents = summary.outcomes.len(),
            "Crisis response dispatched"
        ),
        CycleStatus::PartiallyResponded => warn!(
            cycle_id = %summary.cycle_id,
            alert_level = %level,
            failed_agents = summary.failed_count(),
            "Crisis response partially dispatched"
        ),
        CycleStatus::ScanFailed | CycleStatus::PredictionFailed => error!(
            cycle_id = %summary.cycle_id,
            status = %summary.status,
            error = summary.error.as_deref().unwrap_or("unknown"),
            "Cycle failed"
        ),
        CycleStatus::Quiet | CycleStatus::Watching => info!(
            cycle_id = %summary.cycle_id,
            alert_tier = %tier,
            alert_level = %level,
            status = %summary.status,
            "No response needed"
        ),
    }
}
