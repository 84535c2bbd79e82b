//! The monitoring loop and the orchestrator handle.
//!
//! One background task runs `SCANNING -> PREDICTING -> RESPONDING -> SLEEPING`
//! until stopped. Nothing a collaborator does can end the loop: provider
//! errors are recorded on the cycle summary and the loop sleeps on.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use medisurge_types::{
    ActivityLogEntry, AgentActivity, AlertLevel, CycleId, CycleStatus, CycleSummary, ThreatTier,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::activity::{ActivityLog, ActivityQuery};
use crate::config::MonitorConfig;
use crate::error::{ActivityResult, OrchestratorError, OrchestratorResult};
use crate::fanout::{FanOutCoordinator, ResponseRoster};
use crate::gate;
use crate::provider::{SurgePredictor, SurveillanceProvider};

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitorState {
    Idle,
    Scanning,
    Predicting,
    Responding,
    Sleeping,
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorState::Idle => write!(f, "IDLE"),
            MonitorState::Scanning => write!(f, "SCANNING"),
            MonitorState::Predicting => write!(f, "PREDICTING"),
            MonitorState::Responding => write!(f, "RESPONDING"),
            MonitorState::Sleeping => write!(f, "SLEEPING"),
        }
    }
}

/// Point-in-time view of the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub running: bool,
    pub state: MonitorState,
    pub last_cycle_time: Option<DateTime<Utc>>,
    pub last_alert_tier: Option<ThreatTier>,
    pub last_alert_level: Option<AlertLevel>,
    pub cycles_completed: u64,

    /// Error of the most recent cycle; cleared by the next clean cycle.
    pub last_error: Option<String>,
}

impl Default for MonitorStatus {
    fn default() -> Self {
        Self {
            running: false,
            state: MonitorState::Idle,
            last_cycle_time: None,
            last_alert_tier: None,
            last_alert_level: None,
            cycles_completed: 0,
            last_error: None,
        }
    }
}

/// Explicit handle owning the collaborators, the activity log and the loop.
///
/// Construct once at process start and share it as `Arc<Orchestrator>` with
/// whatever hosts the API layer.
pub struct Orchestrator {
    config: MonitorConfig,
    surveillance: Arc<dyn SurveillanceProvider>,
    predictor: Arc<dyn SurgePredictor>,
    fan_out: FanOutCoordinator,
    log: Arc<ActivityLog>,
    status: RwLock<MonitorStatus>,
    event_tx: broadcast::Sender<CycleSummary>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Orchestrator {
    /// Create an orchestrator; the loop is not started.
    pub fn new(
        config: MonitorConfig,
        surveillance: Arc<dyn SurveillanceProvider>,
        predictor: Arc<dyn SurgePredictor>,
        roster: ResponseRoster,
        log: Arc<ActivityLog>,
    ) -> OrchestratorResult<Self> {
        config.validate()?;

        let (event_tx, _) = broadcast::channel(config.event_capacity);
        let (shutdown_tx, _) = watch::channel(false);
        let fan_out = FanOutCoordinator::new(roster, Arc::clone(&log), config.agent_timeout());

        Ok(Self {
            config,
            surveillance,
            predictor,
            fan_out,
            log,
            status: RwLock::new(MonitorStatus::default()),
            event_tx,
            shutdown_tx,
            task: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn activity_log(&self) -> &Arc<ActivityLog> {
        &self.log
    }

    /// Subscribe to per-cycle summaries.
    ///
    /// Delivery is best-effort: a lagging receiver misses summaries and the
    /// loop never waits for it.
    pub fn subscribe(&self) -> broadcast::Receiver<CycleSummary> {
        self.event_tx.subscribe()
    }

    pub fn current_status(&self) -> MonitorStatus {
        self.status.read().clone()
    }

    pub fn is_running(&self) -> bool {
        self.status.read().running
    }

    /// Read activity entries, including any still held in the fallback buffer.
    pub async fn recent_activity(
        &self,
        query: &ActivityQuery,
    ) -> ActivityResult<Vec<ActivityLogEntry>> {
        self.log.query(query).await
    }

    /// Per-agent totals since `since`.
    pub async fn agent_activity(
        &self,
        since: DateTime<Utc>,
    ) -> ActivityResult<BTreeMap<String, AgentActivity>> {
        self.log.agent_activity(since).await
    }

    /// Spawn the monitoring loop.
    pub fn start(self: &Arc<Self>) -> OrchestratorResult<()> {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Err(OrchestratorError::AlreadyRunning);
        }

        self.shutdown_tx.send_replace(false);
        let shutdown_rx = self.shutdown_tx.subscribe();
        {
            let mut status = self.status.write();
            status.running = true;
            status.last_error = None;
        }

        let this = Arc::clone(self);
        *task = Some(tokio::spawn(this.run_loop(shutdown_rx)));

        info!(
            scan_interval_secs = self.config.scan_interval_secs,
            backoff_interval_secs = self.config.backoff_interval_secs,
            agent_timeout_secs = self.config.agent_timeout_secs,
            "Monitoring loop started"
        );
        Ok(())
    }

    /// Request a stop; honoured at the next suspension point.
    ///
    /// An in-flight fan-out is allowed to finish first.
    pub fn stop(&self) {
        let already_stopping = self.shutdown_tx.send_replace(true);
        if !already_stopping {
            info!("Monitoring loop stop requested");
        }
    }

    /// Stop and wait for the loop task to exit.
    pub async fn shutdown(&self) {
        self.stop();
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Monitoring loop task ended abnormally");
                self.status.write().running = false;
            }
        }
    }

    async fn run_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            let summary = self.run_cycle().await;
            let delay = if summary.status == CycleStatus::ScanFailed {
                self.config.backoff_interval()
            } else {
                self.config.scan_interval()
            };

            debug!(delay_secs = delay.as_secs(), "Sleeping until next scan");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {}
            }
        }

        {
            let mut status = self.status.write();
            status.running = false;
            status.state = MonitorState::Idle;
        }
        info!("Monitoring loop stopped");
    }

    /// Run one full cycle and return its summary.
    ///
    /// Never fails: provider errors end the cycle early and are recorded on
    /// the summary.
    #[instrument(skip(self), fields(cycle_id = tracing::field::Empty))]
    pub async fn run_cycle(&self) -> CycleSummary {
        let cycle_id = CycleId::generate();
        tracing::Span::current().record("cycle_id", tracing::field::display(cycle_id));
        let summary = CycleSummary::begin(cycle_id);

        self.set_state(MonitorState::Scanning);
        let snapshot = match self.surveillance.scan().await {
            Ok(snapshot) => snapshot,
            Err(source) => {
                let err = OrchestratorError::ProviderUnavailable {
                    provider: "surveillance",
                    source,
                };
                warn!(
                    error = %err,
                    backoff_secs = self.config.backoff_interval_secs,
                    "Surveillance scan failed"
                );
                return self
                    .complete(summary.failed(CycleStatus::ScanFailed, err.to_string()))
                    .await;
            }
        };

        let summary = summary.with_snapshot(&snapshot);
        info!(
            snapshot_id = %snapshot.id,
            alert_tier = %snapshot.alert_tier,
            aqi = snapshot.aqi,
            "Threat snapshot assessed"
        );
        if !gate::should_predict(&snapshot) {
            return self.complete(summary).await;
        }

        let summary = summary.predicting();
        self.set_state(MonitorState::Predicting);
        let prediction = match self.predictor.predict(&snapshot).await {
            Ok(prediction) => prediction,
            Err(source) => {
                let err = OrchestratorError::ProviderUnavailable {
                    provider: "predictor",
                    source,
                };
                warn!(error = %err, "Surge prediction failed");
                return self
                    .complete(summary.failed(CycleStatus::PredictionFailed, err.to_string()))
                    .await;
            }
        };

        let summary = summary.with_prediction(&prediction);
        info!(
            prediction_id = %prediction.id,
            alert_level = %prediction.alert_level,
            predicted_patients = prediction.predicted_patients,
            surge_percentage = prediction.surge_percentage,
            "Surge predicted"
        );
        if !gate::should_respond(&prediction) {
            return self.complete(summary).await;
        }

        self.set_state(MonitorState::Responding);
        let result = self.fan_out.coordinate(cycle_id, &prediction).await;
        self.complete(summary.with_fan_out(result)).await
    }

    async fn complete(&self, summary: CycleSummary) -> CycleSummary {
        let summary = summary.finish();

        if summary.fan_out_triggered {
            self.log.record(ActivityLogEntry::from_summary(&summary)).await;
        }

        {
            let mut status = self.status.write();
            status.last_cycle_time = Some(summary.finished_at);
            if summary.alert_tier.is_some() {
                status.last_alert_tier = summary.alert_tier;
            }
            if summary.alert_level.is_some() {
                status.last_alert_level = summary.alert_level;
            }
            status.last_error = summary.error.clone();
            status.cycles_completed += 1;
            status.state = if status.running {
                MonitorState::Sleeping
            } else {
                MonitorState::Idle
            };
        }

        info!(
            status = %summary.status,
            duration_ms = summary.duration_ms(),
            failed_agents = summary.failed_count(),
            "Cycle complete"
        );

        // No subscribers is fine.
        let _ = self.event_tx.send(summary.clone());
        summary
    }

    fn set_state(&self, state: MonitorState) {
        self.status.write().state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::MemoryActivityStore;
    use crate::testing::{
        AgentBehavior, FixedPredictor, FlakyActivityStore, MockAgent, ScanStep, ScriptedSurveillance,
    };
    use medisurge_types::{
        AdmissionTrend, EntryKind, EventIndicator, SocialSignal, ThreatSignals, Trend,
        ORCHESTRATOR_AGENT,
    };
    use std::time::Duration;

    struct Harness {
        orchestrator: Arc<Orchestrator>,
        surveillance: Arc<ScriptedSurveillance>,
        predictor: Arc<FixedPredictor>,
        agents: Vec<Arc<MockAgent>>,
        store: Arc<MemoryActivityStore>,
    }

    fn calm() -> ThreatSignals {
        ThreatSignals::default()
    }

    /// aqi 250, 17 C, Diwali tomorrow: score 3 + 1 + 2 = CRITICAL.
    fn festival_smog() -> ThreatSignals {
        ThreatSignals {
            aqi: 250.0,
            temperature: 17.0,
            humidity: 60.0,
            events: EventIndicator::upcoming("Diwali", 1),
            social: SocialSignal::default(),
            admissions: AdmissionTrend {
                current_rate: 100,
                baseline: 100,
                trend: Trend::Stable,
            },
        }
    }

    fn harness(
        surveillance: ScriptedSurveillance,
        predictor: FixedPredictor,
        behavior: impl Fn(medisurge_types::AgentName) -> AgentBehavior,
    ) -> Harness {
        let surveillance = Arc::new(surveillance);
        let predictor = Arc::new(predictor);
        let agents = MockAgent::full_set(behavior);
        let store = Arc::new(MemoryActivityStore::new());
        let log = Arc::new(ActivityLog::new(store.clone(), 64));

        let orchestrator = Orchestrator::new(
            MonitorConfig::default(),
            surveillance.clone(),
            predictor.clone(),
            MockAgent::roster(&agents).unwrap(),
            log,
        )
        .unwrap();

        Harness {
            orchestrator: Arc::new(orchestrator),
            surveillance,
            predictor,
            agents,
            store,
        }
    }

    fn agent_calls(h: &Harness) -> usize {
        h.agents.iter().map(|a| a.calls()).sum()
    }

    #[tokio::test(start_paused = true)]
    async fn test_low_snapshot_never_predicts() {
        let h = harness(
            ScriptedSurveillance::new(calm()),
            FixedPredictor::new(AlertLevel::High, 340, 120),
            |_| AgentBehavior::succeed(),
        );

        let summary = h.orchestrator.run_cycle().await;

        assert_eq!(summary.status, CycleStatus::Quiet);
        assert_eq!(summary.alert_tier, Some(ThreatTier::Low));
        assert_eq!(h.predictor.calls(), 0);
        assert_eq!(agent_calls(&h), 0);
        assert!(h.store.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_medium_prediction_never_responds() {
        let h = harness(
            ScriptedSurveillance::new(festival_smog()),
            FixedPredictor::new(AlertLevel::Medium, 190, 120),
            |_| AgentBehavior::succeed(),
        );

        let summary = h.orchestrator.run_cycle().await;

        assert_eq!(summary.status, CycleStatus::Watching);
        assert!(summary.prediction_triggered);
        assert!(!summary.fan_out_triggered);
        assert_eq!(h.predictor.calls(), 1);
        assert_eq!(agent_calls(&h), 0);
        assert!(h.store.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_critical_scenario_fans_out_to_all_agents() {
        let h = harness(
            ScriptedSurveillance::new(festival_smog()),
            FixedPredictor::new(AlertLevel::High, 340, 120),
            |_| AgentBehavior::succeed(),
        );

        let summary = h.orchestrator.run_cycle().await;

        assert_eq!(summary.alert_tier, Some(ThreatTier::Critical));
        assert_eq!(summary.status, CycleStatus::Responded);
        assert_eq!(summary.outcomes.len(), 5);
        let prediction_id = summary.prediction_id.unwrap();
        assert!(summary
            .outcomes
            .iter()
            .all(|o| o.prediction_id == prediction_id));

        let entries = h.store.snapshot();
        assert_eq!(entries.len(), 6);
        let summaries: Vec<_> = entries
            .iter()
            .filter(|e| e.kind == EntryKind::CycleSummary)
            .collect();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].agent_name, ORCHESTRATOR_AGENT);
        assert_eq!(summaries[0].prediction_id, Some(prediction_id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_is_recorded_not_fatal() {
        let h = harness(
            ScriptedSurveillance::new(festival_smog()),
            FixedPredictor::new(AlertLevel::Critical, 420, 120),
            |name| match name {
                medisurge_types::AgentName::StaffActivation => AgentBehavior::Panic,
                _ => AgentBehavior::succeed(),
            },
        );

        let summary = h.orchestrator.run_cycle().await;

        assert_eq!(summary.status, CycleStatus::PartiallyResponded);
        assert_eq!(summary.failed_count(), 1);
        let entries = h.store.snapshot();
        assert_eq!(entries.len(), 6);
        let cycle_entry = entries
            .iter()
            .find(|e| e.kind == EntryKind::CycleSummary)
            .unwrap();
        assert!(!cycle_entry.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_readable_while_fan_out_in_flight() {
        let h = harness(
            ScriptedSurveillance::new(festival_smog()),
            FixedPredictor::new(AlertLevel::High, 340, 120),
            |name| match name {
                medisurge_types::AgentName::Resource => {
                    AgentBehavior::Delay(Duration::from_secs(10))
                }
                _ => AgentBehavior::succeed(),
            },
        );

        let cycle = {
            let orchestrator = h.orchestrator.clone();
            tokio::spawn(async move { orchestrator.run_cycle().await })
        };

        // Four agents have reported; Resource is still working.
        tokio::time::sleep(Duration::from_secs(1)).await;
        let partial = h
            .orchestrator
            .recent_activity(&ActivityQuery::default())
            .await
            .unwrap();
        assert_eq!(partial.len(), 4);
        assert!(partial.iter().all(|e| e.agent_name != "Resource"));

        let summary = cycle.await.unwrap();
        assert_eq!(summary.status, CycleStatus::Responded);
        let all = h
            .orchestrator
            .recent_activity(&ActivityQuery::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unwritable_store_does_not_fail_cycle() {
        let agents = MockAgent::full_set(|_| AgentBehavior::succeed());
        let store = Arc::new(FlakyActivityStore::new());
        store.set_available(false);

        let orchestrator = Orchestrator::new(
            MonitorConfig::default(),
            Arc::new(ScriptedSurveillance::new(festival_smog())),
            Arc::new(FixedPredictor::new(AlertLevel::High, 340, 120)),
            MockAgent::roster(&agents).unwrap(),
            Arc::new(ActivityLog::new(store.clone(), 64)),
        )
        .unwrap();

        let summary = orchestrator.run_cycle().await;

        assert_eq!(summary.status, CycleStatus::Responded);
        assert_eq!(summary.outcomes.len(), 5);
        assert_eq!(orchestrator.activity_log().buffered(), 6);
        assert!(store.entries().is_empty());

        // Buffered entries remain readable.
        let entries = orchestrator
            .recent_activity(&ActivityQuery::default())
            .await
            .unwrap();
        assert_eq!(entries.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prediction_failure_keeps_cadence() {
        let h = harness(
            ScriptedSurveillance::new(festival_smog()),
            FixedPredictor::new(AlertLevel::High, 340, 120),
            |_| AgentBehavior::succeed(),
        );
        h.predictor.set_failing(true);

        let summary = h.orchestrator.run_cycle().await;

        assert_eq!(summary.status, CycleStatus::PredictionFailed);
        assert!(summary.prediction_triggered);
        assert!(!summary.fan_out_triggered);
        assert_eq!(h.predictor.calls(), 1);
        assert!(summary.error.unwrap().contains("predictor unavailable"));
        assert!(h.store.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_failure_backs_off_and_keeps_running() {
        let h = harness(
            ScriptedSurveillance::new(calm()).then(ScanStep::Fail("aqi feed down".into())),
            FixedPredictor::new(AlertLevel::High, 340, 120),
            |_| AgentBehavior::succeed(),
        );
        let mut events = h.orchestrator.subscribe();

        h.orchestrator.start().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(h.surveillance.calls(), 1);
        let status = h.orchestrator.current_status();
        assert!(status.running);
        assert_eq!(status.state, MonitorState::Sleeping);
        assert!(status
            .last_error
            .as_deref()
            .unwrap()
            .contains("aqi feed down"));
        let first = events.recv().await.unwrap();
        assert_eq!(first.status, CycleStatus::ScanFailed);

        // Short backoff, not the normal cadence.
        tokio::time::sleep(Duration::from_secs(58)).await;
        assert_eq!(h.surveillance.calls(), 1);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(h.surveillance.calls(), 2);

        let status = h.orchestrator.current_status();
        assert!(status.running);
        assert_eq!(status.last_error, None);
        assert_eq!(status.cycles_completed, 2);

        h.orchestrator.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_sleep_halts_within_one_cadence() {
        let h = harness(
            ScriptedSurveillance::new(calm()),
            FixedPredictor::new(AlertLevel::High, 340, 120),
            |_| AgentBehavior::succeed(),
        );

        h.orchestrator.start().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.surveillance.calls(), 1);
        assert_eq!(h.orchestrator.current_status().state, MonitorState::Sleeping);

        let scan_interval = h.orchestrator.config().scan_interval();
        tokio::time::timeout(scan_interval, h.orchestrator.shutdown())
            .await
            .expect("loop should stop within one cadence");

        let status = h.orchestrator.current_status();
        assert!(!status.running);
        assert_eq!(status.state, MonitorState::Idle);

        tokio::time::sleep(scan_interval * 3).await;
        assert_eq!(h.surveillance.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_keeps_cadence_across_cycles() {
        let h = harness(
            ScriptedSurveillance::new(festival_smog()),
            FixedPredictor::new(AlertLevel::High, 340, 120),
            |_| AgentBehavior::succeed(),
        );

        h.orchestrator.start().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.surveillance.calls(), 1);

        tokio::time::sleep(Duration::from_secs(900)).await;
        assert_eq!(h.surveillance.calls(), 2);
        assert_eq!(h.store.snapshot().len(), 12);

        let recent = h
            .orchestrator
            .recent_activity(&ActivityQuery::recent(3))
            .await
            .unwrap();
        assert_eq!(recent.len(), 3);

        h.orchestrator.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_is_rejected() {
        let h = harness(
            ScriptedSurveillance::new(calm()),
            FixedPredictor::new(AlertLevel::High, 340, 120),
            |_| AgentBehavior::succeed(),
        );

        h.orchestrator.start().unwrap();
        assert!(matches!(
            h.orchestrator.start(),
            Err(OrchestratorError::AlreadyRunning)
        ));

        h.orchestrator.shutdown().await;
        assert!(h.orchestrator.start().is_ok());
        h.orchestrator.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_before_start() {
        let h = harness(
            ScriptedSurveillance::new(calm()),
            FixedPredictor::new(AlertLevel::High, 340, 120),
            |_| AgentBehavior::succeed(),
        );

        let status = h.orchestrator.current_status();
        assert_eq!(status, MonitorStatus::default());

        h.orchestrator.run_cycle().await;
        let status = h.orchestrator.current_status();
        assert!(!status.running);
        assert_eq!(status.state, MonitorState::Idle);
        assert_eq!(status.last_alert_tier, Some(ThreatTier::Low));
        assert!(status.last_cycle_time.is_some());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let agents = MockAgent::full_set(|_| AgentBehavior::succeed());
        let store = Arc::new(MemoryActivityStore::new());
        let result = Orchestrator::new(
            MonitorConfig {
                scan_interval_secs: 0,
                ..MonitorConfig::default()
            },
            Arc::new(ScriptedSurveillance::new(calm())),
            Arc::new(FixedPredictor::new(AlertLevel::High, 340, 120)),
            MockAgent::roster(&agents).unwrap(),
            Arc::new(ActivityLog::new(store, 8)),
        );
        assert!(matches!(result, Err(OrchestratorError::Config(_))));
    }
}
