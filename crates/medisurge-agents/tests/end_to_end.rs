//! Full pipeline: scripted threat signals through the baseline predictor and
//! the five reference agents into a real activity store.

use std::sync::Arc;

use medisurge_agents::{reference_roster, BaselinePredictor, SimulatedSurveillance};
use medisurge_runtime::testing::{ScanStep, ScriptedSurveillance};
use medisurge_runtime::{
    ActivityLog, ActivityQuery, FileActivityStore, MemoryActivityStore, MonitorConfig,
    MonitorState, Orchestrator,
};
use medisurge_types::{
    AdmissionTrend, AgentName, CycleStatus, EntryKind, EventIndicator, SocialSignal,
    ThreatSignals, ThreatTier, Trend, ORCHESTRATOR_AGENT,
};

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

fn orchestrator(surveillance: ScriptedSurveillance, log: Arc<ActivityLog>) -> Arc<Orchestrator> {
    let orchestrator = Orchestrator::new(
        MonitorConfig::default(),
        Arc::new(surveillance),
        Arc::new(BaselinePredictor::new(Some(42))),
        reference_roster(Some(42)).unwrap(),
        log,
    )
    .unwrap();
    Arc::new(orchestrator)
}

#[tokio::test]
async fn test_critical_cycle_persists_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("activity.jsonl");
    let store = Arc::new(FileActivityStore::open(&path).await.unwrap());
    let log = Arc::new(ActivityLog::new(store, 1024));
    let orchestrator = orchestrator(ScriptedSurveillance::new(festival_smog()), log);

    let summary = orchestrator.run_cycle().await;

    assert_eq!(summary.alert_tier, Some(ThreatTier::Critical));
    assert_eq!(summary.status, CycleStatus::Responded);
    assert_eq!(summary.outcomes.len(), 5);
    assert!(summary.outcomes.iter().all(|o| o.is_success()));

    // Reopen to read what actually reached disk.
    let reopened = FileActivityStore::open(&path).await.unwrap();
    let log = ActivityLog::new(Arc::new(reopened), 16);
    let entries = log
        .query(&ActivityQuery::default().for_cycle(summary.cycle_id))
        .await
        .unwrap();
    assert_eq!(entries.len(), 6);

    let summaries: Vec<_> = entries
        .iter()
        .filter(|e| e.kind == EntryKind::CycleSummary)
        .collect();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].agent_name, ORCHESTRATOR_AGENT);

    let resource = log
        .query(&ActivityQuery::default().for_agent(AgentName::Resource))
        .await
        .unwrap();
    assert_eq!(resource.len(), 1);
    assert_eq!(resource[0].prediction_id, summary.prediction_id);
    assert!(resource[0].details["nurses_needed"].as_u64().unwrap() > 1);
}

#[tokio::test]
async fn test_calm_day_stays_quiet() {
    let store = Arc::new(MemoryActivityStore::new());
    let log = Arc::new(ActivityLog::new(store.clone(), 64));
    let orchestrator = orchestrator(ScriptedSurveillance::new(ThreatSignals::default()), log);

    let summary = orchestrator.run_cycle().await;

    assert_eq!(summary.alert_tier, Some(ThreatTier::Low));
    assert_eq!(summary.status, CycleStatus::Quiet);
    assert!(!summary.prediction_triggered);
    assert!(store.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_loop_recovers_after_scan_outage() {
    let store = Arc::new(MemoryActivityStore::new());
    let log = Arc::new(ActivityLog::new(store.clone(), 64));
    let surveillance = ScriptedSurveillance::new(festival_smog())
        .then(ScanStep::Fail("sensor feed offline".into()));
    let orchestrator = orchestrator(surveillance, log);

    let mut cycles = orchestrator.subscribe();
    orchestrator.start().unwrap();

    let first = cycles.recv().await.unwrap();
    assert_eq!(first.status, CycleStatus::ScanFailed);
    assert!(orchestrator.is_running());

    let second = cycles.recv().await.unwrap();
    assert_eq!(second.status, CycleStatus::Responded);

    orchestrator.shutdown().await;
    let status = orchestrator.current_status();
    assert!(!status.running);
    assert_eq!(status.state, MonitorState::Idle);
    assert_eq!(status.cycles_completed, 2);
    assert_eq!(status.last_alert_tier, Some(ThreatTier::Critical));
    assert!(status.last_error.is_none());

    let activity = orchestrator
        .agent_activity(chrono::Utc::now() - chrono::Duration::days(1))
        .await
        .unwrap();
    assert_eq!(activity.len(), 6);
    assert!(activity.values().all(|a| a.total_actions == 1 && a.failed == 0));
}

#[tokio::test]
async fn test_simulated_surveillance_drives_a_cycle() {
    let store = Arc::new(MemoryActivityStore::new());
    let log = Arc::new(ActivityLog::new(store.clone(), 64));
    let orchestrator = Orchestrator::new(
        MonitorConfig::default(),
        Arc::new(SimulatedSurveillance::new(Some(7))),
        Arc::new(BaselinePredictor::new(Some(7))),
        reference_roster(Some(7)).unwrap(),
        log,
    )
    .unwrap();

    let summary = orchestrator.run_cycle().await;

    // Whatever the draw, the log holds exactly the responded cycles.
    let expected = if summary.fan_out_triggered { 6 } else { 0 };
    assert_eq!(store.snapshot().len(), expected);
    assert!(!summary.status.is_failure());
}
