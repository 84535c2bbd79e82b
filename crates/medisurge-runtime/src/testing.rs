//! Scripted collaborators for exercising the runtime without live feeds.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use medisurge_types::{
    ActivityLogEntry, AgentName, AlertLevel, Condition, PredictionDraft, SurgePrediction,
    ThreatSignals, ThreatSnapshot,
};
use parking_lot::Mutex;

use crate::activity::{ActivityQuery, ActivityStore, MemoryActivityStore};
use crate::error::{ActivityError, ActivityResult, OrchestratorResult, ProviderError, ProviderResult};
use crate::fanout::ResponseRoster;
use crate::provider::{ResponseAgent, SurgePredictor, SurveillanceProvider};

/// A prediction built from a default snapshot.
pub fn sample_prediction(level: AlertLevel, predicted: u32, baseline: u32) -> SurgePrediction {
    let snapshot = ThreatSnapshot::assess(ThreatSignals::default());
    SurgePrediction::from_snapshot(
        &snapshot,
        PredictionDraft {
            surge_date: Utc::now() + chrono::Duration::hours(48),
            predicted_patients: predicted,
            baseline_patients: baseline,
            confidence: 85.0,
            primary_condition: Condition::RespiratoryIllness,
            alert_level: level,
        },
    )
}

/// One scripted scan result.
#[derive(Debug, Clone)]
pub enum ScanStep {
    Signals(ThreatSignals),
    Fail(String),
}

/// Surveillance that replays queued steps, then repeats a fallback.
pub struct ScriptedSurveillance {
    steps: Mutex<VecDeque<ScanStep>>,
    fallback: ThreatSignals,
    calls: AtomicUsize,
}

impl ScriptedSurveillance {
    pub fn new(fallback: ThreatSignals) -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn then(self, step: ScanStep) -> Self {
        self.steps.lock().push_back(step);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SurveillanceProvider for ScriptedSurveillance {
    async fn scan(&self) -> ProviderResult<ThreatSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().pop_front();
        match step {
            Some(ScanStep::Signals(signals)) => Ok(ThreatSnapshot::assess(signals)),
            Some(ScanStep::Fail(reason)) => Err(ProviderError::Unavailable(reason)),
            None => Ok(ThreatSnapshot::assess(self.fallback.clone())),
        }
    }
}

/// Predictor returning a fixed level and patient count for any snapshot.
pub struct FixedPredictor {
    level: AlertLevel,
    predicted: u32,
    baseline: u32,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl FixedPredictor {
    pub fn new(level: AlertLevel, predicted: u32, baseline: u32) -> Self {
        Self {
            level,
            predicted,
            baseline,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SurgePredictor for FixedPredictor {
    async fn predict(&self, snapshot: &ThreatSnapshot) -> ProviderResult<SurgePrediction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::Unavailable("model offline".into()));
        }
        Ok(SurgePrediction::from_snapshot(
            snapshot,
            PredictionDraft {
                surge_date: snapshot.timestamp + chrono::Duration::hours(48),
                predicted_patients: self.predicted,
                baseline_patients: self.baseline,
                confidence: 88.0,
                primary_condition: Condition::RespiratoryIllness,
                alert_level: self.level,
            },
        ))
    }
}

/// How a [`MockAgent`] responds.
#[derive(Debug, Clone)]
pub enum AgentBehavior {
    Succeed(serde_json::Value),
    Fail(String),
    Panic,
    /// Never completes.
    Hang,
    /// Succeeds after the given delay.
    Delay(Duration),
}

impl AgentBehavior {
    pub fn succeed() -> Self {
        AgentBehavior::Succeed(serde_json::json!({ "ok": true }))
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        AgentBehavior::Fail(reason.into())
    }
}

/// Response agent with scripted behaviour and a call counter.
pub struct MockAgent {
    name: AgentName,
    behavior: AgentBehavior,
    calls: AtomicUsize,
}

impl MockAgent {
    pub fn new(name: AgentName, behavior: AgentBehavior) -> Self {
        Self {
            name,
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    /// One agent per name, behaviour chosen by `behavior`.
    pub fn full_set(behavior: impl Fn(AgentName) -> AgentBehavior) -> Vec<Arc<MockAgent>> {
        AgentName::ALL
            .iter()
            .map(|name| Arc::new(MockAgent::new(*name, behavior(*name))))
            .collect()
    }

    pub fn roster(agents: &[Arc<MockAgent>]) -> OrchestratorResult<ResponseRoster> {
        ResponseRoster::new(
            agents
                .iter()
                .map(|a| Arc::clone(a) as Arc<dyn ResponseAgent>)
                .collect(),
        )
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResponseAgent for MockAgent {
    fn name(&self) -> AgentName {
        self.name
    }

    async fn respond(&self, prediction: &SurgePrediction) -> ProviderResult<serde_json::Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            AgentBehavior::Succeed(payload) => Ok(serde_json::json!({
                "prediction_id": prediction.id,
                "result": payload,
            })),
            AgentBehavior::Fail(reason) => Err(ProviderError::Unavailable(reason.clone())),
            AgentBehavior::Panic => panic!("{} agent crashed", self.name),
            AgentBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(serde_json::Value::Null)
            }
            AgentBehavior::Delay(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(serde_json::json!({ "prediction_id": prediction.id }))
            }
        }
    }
}

/// In-memory store whose writes can be switched off.
#[derive(Default)]
pub struct FlakyActivityStore {
    inner: MemoryActivityStore,
    unavailable: AtomicBool,
    append_delay: Mutex<Duration>,
}

impl FlakyActivityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Every append sleeps this long before reaching the inner store.
    pub fn set_append_delay(&self, delay: Duration) {
        *self.append_delay.lock() = delay;
    }

    pub fn entries(&self) -> Vec<ActivityLogEntry> {
        self.inner.snapshot()
    }
}

#[async_trait]
impl ActivityStore for FlakyActivityStore {
    fn backend(&self) -> &'static str {
        "flaky"
    }

    async fn append(&self, entry: &ActivityLogEntry) -> ActivityResult<()> {
        let delay = *self.append_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ActivityError::Unavailable("disk full".into()));
        }
        self.inner.append(entry).await
    }

    async fn query(&self, query: &ActivityQuery) -> ActivityResult<Vec<ActivityLogEntry>> {
        self.inner.query(query).await
    }

    async fn count(&self) -> ActivityResult<usize> {
        self.inner.count().await
    }
}
