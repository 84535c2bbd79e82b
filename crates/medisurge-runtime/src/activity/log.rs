//! The never-failing activity log facade.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use medisurge_types::{ActivityLogEntry, AgentActivity, EntryId};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::query::ActivityQuery;
use super::store::ActivityStore;
use crate::error::{ActivityError, ActivityResult, OrchestratorError};

/// Append-only activity log shared by the loop and every fan-out branch.
///
/// [`ActivityLog::record`] never returns an error. When the store rejects a
/// write the entry goes to a bounded local buffer (oldest dropped first)
/// and is re-appended once the store accepts writes again.
///
/// Writes are serialised: a buffered entry always reaches the store before
/// any entry recorded after it.
pub struct ActivityLog {
    store: Arc<dyn ActivityStore>,
    fallback: Mutex<VecDeque<ActivityLogEntry>>,
    fallback_capacity: usize,
    dropped: AtomicU64,
    writer: tokio::sync::Mutex<()>,
}

impl ActivityLog {
    pub fn new(store: Arc<dyn ActivityStore>, fallback_capacity: usize) -> Self {
        Self {
            store,
            fallback: Mutex::new(VecDeque::new()),
            fallback_capacity,
            dropped: AtomicU64::new(0),
            writer: tokio::sync::Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn ActivityStore> {
        &self.store
    }

    /// Record one entry.
    pub async fn record(&self, entry: ActivityLogEntry) {
        let _writer = self.writer.lock().await;

        if self.buffered() > 0 {
            // Store may have recovered; buffered entries go first.
            if let Err(e) = self.drain_buffer().await {
                debug!(error = %e, "Activity store still unavailable");
            }
        }

        if self.buffered() > 0 {
            self.buffer(entry, None);
            return;
        }

        if let Err(e) = self.store.append(&entry).await {
            self.buffer(entry, Some(e));
        }
    }

    /// Re-append buffered entries; returns how many reached the store.
    ///
    /// Stops at the first failure, leaving that entry and the rest buffered.
    pub async fn drain(&self) -> ActivityResult<usize> {
        let _writer = self.writer.lock().await;
        self.drain_buffer().await
    }

    /// Caller holds the writer lock, so nothing else touches the buffer front.
    async fn drain_buffer(&self) -> ActivityResult<usize> {
        let mut drained = 0;
        loop {
            // Leave the entry visible to readers until the store has it.
            let next = self.fallback.lock().front().cloned();
            let Some(entry) = next else {
                break;
            };

            self.store.append(&entry).await?;
            self.fallback.lock().pop_front();
            drained += 1;
        }

        if drained > 0 {
            info!(
                drained,
                backend = self.store.backend(),
                "Re-appended buffered activity entries"
            );
        }
        Ok(drained)
    }

    fn buffer(&self, entry: ActivityLogEntry, cause: Option<ActivityError>) {
        if let Some(e) = cause {
            let degraded = OrchestratorError::LogWriteDegraded(e);
            warn!(
                entry_id = %entry.id,
                agent = %entry.agent_name,
                backend = self.store.backend(),
                error = %degraded,
                "Buffering activity entry locally"
            );
        }

        let mut fallback = self.fallback.lock();
        if self.fallback_capacity == 0 {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            error!(entry_id = %entry.id, "Activity entry lost; no fallback buffer");
            return;
        }
        if fallback.len() >= self.fallback_capacity {
            if let Some(oldest) = fallback.pop_front() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                error!(
                    entry_id = %oldest.id,
                    capacity = self.fallback_capacity,
                    "Activity fallback buffer full; dropping oldest entry"
                );
            }
        }
        fallback.push_back(entry);
    }

    /// Entries waiting in the fallback buffer.
    pub fn buffered(&self) -> usize {
        self.fallback.lock().len()
    }

    /// Entries discarded because the fallback buffer overflowed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Entries matching `query`, including those still buffered locally.
    ///
    /// Buffered entries follow stored ones in append order. An entry caught
    /// mid-drain is reported once.
    pub async fn query(&self, query: &ActivityQuery) -> ActivityResult<Vec<ActivityLogEntry>> {
        let buffered: Vec<ActivityLogEntry> = {
            let fallback = self.fallback.lock();
            fallback.iter().filter(|e| query.matches(e)).cloned().collect()
        };

        if buffered.is_empty() {
            return self.store.query(query).await;
        }

        let stored = self
            .store
            .query(&query.unlimited().oldest_first())
            .await?;
        let stored_ids: HashSet<EntryId> = stored.iter().map(|e| e.id).collect();
        let pending = buffered.into_iter().filter(|e| !stored_ids.contains(&e.id));
        Ok(query.apply(stored.into_iter().chain(pending)))
    }

    /// The `limit` most recent entries.
    pub async fn recent(&self, limit: usize) -> ActivityResult<Vec<ActivityLogEntry>> {
        self.query(&ActivityQuery::recent(limit)).await
    }

    /// Every entry at or after `since`, newest first.
    pub async fn since(&self, since: DateTime<Utc>) -> ActivityResult<Vec<ActivityLogEntry>> {
        self.query(&ActivityQuery::since(since)).await
    }

    /// Per-agent totals over entries at or after `since`.
    pub async fn agent_activity(
        &self,
        since: DateTime<Utc>,
    ) -> ActivityResult<BTreeMap<String, AgentActivity>> {
        let mut totals: BTreeMap<String, AgentActivity> = BTreeMap::new();
        for entry in self.since(since).await? {
            totals
                .entry(entry.agent_name.clone())
                .or_default()
                .record(&entry);
        }
        Ok(totals)
    }
}

impl std::fmt::Debug for ActivityLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityLog")
            .field("backend", &self.store.backend())
            .field("buffered", &self.buffered())
            .field("dropped", &self.dropped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::MemoryActivityStore;
    use crate::testing::FlakyActivityStore;
    use chrono::Duration;
    use medisurge_types::{AgentName, AgentOutcome, CycleId, FailureKind, PredictionId};

    fn entry(agent: AgentName, ok: bool) -> ActivityLogEntry {
        let prediction_id = PredictionId::generate();
        let outcome = if ok {
            AgentOutcome::success(agent, prediction_id, serde_json::json!({}), Utc::now(), 2)
        } else {
            AgentOutcome::failure(agent, prediction_id, FailureKind::Timeout, "slow", Utc::now(), 2)
        };
        ActivityLogEntry::from_outcome(CycleId::generate(), &outcome)
    }

    #[tokio::test]
    async fn test_record_reaches_store() {
        let store = Arc::new(MemoryActivityStore::new());
        let log = ActivityLog::new(store.clone(), 8);

        log.record(entry(AgentName::Resource, true)).await;

        assert_eq!(store.snapshot().len(), 1);
        assert_eq!(log.buffered(), 0);
    }

    #[tokio::test]
    async fn test_degraded_store_buffers_and_recovers() {
        let store = Arc::new(FlakyActivityStore::new());
        let log = ActivityLog::new(store.clone(), 8);

        store.set_available(false);
        log.record(entry(AgentName::Resource, true)).await;
        log.record(entry(AgentName::Insurance, false)).await;
        assert_eq!(log.buffered(), 2);
        assert_eq!(store.count().await.unwrap(), 0);

        store.set_available(true);
        log.record(entry(AgentName::Communication, true)).await;

        assert_eq!(log.buffered(), 0);
        let stored = store.entries();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[0].agent_name, "Resource");
        assert_eq!(stored[2].agent_name, "Communication");
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_records_wait_for_drain() {
        let store = Arc::new(FlakyActivityStore::new());
        let log = ActivityLog::new(store.clone(), 8);

        store.set_available(false);
        log.record(entry(AgentName::Resource, true)).await;
        assert_eq!(log.buffered(), 1);

        // Each append now yields, so both writers overlap the drain.
        store.set_available(true);
        store.set_append_delay(std::time::Duration::from_millis(50));
        tokio::join!(
            log.record(entry(AgentName::Insurance, true)),
            log.record(entry(AgentName::Communication, true)),
        );

        assert_eq!(log.buffered(), 0);
        let names: Vec<_> = store.entries().into_iter().map(|e| e.agent_name).collect();
        assert_eq!(names.len(), 3);
        assert_eq!(names[0], "Resource");
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_during_drain_keeps_buffered_entry() {
        let store = Arc::new(FlakyActivityStore::new());
        let log = Arc::new(ActivityLog::new(store.clone(), 8));

        store.set_available(false);
        log.record(entry(AgentName::Resource, true)).await;

        store.set_available(true);
        store.set_append_delay(std::time::Duration::from_millis(50));
        let writer = {
            let log = log.clone();
            tokio::spawn(async move { log.record(entry(AgentName::Insurance, true)).await })
        };

        // Mid-drain the entry is still buffered and not yet stored.
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let during = log.recent(10).await.unwrap();
        assert_eq!(during.len(), 1);
        assert_eq!(during[0].agent_name, "Resource");

        writer.await.unwrap();
        let after = log.recent(10).await.unwrap();
        let names: Vec<_> = after.into_iter().map(|e| e.agent_name).collect();
        assert_eq!(names, vec!["Insurance", "Resource"]);
    }

    #[tokio::test]
    async fn test_fallback_capacity_drops_oldest() {
        let store = Arc::new(FlakyActivityStore::new());
        store.set_available(false);
        let log = ActivityLog::new(store.clone(), 2);

        log.record(entry(AgentName::Resource, true)).await;
        log.record(entry(AgentName::Insurance, true)).await;
        log.record(entry(AgentName::SupplyChain, true)).await;

        assert_eq!(log.buffered(), 2);
        assert_eq!(log.dropped(), 1);

        store.set_available(true);
        assert_eq!(log.drain().await.unwrap(), 2);
        let names: Vec<_> = store.entries().into_iter().map(|e| e.agent_name).collect();
        assert_eq!(names, vec!["Insurance", "SupplyChain"]);
    }

    #[tokio::test]
    async fn test_query_includes_buffered_entries() {
        let store = Arc::new(FlakyActivityStore::new());
        let log = ActivityLog::new(store.clone(), 8);

        log.record(entry(AgentName::Resource, true)).await;
        store.set_available(false);
        log.record(entry(AgentName::Insurance, false)).await;

        // Reads still work while writes are failing.
        let recent = log.recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
    }

    #[tokio::test]
    async fn test_agent_activity_aggregates() {
        let store = Arc::new(MemoryActivityStore::new());
        let log = ActivityLog::new(store, 8);

        log.record(entry(AgentName::Resource, true)).await;
        log.record(entry(AgentName::Resource, false)).await;
        log.record(entry(AgentName::Insurance, true)).await;

        let totals = log
            .agent_activity(Utc::now() - Duration::hours(24))
            .await
            .unwrap();

        let resource = &totals["Resource"];
        assert_eq!(resource.total_actions, 2);
        assert_eq!(resource.successful, 1);
        assert_eq!(resource.failed, 1);
        assert_eq!(totals["Insurance"].success_rate(), 1.0);
    }
}
