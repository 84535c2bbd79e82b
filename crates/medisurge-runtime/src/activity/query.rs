//! Read-side filters over the activity log.

use chrono::{DateTime, Utc};
use medisurge_types::{ActivityLogEntry, AgentName, CycleId, PredictionId};
use serde::{Deserialize, Serialize};

/// Filter, ordering and limit for reading activity entries.
///
/// The default query returns every entry, newest first. Order is append
/// order, not timestamp order: an entry recorded late with an earlier
/// timestamp still counts as newer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityQuery {
    /// Maximum number of entries returned.
    pub limit: Option<usize>,

    /// Only entries at or after this instant.
    pub since: Option<DateTime<Utc>>,

    /// Only entries recorded under this agent name.
    pub agent: Option<String>,

    /// Only entries tagged with this prediction.
    pub prediction_id: Option<PredictionId>,

    /// Only entries belonging to this cycle.
    pub cycle_id: Option<CycleId>,

    /// Most recently appended first.
    pub newest_first: bool,
}

impl Default for ActivityQuery {
    fn default() -> Self {
        Self {
            limit: None,
            since: None,
            agent: None,
            prediction_id: None,
            cycle_id: None,
            newest_first: true,
        }
    }
}

impl ActivityQuery {
    /// The `limit` most recent entries.
    pub fn recent(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Every entry at or after `since`.
    pub fn since(since: DateTime<Utc>) -> Self {
        Self {
            since: Some(since),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn for_agent(mut self, agent: AgentName) -> Self {
        self.agent = Some(agent.to_string());
        self
    }

    /// Filter on a raw agent name, e.g. the orchestrator's summary entries.
    pub fn for_agent_name(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn for_prediction(mut self, prediction_id: PredictionId) -> Self {
        self.prediction_id = Some(prediction_id);
        self
    }

    pub fn for_cycle(mut self, cycle_id: CycleId) -> Self {
        self.cycle_id = Some(cycle_id);
        self
    }

    pub fn oldest_first(mut self) -> Self {
        self.newest_first = false;
        self
    }

    /// Same filters and ordering with no limit.
    pub fn unlimited(&self) -> Self {
        Self {
            limit: None,
            ..self.clone()
        }
    }

    /// Whether `entry` passes every filter of this query.
    pub fn matches(&self, entry: &ActivityLogEntry) -> bool {
        if let Some(since) = self.since {
            if entry.timestamp < since {
                return false;
            }
        }
        if let Some(agent) = &self.agent {
            if &entry.agent_name != agent {
                return false;
            }
        }
        if let Some(prediction_id) = self.prediction_id {
            if entry.prediction_id != Some(prediction_id) {
                return false;
            }
        }
        if let Some(cycle_id) = self.cycle_id {
            if entry.cycle_id != cycle_id {
                return false;
            }
        }
        true
    }

    /// Filter, order and truncate `entries`, which must be in append order.
    pub fn apply<I>(&self, entries: I) -> Vec<ActivityLogEntry>
    where
        I: IntoIterator<Item = ActivityLogEntry>,
    {
        let mut selected: Vec<ActivityLogEntry> =
            entries.into_iter().filter(|e| self.matches(e)).collect();

        if self.newest_first {
            selected.reverse();
        }
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}
