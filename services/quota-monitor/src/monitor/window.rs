use std::fmt;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "caller_id", rename_all = "snake_case")]
pub enum QuotaScope {
    Caller(String),
    Global,
}

impl QuotaScope {
    pub fn caller(caller_id: &str) -> Self {
        QuotaScope::Caller(caller_id.to_string())
    }

    pub fn from_caller(caller_id: Option<&str>) -> Self {
        caller_id.map_or(QuotaScope::Global, QuotaScope::caller)
    }

    pub fn caller_id(&self) -> Option<&str> {
        match self {
            QuotaScope::Caller(id) => Some(id),
            QuotaScope::Global => None,
        }
    }
}

impl fmt::Display for QuotaScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaScope::Caller(id) => write!(f, "caller:{id}"),
            QuotaScope::Global => f.write_str("global"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowCounter {
    pub count: u64,
    pub window_started_at: DateTime<Utc>,
}

impl WindowCounter {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            window_started_at: now,
        }
    }

    pub fn window_ends_at(&self, window: Duration) -> DateTime<Utc> {
        self.window_started_at + window
    }

    /// The window covers `[window_started_at, window_started_at + window)`.
    pub fn is_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now >= self.window_ends_at(window)
    }
}

/// Usage counters keyed by scope, each carrying its own window start.
pub struct WindowStore {
    counters: DashMap<QuotaScope, WindowCounter>,
    window: Duration,
}

impl WindowStore {
    pub fn new(window: Duration) -> Self {
        Self {
            counters: DashMap::new(),
            window,
        }
    }

    /// Counts one request against `scope`, opening a fresh window first if the current
    /// one has elapsed. Returns the counter as it stands after the increment.
    pub fn increment(&self, scope: QuotaScope, now: DateTime<Utc>) -> WindowCounter {
        let mut entry = self
            .counters
            .entry(scope)
            .or_insert_with(|| WindowCounter::fresh(now));

        if entry.is_expired(now, self.window) {
            debug!(
                scope = %entry.key(),
                previous_count = entry.count,
                "quota window elapsed; starting a new one"
            );
            *entry = WindowCounter::fresh(now);
        }

        entry.count = entry.count.saturating_add(1);
        entry.clone()
    }

    /// Returns the counter only while its window is still open.
    pub fn live(&self, scope: &QuotaScope, now: DateTime<Utc>) -> Option<WindowCounter> {
        self.counters
            .get(scope)
            .filter(|counter| !counter.is_expired(now, self.window))
            .map(|counter| counter.clone())
    }

    pub fn live_count(&self, scope: &QuotaScope, now: DateTime<Utc>) -> u64 {
        self.live(scope, now).map_or(0, |counter| counter.count)
    }

    pub fn remove(&self, scope: &QuotaScope) -> bool {
        self.counters.remove(scope).is_some()
    }

    pub fn clear(&self) -> usize {
        let removed = self.counters.len();
        self.counters.clear();
        removed
    }

    /// Drops every counter whose window has elapsed. The expiry check runs under the
    /// shard lock that `increment` takes, so a window re-opened concurrently survives.
    pub fn remove_expired(&self, now: DateTime<Utc>) -> usize {
        let window = self.window;
        let mut removed = 0usize;
        self.counters.retain(|_, counter| {
            if counter.is_expired(now, window) {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn live_counters(&self, now: DateTime<Utc>) -> Vec<(QuotaScope, WindowCounter)> {
        self.counters
            .iter()
            .filter(|entry| !entry.value().is_expired(now, self.window))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}
