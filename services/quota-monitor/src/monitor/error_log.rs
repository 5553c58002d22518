use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classifier::ErrorCode;

pub const DEFAULT_ERROR_LOG_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaErrorRecord {
    pub id: Uuid,
    /// Position in insertion order; assigned by [`ErrorLog::push`].
    pub sequence: u64,
    pub error_code: ErrorCode,
    pub caller_id: Option<String>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Default)]
struct LogState {
    records: VecDeque<QuotaErrorRecord>,
    next_sequence: u64,
}

/// Fixed-capacity FIFO of quota-related failures.
pub struct ErrorLog {
    state: Mutex<LogState>,
    capacity: usize,
}

impl ErrorLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(LogState {
                records: VecDeque::with_capacity(capacity),
                next_sequence: 0,
            }),
            capacity,
        }
    }

    /// Appends a record, evicting the oldest one when full. Returns the evicted record.
    pub fn push(&self, mut record: QuotaErrorRecord) -> Option<QuotaErrorRecord> {
        let mut state = self.lock();
        record.sequence = state.next_sequence;
        state.next_sequence += 1;

        let evicted = if state.records.len() >= self.capacity {
            state.records.pop_front()
        } else {
            None
        };
        state.records.push_back(record);
        evicted
    }

    /// Most recent `limit` records, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<QuotaErrorRecord> {
        let state = self.lock();
        let skip = state.records.len().saturating_sub(limit);
        state.records.iter().skip(skip).cloned().collect()
    }

    /// Records for `caller_id` (any caller when `None`) stamped at or after `since` whose
    /// sequence is at least `min_sequence`.
    pub fn count_since(
        &self,
        caller_id: Option<&str>,
        since: DateTime<Utc>,
        min_sequence: u64,
    ) -> u64 {
        self.lock()
            .records
            .iter()
            .filter(|record| record.timestamp >= since && record.sequence >= min_sequence)
            .filter(|record| match caller_id {
                Some(id) => record.caller_id.as_deref() == Some(id),
                None => true,
            })
            .count() as u64
    }

    /// Sequence the next pushed record will receive. Sequences keep growing across
    /// [`ErrorLog::clear`].
    pub fn next_sequence(&self) -> u64 {
        self.lock().next_sequence
    }

    pub fn oldest_sequence(&self) -> Option<u64> {
        self.lock().records.front().map(|record| record.sequence)
    }

    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let cleared = state.records.len();
        state.records.clear();
        cleared
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_LOG_CAPACITY)
    }
}
