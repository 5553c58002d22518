use std::error::Error as StdError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classifier::{ClassifiedError, ErrorClassifier, ProviderErrorClassifier};

use super::clock::{Clock, SystemClock};
use super::error::{QuotaError, TrackedError};
use super::error_log::{ErrorLog, QuotaErrorRecord};
use super::stats::{QuotaAlert, UsageStats, WindowSnapshot};
use super::usage::{LimitKind, QuotaCheck, QuotaPolicy};
use super::window::{QuotaScope, WindowStore};

pub const DEFAULT_RECENT_ERRORS: usize = 20;

/// Admission control for calls to the storage provider. Cloning is cheap and every clone
/// shares the same counters and error log.
#[derive(Clone)]
pub struct QuotaMonitor {
    windows: Arc<WindowStore>,
    errors: Arc<ErrorLog>,
    /// Per-caller error-log watermark: records older than the stored sequence no longer
    /// count towards that caller's stats.
    caller_resets: Arc<DashMap<String, u64>>,
    classifier: Arc<dyn ErrorClassifier>,
    clock: Arc<dyn Clock>,
    policy: QuotaPolicy,
}

impl QuotaMonitor {
    pub fn new(policy: QuotaPolicy) -> Self {
        Self {
            windows: Arc::new(WindowStore::new(policy.window)),
            errors: Arc::new(ErrorLog::new(policy.error_log_capacity)),
            caller_resets: Arc::new(DashMap::new()),
            classifier: Arc::new(ProviderErrorClassifier),
            clock: Arc::new(SystemClock),
            policy,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn policy(&self) -> &QuotaPolicy {
        &self.policy
    }

    /// Counts one request against the caller's and the global window and decides whether
    /// it may proceed. Denied attempts are counted too. `caller_id` is expected to be
    /// non-empty; [`QuotaMonitor::with_quota_tracking`] enforces that.
    pub fn track_usage(&self, caller_id: &str, operation_name: &str) -> QuotaCheck {
        let now = self.clock.now();
        // Each increment holds its own shard guard; never hold both at once.
        let caller = self.windows.increment(QuotaScope::caller(caller_id), now);
        let global = self.windows.increment(QuotaScope::Global, now);

        let check = QuotaCheck::evaluate(&caller, &global, &self.policy, now);
        if !check.allowed {
            debug!(
                caller_id,
                operation = operation_name,
                caller_count = caller.count,
                global_count = global.count,
                denied_by = ?check.denied_by,
                "quota check denied request"
            );
        }

        check
    }

    /// Records a classified provider failure. Anything that is not quota-related is
    /// ignored.
    pub fn track_error(&self, classified: &ClassifiedError, caller_id: Option<&str>) {
        if !classified.is_quota_related() {
            return;
        }

        let record = QuotaErrorRecord {
            id: Uuid::new_v4(),
            sequence: 0,
            error_code: classified.error_code,
            caller_id: caller_id.map(str::to_string),
            message: classified.message.clone(),
            timestamp: self.clock.now(),
        };
        self.errors.push(record);

        warn!(
            caller_id = caller_id.unwrap_or("-"),
            error_code = %classified.error_code,
            detail = %classified.message,
            "storage provider quota error"
        );
    }

    pub fn stats(&self, caller_id: Option<&str>) -> UsageStats {
        self.stats_for(&QuotaScope::from_caller(caller_id))
    }

    pub fn check_alerts(&self, caller_id: Option<&str>) -> Option<QuotaAlert> {
        QuotaAlert::from_stats(self.stats(caller_id))
    }

    pub fn recent_errors(&self, limit: usize) -> Vec<QuotaErrorRecord> {
        self.errors.recent(limit)
    }

    /// Runs `operation` only if both quotas admit it. Failures are classified and
    /// quota-related ones land in the error log; the original error is always returned.
    ///
    /// Dropping the returned future before `operation` completes leaves the attempt
    /// counted and logs nothing.
    pub async fn with_quota_tracking<T, E, F, Fut>(
        &self,
        caller_id: &str,
        operation_name: &str,
        operation: F,
    ) -> Result<T, TrackedError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: StdError + 'static,
    {
        let classifier = Arc::clone(&self.classifier);
        self.run_tracked(caller_id, operation_name, operation, move |err: &E| {
            classifier.classify(err)
        })
        .await
    }

    /// [`QuotaMonitor::with_quota_tracking`] for operations that fail with
    /// [`anyhow::Error`]. The classifier sees the whole context chain.
    pub async fn with_quota_tracking_anyhow<T, F, Fut>(
        &self,
        caller_id: &str,
        operation_name: &str,
        operation: F,
    ) -> Result<T, TrackedError<anyhow::Error>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let classifier = Arc::clone(&self.classifier);
        self.run_tracked(caller_id, operation_name, operation, move |err: &anyhow::Error| {
            let source: &(dyn StdError + 'static) = err.as_ref();
            classifier.classify(source)
        })
        .await
    }

    async fn run_tracked<T, E, F, Fut, C>(
        &self,
        caller_id: &str,
        operation_name: &str,
        operation: F,
        classify: C,
    ) -> Result<T, TrackedError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: FnOnce(&E) -> ClassifiedError,
    {
        if caller_id.trim().is_empty() {
            return Err(QuotaError::InvalidCallerId.into());
        }

        let check = self.track_usage(caller_id, operation_name);
        if !check.allowed {
            let denial = self.denial(caller_id, &check);
            debug!(
                caller_id,
                operation = operation_name,
                retry_after_secs = denial.retry_after_secs(),
                "refusing quota-governed operation"
            );
            return Err(denial.into());
        }

        if let Some(warning) = check.warning {
            let stats = self.stats(Some(caller_id));
            warn!(
                caller_id,
                operation = operation_name,
                warning,
                user_quota_remaining = check.user_quota_remaining,
                global_quota_remaining = check.global_quota_remaining,
                total = stats.total,
                quota_errors = stats.quota_errors,
                rate_limit = stats.rate_limit,
                "storage provider quota usage is high"
            );
        }

        match operation().await {
            Ok(value) => Ok(value),
            Err(err) => {
                let classified = classify(&err);
                self.track_error(&classified, Some(caller_id));
                Err(TrackedError::Operation(err))
            }
        }
    }

    /// Clears one caller's window, or every window plus the error log when `caller_id`
    /// is `None`. A caller reset keeps the error log but stops earlier records from
    /// counting towards that caller's stats.
    pub fn reset(&self, caller_id: Option<&str>) {
        match caller_id {
            Some(caller_id) => {
                self.caller_resets
                    .insert(caller_id.to_string(), self.errors.next_sequence());
                let removed = self.windows.remove(&QuotaScope::caller(caller_id));
                info!(caller_id, removed, "reset quota tracking for caller");
            }
            None => {
                let windows = self.windows.clear();
                let errors = self.errors.clear();
                self.caller_resets.clear();
                info!(windows, errors, "reset all quota tracking");
            }
        }
    }

    pub fn cleanup_expired(&self) -> usize {
        let removed = self.windows.remove_expired(self.clock.now());
        // A watermark at or below the oldest retained record no longer filters anything.
        match self.errors.oldest_sequence() {
            Some(oldest) => self.caller_resets.retain(|_, watermark| *watermark > oldest),
            None => self.caller_resets.clear(),
        }
        if removed > 0 {
            info!(
                removed,
                remaining = self.windows.len(),
                "removed expired quota windows"
            );
        }
        removed
    }

    pub fn start_cleanup_task(&self, every: Duration) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                monitor.cleanup_expired();
            }
        })
    }

    pub fn snapshots(&self) -> Vec<WindowSnapshot> {
        let now = self.clock.now();
        let mut snapshots: Vec<WindowSnapshot> = self
            .windows
            .live_counters(now)
            .into_iter()
            .map(|(scope, counter)| WindowSnapshot {
                limit: self.policy.limit_for(&scope),
                count: counter.count,
                window_started_at: counter.window_started_at,
                window_ends_at: counter.window_ends_at(self.policy.window),
                scope,
            })
            .collect();
        snapshots.sort_by(|a, b| b.count.cmp(&a.count));
        snapshots
    }

    fn stats_for(&self, scope: &QuotaScope) -> UsageStats {
        let rate_limit = self.policy.limit_for(scope);
        match self.windows.live(scope, self.clock.now()) {
            Some(counter) => {
                let caller_id = scope.caller_id();
                let min_sequence = caller_id
                    .and_then(|id| self.caller_resets.get(id).map(|watermark| *watermark))
                    .unwrap_or(0);
                let quota_errors =
                    self.errors
                        .count_since(caller_id, counter.window_started_at, min_sequence);
                UsageStats::from_window(counter.count, quota_errors, rate_limit)
            }
            None => UsageStats::from_window(0, 0, rate_limit),
        }
    }

    fn denial(&self, caller_id: &str, check: &QuotaCheck) -> QuotaError {
        let retry_after_secs = check.retry_after.map_or(0, |after| {
            after.as_secs() + u64::from(after.subsec_nanos() > 0)
        });

        match check.denied_by {
            Some(LimitKind::Global) => QuotaError::GlobalQuotaExceeded {
                limit: self.policy.global_limit,
                retry_after_secs,
            },
            _ => QuotaError::CallerQuotaExceeded {
                caller_id: caller_id.to_string(),
                limit: self.policy.per_caller_limit,
                retry_after_secs,
            },
        }
    }
}

impl Default for QuotaMonitor {
    fn default() -> Self {
        Self::new(QuotaPolicy::default())
    }
}
