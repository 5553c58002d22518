use std::sync::Arc;

use rand::Rng;
use storage_quota_monitor::{ManualClock, QuotaMonitor, QuotaPolicy};

pub struct MonitorBenchFixture {
    pub monitor: QuotaMonitor,
    pub clock: Arc<ManualClock>,
    pub callers: Vec<String>,
}

impl MonitorBenchFixture {
    /// Monitor with limits high enough that benchmarks never hit a denial, pre-warmed
    /// with one open window per caller.
    pub fn new(caller_count: usize) -> Self {
        let policy = QuotaPolicy {
            per_caller_limit: u64::MAX / 2,
            global_limit: u64::MAX / 2,
            ..QuotaPolicy::default()
        };
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        let monitor = QuotaMonitor::new(policy).with_clock(clock.clone());

        let callers: Vec<String> = (0..caller_count).map(|_| random_caller_id()).collect();
        for caller in &callers {
            monitor.track_usage(caller, "warmup");
        }

        Self {
            monitor,
            clock,
            callers,
        }
    }

    pub fn caller(&self, index: usize) -> &str {
        &self.callers[index % self.callers.len()]
    }
}

pub fn random_caller_id() -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!("caller-{suffix:08x}")
}
