use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::error_log::DEFAULT_ERROR_LOG_CAPACITY;
use super::window::{QuotaScope, WindowCounter};

pub const WARNING_USER_QUOTA_EXCEEDED: &str = "User quota exceeded";
pub const WARNING_GLOBAL_QUOTA_EXCEEDED: &str = "Project quota exceeded";
pub const WARNING_CRITICAL_USAGE: &str = "Critical: Approaching quota limit";
pub const WARNING_HIGH_USAGE: &str = "Warning: High quota usage";

const HIGH_USAGE_PERCENT: u128 = 80;
const CRITICAL_USAGE_PERCENT: u128 = 95;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub per_caller_limit: u64,
    pub global_limit: u64,
    pub window: Duration,
    pub error_log_capacity: usize,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            per_caller_limit: 20_000,
            global_limit: 12_000,
            window: Duration::seconds(100),
            error_log_capacity: DEFAULT_ERROR_LOG_CAPACITY,
        }
    }
}

impl QuotaPolicy {
    pub fn limit_for(&self, scope: &QuotaScope) -> u64 {
        match scope {
            QuotaScope::Caller(_) => self.per_caller_limit,
            QuotaScope::Global => self.global_limit,
        }
    }
}

/// How close a counter is to its limit. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UsageLevel {
    Normal,
    High,
    Critical,
    Exceeded,
}

impl UsageLevel {
    pub fn of(count: u64, limit: u64) -> Self {
        let count = u128::from(count);
        let limit = u128::from(limit);

        if count > limit {
            UsageLevel::Exceeded
        } else if count * 100 >= limit * CRITICAL_USAGE_PERCENT {
            UsageLevel::Critical
        } else if count * 100 >= limit * HIGH_USAGE_PERCENT {
            UsageLevel::High
        } else {
            UsageLevel::Normal
        }
    }
}

pub fn usage_percent(count: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 0;
    }
    ((count as f64 / limit as f64) * 100.0).round() as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    Caller,
    Global,
}

/// Outcome of counting one request against both limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaCheck {
    pub allowed: bool,
    pub user_quota_remaining: i64,
    pub global_quota_remaining: i64,
    pub warning: Option<&'static str>,
    pub denied_by: Option<LimitKind>,
    pub retry_after: Option<StdDuration>,
}

impl QuotaCheck {
    pub(crate) fn evaluate(
        caller: &WindowCounter,
        global: &WindowCounter,
        policy: &QuotaPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        let mut check = QuotaCheck {
            allowed: true,
            user_quota_remaining: remaining(policy.per_caller_limit, caller.count),
            global_quota_remaining: remaining(policy.global_limit, global.count),
            warning: None,
            denied_by: None,
            retry_after: None,
        };

        let caller_level = UsageLevel::of(caller.count, policy.per_caller_limit);
        let global_level = UsageLevel::of(global.count, policy.global_limit);

        if caller_level == UsageLevel::Exceeded {
            check.allowed = false;
            check.user_quota_remaining = -1;
            check.warning = Some(WARNING_USER_QUOTA_EXCEEDED);
            check.denied_by = Some(LimitKind::Caller);
            check.retry_after = Some(time_until_reset(caller, policy.window, now));
        } else if global_level == UsageLevel::Exceeded {
            check.allowed = false;
            check.global_quota_remaining = -1;
            check.warning = Some(WARNING_GLOBAL_QUOTA_EXCEEDED);
            check.denied_by = Some(LimitKind::Global);
            check.retry_after = Some(time_until_reset(global, policy.window, now));
        } else {
            check.warning = match caller_level.max(global_level) {
                UsageLevel::Critical => Some(WARNING_CRITICAL_USAGE),
                UsageLevel::High => Some(WARNING_HIGH_USAGE),
                _ => None,
            };
        }

        check
    }
}

fn remaining(limit: u64, count: u64) -> i64 {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let count = i64::try_from(count).unwrap_or(i64::MAX);
    limit.saturating_sub(count)
}

fn time_until_reset(counter: &WindowCounter, window: Duration, now: DateTime<Utc>) -> StdDuration {
    (counter.window_ends_at(window) - now)
        .to_std()
        .unwrap_or_default()
}
