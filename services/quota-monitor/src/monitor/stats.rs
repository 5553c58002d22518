use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::usage::{usage_percent, UsageLevel};
use super::window::QuotaScope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UsageStats {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub quota_errors: u64,
    pub rate_limit: u64,
}

impl UsageStats {
    pub(crate) fn from_window(total: u64, quota_errors: u64, rate_limit: u64) -> Self {
        Self {
            total,
            successful: total.saturating_sub(quota_errors),
            failed: quota_errors,
            quota_errors,
            rate_limit,
        }
    }

    pub fn usage_level(&self) -> UsageLevel {
        UsageLevel::of(self.total, self.rate_limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Critical,
    Exceeded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaAlert {
    pub level: AlertLevel,
    pub message: String,
    pub stats: UsageStats,
}

impl QuotaAlert {
    pub(crate) fn from_stats(stats: UsageStats) -> Option<Self> {
        let percent = usage_percent(stats.total, stats.rate_limit);
        let (level, message) = match stats.usage_level() {
            UsageLevel::Normal => return None,
            UsageLevel::High => (AlertLevel::Warning, format!("High quota usage: {percent}%")),
            UsageLevel::Critical => (
                AlertLevel::Critical,
                format!("Critical quota usage: {percent}%"),
            ),
            UsageLevel::Exceeded => (AlertLevel::Exceeded, format!("Quota exceeded: {percent}%")),
        };

        Some(Self {
            level,
            message,
            stats,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub scope: QuotaScope,
    pub count: u64,
    pub limit: u64,
    pub window_started_at: DateTime<Utc>,
    pub window_ends_at: DateTime<Utc>,
}
