use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::monitor::QuotaPolicy;

const MAX_WINDOW_SECS: u64 = 86_400;

#[derive(Debug, Clone)]
pub struct QuotaMonitorConfig {
    pub server_host: String,
    pub server_port: u16,
    pub per_caller_limit: u64,
    pub global_limit: u64,
    pub window_secs: u64,
    pub cleanup_interval_secs: u64,
    pub error_log_capacity: usize,
    pub log_level: String,
}

impl Default for QuotaMonitorConfig {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 8184,
            per_caller_limit: 20_000,
            global_limit: 12_000,
            window_secs: 100,
            cleanup_interval_secs: 300,
            error_log_capacity: 100,
            log_level: "info".to_string(),
        }
    }
}

impl QuotaMonitorConfig {
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(host) = env::var("QUOTA_HOST") {
            cfg.server_host = host;
        }
        if let Ok(port) = env::var("QUOTA_PORT") {
            cfg.server_port = port.parse().context("QUOTA_PORT must be a valid u16")?;
        }
        if let Ok(limit) = env::var("PER_CALLER_LIMIT") {
            cfg.per_caller_limit = limit
                .parse()
                .context("PER_CALLER_LIMIT must be a positive integer")?;
        }
        if let Ok(limit) = env::var("GLOBAL_LIMIT") {
            cfg.global_limit = limit
                .parse()
                .context("GLOBAL_LIMIT must be a positive integer")?;
        }
        if let Ok(window) = env::var("QUOTA_WINDOW_SECS") {
            cfg.window_secs = window
                .parse()
                .context("QUOTA_WINDOW_SECS must be a positive integer")?;
        }
        if let Ok(interval) = env::var("CLEANUP_INTERVAL_SECS") {
            cfg.cleanup_interval_secs = interval
                .parse()
                .context("CLEANUP_INTERVAL_SECS must be a positive integer")?;
        }
        if let Ok(capacity) = env::var("ERROR_LOG_CAPACITY") {
            cfg.error_log_capacity = capacity
                .parse()
                .context("ERROR_LOG_CAPACITY must be a positive integer")?;
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            cfg.log_level = level;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.per_caller_limit == 0 {
            anyhow::bail!("PER_CALLER_LIMIT must be greater than zero");
        }
        if self.global_limit == 0 {
            anyhow::bail!("GLOBAL_LIMIT must be greater than zero");
        }
        if self.window_secs == 0 || self.window_secs > MAX_WINDOW_SECS {
            anyhow::bail!("QUOTA_WINDOW_SECS must be between 1 and {MAX_WINDOW_SECS}");
        }
        if self.cleanup_interval_secs == 0 {
            anyhow::bail!("CLEANUP_INTERVAL_SECS must be greater than zero");
        }
        if self.error_log_capacity == 0 {
            anyhow::bail!("ERROR_LOG_CAPACITY must be greater than zero");
        }

        Ok(())
    }

    pub fn policy(&self) -> QuotaPolicy {
        QuotaPolicy {
            per_caller_limit: self.per_caller_limit,
            global_limit: self.global_limit,
            window: chrono::Duration::seconds(self.window_secs as i64),
            error_log_capacity: self.error_log_capacity,
        }
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_matches_provider_limits() {
        let policy = QuotaMonitorConfig::default().policy();
        assert_eq!(policy.per_caller_limit, 20_000);
        assert_eq!(policy.global_limit, 12_000);
        assert_eq!(policy.window, chrono::Duration::seconds(100));
        assert_eq!(policy.error_log_capacity, 100);
    }

    #[test]
    fn test_config_validation() {
        let mut config = QuotaMonitorConfig::default();
        assert!(config.validate().is_ok());

        config.per_caller_limit = 0;
        assert!(config.validate().is_err());
        config.per_caller_limit = 20_000;

        config.global_limit = 0;
        assert!(config.validate().is_err());
        config.global_limit = 12_000;

        config.window_secs = 0;
        assert!(config.validate().is_err());
        config.window_secs = MAX_WINDOW_SECS + 1;
        assert!(config.validate().is_err());
        config.window_secs = 100;

        config.cleanup_interval_secs = 0;
        assert!(config.validate().is_err());
        config.cleanup_interval_secs = 300;

        config.error_log_capacity = 0;
        assert!(config.validate().is_err());
        config.error_log_capacity = 100;

        assert!(config.validate().is_ok());
    }
}
