use std::sync::Arc;

pub mod handlers;
pub mod router;
pub mod types;

pub use router::create_router;
pub use types::*;

use crate::config::QuotaMonitorConfig;
use crate::monitor::QuotaMonitor;

pub struct ApiState {
    pub monitor: QuotaMonitor,
    pub config: Arc<QuotaMonitorConfig>,
}

impl ApiState {
    pub fn new(monitor: QuotaMonitor, config: QuotaMonitorConfig) -> Self {
        Self {
            monitor,
            config: Arc::new(config),
        }
    }
}
