pub mod api;
pub mod classifier;
pub mod config;
pub mod monitor;

pub use api::{create_router, ApiState, ErrorResponse};
pub use classifier::{
    ClassifiedError, ErrorClassifier, ErrorCode, ProviderError, ProviderErrorClassifier,
};
pub use config::QuotaMonitorConfig;
pub use monitor::{
    AlertLevel, Clock, ManualClock, QuotaAlert, QuotaCheck, QuotaError, QuotaErrorRecord,
    QuotaMonitor, QuotaPolicy, QuotaScope, SystemClock, TrackedError, UsageStats,
    WindowSnapshot,
};
