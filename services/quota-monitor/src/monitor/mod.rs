pub mod clock;
pub mod error;
pub mod error_log;
pub mod manager;
pub mod stats;
pub mod usage;
pub mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{QuotaError, TrackedError};
pub use error_log::{ErrorLog, QuotaErrorRecord, DEFAULT_ERROR_LOG_CAPACITY};
pub use manager::{QuotaMonitor, DEFAULT_RECENT_ERRORS};
pub use stats::{AlertLevel, QuotaAlert, UsageStats, WindowSnapshot};
pub use usage::{
    LimitKind, QuotaCheck, QuotaPolicy, UsageLevel, WARNING_CRITICAL_USAGE,
    WARNING_GLOBAL_QUOTA_EXCEEDED, WARNING_HIGH_USAGE, WARNING_USER_QUOTA_EXCEEDED,
};
pub use window::{QuotaScope, WindowCounter, WindowStore};
