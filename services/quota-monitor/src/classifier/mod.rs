use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod provider;

pub use provider::{ProviderError, ProviderErrorClassifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    RateLimitExceeded,
    UserRateLimitExceeded,
    QuotaExceeded,
    StorageQuotaExceeded,
    NotFound,
    Unauthorized,
    PermissionDenied,
    InvalidRequest,
    ServerError,
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RateLimitExceeded => "rate-limit-exceeded",
            ErrorCode::UserRateLimitExceeded => "user-rate-limit-exceeded",
            ErrorCode::QuotaExceeded => "quota-exceeded",
            ErrorCode::StorageQuotaExceeded => "storage-quota-exceeded",
            ErrorCode::NotFound => "not-found",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::PermissionDenied => "permission-denied",
            ErrorCode::InvalidRequest => "invalid-request",
            ErrorCode::ServerError => "server-error",
            ErrorCode::Unknown => "unknown",
        }
    }

    /// Only these four codes are attributable to provider quotas.
    pub fn is_quota_related(&self) -> bool {
        matches!(
            self,
            ErrorCode::RateLimitExceeded
                | ErrorCode::UserRateLimitExceeded
                | ErrorCode::QuotaExceeded
                | ErrorCode::StorageQuotaExceeded
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub error_code: ErrorCode,
    pub message: String,
}

impl ClassifiedError {
    pub fn new(error_code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error_code,
            message: message.into(),
        }
    }

    pub fn is_quota_related(&self) -> bool {
        self.error_code.is_quota_related()
    }
}

/// Turns a raw failure from the storage provider into a stable error code.
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, error: &(dyn StdError + 'static)) -> ClassifiedError;
}

impl<F> ErrorClassifier for F
where
    F: Fn(&(dyn StdError + 'static)) -> ClassifiedError + Send + Sync,
{
    fn classify(&self, error: &(dyn StdError + 'static)) -> ClassifiedError {
        self(error)
    }
}
