use std::error::Error as StdError;

use thiserror::Error;

use super::{ClassifiedError, ErrorClassifier, ErrorCode};

/// Failure reported by the storage provider's HTTP API.
#[derive(Debug, Clone, Error)]
#[error("storage provider returned {status}: {message}")]
pub struct ProviderError {
    pub status: u16,
    pub reason: Option<String>,
    pub message: String,
}

impl ProviderError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            reason: None,
            message: message.into(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn error_code(&self) -> ErrorCode {
        match (self.status, self.reason.as_deref()) {
            (429, _) => ErrorCode::RateLimitExceeded,
            (403, Some("usageRateLimitExceeded" | "userRateLimitExceeded")) => {
                ErrorCode::UserRateLimitExceeded
            }
            (403, Some("dailyLimitExceeded" | "quotaExceeded")) => ErrorCode::QuotaExceeded,
            (403, Some("storageQuotaExceeded")) => ErrorCode::StorageQuotaExceeded,
            (403, _) => ErrorCode::PermissionDenied,
            (400, _) => ErrorCode::InvalidRequest,
            (401, _) => ErrorCode::Unauthorized,
            (404, _) => ErrorCode::NotFound,
            (500..=599, _) => ErrorCode::ServerError,
            _ => ErrorCode::Unknown,
        }
    }
}

/// Finds a [`ProviderError`] anywhere in the source chain and maps its status and
/// reason onto an [`ErrorCode`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ProviderErrorClassifier;

impl ErrorClassifier for ProviderErrorClassifier {
    fn classify(&self, error: &(dyn StdError + 'static)) -> ClassifiedError {
        let mut current = Some(error);
        while let Some(err) = current {
            if let Some(provider) = err.downcast_ref::<ProviderError>() {
                return ClassifiedError::new(provider.error_code(), provider.message.clone());
            }
            current = err.source();
        }

        ClassifiedError::new(ErrorCode::Unknown, error.to_string())
    }
}
