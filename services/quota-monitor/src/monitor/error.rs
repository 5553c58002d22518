use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuotaError {
    #[error("quota exceeded for caller {caller_id}: limit={limit}, retry after {retry_after_secs}s")]
    CallerQuotaExceeded {
        caller_id: String,
        limit: u64,
        retry_after_secs: u64,
    },
    #[error("global quota exceeded: limit={limit}, retry after {retry_after_secs}s")]
    GlobalQuotaExceeded { limit: u64, retry_after_secs: u64 },
    #[error("caller id cannot be empty")]
    InvalidCallerId,
}

impl QuotaError {
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            QuotaError::CallerQuotaExceeded {
                retry_after_secs, ..
            }
            | QuotaError::GlobalQuotaExceeded {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
            QuotaError::InvalidCallerId => None,
        }
    }
}

/// Failure of a quota-governed operation: either the monitor refused to run it, or the
/// operation itself failed and its error is handed back untouched.
#[derive(Debug, Error)]
pub enum TrackedError<E> {
    #[error(transparent)]
    Quota(#[from] QuotaError),
    #[error(transparent)]
    Operation(E),
}

impl<E> TrackedError<E> {
    pub fn is_quota_denied(&self) -> bool {
        matches!(self, TrackedError::Quota(_))
    }

    pub fn into_operation_error(self) -> Option<E> {
        match self {
            TrackedError::Operation(err) => Some(err),
            TrackedError::Quota(_) => None,
        }
    }
}
