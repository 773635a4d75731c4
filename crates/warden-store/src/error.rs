//! Store errors and the retryability contract.

use thiserror::Error;

use warden_core::RequestId;

use crate::types::RequestStatus;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the approval request store.
///
/// Logical violations (`DuplicateRequest`, `AlreadyResolved`, `NotFound`,
/// `ChainMismatch`) are final: retrying the same call cannot succeed.
/// `Storage` covers transient infrastructure failures and is the only
/// variant a caller should retry.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A request with this id already exists.
    #[error("request {0} already exists")]
    DuplicateRequest(RequestId),

    /// The request already left `pending`; its status is included.
    #[error("request already resolved with status {status}")]
    AlreadyResolved {
        /// The terminal status the request holds.
        status: RequestStatus,
    },

    /// No request with this id.
    #[error("request {0} not found")]
    NotFound(RequestId),

    /// The stored audit chain for a request failed verification.
    #[error("audit chain mismatch for request {0}")]
    ChainMismatch(RequestId),

    /// The underlying storage failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl StoreError {
    /// Whether retrying the same operation could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability() {
        assert!(StoreError::Storage("disk full".to_string()).is_retryable());
        assert!(!StoreError::DuplicateRequest(RequestId::new()).is_retryable());
        assert!(!StoreError::NotFound(RequestId::new()).is_retryable());
        assert!(
            !StoreError::AlreadyResolved {
                status: RequestStatus::Approved,
            }
            .is_retryable()
        );
        assert!(!StoreError::ChainMismatch(RequestId::new()).is_retryable());
    }
}
