//! Audit errors.

use thiserror::Error;

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;

/// Errors from building audit entries.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Entry content could not be serialized for hashing.
    #[error("failed to serialize audit entry content: {0}")]
    Serialization(#[from] serde_json::Error),
}
