//! Gateway error types.

use std::fmt;

use thiserror::Error;

use warden_core::RequestId;
use warden_store::StoreError;

/// The structured reason an action was refused by the gate.
///
/// These codes cross the wire inside `tool.approval.blocked` errors, so
/// their strings are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCode {
    /// The policy denied the action without asking anyone.
    PolicyDeny,
    /// A human reviewed the request and denied it.
    ApprovalDenied,
    /// The request expired before anyone decided.
    ApprovalTimeout,
    /// The request could not be persisted or awaited; fail-closed.
    ApprovalRequestFailed,
}

impl BlockCode {
    /// The snake_case wire string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PolicyDeny => "policy_deny",
            Self::ApprovalDenied => "approval_denied",
            Self::ApprovalTimeout => "approval_timeout",
            Self::ApprovalRequestFailed => "approval_request_failed",
        }
    }
}

impl fmt::Display for BlockCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from the approval gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The resolve carried a hash that does not match the stored request.
    /// The request is left pending and untouched.
    #[error("stale resolve for {0}: request hash does not match stored request")]
    StaleRequest(RequestId),

    /// The request's deadline passed before it was resolved.
    #[error("request {0} expired before resolution")]
    RequestExpired(RequestId),

    /// The request parameters failed validation.
    #[error("invalid approval request: {0}")]
    InvalidRequest(String),

    /// The gate refused the action.
    #[error("action blocked: {code}")]
    Blocked {
        /// Why the action was refused.
        code: BlockCode,
        /// The approval request involved, when one was created.
        request_id: Option<RequestId>,
    },

    /// A payload could not be serialized for hashing.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience alias for gateway results.
pub type GatewayResult<T> = Result<T, GatewayError>;
