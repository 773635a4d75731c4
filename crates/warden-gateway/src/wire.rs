//! Wire types for the approval protocol.
//!
//! These are the payloads an embedding host exchanges with the gateway.
//! Transport and framing are the host's concern; the gateway only defines
//! the shapes and the method names.

use serde::{Deserialize, Serialize};
use std::fmt;

use warden_core::{ContentHash, ReasonCode, RequestId, RiskClass, SideEffect};
use warden_store::{ApprovalRequestRecord, RequestStatus};

/// Method name for submitting an approval request.
pub const METHOD_APPROVAL_REQUEST: &str = "tool.approval.request";
/// Method name for resolving a pending approval.
pub const METHOD_APPROVAL_RESOLVE: &str = "tool.approval.resolve";
/// Method name for listing pending approvals.
pub const METHOD_APPROVALS_GET: &str = "tool.approvals.get";

/// Parameters for `tool.approval.request`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolApprovalRequestParams {
    /// The gated action.
    pub tool_name: String,
    /// Redacted, human-readable summary of the call arguments.
    pub params_summary: String,
    /// Assessed risk class.
    pub risk_class: RiskClass,
    /// Assessed side effects.
    pub side_effects: Vec<SideEffect>,
    /// Why approval is required.
    pub reason_codes: Vec<ReasonCode>,
    /// Session that proposed the action.
    pub session_key: String,
    /// Agent identity behind the proposal, when known.
    pub agent_id: Option<String>,
    /// Version of the policy in force, when known.
    pub policy_version: Option<String>,
    /// Anti-replay hash binding the request to its exact content.
    pub request_hash: ContentHash,
    /// How long the request may stay pending, in milliseconds.
    pub timeout_ms: u64,
}

/// What the resolving human chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolveDecision {
    /// Approve this request. Each request is independent.
    AllowOnce,
    /// Approve this request. Treated the same as `AllowOnce` for status
    /// purposes; no fingerprint is cached.
    AllowAlways,
    /// Deny this request.
    Deny,
}

impl ResolveDecision {
    /// The kebab-case wire string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllowOnce => "allow-once",
            Self::AllowAlways => "allow-always",
            Self::Deny => "deny",
        }
    }

    /// Whether this decision approves the request.
    #[must_use]
    pub const fn is_approval(self) -> bool {
        matches!(self, Self::AllowOnce | Self::AllowAlways)
    }
}

impl fmt::Display for ResolveDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for `tool.approval.resolve`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolApprovalResolveParams {
    /// The request being resolved.
    pub id: RequestId,
    /// The chosen decision.
    pub decision: ResolveDecision,
    /// Must match the stored request hash, or the resolve is stale.
    pub request_hash: ContentHash,
}

/// Response to `tool.approval.request`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToolApprovalRequested {
    /// The id assigned to the new request.
    pub id: RequestId,
    /// Its status at creation time (always `pending`).
    pub status: RequestStatus,
}

/// Response to `tool.approvals.get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingApprovals {
    /// All pending requests matching the filter, newest first.
    pub pending: Vec<ApprovalRequestRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_decision_wire_strings() {
        let json = serde_json::to_string(&ResolveDecision::AllowOnce).unwrap();
        assert_eq!(json, "\"allow-once\"");
        let back: ResolveDecision = serde_json::from_str("\"allow-always\"").unwrap();
        assert_eq!(back, ResolveDecision::AllowAlways);
        assert!(serde_json::from_str::<ResolveDecision>("\"allow\"").is_err());
    }

    #[test]
    fn test_both_allow_variants_approve() {
        assert!(ResolveDecision::AllowOnce.is_approval());
        assert!(ResolveDecision::AllowAlways.is_approval());
        assert!(!ResolveDecision::Deny.is_approval());
    }

    #[test]
    fn test_request_params_round_trip() {
        let params = ToolApprovalRequestParams {
            tool_name: "exec".to_string(),
            params_summary: "command=rm -rf /tmp/scratch".to_string(),
            risk_class: RiskClass::R4,
            side_effects: vec![SideEffect::ProcessSpawn],
            reason_codes: vec![ReasonCode::ParameterBump, ReasonCode::PolicyThreshold],
            session_key: "session-1".to_string(),
            agent_id: Some("agent-7".to_string()),
            policy_version: None,
            request_hash: ContentHash::hash(b"content"),
            timeout_ms: 60_000,
        };
        let json = serde_json::to_string(&params).unwrap();
        let back: ToolApprovalRequestParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn test_method_names() {
        assert_eq!(METHOD_APPROVAL_REQUEST, "tool.approval.request");
        assert_eq!(METHOD_APPROVAL_RESOLVE, "tool.approval.resolve");
        assert_eq!(METHOD_APPROVALS_GET, "tool.approvals.get");
    }
}
