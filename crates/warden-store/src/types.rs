//! Persisted record types.

use serde::{Deserialize, Serialize};
use std::fmt;

use warden_audit::{AuditEntry, AuditEvent};
use warden_core::{ContentHash, DecisionId, ReasonCode, RequestId, RiskClass, SideEffect};

/// Lifecycle status of an approval request.
///
/// `Pending` is the only non-terminal status; a request transitions out of
/// it exactly once and the terminal record is immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Waiting for a decision.
    Pending,
    /// A human approved it.
    Approved,
    /// A human denied it.
    Denied,
    /// The deadline passed without a decision.
    Expired,
}

impl RequestStatus {
    /// The snake_case wire/storage string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Denied => "denied",
            Self::Expired => "expired",
        }
    }

    /// Parse the storage string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "denied" => Some(Self::Denied),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    /// Whether this status is final.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a decision came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    /// A human resolved the request.
    Explicit,
    /// The deadline passed; the system recorded the outcome.
    Timeout,
}

impl DecisionKind {
    /// The snake_case wire/storage string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Timeout => "timeout",
        }
    }

    /// Parse the storage string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "explicit" => Some(Self::Explicit),
            "timeout" => Some(Self::Timeout),
            _ => None,
        }
    }
}

/// What the decision says.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    /// Let the action proceed.
    Approve,
    /// Refuse the action.
    Deny,
}

impl DecisionOutcome {
    /// The snake_case wire/storage string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Deny => "deny",
        }
    }

    /// Parse the storage string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approve" => Some(Self::Approve),
            "deny" => Some(Self::Deny),
            _ => None,
        }
    }
}

/// A persisted approval request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequestRecord {
    /// Unique request id.
    pub id: RequestId,
    /// The gated action.
    pub action_name: String,
    /// Redacted, human-readable summary of the arguments.
    pub arguments_summary: String,
    /// Session that proposed the action.
    pub requester_session: String,
    /// Role of the proposer (`agent`, `subagent`, ...).
    pub requester_role: String,
    /// Agent identity behind the proposal, when known.
    pub agent_id: Option<String>,
    /// Version of the policy that demanded approval.
    pub policy_id: Option<String>,
    /// Assessed risk class at request time.
    pub risk_class: RiskClass,
    /// Assessed side effects at request time.
    pub side_effects: Vec<SideEffect>,
    /// Why approval was required.
    pub reason_codes: Vec<ReasonCode>,
    /// Anti-replay hash binding the request to its exact content.
    pub request_hash: ContentHash,
    /// Current lifecycle status.
    pub status: RequestStatus,
    /// Creation time, epoch milliseconds.
    pub created_at_ms: i64,
    /// Deadline, epoch milliseconds.
    pub expires_at_ms: i64,
    /// Last status change, epoch milliseconds.
    pub updated_at_ms: i64,
}

/// Input for creating a request. The store assigns timestamps and derives
/// `expires_at_ms` from `timeout_ms`.
#[derive(Debug, Clone)]
pub struct NewRequest {
    /// Unique request id, chosen by the caller.
    pub id: RequestId,
    /// The gated action.
    pub action_name: String,
    /// Redacted summary of the arguments.
    pub arguments_summary: String,
    /// Session that proposed the action.
    pub requester_session: String,
    /// Role of the proposer.
    pub requester_role: String,
    /// Agent identity, when known.
    pub agent_id: Option<String>,
    /// Policy version, when known.
    pub policy_id: Option<String>,
    /// Assessed risk class.
    pub risk_class: RiskClass,
    /// Assessed side effects.
    pub side_effects: Vec<SideEffect>,
    /// Why approval was required.
    pub reason_codes: Vec<ReasonCode>,
    /// Anti-replay hash.
    pub request_hash: ContentHash,
    /// How long the request may stay pending, in milliseconds.
    pub timeout_ms: u64,
}

/// A persisted decision, 1:1 with a terminal request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Unique decision id.
    pub id: DecisionId,
    /// The request this decision resolves.
    pub request_id: RequestId,
    /// Session of the deciding actor.
    pub actor_session: String,
    /// Role of the deciding actor (`human`, `system`).
    pub actor_role: String,
    /// The outcome.
    pub decision: DecisionOutcome,
    /// Free-text reason, when given.
    pub reason: Option<String>,
    /// Explicit or timeout.
    pub kind: DecisionKind,
    /// Decision time, epoch milliseconds.
    pub created_at_ms: i64,
}

/// Input for recording a decision.
#[derive(Debug, Clone)]
pub struct NewDecision {
    /// The request being decided.
    pub request_id: RequestId,
    /// Session of the deciding actor.
    pub actor_session: String,
    /// Role of the deciding actor.
    pub actor_role: String,
    /// The outcome.
    pub decision: DecisionOutcome,
    /// Free-text reason, when given.
    pub reason: Option<String>,
    /// Explicit or timeout.
    pub kind: DecisionKind,
}

/// Input for appending an audit entry. The store computes the chain hash.
#[derive(Debug, Clone)]
pub struct NewAudit {
    /// The request whose chain grows.
    pub request_id: RequestId,
    /// What happened.
    pub event: AuditEvent,
    /// Session of the actor.
    pub actor_session: String,
    /// Role of the actor.
    pub actor_role: String,
    /// Structured event payload.
    pub data: serde_json::Value,
}

/// Filter for listing requests.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    /// Only this status, when set.
    pub status: Option<RequestStatus>,
    /// Only this requester session, when set.
    pub session: Option<String>,
    /// Only this agent, when set.
    pub agent: Option<String>,
    /// At most this many records, newest first.
    pub limit: Option<usize>,
}

impl RequestFilter {
    /// A filter that matches only pending requests.
    #[must_use]
    pub fn pending() -> Self {
        Self {
            status: Some(RequestStatus::Pending),
            ..Self::default()
        }
    }
}

/// A request with its full decision and audit history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestTimeline {
    /// The request record.
    pub request: ApprovalRequestRecord,
    /// Decisions in creation order.
    pub decisions: Vec<DecisionRecord>,
    /// Audit entries in chain order.
    pub audit: Vec<AuditEntry>,
}
