//! The prompt delivery seam.
//!
//! Chat adapters (CLI, Discord, web) implement [`ApprovalPrompter`] to put
//! a pending request in front of a human. Delivery is fire-and-forget: the
//! authoritative resolution path is `tool.approval.resolve`, and a prompt
//! that is never answered simply lets the request expire.

use async_trait::async_trait;

use warden_core::{ReasonCode, RequestId, RiskClass, SideEffect};
use warden_store::ApprovalRequestRecord;

/// What a frontend needs to render an approval prompt.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    /// The request awaiting a decision.
    pub id: RequestId,
    /// The gated action.
    pub tool_name: String,
    /// Redacted summary of the arguments.
    pub params_summary: String,
    /// Assessed risk class.
    pub risk_class: RiskClass,
    /// Assessed side effects.
    pub side_effects: Vec<SideEffect>,
    /// Why approval is required.
    pub reason_codes: Vec<ReasonCode>,
    /// Session that proposed the action.
    pub session_key: String,
    /// Deadline, epoch milliseconds.
    pub expires_at_ms: i64,
}

impl From<&ApprovalRequestRecord> for PromptRequest {
    fn from(record: &ApprovalRequestRecord) -> Self {
        Self {
            id: record.id,
            tool_name: record.action_name.clone(),
            params_summary: record.arguments_summary.clone(),
            risk_class: record.risk_class,
            side_effects: record.side_effects.clone(),
            reason_codes: record.reason_codes.clone(),
            session_key: record.requester_session.clone(),
            expires_at_ms: record.expires_at_ms,
        }
    }
}

/// What happened to a delivered prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptOutcome {
    /// The frontend confirmed the prompt reached a human.
    pub confirmed: bool,
    /// Delivery gave up before confirmation.
    pub timed_out: bool,
}

/// Delivers approval prompts to humans.
///
/// Implementations must not resolve requests themselves; they surface the
/// prompt and leave the decision to the resolve path.
#[async_trait]
pub trait ApprovalPrompter: Send + Sync {
    /// Deliver a prompt. The returned outcome is informational only.
    async fn send_prompt(&self, request: PromptRequest) -> PromptOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::ContentHash;
    use warden_store::RequestStatus;

    #[test]
    fn test_prompt_request_from_record() {
        let record = ApprovalRequestRecord {
            id: RequestId::new(),
            action_name: "message".to_string(),
            arguments_summary: "to=#general".to_string(),
            requester_session: "session-1".to_string(),
            requester_role: "agent".to_string(),
            agent_id: None,
            policy_id: None,
            risk_class: RiskClass::R2,
            side_effects: vec![SideEffect::MessageSend],
            reason_codes: vec![ReasonCode::PolicyMessageSend],
            request_hash: ContentHash::hash(b"x"),
            status: RequestStatus::Pending,
            created_at_ms: 1_000,
            expires_at_ms: 61_000,
            updated_at_ms: 1_000,
        };
        let prompt = PromptRequest::from(&record);
        assert_eq!(prompt.id, record.id);
        assert_eq!(prompt.tool_name, "message");
        assert_eq!(prompt.expires_at_ms, 61_000);
    }
}
