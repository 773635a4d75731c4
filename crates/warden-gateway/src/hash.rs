//! Request hashing.
//!
//! The request hash binds a resolve to the exact request content the human
//! saw. It covers everything that describes the proposed action; it excludes
//! the hash field itself and the timeout, which do not change what is being
//! approved.

use serde::Serialize;

use warden_core::{ContentHash, ReasonCode, RiskClass, SideEffect};

use crate::error::GatewayResult;
use crate::wire::ToolApprovalRequestParams;

/// Domain string separating request hashes from audit chain hashes.
pub const REQUEST_HASH_DOMAIN: &str = "warden.request.v1";

/// The hashed view of a request. Field order is part of the format.
#[derive(Serialize)]
struct RequestDigest<'a> {
    action_name: &'a str,
    arguments_summary: &'a str,
    risk_class: RiskClass,
    side_effects: &'a [SideEffect],
    reason_codes: &'a [ReasonCode],
    session_key: &'a str,
    agent_id: Option<&'a str>,
    policy_version: Option<&'a str>,
}

/// Compute the anti-replay hash for a request.
///
/// Deterministic: the same request content always hashes to the same value,
/// so a requester and the gateway can compute it independently.
///
/// # Errors
///
/// Returns a serialization error if the canonical JSON form cannot be
/// produced.
pub fn compute_request_hash(params: &ToolApprovalRequestParams) -> GatewayResult<ContentHash> {
    let digest = RequestDigest {
        action_name: &params.tool_name,
        arguments_summary: &params.params_summary,
        risk_class: params.risk_class,
        side_effects: &params.side_effects,
        reason_codes: &params.reason_codes,
        session_key: &params.session_key,
        agent_id: params.agent_id.as_deref(),
        policy_version: params.policy_version.as_deref(),
    };
    let bytes = serde_json::to_vec(&digest)?;
    Ok(ContentHash::hash_with_domain(REQUEST_HASH_DOMAIN, &bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ToolApprovalRequestParams {
        ToolApprovalRequestParams {
            tool_name: "deploy".to_string(),
            params_summary: "target=production".to_string(),
            risk_class: RiskClass::R3,
            side_effects: vec![SideEffect::Deployment, SideEffect::NetworkEgress],
            reason_codes: vec![ReasonCode::PolicyThreshold],
            session_key: "session-1".to_string(),
            agent_id: None,
            policy_version: Some("v2".to_string()),
            request_hash: ContentHash::zero(),
            timeout_ms: 60_000,
        }
    }

    #[test]
    fn test_deterministic() {
        let a = compute_request_hash(&params()).unwrap();
        let b = compute_request_hash(&params()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_content_changes_hash() {
        let base = compute_request_hash(&params()).unwrap();

        let mut changed = params();
        changed.params_summary = "target=staging".to_string();
        assert_ne!(compute_request_hash(&changed).unwrap(), base);

        let mut changed = params();
        changed.risk_class = RiskClass::R4;
        assert_ne!(compute_request_hash(&changed).unwrap(), base);
    }

    #[test]
    fn test_timeout_and_hash_fields_are_excluded() {
        let base = compute_request_hash(&params()).unwrap();

        let mut changed = params();
        changed.timeout_ms = 1;
        changed.request_hash = ContentHash::hash(b"junk");
        assert_eq!(compute_request_hash(&changed).unwrap(), base);
    }

    #[test]
    fn test_domain_separated_from_plain_hash() {
        let p = params();
        let domain = compute_request_hash(&p).unwrap();
        assert_ne!(domain, ContentHash::hash(b"target=production"));
    }
}
