//! The action-invocation gate.
//!
//! One call ties the pipeline together: resolve the action's risk profile,
//! evaluate it against the call parameters, ask the policy engine what to
//! do, and when approval is required, suspend on the gateway until a human
//! (or the clock) decides. A storage failure on the approval path never
//! defaults to allow.

use std::time::Duration;

use tracing::warn;

use warden_core::{ContentHash, RequestId};
use warden_policy::{Decision, PolicyConfig, PolicyVerdict, decide};
use warden_risk::{DEFAULT_APPROVAL_THRESHOLD, RiskAssessment, RiskResolver, evaluate};
use warden_store::RequestStatus;

use crate::error::{BlockCode, GatewayError, GatewayResult};
use crate::gateway::ApprovalGateway;
use crate::hash::compute_request_hash;
use crate::wire::ToolApprovalRequestParams;

/// A proposed action arriving at the gate.
#[derive(Debug, Clone)]
pub struct GateInput {
    /// The action name.
    pub action_name: String,
    /// The plugin claiming to provide the action, when known.
    pub declaring_plugin: Option<String>,
    /// The raw call parameters, consulted by parameter bumps.
    pub params: serde_json::Value,
    /// Redacted, human-readable summary of the parameters.
    pub arguments_summary: String,
    /// Session proposing the action.
    pub session_key: String,
    /// Agent identity, when known.
    pub agent_id: Option<String>,
    /// Version of the policy in force, when known.
    pub policy_version: Option<String>,
}

/// Proof that an action passed the gate.
#[derive(Debug, Clone)]
pub struct GatePass {
    /// The risk assessment the decision was based on.
    pub assessment: RiskAssessment,
    /// The policy verdict.
    pub verdict: PolicyVerdict,
    /// The approval request that was granted, when one was needed.
    pub request_id: Option<RequestId>,
}

/// Gate one proposed action.
///
/// `Allow` passes through immediately. `Deny` blocks with `policy_deny`.
/// `ApprovalRequired` creates a request and suspends until it is approved,
/// denied, or expired; denial, expiry, and persistence failure all block.
///
/// # Errors
///
/// [`GatewayError::Blocked`] with the structured code describing why the
/// action may not proceed.
pub async fn gate_action(
    gateway: &ApprovalGateway,
    resolver: &RiskResolver,
    config: Option<&PolicyConfig>,
    input: GateInput,
) -> GatewayResult<GatePass> {
    let resolution = resolver.resolve(&input.action_name, input.declaring_plugin.as_deref());
    let threshold = config
        .and_then(|c| c.policy.require_approval_at_or_above)
        .unwrap_or(DEFAULT_APPROVAL_THRESHOLD);
    let assessment = evaluate(
        &input.action_name,
        resolution.profile.as_ref(),
        &input.params,
        resolution.source,
        threshold,
    );
    let verdict = decide(&assessment, config);

    match verdict.decision {
        Decision::Allow => Ok(GatePass {
            assessment,
            verdict,
            request_id: None,
        }),
        Decision::Deny => Err(GatewayError::Blocked {
            code: BlockCode::PolicyDeny,
            request_id: None,
        }),
        Decision::ApprovalRequired => {
            request_approval(gateway, config, input, assessment, verdict).await
        },
    }
}

async fn request_approval(
    gateway: &ApprovalGateway,
    config: Option<&PolicyConfig>,
    input: GateInput,
    assessment: RiskAssessment,
    verdict: PolicyVerdict,
) -> GatewayResult<GatePass> {
    let timeout_ms = config.map_or(PolicyConfig::DEFAULT_TIMEOUT_MS, |c| c.timeout_ms);

    let mut reason_codes = assessment.reason_codes.clone();
    reason_codes.push(verdict.reason.clone());

    let mut params = ToolApprovalRequestParams {
        tool_name: input.action_name,
        params_summary: input.arguments_summary,
        risk_class: assessment.risk_class,
        side_effects: assessment.side_effects.iter().cloned().collect(),
        reason_codes,
        session_key: input.session_key,
        agent_id: input.agent_id,
        policy_version: input.policy_version,
        request_hash: ContentHash::zero(),
        timeout_ms,
    };
    params.request_hash = compute_request_hash(&params)?;

    let requested = match gateway.request(params).await {
        Ok(requested) => requested,
        Err(e) => {
            warn!("approval request could not be created, blocking: {e}");
            return Err(GatewayError::Blocked {
                code: BlockCode::ApprovalRequestFailed,
                request_id: None,
            });
        },
    };

    let awaited = match gateway
        .await_decision(requested.id, Duration::from_millis(timeout_ms))
        .await
    {
        Ok(awaited) => awaited,
        Err(e) => {
            warn!(id = %requested.id, "approval wait failed, blocking: {e}");
            return Err(GatewayError::Blocked {
                code: BlockCode::ApprovalRequestFailed,
                request_id: Some(requested.id),
            });
        },
    };

    match awaited.status {
        RequestStatus::Approved => Ok(GatePass {
            assessment,
            verdict,
            request_id: Some(requested.id),
        }),
        RequestStatus::Denied => Err(GatewayError::Blocked {
            code: BlockCode::ApprovalDenied,
            request_id: Some(requested.id),
        }),
        RequestStatus::Expired | RequestStatus::Pending => Err(GatewayError::Blocked {
            code: BlockCode::ApprovalTimeout,
            request_id: Some(requested.id),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use warden_core::{ReasonCode, RiskClass};
    use warden_policy::{PolicyMode, PolicyRules};
    use warden_store::{MemoryRequestStore, RequestFilter};

    use crate::wire::{ResolveDecision, ToolApprovalResolveParams};

    fn make_gateway() -> Arc<ApprovalGateway> {
        Arc::new(ApprovalGateway::new(Arc::new(MemoryRequestStore::new())))
    }

    fn enabled_config(timeout_ms: u64) -> PolicyConfig {
        PolicyConfig {
            enabled: true,
            mode: PolicyMode::Adaptive,
            timeout_ms,
            policy: PolicyRules::default(),
        }
    }

    fn input(action: &str) -> GateInput {
        GateInput {
            action_name: action.to_string(),
            declaring_plugin: None,
            params: serde_json::json!({}),
            arguments_summary: "args".to_string(),
            session_key: "session-1".to_string(),
            agent_id: None,
            policy_version: Some("v1".to_string()),
        }
    }

    /// Resolve the single pending request as soon as it appears.
    fn resolve_when_pending(gateway: Arc<ApprovalGateway>, decision: ResolveDecision) {
        tokio::spawn(async move {
            loop {
                let pending = gateway.pending(RequestFilter::default()).unwrap().pending;
                if let Some(record) = pending.first() {
                    gateway
                        .resolve(
                            ToolApprovalResolveParams {
                                id: record.id,
                                decision,
                                request_hash: record.request_hash,
                            },
                            "operator",
                            "human",
                        )
                        .await
                        .unwrap();
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });
    }

    // -----------------------------------------------------------------------
    // Pass-through and outright denial
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_low_risk_action_passes_without_request() {
        let gateway = make_gateway();
        let resolver = RiskResolver::new();
        let config = enabled_config(60_000);

        let pass = gate_action(&gateway, &resolver, Some(&config), input("read_file"))
            .await
            .unwrap();
        assert_eq!(pass.assessment.risk_class, RiskClass::R0);
        assert_eq!(pass.verdict.reason, ReasonCode::PolicyAllow);
        assert!(pass.request_id.is_none());
        assert!(gateway.pending(RequestFilter::default()).unwrap().pending.is_empty());
    }

    #[tokio::test]
    async fn test_absent_config_allows_everything() {
        let gateway = make_gateway();
        let resolver = RiskResolver::new();

        let pass = gate_action(&gateway, &resolver, None, input("billing_charge"))
            .await
            .unwrap();
        assert!(pass.request_id.is_none());
    }

    #[tokio::test]
    async fn test_deny_threshold_blocks_without_asking() {
        let gateway = make_gateway();
        let resolver = RiskResolver::new();
        let mut config = enabled_config(60_000);
        config.policy.deny_at_or_above = Some(RiskClass::R4);

        // billing_charge is R4 in the builtin catalog.
        let err = gate_action(&gateway, &resolver, Some(&config), input("billing_charge"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Blocked {
                code: BlockCode::PolicyDeny,
                request_id: None,
            }
        ));
        assert!(gateway.pending(RequestFilter::default()).unwrap().pending.is_empty());
    }

    // -----------------------------------------------------------------------
    // Approval round trips
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_approved_action_passes_with_request_id() {
        let gateway = make_gateway();
        let resolver = RiskResolver::new();
        let config = enabled_config(60_000);
        resolve_when_pending(Arc::clone(&gateway), ResolveDecision::AllowOnce);

        // exec is R3, at the default adaptive threshold.
        let pass = gate_action(&gateway, &resolver, Some(&config), input("exec"))
            .await
            .unwrap();
        assert_eq!(pass.verdict.reason, ReasonCode::PolicyThreshold);
        assert!(pass.request_id.is_some());
    }

    #[tokio::test]
    async fn test_denied_action_blocks() {
        let gateway = make_gateway();
        let resolver = RiskResolver::new();
        let config = enabled_config(60_000);
        resolve_when_pending(Arc::clone(&gateway), ResolveDecision::Deny);

        let err = gate_action(&gateway, &resolver, Some(&config), input("exec"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Blocked {
                code: BlockCode::ApprovalDenied,
                request_id: Some(_),
            }
        ));
    }

    #[tokio::test]
    async fn test_unanswered_approval_times_out() {
        let gateway = make_gateway();
        let resolver = RiskResolver::new();
        let config = enabled_config(30);

        let err = gate_action(&gateway, &resolver, Some(&config), input("exec"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Blocked {
                code: BlockCode::ApprovalTimeout,
                request_id: Some(_),
            }
        ));
    }

    #[tokio::test]
    async fn test_unknown_action_requires_approval() {
        let gateway = make_gateway();
        let resolver = RiskResolver::new();
        let config = enabled_config(60_000);
        resolve_when_pending(Arc::clone(&gateway), ResolveDecision::AllowOnce);

        let pass = gate_action(&gateway, &resolver, Some(&config), input("summon_dragon"))
            .await
            .unwrap();
        // Unknown actions fail closed to the fallback class.
        assert_eq!(pass.assessment.risk_class, RiskClass::UNKNOWN_FALLBACK);
        assert!(pass
            .assessment
            .reason_codes
            .contains(&ReasonCode::UnknownToolProfile));
        assert!(pass.request_id.is_some());
    }
}
