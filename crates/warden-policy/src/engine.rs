//! Policy types and the decision function.

use serde::{Deserialize, Serialize};
use std::fmt;

use tracing::debug;

use warden_core::{ReasonCode, RiskClass, SideEffect};
use warden_risk::RiskAssessment;

/// Side effects that count as writes to the world outside the workspace.
const EXTERNAL_WRITE_EFFECTS: [SideEffect; 6] = [
    SideEffect::NetworkEgress,
    SideEffect::Deployment,
    SideEffect::BillingMutation,
    SideEffect::DataDelete,
    SideEffect::ConfigMutation,
    SideEffect::SystemState,
];

/// How aggressively the policy gates actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyMode {
    /// Gate nothing.
    Off,
    /// Gate based on risk class and side effects.
    #[default]
    Adaptive,
    /// Gate everything that is not denied outright.
    Always,
}

impl fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("off"),
            Self::Adaptive => f.write_str("adaptive"),
            Self::Always => f.write_str("always"),
        }
    }
}

/// Threshold and side-effect rules consulted in adaptive mode.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct PolicyRules {
    /// Classes at or above this require approval. `None` uses the default
    /// adaptive threshold (`R3`).
    pub require_approval_at_or_above: Option<RiskClass>,
    /// Classes at or above this are denied without asking.
    pub deny_at_or_above: Option<RiskClass>,
    /// Whether external-write side effects require approval.
    pub require_approval_for_external_write: bool,
    /// Whether message-send side effects require approval.
    pub require_approval_for_messaging_send: bool,
}

/// The full policy configuration the decision engine consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PolicyConfig {
    /// Master switch. Disabled means everything is allowed.
    pub enabled: bool,
    /// Gating mode.
    pub mode: PolicyMode,
    /// How long a pending approval lives before it expires, in milliseconds.
    pub timeout_ms: u64,
    /// Threshold and side-effect rules.
    pub policy: PolicyRules,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: PolicyMode::Adaptive,
            timeout_ms: Self::DEFAULT_TIMEOUT_MS,
            policy: PolicyRules::default(),
        }
    }
}

impl PolicyConfig {
    /// Default pending-request lifetime: five minutes.
    pub const DEFAULT_TIMEOUT_MS: u64 = 5 * 60 * 1000;

    /// A disabled config, the degraded fallback for invalid configuration.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }
}

/// What the policy engine says to do with an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Proceed without asking anyone.
    Allow,
    /// Refuse without asking anyone.
    Deny,
    /// Suspend and ask a human.
    ApprovalRequired,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => f.write_str("allow"),
            Self::Deny => f.write_str("deny"),
            Self::ApprovalRequired => f.write_str("approval_required"),
        }
    }
}

/// A decision together with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyVerdict {
    /// The decision.
    pub decision: Decision,
    /// The stable code for the first rule that matched.
    pub reason: ReasonCode,
}

impl PolicyVerdict {
    fn new(decision: Decision, reason: ReasonCode) -> Self {
        Self { decision, reason }
    }
}

impl fmt::Display for PolicyVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.decision, self.reason)
    }
}

/// Decide what to do with an assessed action.
///
/// Pure and total: no I/O, no clock, and every `(assessment, config)` pair
/// maps to exactly one verdict. The deny threshold outranks every approval
/// rule so a denied class can never sneak through as a prompt.
#[must_use]
pub fn decide(assessment: &RiskAssessment, config: Option<&PolicyConfig>) -> PolicyVerdict {
    let Some(config) = config.filter(|c| c.enabled) else {
        return PolicyVerdict::new(Decision::Allow, ReasonCode::PolicyAllow);
    };

    if config.mode == PolicyMode::Off {
        return PolicyVerdict::new(Decision::Allow, ReasonCode::ModeOff);
    }

    if let Some(deny_at) = config.policy.deny_at_or_above {
        if assessment.risk_class >= deny_at {
            debug!(
                action = %assessment.action_name,
                risk_class = %assessment.risk_class,
                "policy denies action outright"
            );
            return PolicyVerdict::new(Decision::Deny, ReasonCode::PolicyDeny);
        }
    }

    if config.mode == PolicyMode::Always {
        return PolicyVerdict::new(Decision::ApprovalRequired, ReasonCode::ModeAlways);
    }

    let approval_threshold = config
        .policy
        .require_approval_at_or_above
        .unwrap_or(RiskClass::UNKNOWN_FALLBACK);
    if assessment.risk_class.requires_approval_at(approval_threshold) {
        return PolicyVerdict::new(Decision::ApprovalRequired, ReasonCode::PolicyThreshold);
    }

    if config.policy.require_approval_for_external_write
        && EXTERNAL_WRITE_EFFECTS
            .iter()
            .any(|effect| assessment.side_effects.contains(effect))
    {
        return PolicyVerdict::new(Decision::ApprovalRequired, ReasonCode::PolicyExternalWrite);
    }

    if config.policy.require_approval_for_messaging_send
        && assessment.side_effects.contains(&SideEffect::MessageSend)
    {
        return PolicyVerdict::new(Decision::ApprovalRequired, ReasonCode::PolicyMessageSend);
    }

    PolicyVerdict::new(Decision::Allow, ReasonCode::PolicyAllow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use warden_risk::RiskSource;

    fn assessment(risk_class: RiskClass, effects: &[SideEffect]) -> RiskAssessment {
        RiskAssessment {
            action_name: "test_action".to_string(),
            risk_class,
            side_effects: effects.iter().cloned().collect::<BTreeSet<_>>(),
            reason_codes: Vec::new(),
            approval_recommended: risk_class >= RiskClass::R3,
            source: RiskSource::CoreCatalog,
        }
    }

    fn enabled_adaptive() -> PolicyConfig {
        PolicyConfig {
            enabled: true,
            mode: PolicyMode::Adaptive,
            ..PolicyConfig::default()
        }
    }

    // -----------------------------------------------------------------------
    // Disabled / off
    // -----------------------------------------------------------------------

    #[test]
    fn test_absent_config_allows() {
        let verdict = decide(&assessment(RiskClass::R4, &[]), None);
        assert_eq!(verdict.decision, Decision::Allow);
        assert_eq!(verdict.reason, ReasonCode::PolicyAllow);
    }

    #[test]
    fn test_disabled_config_allows_everything() {
        let config = PolicyConfig::disabled();
        let verdict = decide(&assessment(RiskClass::R4, &[SideEffect::DataDelete]), Some(&config));
        assert_eq!(verdict.decision, Decision::Allow);
    }

    #[test]
    fn test_mode_off_allows_with_reason() {
        let config = PolicyConfig {
            enabled: true,
            mode: PolicyMode::Off,
            ..PolicyConfig::default()
        };
        let verdict = decide(&assessment(RiskClass::R4, &[]), Some(&config));
        assert_eq!(verdict.decision, Decision::Allow);
        assert_eq!(verdict.reason, ReasonCode::ModeOff);
    }

    // -----------------------------------------------------------------------
    // Deny threshold
    // -----------------------------------------------------------------------

    #[test]
    fn test_deny_threshold() {
        let mut config = enabled_adaptive();
        config.policy.deny_at_or_above = Some(RiskClass::R4);

        let verdict = decide(&assessment(RiskClass::R4, &[]), Some(&config));
        assert_eq!(verdict.decision, Decision::Deny);
        assert_eq!(verdict.reason, ReasonCode::PolicyDeny);

        let verdict = decide(&assessment(RiskClass::R3, &[]), Some(&config));
        assert_ne!(verdict.decision, Decision::Deny);
    }

    #[test]
    fn test_deny_outranks_always_mode() {
        let config = PolicyConfig {
            enabled: true,
            mode: PolicyMode::Always,
            timeout_ms: PolicyConfig::DEFAULT_TIMEOUT_MS,
            policy: PolicyRules {
                deny_at_or_above: Some(RiskClass::R4),
                ..PolicyRules::default()
            },
        };
        let verdict = decide(&assessment(RiskClass::R4, &[]), Some(&config));
        assert_eq!(verdict.decision, Decision::Deny);
        assert_eq!(verdict.reason, ReasonCode::PolicyDeny);
    }

    // -----------------------------------------------------------------------
    // Always mode
    // -----------------------------------------------------------------------

    #[test]
    fn test_always_mode_gates_even_r0() {
        let config = PolicyConfig {
            enabled: true,
            mode: PolicyMode::Always,
            ..PolicyConfig::default()
        };
        let verdict = decide(&assessment(RiskClass::R0, &[]), Some(&config));
        assert_eq!(verdict.decision, Decision::ApprovalRequired);
        assert_eq!(verdict.reason, ReasonCode::ModeAlways);
    }

    // -----------------------------------------------------------------------
    // Adaptive threshold
    // -----------------------------------------------------------------------

    #[test]
    fn test_adaptive_default_threshold_is_r3() {
        let config = enabled_adaptive();

        let verdict = decide(&assessment(RiskClass::R3, &[]), Some(&config));
        assert_eq!(verdict.decision, Decision::ApprovalRequired);
        assert_eq!(verdict.reason, ReasonCode::PolicyThreshold);

        let verdict = decide(&assessment(RiskClass::R2, &[]), Some(&config));
        assert_eq!(verdict.decision, Decision::Allow);
        assert_eq!(verdict.reason, ReasonCode::PolicyAllow);
    }

    #[test]
    fn test_adaptive_custom_threshold() {
        let mut config = enabled_adaptive();
        config.policy.require_approval_at_or_above = Some(RiskClass::R1);

        let verdict = decide(&assessment(RiskClass::R1, &[]), Some(&config));
        assert_eq!(verdict.decision, Decision::ApprovalRequired);

        let verdict = decide(&assessment(RiskClass::R0, &[]), Some(&config));
        assert_eq!(verdict.decision, Decision::Allow);
    }

    // -----------------------------------------------------------------------
    // Side-effect rules
    // -----------------------------------------------------------------------

    #[test]
    fn test_external_write_gates_below_threshold() {
        let mut config = enabled_adaptive();
        config.policy.require_approval_for_external_write = true;

        for effect in EXTERNAL_WRITE_EFFECTS {
            let verdict = decide(&assessment(RiskClass::R1, &[effect.clone()]), Some(&config));
            assert_eq!(verdict.decision, Decision::ApprovalRequired, "effect: {effect}");
            assert_eq!(verdict.reason, ReasonCode::PolicyExternalWrite);
        }
    }

    #[test]
    fn test_external_write_flag_off_allows() {
        let config = enabled_adaptive();
        let verdict = decide(
            &assessment(RiskClass::R1, &[SideEffect::NetworkEgress]),
            Some(&config),
        );
        assert_eq!(verdict.decision, Decision::Allow);
    }

    #[test]
    fn test_message_send_rule() {
        let mut config = enabled_adaptive();
        config.policy.require_approval_for_messaging_send = true;

        let verdict = decide(
            &assessment(RiskClass::R1, &[SideEffect::MessageSend]),
            Some(&config),
        );
        assert_eq!(verdict.decision, Decision::ApprovalRequired);
        assert_eq!(verdict.reason, ReasonCode::PolicyMessageSend);
    }

    #[test]
    fn test_external_write_checked_before_message_send() {
        let mut config = enabled_adaptive();
        config.policy.require_approval_for_external_write = true;
        config.policy.require_approval_for_messaging_send = true;

        let verdict = decide(
            &assessment(
                RiskClass::R1,
                &[SideEffect::MessageSend, SideEffect::NetworkEgress],
            ),
            Some(&config),
        );
        assert_eq!(verdict.reason, ReasonCode::PolicyExternalWrite);
    }

    #[test]
    fn test_filesystem_write_is_not_external() {
        let mut config = enabled_adaptive();
        config.policy.require_approval_for_external_write = true;

        let verdict = decide(
            &assessment(RiskClass::R1, &[SideEffect::FilesystemWrite]),
            Some(&config),
        );
        assert_eq!(verdict.decision, Decision::Allow);
    }

    // -----------------------------------------------------------------------
    // Determinism & serde
    // -----------------------------------------------------------------------

    #[test]
    fn test_deterministic() {
        let config = enabled_adaptive();
        let input = assessment(RiskClass::R3, &[SideEffect::ProcessSpawn]);
        assert_eq!(decide(&input, Some(&config)), decide(&input, Some(&config)));
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = PolicyConfig {
            enabled: true,
            mode: PolicyMode::Always,
            timeout_ms: 30_000,
            policy: PolicyRules {
                require_approval_at_or_above: Some(RiskClass::R2),
                deny_at_or_above: Some(RiskClass::R4),
                require_approval_for_external_write: true,
                require_approval_for_messaging_send: false,
            },
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"mode\":\"always\""));
        let back: PolicyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_verdict_display() {
        let verdict = PolicyVerdict::new(Decision::Deny, ReasonCode::PolicyDeny);
        assert_eq!(verdict.to_string(), "deny (policy_deny)");
    }
}
