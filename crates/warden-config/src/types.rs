//! Configuration types for the `[approvals.tools]` table.

use serde::{Deserialize, Serialize};

use warden_policy::{PolicyConfig, PolicyMode, PolicyRules};

/// Root of a Warden config file.
///
/// ```toml
/// [approvals.tools]
/// enabled = true
/// mode = "adaptive"
/// timeout_ms = 120000
///
/// [approvals.tools.policy]
/// require_approval_at_or_above = "R3"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolApprovalsConfig {
    /// The `[approvals]` table.
    #[serde(default)]
    pub approvals: ApprovalsSection,
}

/// The `[approvals]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApprovalsSection {
    /// The `[approvals.tools]` table.
    #[serde(default)]
    pub tools: ApprovalsConfig,
}

/// Operator-facing approval configuration for tool calls.
///
/// Every field has a serde default, so a partial table parses; the absent
/// fields fall back to the disabled-adaptive baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalsConfig {
    /// Master switch.
    pub enabled: bool,
    /// Gating mode.
    pub mode: PolicyMode,
    /// Pending-request lifetime in milliseconds.
    pub timeout_ms: u64,
    /// Threshold and side-effect rules.
    pub policy: PolicyRules,
    /// Where approval prompts are delivered.
    pub routing: RoutingConfig,
}

impl Default for ApprovalsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: PolicyMode::Adaptive,
            timeout_ms: PolicyConfig::DEFAULT_TIMEOUT_MS,
            policy: PolicyRules::default(),
            routing: RoutingConfig::default(),
        }
    }
}

impl ApprovalsConfig {
    /// Bridge into the shape the policy engine consumes.
    ///
    /// Routing is dropped here on purpose: prompt delivery is the gateway's
    /// concern, not the decision engine's.
    #[must_use]
    pub fn into_policy_config(self) -> PolicyConfig {
        PolicyConfig {
            enabled: self.enabled,
            mode: self.mode,
            timeout_ms: self.timeout_ms,
            policy: self.policy,
        }
    }
}

/// How approval prompts are routed to humans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    /// Prompt the session that initiated the action.
    #[default]
    Session,
    /// Prompt every configured target.
    Broadcast,
    /// Prompt only the listed targets.
    Targets,
}

/// Prompt routing configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Delivery mode.
    pub mode: RoutingMode,
    /// Delivery targets for `broadcast` / `targets` modes.
    pub targets: Vec<String>,
    /// Only gate actions from these agents, when non-empty.
    pub agent_filter: Vec<String>,
    /// Only gate actions from these sessions, when non-empty.
    pub session_filter: Vec<String>,
}
