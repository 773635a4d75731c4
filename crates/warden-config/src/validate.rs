//! Approvals configuration validation and degradation.

use tracing::warn;

use crate::error::{ConfigError, ConfigResult};
use crate::types::{ApprovalsConfig, RoutingMode};

/// Upper bound on the pending-request lifetime: 24 hours.
const TIMEOUT_UPPER_BOUND_MS: u64 = 24 * 60 * 60 * 1000;

/// Validate an approvals configuration.
///
/// A disabled config is always valid; its other fields are never consulted.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &ApprovalsConfig) -> ConfigResult<()> {
    if !config.enabled {
        return Ok(());
    }

    if config.timeout_ms == 0 {
        return Err(ConfigError::ValidationError {
            field: "approvals.tools.timeout_ms".to_owned(),
            message: "timeout_ms must be greater than 0".to_owned(),
        });
    }

    if config.timeout_ms > TIMEOUT_UPPER_BOUND_MS {
        return Err(ConfigError::ValidationError {
            field: "approvals.tools.timeout_ms".to_owned(),
            message: format!(
                "timeout_ms ({}) exceeds maximum allowed value ({TIMEOUT_UPPER_BOUND_MS})",
                config.timeout_ms
            ),
        });
    }

    if let (Some(deny_at), Some(approve_at)) = (
        config.policy.deny_at_or_above,
        config.policy.require_approval_at_or_above,
    ) {
        // A deny threshold at or below the approval threshold makes the
        // approval rule unreachable.
        if deny_at <= approve_at {
            return Err(ConfigError::ValidationError {
                field: "approvals.tools.policy.deny_at_or_above".to_owned(),
                message: format!(
                    "deny threshold {deny_at} must be above approval threshold {approve_at}"
                ),
            });
        }
    }

    if matches!(config.routing.mode, RoutingMode::Targets) && config.routing.targets.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "approvals.tools.routing.targets".to_owned(),
            message: "routing mode 'targets' requires at least one target".to_owned(),
        });
    }

    Ok(())
}

impl ApprovalsConfig {
    /// Return this config if valid, else the disabled defaults.
    ///
    /// This is the fail-safe entry point for callers that must not crash on
    /// operator error: a broken config gates nothing and says so once in the
    /// log, rather than erroring every action.
    #[must_use]
    pub fn sanitized(self) -> Self {
        match validate(&self) {
            Ok(()) => self,
            Err(e) => {
                warn!(error = %e, "invalid approvals config, degrading to disabled");
                Self::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::RiskClass;

    fn enabled() -> ApprovalsConfig {
        ApprovalsConfig {
            enabled: true,
            ..ApprovalsConfig::default()
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&ApprovalsConfig::default()).is_ok());
    }

    #[test]
    fn test_enabled_defaults_are_valid() {
        assert!(validate(&enabled()).is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = enabled();
        config.timeout_ms = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_absurd_timeout_rejected() {
        let mut config = enabled();
        config.timeout_ms = TIMEOUT_UPPER_BOUND_MS.saturating_add(1);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_timeout_ok_when_disabled() {
        let mut config = ApprovalsConfig::default();
        config.timeout_ms = 0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_deny_below_approval_threshold_rejected() {
        let mut config = enabled();
        config.policy.require_approval_at_or_above = Some(RiskClass::R3);
        config.policy.deny_at_or_above = Some(RiskClass::R2);
        assert!(validate(&config).is_err());

        config.policy.deny_at_or_above = Some(RiskClass::R3);
        assert!(validate(&config).is_err());

        config.policy.deny_at_or_above = Some(RiskClass::R4);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_targets_mode_requires_targets() {
        let mut config = enabled();
        config.routing.mode = crate::types::RoutingMode::Targets;
        assert!(validate(&config).is_err());

        config.routing.targets.push("ops".to_owned());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_sanitized_keeps_valid_config() {
        let config = enabled();
        let sanitized = config.clone().sanitized();
        assert_eq!(sanitized, config);
    }

    #[test]
    fn test_sanitized_degrades_invalid_to_disabled() {
        let mut config = enabled();
        config.timeout_ms = 0;
        let sanitized = config.sanitized();
        assert!(!sanitized.enabled);
        assert_eq!(sanitized, ApprovalsConfig::default());
    }
}
