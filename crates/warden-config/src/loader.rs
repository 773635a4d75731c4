//! Config file loading.

use std::path::Path;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::types::{ApprovalsConfig, ToolApprovalsConfig};
use crate::validate;

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: usize = 1_048_576;

/// Load and validate the `[approvals.tools]` table from a file.
///
/// A missing file is not an error: it yields the disabled defaults, the
/// same posture an empty table would.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file exists but cannot be read or
/// parsed, or if the parsed configuration fails validation.
pub fn load_from_path(path: &Path) -> ConfigResult<ApprovalsConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(ApprovalsConfig::default());
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    // Size check after the read, so there is no gap between stat and read.
    if content.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        });
    }

    load_named(&content, &path.display().to_string())
}

/// Parse and validate the `[approvals.tools]` table from a TOML string.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the string is not valid TOML or the parsed
/// configuration fails validation.
pub fn load_from_str(content: &str) -> ConfigResult<ApprovalsConfig> {
    load_named(content, "<inline>")
}

fn load_named(content: &str, origin: &str) -> ConfigResult<ApprovalsConfig> {
    let root: ToolApprovalsConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: origin.to_string(),
            source: e,
        })?;
    let config = root.approvals.tools;
    validate::validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::RiskClass;
    use warden_policy::PolicyMode;

    const VALID: &str = r#"
        [approvals.tools]
        enabled = true
        mode = "adaptive"
        timeout_ms = 120000

        [approvals.tools.policy]
        require_approval_at_or_above = "R2"
        deny_at_or_above = "R4"
        require_approval_for_external_write = true

        [approvals.tools.routing]
        mode = "broadcast"
        targets = ["ops-channel"]
    "#;

    #[test]
    fn test_load_full_table() {
        let config = load_from_str(VALID).unwrap();
        assert!(config.enabled);
        assert_eq!(config.mode, PolicyMode::Adaptive);
        assert_eq!(config.timeout_ms, 120_000);
        assert_eq!(
            config.policy.require_approval_at_or_above,
            Some(RiskClass::R2)
        );
        assert_eq!(config.policy.deny_at_or_above, Some(RiskClass::R4));
        assert_eq!(config.routing.targets, vec!["ops-channel".to_string()]);
    }

    #[test]
    fn test_empty_string_is_disabled_defaults() {
        let config = load_from_str("").unwrap();
        assert!(!config.enabled);
    }

    #[test]
    fn test_unrelated_tables_are_ignored() {
        let config = load_from_str("[model]\nprovider = \"x\"").unwrap();
        assert!(!config.enabled);
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = load_from_str("[approvals.tools\nenabled = true").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let err = load_from_str(
            r#"
            [approvals.tools]
            enabled = true
            timeout_ms = 0
        "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn test_load_from_missing_path_is_defaults() {
        let config = load_from_path(Path::new("/nonexistent/warden.toml")).unwrap();
        assert!(!config.enabled);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warden.toml");
        std::fs::write(&path, VALID).unwrap();
        let config = load_from_path(&path).unwrap();
        assert!(config.enabled);
    }

    #[test]
    fn test_oversized_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.toml");
        let data = "x = \"".to_string() + &"a".repeat(1_100_000) + "\"";
        std::fs::write(&path, data).unwrap();
        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }
}
