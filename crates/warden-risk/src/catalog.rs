//! Built-in risk catalog for core actions.

use std::collections::HashMap;

use warden_core::{RiskClass, SideEffect};

use crate::profile::RiskProfile;

/// Command fragments that elevate a shell execution to the highest class.
const DESTRUCTIVE_COMMAND_MARKERS: &[&str] = &[
    "rm -rf",
    "rm -fr",
    "mkfs",
    "dd if=",
    "shutdown",
    "reboot",
    "chmod 777",
    "chmod -r 777",
    ":(){ :|:& };:",
];

/// Fragments that mark a shell execution as privilege-elevating.
const ELEVATION_MARKERS: &[&str] = &["sudo ", "doas ", "su -"];

/// Static mapping from core action names to risk profiles.
///
/// Lookup is case-insensitive: names are normalized to lowercase at both
/// insert and query time, so `Exec` and `exec` resolve identically.
pub struct RiskCatalog {
    profiles: HashMap<String, RiskProfile>,
}

impl RiskCatalog {
    /// The catalog of built-in core actions.
    #[must_use]
    pub fn builtin() -> Self {
        let mut catalog = Self {
            profiles: HashMap::new(),
        };

        catalog.insert(
            "exec",
            RiskProfile::new(RiskClass::R3, "Run a shell command on the host")
                .with_side_effect(SideEffect::ProcessSpawn)
                .with_parameter_bump(exec_command_bump),
        );
        catalog.insert(
            "read_file",
            RiskProfile::new(RiskClass::R0, "Read a file from the workspace"),
        );
        catalog.insert(
            "list_dir",
            RiskProfile::new(RiskClass::R0, "List the contents of a directory"),
        );
        catalog.insert(
            "write_file",
            RiskProfile::new(RiskClass::R2, "Create or overwrite a file")
                .with_side_effect(SideEffect::FilesystemWrite),
        );
        catalog.insert(
            "delete_file",
            RiskProfile::new(RiskClass::R3, "Delete a file or directory tree")
                .with_side_effect(SideEffect::DataDelete),
        );
        catalog.insert(
            "fetch",
            RiskProfile::new(RiskClass::R2, "Fetch a URL over the network")
                .with_side_effect(SideEffect::NetworkEgress),
        );
        catalog.insert(
            "browser",
            RiskProfile::new(RiskClass::R2, "Drive a browser session")
                .with_side_effect(SideEffect::NetworkEgress),
        );
        catalog.insert(
            "message",
            RiskProfile::new(RiskClass::R2, "Send a message to a person or channel")
                .with_side_effect(SideEffect::MessageSend),
        );
        catalog.insert(
            "deploy",
            RiskProfile::new(RiskClass::R3, "Deploy to a live environment")
                .with_side_effect(SideEffect::Deployment)
                .with_side_effect(SideEffect::NetworkEgress),
        );
        catalog.insert(
            "config_set",
            RiskProfile::new(RiskClass::R3, "Mutate service configuration")
                .with_side_effect(SideEffect::ConfigMutation),
        );
        catalog.insert(
            "billing_charge",
            RiskProfile::new(RiskClass::R4, "Charge a payment method")
                .with_side_effect(SideEffect::BillingMutation),
        );
        catalog.insert(
            "process_kill",
            RiskProfile::new(RiskClass::R3, "Terminate a running process")
                .with_side_effect(SideEffect::SystemState),
        );

        catalog
    }

    fn insert(&mut self, name: &str, profile: RiskProfile) {
        self.profiles.insert(name.to_lowercase(), profile);
    }

    /// Look up a profile by action name.
    #[must_use]
    pub fn get(&self, action_name: &str) -> Option<&RiskProfile> {
        self.profiles.get(&action_name.to_lowercase())
    }

    /// Number of catalogued actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for RiskCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Elevate shell commands that match destructive or elevating patterns.
fn exec_command_bump(params: &serde_json::Value) -> Option<RiskClass> {
    let command = params.get("command").and_then(|v| v.as_str())?;
    let normalized = command.to_lowercase();
    if DESTRUCTIVE_COMMAND_MARKERS
        .iter()
        .any(|marker| normalized.contains(marker))
    {
        return Some(RiskClass::R4);
    }
    if ELEVATION_MARKERS
        .iter()
        .any(|marker| normalized.contains(marker))
    {
        return Some(RiskClass::R4);
    }
    None
}
