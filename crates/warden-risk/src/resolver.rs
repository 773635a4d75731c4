//! Profile resolution with a fixed precedence order.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use crate::catalog::RiskCatalog;
use crate::profile::{RiskProfile, RiskSource};

/// Profiles declared at registration time by plugins, keyed by action name.
///
/// A plugin may only satisfy lookups for actions it declared itself, so the
/// registry stores the declaring plugin id alongside each profile.
#[derive(Default)]
pub struct ProfileRegistry {
    entries: RwLock<HashMap<String, (String, RiskProfile)>>,
}

impl ProfileRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin-declared profile for an action.
    ///
    /// A later registration for the same action name replaces the earlier
    /// one; the resolver always sees the most recent declaration.
    pub fn register(&self, plugin_id: &str, action_name: &str, profile: RiskProfile) {
        debug!(
            plugin_id,
            action_name,
            risk_class = %profile.risk_class,
            "registering plugin risk profile"
        );
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                action_name.to_lowercase(),
                (plugin_id.to_string(), profile),
            );
        }
    }

    /// Look up a profile, optionally constrained to a declaring plugin.
    #[must_use]
    pub fn get(&self, action_name: &str, declaring_plugin: Option<&str>) -> Option<RiskProfile> {
        let entries = self.entries.read().ok()?;
        let (owner, profile) = entries.get(&action_name.to_lowercase())?;
        match declaring_plugin {
            Some(plugin_id) if plugin_id != owner => None,
            _ => Some(profile.clone()),
        }
    }
}

/// A resolved profile together with its provenance.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The profile, or `None` when the action is unknown everywhere.
    pub profile: Option<RiskProfile>,
    /// Where the profile came from.
    pub source: RiskSource,
}

/// Resolves an action name to a risk profile.
///
/// Precedence is fixed: plugin-declared profile, then the built-in catalog,
/// then the unknown fallback. The order never depends on configuration.
pub struct RiskResolver {
    registry: ProfileRegistry,
    catalog: RiskCatalog,
}

impl RiskResolver {
    /// Create a resolver over the built-in catalog with no plugin profiles.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: ProfileRegistry::new(),
            catalog: RiskCatalog::builtin(),
        }
    }

    /// Create a resolver with a pre-populated registry.
    #[must_use]
    pub fn with_registry(registry: ProfileRegistry) -> Self {
        Self {
            registry,
            catalog: RiskCatalog::builtin(),
        }
    }

    /// The plugin profile registry, for registration at plugin load time.
    #[must_use]
    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    /// Resolve an action name to a profile and source.
    #[must_use]
    pub fn resolve(&self, action_name: &str, declaring_plugin: Option<&str>) -> Resolution {
        if let Some(profile) = self.registry.get(action_name, declaring_plugin) {
            return Resolution {
                profile: Some(profile),
                source: RiskSource::Plugin,
            };
        }
        if let Some(profile) = self.catalog.get(action_name) {
            return Resolution {
                profile: Some(profile.clone()),
                source: RiskSource::CoreCatalog,
            };
        }
        debug!(action_name, "no risk profile found, using unknown fallback");
        Resolution {
            profile: None,
            source: RiskSource::UnknownFallback,
        }
    }
}

impl Default for RiskResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::RiskClass;

    #[test]
    fn test_plugin_profile_wins_over_catalog() {
        let resolver = RiskResolver::new();
        resolver.registry().register(
            "shell-plugin",
            "exec",
            RiskProfile::new(RiskClass::R1, "sandboxed exec"),
        );

        let resolution = resolver.resolve("exec", None);
        assert_eq!(resolution.source, RiskSource::Plugin);
        assert_eq!(resolution.profile.unwrap().risk_class, RiskClass::R1);
    }

    #[test]
    fn test_catalog_fallback() {
        let resolver = RiskResolver::new();
        let resolution = resolver.resolve("write_file", None);
        assert_eq!(resolution.source, RiskSource::CoreCatalog);
        assert_eq!(resolution.profile.unwrap().risk_class, RiskClass::R2);
    }

    #[test]
    fn test_unknown_action_falls_through() {
        let resolver = RiskResolver::new();
        let resolution = resolver.resolve("summon_dragon", None);
        assert_eq!(resolution.source, RiskSource::UnknownFallback);
        assert!(resolution.profile.is_none());
    }

    #[test]
    fn test_declaring_plugin_is_enforced() {
        let resolver = RiskResolver::new();
        resolver.registry().register(
            "plugin-a",
            "custom_action",
            RiskProfile::new(RiskClass::R2, "plugin a action"),
        );

        let same = resolver.resolve("custom_action", Some("plugin-a"));
        assert_eq!(same.source, RiskSource::Plugin);

        // Another plugin's name does not satisfy the lookup.
        let other = resolver.resolve("custom_action", Some("plugin-b"));
        assert_eq!(other.source, RiskSource::UnknownFallback);
        assert!(other.profile.is_none());
    }

    #[test]
    fn test_later_registration_replaces() {
        let registry = ProfileRegistry::new();
        registry.register("p", "act", RiskProfile::new(RiskClass::R1, "v1"));
        registry.register("p", "act", RiskProfile::new(RiskClass::R3, "v2"));
        assert_eq!(registry.get("act", None).unwrap().risk_class, RiskClass::R3);
    }
}
