//! Risk profiles and their provenance.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use warden_core::{RiskClass, SideEffect};

/// A parameter-driven escalation hook.
///
/// Given the call parameters, returns a class the action should be elevated
/// to, or `None` when the parameters carry no extra signal. The evaluator
/// combines the result with the base class via `max`, so a bump can never
/// lower an assessment.
pub type ParamBump = Arc<dyn Fn(&serde_json::Value) -> Option<RiskClass> + Send + Sync>;

/// Declared risk characteristics of an action.
#[derive(Clone)]
pub struct RiskProfile {
    /// Base risk class for the action.
    pub risk_class: RiskClass,
    /// Side effects the action may have.
    pub side_effects: BTreeSet<SideEffect>,
    /// Human-readable description of what the action does.
    pub description: String,
    /// Optional parameter-driven escalation.
    pub parameter_bump: Option<ParamBump>,
}

impl RiskProfile {
    /// Create a profile with no side effects and no parameter bump.
    #[must_use]
    pub fn new(risk_class: RiskClass, description: impl Into<String>) -> Self {
        Self {
            risk_class,
            side_effects: BTreeSet::new(),
            description: description.into(),
            parameter_bump: None,
        }
    }

    /// Add a side effect.
    #[must_use]
    pub fn with_side_effect(mut self, effect: SideEffect) -> Self {
        self.side_effects.insert(effect);
        self
    }

    /// Attach a parameter-driven escalation hook.
    #[must_use]
    pub fn with_parameter_bump<F>(mut self, bump: F) -> Self
    where
        F: Fn(&serde_json::Value) -> Option<RiskClass> + Send + Sync + 'static,
    {
        self.parameter_bump = Some(Arc::new(bump));
        self
    }
}

impl fmt::Debug for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RiskProfile")
            .field("risk_class", &self.risk_class)
            .field("side_effects", &self.side_effects)
            .field("description", &self.description)
            .field("parameter_bump", &self.parameter_bump.is_some())
            .finish()
    }
}

/// Where a resolved profile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskSource {
    /// Declared by the plugin that owns the action.
    Plugin,
    /// Found in the built-in catalog.
    CoreCatalog,
    /// Not found anywhere; the fail-closed fallback applies.
    UnknownFallback,
}

impl fmt::Display for RiskSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plugin => f.write_str("plugin"),
            Self::CoreCatalog => f.write_str("core_catalog"),
            Self::UnknownFallback => f.write_str("unknown_fallback"),
        }
    }
}
