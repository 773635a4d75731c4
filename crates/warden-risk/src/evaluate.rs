//! Static risk evaluation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use warden_core::{ReasonCode, RiskClass, SideEffect};

use crate::profile::{RiskProfile, RiskSource};

/// Default class at or above which approval is recommended.
pub const DEFAULT_APPROVAL_THRESHOLD: RiskClass = RiskClass::R3;

/// The outcome of classifying one proposed action.
///
/// Plain data only: serializable, comparable, and reproducible from the same
/// inputs. The policy engine consumes it without re-deriving anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// The action that was classified.
    pub action_name: String,
    /// Final risk class after any parameter bump.
    pub risk_class: RiskClass,
    /// Side effects declared by the profile.
    pub side_effects: BTreeSet<SideEffect>,
    /// Why the class is what it is, in application order.
    pub reason_codes: Vec<ReasonCode>,
    /// Whether the class meets the approval threshold.
    pub approval_recommended: bool,
    /// Where the profile came from.
    pub source: RiskSource,
}

/// Classify an action from its resolved profile and call parameters.
///
/// A missing profile is fail-closed: the assessment is forced to
/// [`RiskClass::UNKNOWN_FALLBACK`] with the `unknown_tool_profile` reason,
/// regardless of the reported source. A parameter bump only ever raises the
/// class (combined via `max`), and its reason code is recorded only when the
/// class actually moved.
#[must_use]
pub fn evaluate(
    action_name: &str,
    profile: Option<&RiskProfile>,
    params: &serde_json::Value,
    source: RiskSource,
    approval_threshold: RiskClass,
) -> RiskAssessment {
    let Some(profile) = profile else {
        return RiskAssessment {
            action_name: action_name.to_string(),
            risk_class: RiskClass::UNKNOWN_FALLBACK,
            side_effects: BTreeSet::new(),
            reason_codes: vec![ReasonCode::UnknownToolProfile],
            approval_recommended: RiskClass::UNKNOWN_FALLBACK >= approval_threshold,
            source: RiskSource::UnknownFallback,
        };
    };

    let base = profile.risk_class;
    let mut risk_class = base;
    let mut reason_codes = Vec::new();

    if let Some(bump) = &profile.parameter_bump {
        if let Some(bumped) = bump(params) {
            let combined = risk_class.max(bumped);
            if combined > risk_class {
                risk_class = combined;
                reason_codes.push(ReasonCode::ParameterBump);
            }
        }
    }

    RiskAssessment {
        action_name: action_name.to_string(),
        risk_class,
        side_effects: profile.side_effects.clone(),
        reason_codes,
        approval_recommended: risk_class >= approval_threshold,
        source,
    }
}
