//! Risk classes, side-effect tags, reason codes, and timestamps.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordinal risk classification for a proposed action.
///
/// `R0` is read-only / no effect; `R4` is highly destructive. The derived
/// `Ord` gives the strict total order the policy engine compares against,
/// and `Ord::max` is the only combination operation the evaluator needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskClass {
    /// Read-only, no real-world effect.
    R0,
    /// Reversible local effect.
    R1,
    /// External effect that is recoverable.
    R2,
    /// External effect that is hard to recover from.
    R3,
    /// Highly destructive or irreversible.
    R4,
}

impl RiskClass {
    /// All classes in ascending order.
    pub const ALL: [Self; 5] = [Self::R0, Self::R1, Self::R2, Self::R3, Self::R4];

    /// The fail-closed class assigned to unclassifiable actions.
    pub const UNKNOWN_FALLBACK: Self = Self::R3;

    /// Whether this class meets an approval threshold.
    #[must_use]
    pub fn requires_approval_at(self, threshold: Self) -> bool {
        self >= threshold
    }

    /// The wire string (`"R0"` .. `"R4"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::R0 => "R0",
            Self::R1 => "R1",
            Self::R2 => "R2",
            Self::R3 => "R3",
            Self::R4 => "R4",
        }
    }
}

impl fmt::Display for RiskClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskClass {
    type Err = ParseRiskClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "R0" | "r0" => Ok(Self::R0),
            "R1" | "r1" => Ok(Self::R1),
            "R2" | "r2" => Ok(Self::R2),
            "R3" | "r3" => Ok(Self::R3),
            "R4" | "r4" => Ok(Self::R4),
            _ => Err(ParseRiskClassError(s.to_string())),
        }
    }
}

/// Error returned when a string is not a valid risk class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRiskClassError(String);

impl fmt::Display for ParseRiskClassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid risk class '{}'", self.0)
    }
}

impl std::error::Error for ParseRiskClassError {}

/// Category of real-world consequence an action may have.
///
/// The set is closed: unknown wire strings deserialize to
/// [`SideEffect::Custom`] rather than silently passing as a known tag, so
/// schema checks can flag them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SideEffect {
    /// Data leaves the machine over the network.
    NetworkEgress,
    /// Files are created or modified.
    FilesystemWrite,
    /// A subprocess is spawned.
    ProcessSpawn,
    /// A message is sent to a human or external channel.
    MessageSend,
    /// Data is deleted.
    DataDelete,
    /// Configuration is mutated.
    ConfigMutation,
    /// Money moves or billing state changes.
    BillingMutation,
    /// Something is deployed to a live environment.
    Deployment,
    /// Host or system state changes (services, power, users).
    SystemState,
    /// An effect outside the closed set. Carried verbatim so audit records
    /// stay faithful; policy treats it as unclassified.
    Custom(String),
}

impl SideEffect {
    /// The snake_case wire string for this tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::NetworkEgress => "network_egress",
            Self::FilesystemWrite => "filesystem_write",
            Self::ProcessSpawn => "process_spawn",
            Self::MessageSend => "message_send",
            Self::DataDelete => "data_delete",
            Self::ConfigMutation => "config_mutation",
            Self::BillingMutation => "billing_mutation",
            Self::Deployment => "deployment",
            Self::SystemState => "system_state",
            Self::Custom(s) => s,
        }
    }

    /// Whether this tag is outside the closed set.
    #[must_use]
    pub const fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl From<String> for SideEffect {
    fn from(s: String) -> Self {
        match s.as_str() {
            "network_egress" => Self::NetworkEgress,
            "filesystem_write" => Self::FilesystemWrite,
            "process_spawn" => Self::ProcessSpawn,
            "message_send" => Self::MessageSend,
            "data_delete" => Self::DataDelete,
            "config_mutation" => Self::ConfigMutation,
            "billing_mutation" => Self::BillingMutation,
            "deployment" => Self::Deployment,
            "system_state" => Self::SystemState,
            _ => Self::Custom(s),
        }
    }
}

impl From<SideEffect> for String {
    fn from(effect: SideEffect) -> Self {
        effect.as_str().to_string()
    }
}

impl fmt::Display for SideEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable machine-readable code explaining a classification or policy
/// outcome.
///
/// These strings are part of the wire contract: tests and observability
/// assert on them, so variants are never renamed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReasonCode {
    /// A parameter bump elevated the risk class above the profile base.
    ParameterBump,
    /// No profile was found for the action; fail-closed fallback applied.
    UnknownToolProfile,
    /// Policy mode is `off`; everything is allowed.
    ModeOff,
    /// Risk class met the deny threshold.
    PolicyDeny,
    /// Policy mode is `always`; all non-denied actions need sign-off.
    ModeAlways,
    /// Risk class met the adaptive approval threshold.
    PolicyThreshold,
    /// An external-write side effect triggered approval.
    PolicyExternalWrite,
    /// A messaging-send side effect triggered approval.
    PolicyMessageSend,
    /// No rule matched; the action is allowed.
    PolicyAllow,
    /// A code outside the closed set.
    Custom(String),
}

impl ReasonCode {
    /// The snake_case wire string for this code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ParameterBump => "parameter_bump",
            Self::UnknownToolProfile => "unknown_tool_profile",
            Self::ModeOff => "mode_off",
            Self::PolicyDeny => "policy_deny",
            Self::ModeAlways => "mode_always",
            Self::PolicyThreshold => "policy_threshold",
            Self::PolicyExternalWrite => "policy_external_write",
            Self::PolicyMessageSend => "policy_message_send",
            Self::PolicyAllow => "policy_allow",
            Self::Custom(s) => s,
        }
    }
}

impl From<String> for ReasonCode {
    fn from(s: String) -> Self {
        match s.as_str() {
            "parameter_bump" => Self::ParameterBump,
            "unknown_tool_profile" => Self::UnknownToolProfile,
            "mode_off" => Self::ModeOff,
            "policy_deny" => Self::PolicyDeny,
            "mode_always" => Self::ModeAlways,
            "policy_threshold" => Self::PolicyThreshold,
            "policy_external_write" => Self::PolicyExternalWrite,
            "policy_message_send" => Self::PolicyMessageSend,
            "policy_allow" => Self::PolicyAllow,
            _ => Self::Custom(s),
        }
    }
}

impl From<ReasonCode> for String {
    fn from(code: ReasonCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timestamp wrapper for consistent handling throughout Warden.
///
/// Wire types and the store speak epoch milliseconds; this wrapper keeps
/// the conversion in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Get the current timestamp.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create a timestamp from epoch milliseconds.
    ///
    /// Out-of-range values clamp to the representable boundary rather than
    /// failing, since stored timestamps were validated at write time.
    #[must_use]
    pub fn from_millis(ms: i64) -> Self {
        match Utc.timestamp_millis_opt(ms) {
            chrono::LocalResult::Single(dt) => Self(dt),
            _ => Self(DateTime::<Utc>::MIN_UTC),
        }
    }

    /// Epoch milliseconds.
    #[must_use]
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Check if this timestamp is in the past.
    #[must_use]
    pub fn is_past(&self) -> bool {
        self.0 < Utc::now()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%S%.3fZ"))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_class_total_order() {
        for (i, a) in RiskClass::ALL.iter().enumerate() {
            for (j, b) in RiskClass::ALL.iter().enumerate() {
                assert_eq!(a.cmp(b), i.cmp(&j));
            }
        }
    }

    #[test]
    fn test_risk_class_max_commutative_idempotent() {
        for a in RiskClass::ALL {
            assert_eq!(a.max(a), a);
            for b in RiskClass::ALL {
                assert_eq!(a.max(b), b.max(a));
            }
        }
    }

    #[test]
    fn test_requires_approval_at() {
        assert!(RiskClass::R3.requires_approval_at(RiskClass::R3));
        assert!(RiskClass::R4.requires_approval_at(RiskClass::R3));
        assert!(!RiskClass::R2.requires_approval_at(RiskClass::R3));
    }

    #[test]
    fn test_risk_class_round_trip() {
        for class in RiskClass::ALL {
            assert_eq!(class.as_str().parse::<RiskClass>().unwrap(), class);
        }
        assert!("R5".parse::<RiskClass>().is_err());
        assert!("".parse::<RiskClass>().is_err());
    }

    #[test]
    fn test_risk_class_serde() {
        let json = serde_json::to_string(&RiskClass::R3).unwrap();
        assert_eq!(json, "\"R3\"");
        let back: RiskClass = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RiskClass::R3);
    }

    #[test]
    fn test_side_effect_wire_strings() {
        assert_eq!(SideEffect::NetworkEgress.as_str(), "network_egress");
        assert_eq!(SideEffect::DataDelete.as_str(), "data_delete");
        assert_eq!(
            SideEffect::from(String::from("filesystem_write")),
            SideEffect::FilesystemWrite
        );
    }

    #[test]
    fn test_side_effect_unknown_is_custom() {
        let effect = SideEffect::from(String::from("quantum_flux"));
        assert!(effect.is_custom());
        assert_eq!(effect.as_str(), "quantum_flux");
    }

    #[test]
    fn test_side_effect_serde_round_trip() {
        let effects = vec![SideEffect::ProcessSpawn, SideEffect::Custom("x".into())];
        let json = serde_json::to_string(&effects).unwrap();
        assert_eq!(json, "[\"process_spawn\",\"x\"]");
        let back: Vec<SideEffect> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, effects);
    }

    #[test]
    fn test_reason_code_round_trip() {
        let code = ReasonCode::from(String::from("parameter_bump"));
        assert_eq!(code, ReasonCode::ParameterBump);
        assert_eq!(
            ReasonCode::from(String::from("something_else")),
            ReasonCode::Custom("something_else".to_string())
        );
    }

    #[test]
    fn test_timestamp_millis_round_trip() {
        let ts = Timestamp::from_millis(1_700_000_000_123);
        assert_eq!(ts.as_millis(), 1_700_000_000_123);
    }

    #[test]
    fn test_timestamp_now_is_not_past_of_itself() {
        let ts = Timestamp::now();
        assert!(ts.as_millis() > 0);
    }
}
