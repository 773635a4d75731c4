//! Warden Policy - the gate between a risk assessment and an action.
//!
//! [`decide`] maps a [`RiskAssessment`](warden_risk::RiskAssessment) and an
//! optional [`PolicyConfig`] to a [`PolicyVerdict`]. It is a pure function
//! with a fixed, first-match-wins rule order, so the same assessment and
//! config always yield the same verdict and reason code.
//!
//! # Rule Order
//!
//! 1. Config absent or `enabled = false` -> `Allow`
//! 2. Mode `Off` -> `Allow` (`mode_off`)
//! 3. Deny threshold met -> `Deny` (`policy_deny`) — outranks every approval rule
//! 4. Mode `Always` -> `ApprovalRequired` (`mode_always`)
//! 5. Adaptive approval threshold met -> `ApprovalRequired` (`policy_threshold`)
//! 6. External-write side effect + flag -> `ApprovalRequired` (`policy_external_write`)
//! 7. Message-send side effect + flag -> `ApprovalRequired` (`policy_message_send`)
//! 8. Otherwise -> `Allow` (`policy_allow`)

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod engine;

pub use engine::{Decision, PolicyConfig, PolicyMode, PolicyRules, PolicyVerdict, decide};
