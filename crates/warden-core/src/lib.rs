//! Warden Core - shared vocabulary for the approval gateway.
//!
//! This crate defines the types every other Warden crate speaks:
//!
//! - [`RiskClass`]: the ordinal severity scale (`R0` lowest .. `R4` highest)
//! - [`SideEffect`]: tags describing real-world consequences of an action
//! - [`ReasonCode`]: stable machine-readable codes explaining a classification
//!   or policy outcome
//! - [`RequestId`] / [`DecisionId`] / [`AuditEntryId`]: identifiers for the
//!   approval lifecycle
//! - [`Timestamp`]: UTC timestamps with millisecond accessors
//! - [`ContentHash`]: BLAKE3 digests used for request hashing and audit
//!   chain linking
//!
//! # Example
//!
//! ```
//! use warden_core::{RiskClass, SideEffect};
//!
//! // Risk classes are a strict total order.
//! assert!(RiskClass::R0 < RiskClass::R4);
//! assert_eq!(RiskClass::R2.max(RiskClass::R3), RiskClass::R3);
//!
//! // Side effects round-trip through their wire strings.
//! assert_eq!(SideEffect::NetworkEgress.as_str(), "network_egress");
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod hash;
pub mod ids;
pub mod types;

pub use hash::ContentHash;
pub use ids::{AuditEntryId, DecisionId, RequestId};
pub use types::{ReasonCode, RiskClass, SideEffect, Timestamp};
