//! Warden Risk - action classification for the approval gateway.
//!
//! Maps an action name to a [`RiskProfile`] and combines the profile with
//! call parameters to produce a [`RiskAssessment`]:
//!
//! 1. **Resolution** ([`RiskResolver`]): plugin-declared profile first, then
//!    the built-in [`RiskCatalog`], else the fail-closed unknown fallback.
//! 2. **Evaluation** ([`evaluate`]): pure function applying the optional
//!    parameter bump and the approval threshold.
//!
//! Both steps are deterministic and free of I/O, so the same inputs always
//! produce the same assessment — a hard requirement for audit replay.
//!
//! # Example
//!
//! ```
//! use warden_core::RiskClass;
//! use warden_risk::{evaluate, RiskResolver, DEFAULT_APPROVAL_THRESHOLD};
//!
//! let resolver = RiskResolver::new();
//! let resolution = resolver.resolve("exec", None);
//! let params = serde_json::json!({"command": "ls -la"});
//! let assessment = evaluate(
//!     "exec",
//!     resolution.profile.as_ref(),
//!     &params,
//!     resolution.source,
//!     DEFAULT_APPROVAL_THRESHOLD,
//! );
//! assert_eq!(assessment.risk_class, RiskClass::R3);
//! assert!(assessment.approval_recommended);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod catalog;
pub mod evaluate;
pub mod profile;
pub mod resolver;

pub use catalog::RiskCatalog;
pub use evaluate::{DEFAULT_APPROVAL_THRESHOLD, RiskAssessment, evaluate};
pub use profile::{ParamBump, RiskProfile, RiskSource};
pub use resolver::{ProfileRegistry, Resolution, RiskResolver};
