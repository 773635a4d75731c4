//! Warden Config - the host-facing `[approvals.tools]` configuration surface.
//!
//! Parses the TOML table operators actually write, validates it, and bridges
//! it into the [`PolicyConfig`](warden_policy::PolicyConfig) the decision
//! engine consumes.
//!
//! Misconfiguration never breaks a caller: [`ApprovalsConfig::sanitized`]
//! degrades an invalid config to disabled defaults with a warning, so a
//! typo'd threshold yields "gate nothing" rather than a crashed agent loop.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod loader;
pub mod types;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_from_path, load_from_str};
pub use types::{
    ApprovalsConfig, ApprovalsSection, RoutingConfig, RoutingMode, ToolApprovalsConfig,
};
