//! Warden Gateway - the approval protocol surface.
//!
//! This crate ties the rest of Warden together. An embedding host hands it
//! a [`RequestStore`](warden_store::RequestStore) and gets:
//!
//! - The wire types and method names of the approval protocol
//!   ([`ToolApprovalRequestParams`], [`ToolApprovalResolveParams`], ...)
//! - [`ApprovalGateway`]: request creation, waiters, resolution, expiry,
//!   and the lifecycle event broadcast
//! - [`gate_action`]: the one-call path that classifies a proposed action,
//!   applies policy, and suspends on human approval when required
//! - [`ApprovalPrompter`]: the seam chat frontends implement to put a
//!   prompt in front of a human
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use warden_gateway::{ApprovalGateway, GateInput, gate_action};
//! use warden_risk::RiskResolver;
//! use warden_store::MemoryRequestStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let gateway = ApprovalGateway::new(Arc::new(MemoryRequestStore::new()));
//! let resolver = RiskResolver::new();
//!
//! // No policy configured: everything passes straight through.
//! let pass = gate_action(
//!     &gateway,
//!     &resolver,
//!     None,
//!     GateInput {
//!         action_name: "read_file".to_string(),
//!         declaring_plugin: None,
//!         params: serde_json::json!({"path": "/tmp/notes.txt"}),
//!         arguments_summary: "path=/tmp/notes.txt".to_string(),
//!         session_key: "session-1".to_string(),
//!         agent_id: None,
//!         policy_version: None,
//!     },
//! )
//! .await
//! .unwrap();
//! assert!(pass.request_id.is_none());
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod gate;
pub mod gateway;
pub mod hash;
pub mod prompter;
pub mod wire;

pub use error::{BlockCode, GatewayError, GatewayResult};
pub use gate::{GateInput, GatePass, gate_action};
pub use gateway::{ApprovalGateway, AwaitedDecision, GatewayEvent, Resolved};
pub use hash::{REQUEST_HASH_DOMAIN, compute_request_hash};
pub use prompter::{ApprovalPrompter, PromptOutcome, PromptRequest};
pub use wire::{
    METHOD_APPROVAL_REQUEST, METHOD_APPROVAL_RESOLVE, METHOD_APPROVALS_GET, PendingApprovals,
    ResolveDecision, ToolApprovalRequestParams, ToolApprovalRequested, ToolApprovalResolveParams,
};
