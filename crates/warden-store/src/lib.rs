//! Warden Store - durable persistence for approval requests.
//!
//! The [`RequestStore`] trait covers the full request lifecycle: creation,
//! the exactly-once terminal transition, decision records, the per-request
//! audit chain, and the expiry sweep. Reads never mutate: a pending request
//! past its deadline stays `pending` in the store until a resolve or sweep
//! realizes the expiry.
//!
//! Two implementations ship: [`SqliteRequestStore`] for durable deployments
//! and [`MemoryRequestStore`] for tests and embedding.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::arithmetic_side_effects))]

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod store;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryRequestStore;
pub use sqlite::SqliteRequestStore;
pub use store::RequestStore;
pub use types::{
    ApprovalRequestRecord, DecisionKind, DecisionOutcome, DecisionRecord, NewAudit, NewDecision,
    NewRequest, RequestFilter, RequestStatus, RequestTimeline,
};
