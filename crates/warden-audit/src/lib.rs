//! Warden Audit - a hash-chained, tamper-evident ledger.
//!
//! Each approval request owns an independent chain. The first entry hashes
//! against a seed derived from the request id; every later entry hashes the
//! previous entry's hash together with its own content. Mutating any field
//! of any persisted entry makes that entry and every successor fail
//! verification.
//!
//! The ledger is append-only by construction: there is no API to edit or
//! remove an entry, only [`AuditChain::append`] and verification.
//!
//! # Example
//!
//! ```
//! use warden_audit::{AuditChain, AuditEvent, verify_entries};
//! use warden_core::RequestId;
//!
//! let request_id = RequestId::new();
//! let mut chain = AuditChain::new(request_id);
//! chain
//!     .append(
//!         AuditEvent::RequestCreated,
//!         "session-1",
//!         "agent",
//!         serde_json::json!({"tool": "exec"}),
//!     )
//!     .unwrap();
//!
//! let report = verify_entries(request_id, chain.entries());
//! assert!(report.valid);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod chain;
pub mod entry;
pub mod error;

pub use chain::{AuditChain, ChainIssue, ChainVerification, verify_entries};
pub use entry::{AuditEntry, AuditEvent, EntryContent, chain_hash, chain_seed};
pub use error::{AuditError, AuditResult};
