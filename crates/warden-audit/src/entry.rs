//! Audit entry type and chain hash computation.

use serde::{Deserialize, Serialize};
use std::fmt;

use warden_core::{AuditEntryId, ContentHash, RequestId, Timestamp};

use crate::error::AuditResult;

/// Domain tag for audit chain hashing.
const AUDIT_DOMAIN: &str = "warden.audit.v1";

/// Lifecycle events recorded on a request's audit chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuditEvent {
    /// The request was created and is pending.
    RequestCreated,
    /// A human approved the request.
    DecisionApproved,
    /// A human denied the request.
    DecisionDenied,
    /// The request expired without a decision.
    RequestExpired,
    /// An event outside the closed set.
    Custom(String),
}

impl AuditEvent {
    /// The dotted wire string for this event.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::RequestCreated => "request.created",
            Self::DecisionApproved => "decision.approved",
            Self::DecisionDenied => "decision.denied",
            Self::RequestExpired => "request.expired",
            Self::Custom(s) => s,
        }
    }
}

impl From<String> for AuditEvent {
    fn from(s: String) -> Self {
        match s.as_str() {
            "request.created" => Self::RequestCreated,
            "decision.approved" => Self::DecisionApproved,
            "decision.denied" => Self::DecisionDenied,
            "request.expired" => Self::RequestExpired,
            _ => Self::Custom(s),
        }
    }
}

impl From<AuditEvent> for String {
    fn from(event: AuditEvent) -> Self {
        event.as_str().to_string()
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry on a request's audit chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry identifier.
    pub id: AuditEntryId,
    /// The request whose chain this entry belongs to.
    pub request_id: RequestId,
    /// What happened.
    pub event: AuditEvent,
    /// Session of the actor that caused the event.
    pub actor_session: String,
    /// Role of the actor (`agent`, `human`, `system`).
    pub actor_role: String,
    /// Structured event payload.
    pub data: serde_json::Value,
    /// When the event happened.
    pub timestamp: Timestamp,
    /// Chain hash: previous hash folded with this entry's content.
    pub hash: ContentHash,
}

impl AuditEntry {
    /// The hashable content of this entry, excluding `id` and `hash`.
    ///
    /// Ids are random and carry no event information; including them would
    /// make the chain depend on values an attacker could pick freely.
    #[must_use]
    pub fn content(&self) -> EntryContent<'_> {
        EntryContent {
            event: &self.event,
            actor_session: &self.actor_session,
            actor_role: &self.actor_role,
            data: &self.data,
            timestamp_ms: self.timestamp.as_millis(),
        }
    }
}

/// The canonical hashable view of an entry.
///
/// Field order is fixed; `serde_json` emits struct fields in declaration
/// order, so the byte encoding is stable across runs.
#[derive(Debug, Serialize)]
pub struct EntryContent<'a> {
    /// What happened.
    pub event: &'a AuditEvent,
    /// Actor session.
    pub actor_session: &'a str,
    /// Actor role.
    pub actor_role: &'a str,
    /// Event payload.
    pub data: &'a serde_json::Value,
    /// Event time in epoch milliseconds.
    pub timestamp_ms: i64,
}

/// The fixed chain seed for a request: a domain-separated hash of its id.
///
/// Seeding with the request id makes the first entry's hash depend on which
/// request the chain belongs to, so chains cannot be swapped between
/// requests.
#[must_use]
pub fn chain_seed(request_id: RequestId) -> ContentHash {
    ContentHash::hash_with_domain(AUDIT_DOMAIN, request_id.0.as_bytes())
}

/// Fold the previous hash with an entry's content.
///
/// # Errors
///
/// Returns an error if the content cannot be serialized.
pub fn chain_hash(previous: ContentHash, content: &EntryContent<'_>) -> AuditResult<ContentHash> {
    let mut bytes = Vec::with_capacity(64);
    bytes.extend_from_slice(previous.as_bytes());
    bytes.extend_from_slice(&serde_json::to_vec(content)?);
    Ok(ContentHash::hash_with_domain(AUDIT_DOMAIN, &bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(event: AuditEvent, data: serde_json::Value) -> AuditEntry {
        AuditEntry {
            id: AuditEntryId::new(),
            request_id: RequestId::new(),
            event,
            actor_session: "session-1".to_string(),
            actor_role: "agent".to_string(),
            data,
            timestamp: Timestamp::from_millis(1_700_000_000_000),
            hash: ContentHash::zero(),
        }
    }

    #[test]
    fn test_event_wire_strings() {
        assert_eq!(AuditEvent::RequestCreated.as_str(), "request.created");
        assert_eq!(
            AuditEvent::from(String::from("decision.denied")),
            AuditEvent::DecisionDenied
        );
        assert!(matches!(
            AuditEvent::from(String::from("weird.event")),
            AuditEvent::Custom(_)
        ));
    }

    #[test]
    fn test_seed_depends_on_request_id() {
        let a = chain_seed(RequestId::new());
        let b = chain_seed(RequestId::new());
        assert_ne!(a, b);
    }

    #[test]
    fn test_seed_is_stable() {
        let id = RequestId::new();
        assert_eq!(chain_seed(id), chain_seed(id));
    }

    #[test]
    fn test_chain_hash_is_deterministic() {
        let e = entry(AuditEvent::RequestCreated, serde_json::json!({"a": 1}));
        let h1 = chain_hash(ContentHash::zero(), &e.content()).unwrap();
        let h2 = chain_hash(ContentHash::zero(), &e.content()).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_chain_hash_changes_with_any_field() {
        let base = entry(AuditEvent::RequestCreated, serde_json::json!({"a": 1}));
        let seed = ContentHash::hash(b"seed");
        let original = chain_hash(seed, &base.content()).unwrap();

        let mut mutated = base.clone();
        mutated.event = AuditEvent::DecisionApproved;
        assert_ne!(chain_hash(seed, &mutated.content()).unwrap(), original);

        let mut mutated = base.clone();
        mutated.data = serde_json::json!({"a": 2});
        assert_ne!(chain_hash(seed, &mutated.content()).unwrap(), original);

        let mut mutated = base.clone();
        mutated.timestamp = Timestamp::from_millis(1);
        assert_ne!(chain_hash(seed, &mutated.content()).unwrap(), original);

        let mut mutated = base;
        mutated.actor_role = "human".to_string();
        assert_ne!(chain_hash(seed, &mutated.content()).unwrap(), original);
    }

    #[test]
    fn test_chain_hash_changes_with_previous() {
        let e = entry(AuditEvent::RequestCreated, serde_json::json!({}));
        let a = chain_hash(ContentHash::hash(b"x"), &e.content()).unwrap();
        let b = chain_hash(ContentHash::hash(b"y"), &e.content()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_id_does_not_affect_hash() {
        let mut a = entry(AuditEvent::RequestCreated, serde_json::json!({}));
        let mut b = a.clone();
        a.id = AuditEntryId::new();
        b.id = AuditEntryId::new();
        let seed = ContentHash::zero();
        assert_eq!(
            chain_hash(seed, &a.content()).unwrap(),
            chain_hash(seed, &b.content()).unwrap()
        );
    }
}
