//! Append-only chain and verification.

use tracing::debug;

use warden_core::{AuditEntryId, ContentHash, RequestId, Timestamp};

use crate::entry::{AuditEntry, AuditEvent, EntryContent, chain_hash, chain_seed};
use crate::error::AuditResult;

/// An in-memory audit chain for a single request.
///
/// The head hash starts at [`chain_seed`] and advances with every append.
/// Persisted stores keep entries in their own tables and verify them with
/// [`verify_entries`]; this type covers embedded use and serves as the
/// reference for what a correct chain looks like.
#[derive(Debug)]
pub struct AuditChain {
    request_id: RequestId,
    head: ContentHash,
    entries: Vec<AuditEntry>,
}

impl AuditChain {
    /// Create an empty chain for a request.
    #[must_use]
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            head: chain_seed(request_id),
            entries: Vec::new(),
        }
    }

    /// Append an event, computing its hash from the current head.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry content cannot be serialized.
    pub fn append(
        &mut self,
        event: AuditEvent,
        actor_session: &str,
        actor_role: &str,
        data: serde_json::Value,
    ) -> AuditResult<AuditEntry> {
        let timestamp = Timestamp::now();
        let content = EntryContent {
            event: &event,
            actor_session,
            actor_role,
            data: &data,
            timestamp_ms: timestamp.as_millis(),
        };
        let hash = chain_hash(self.head, &content)?;

        let entry = AuditEntry {
            id: AuditEntryId::new(),
            request_id: self.request_id,
            event,
            actor_session: actor_session.to_string(),
            actor_role: actor_role.to_string(),
            data,
            timestamp,
            hash,
        };
        self.head = hash;
        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// The request this chain belongs to.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// The current head hash.
    #[must_use]
    pub fn head(&self) -> ContentHash {
        self.head
    }

    /// All entries in append order.
    #[must_use]
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Verify this chain's own entries.
    #[must_use]
    pub fn verify(&self) -> ChainVerification {
        verify_entries(self.request_id, &self.entries)
    }
}

/// A problem found during chain verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainIssue {
    /// An entry's stored hash does not match the recomputed chain value.
    HashMismatch {
        /// Position in the chain, zero-based.
        index: usize,
        /// The offending entry.
        entry_id: AuditEntryId,
    },
    /// An entry belongs to a different request than the chain under review.
    ForeignEntry {
        /// Position in the chain, zero-based.
        index: usize,
        /// The offending entry.
        entry_id: AuditEntryId,
    },
    /// An entry's content could not be serialized for hashing.
    Unhashable {
        /// Position in the chain, zero-based.
        index: usize,
        /// The offending entry.
        entry_id: AuditEntryId,
    },
}

/// The result of verifying a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainVerification {
    /// Whether every entry checked out.
    pub valid: bool,
    /// Every problem found, in chain order.
    pub issues: Vec<ChainIssue>,
}

/// Verify a sequence of entries against the chain rules for `request_id`.
///
/// The running hash continues from the *recomputed* value rather than the
/// stored one, so a mutated entry taints every successor: the mutation
/// shows up once where it happened and again in every entry chained after
/// it. An empty sequence is trivially valid.
#[must_use]
pub fn verify_entries(request_id: RequestId, entries: &[AuditEntry]) -> ChainVerification {
    let mut issues = Vec::new();
    let mut running = chain_seed(request_id);

    for (index, entry) in entries.iter().enumerate() {
        if entry.request_id != request_id {
            issues.push(ChainIssue::ForeignEntry {
                index,
                entry_id: entry.id,
            });
        }

        match chain_hash(running, &entry.content()) {
            Ok(expected) => {
                if expected != entry.hash {
                    issues.push(ChainIssue::HashMismatch {
                        index,
                        entry_id: entry.id,
                    });
                }
                running = expected;
            },
            Err(_) => {
                issues.push(ChainIssue::Unhashable {
                    index,
                    entry_id: entry.id,
                });
            },
        }
    }

    let valid = issues.is_empty();
    if !valid {
        debug!(
            request_id = %request_id,
            issue_count = issues.len(),
            "audit chain verification failed"
        );
    }
    ChainVerification { valid, issues }
}
