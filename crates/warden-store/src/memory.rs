//! In-memory request store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use warden_audit::{AuditEntry, EntryContent, chain_hash, chain_seed};
use warden_core::{AuditEntryId, DecisionId, RequestId, Timestamp};

use crate::error::{StoreError, StoreResult};
use crate::store::RequestStore;
use crate::types::{
    ApprovalRequestRecord, DecisionRecord, NewAudit, NewDecision, NewRequest, RequestFilter,
    RequestStatus, RequestTimeline,
};

#[derive(Default)]
struct Inner {
    requests: HashMap<RequestId, ApprovalRequestRecord>,
    insertion: Vec<RequestId>,
    decisions: HashMap<RequestId, Vec<DecisionRecord>>,
    audit: HashMap<RequestId, Vec<AuditEntry>>,
}

/// A [`RequestStore`] held entirely in memory.
///
/// Same semantics as the SQLite store, no durability. Used by unit tests
/// and by embedders that do not want a database file.
#[derive(Default)]
pub struct MemoryRequestStore {
    inner: Mutex<Inner>,
}

impl MemoryRequestStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Storage("store mutex poisoned".to_string()))
    }
}

impl RequestStore for MemoryRequestStore {
    fn create_request(&self, new: NewRequest) -> StoreResult<ApprovalRequestRecord> {
        let mut inner = self.lock()?;
        if inner.requests.contains_key(&new.id) {
            return Err(StoreError::DuplicateRequest(new.id));
        }

        let now_ms = Timestamp::now().as_millis();
        let record = ApprovalRequestRecord {
            id: new.id,
            action_name: new.action_name,
            arguments_summary: new.arguments_summary,
            requester_session: new.requester_session,
            requester_role: new.requester_role,
            agent_id: new.agent_id,
            policy_id: new.policy_id,
            risk_class: new.risk_class,
            side_effects: new.side_effects,
            reason_codes: new.reason_codes,
            request_hash: new.request_hash,
            status: RequestStatus::Pending,
            created_at_ms: now_ms,
            expires_at_ms: now_ms.saturating_add(i64::try_from(new.timeout_ms).unwrap_or(i64::MAX)),
            updated_at_ms: now_ms,
        };
        inner.requests.insert(new.id, record.clone());
        inner.insertion.push(new.id);
        Ok(record)
    }

    fn get_request(&self, id: RequestId) -> StoreResult<ApprovalRequestRecord> {
        let inner = self.lock()?;
        inner.requests.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    fn list_requests(&self, filter: &RequestFilter) -> StoreResult<Vec<ApprovalRequestRecord>> {
        let inner = self.lock()?;
        let matches = |record: &ApprovalRequestRecord| {
            filter.status.is_none_or(|status| record.status == status)
                && filter
                    .session
                    .as_ref()
                    .is_none_or(|session| &record.requester_session == session)
                && filter
                    .agent
                    .as_ref()
                    .is_none_or(|agent| record.agent_id.as_ref() == Some(agent))
        };
        let records: Vec<_> = inner
            .insertion
            .iter()
            .rev()
            .filter_map(|id| inner.requests.get(id))
            .filter(|record| matches(record))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(records)
    }

    fn update_request_status(
        &self,
        id: RequestId,
        status: RequestStatus,
        now_ms: i64,
    ) -> StoreResult<ApprovalRequestRecord> {
        let mut inner = self.lock()?;
        let record = inner.requests.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if record.status != RequestStatus::Pending {
            return Err(StoreError::AlreadyResolved {
                status: record.status,
            });
        }
        record.status = status;
        record.updated_at_ms = now_ms;
        Ok(record.clone())
    }

    fn record_decision(&self, new: NewDecision) -> StoreResult<DecisionRecord> {
        let mut inner = self.lock()?;
        if !inner.requests.contains_key(&new.request_id) {
            return Err(StoreError::NotFound(new.request_id));
        }
        let record = DecisionRecord {
            id: DecisionId::new(),
            request_id: new.request_id,
            actor_session: new.actor_session,
            actor_role: new.actor_role,
            decision: new.decision,
            reason: new.reason,
            kind: new.kind,
            created_at_ms: Timestamp::now().as_millis(),
        };
        inner
            .decisions
            .entry(new.request_id)
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    fn record_audit(&self, new: NewAudit) -> StoreResult<AuditEntry> {
        let mut inner = self.lock()?;
        if !inner.requests.contains_key(&new.request_id) {
            return Err(StoreError::NotFound(new.request_id));
        }

        let previous = inner
            .audit
            .get(&new.request_id)
            .and_then(|entries| entries.last())
            .map_or_else(|| chain_seed(new.request_id), |entry| entry.hash);

        let timestamp = Timestamp::now();
        let content = EntryContent {
            event: &new.event,
            actor_session: &new.actor_session,
            actor_role: &new.actor_role,
            data: &new.data,
            timestamp_ms: timestamp.as_millis(),
        };
        let hash =
            chain_hash(previous, &content).map_err(|e| StoreError::Storage(e.to_string()))?;

        let entry = AuditEntry {
            id: AuditEntryId::new(),
            request_id: new.request_id,
            event: new.event,
            actor_session: new.actor_session,
            actor_role: new.actor_role,
            data: new.data,
            timestamp,
            hash,
        };
        inner
            .audit
            .entry(new.request_id)
            .or_default()
            .push(entry.clone());
        Ok(entry)
    }

    fn list_decisions(&self, id: RequestId) -> StoreResult<Vec<DecisionRecord>> {
        let inner = self.lock()?;
        Ok(inner.decisions.get(&id).cloned().unwrap_or_default())
    }

    fn list_audit(&self, id: RequestId) -> StoreResult<Vec<AuditEntry>> {
        let inner = self.lock()?;
        Ok(inner.audit.get(&id).cloned().unwrap_or_default())
    }

    fn request_with_timeline(&self, id: RequestId) -> StoreResult<RequestTimeline> {
        let inner = self.lock()?;
        let request = inner
            .requests
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))?;
        Ok(RequestTimeline {
            request,
            decisions: inner.decisions.get(&id).cloned().unwrap_or_default(),
            audit: inner.audit.get(&id).cloned().unwrap_or_default(),
        })
    }

    fn sweep_expired(&self, now_ms: i64) -> StoreResult<Vec<ApprovalRequestRecord>> {
        let mut inner = self.lock()?;
        let overdue: Vec<RequestId> = inner
            .insertion
            .iter()
            .filter(|id| {
                inner.requests.get(id).is_some_and(|record| {
                    record.status == RequestStatus::Pending && record.expires_at_ms <= now_ms
                })
            })
            .copied()
            .collect();

        let mut expired = Vec::with_capacity(overdue.len());
        for id in overdue {
            if let Some(record) = inner.requests.get_mut(&id) {
                record.status = RequestStatus::Expired;
                record.updated_at_ms = now_ms;
                expired.push(record.clone());
            }
        }
        Ok(expired)
    }
}
