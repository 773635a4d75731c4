//! SQLite-backed request store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use tracing::{debug, info};

use warden_audit::{AuditEntry, AuditEvent, EntryContent, chain_hash, chain_seed};
use warden_core::{
    AuditEntryId, ContentHash, DecisionId, ReasonCode, RequestId, RiskClass, SideEffect, Timestamp,
};

use crate::error::{StoreError, StoreResult};
use crate::store::RequestStore;
use crate::types::{
    ApprovalRequestRecord, DecisionKind, DecisionOutcome, DecisionRecord, NewAudit, NewDecision,
    NewRequest, RequestFilter, RequestStatus, RequestTimeline,
};

/// Busy timeout for concurrent access, in milliseconds.
const BUSY_TIMEOUT_MS: u64 = 5_000;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS approval_requests (
        id TEXT PRIMARY KEY,
        action_name TEXT NOT NULL,
        arguments_summary TEXT NOT NULL,
        requester_session TEXT NOT NULL,
        requester_role TEXT NOT NULL,
        agent_id TEXT,
        policy_id TEXT,
        risk_class TEXT NOT NULL,
        side_effects TEXT NOT NULL,
        reason_codes TEXT NOT NULL,
        request_hash TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at_ms INTEGER NOT NULL,
        expires_at_ms INTEGER NOT NULL,
        updated_at_ms INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_requests_status
        ON approval_requests(status, created_at_ms);

    CREATE TABLE IF NOT EXISTS approval_decisions (
        id TEXT PRIMARY KEY,
        request_id TEXT NOT NULL REFERENCES approval_requests(id),
        actor_session TEXT NOT NULL,
        actor_role TEXT NOT NULL,
        decision TEXT NOT NULL,
        reason TEXT,
        kind TEXT NOT NULL,
        created_at_ms INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_decisions_request
        ON approval_decisions(request_id, created_at_ms);

    CREATE TABLE IF NOT EXISTS approval_audit (
        id TEXT PRIMARY KEY,
        request_id TEXT NOT NULL REFERENCES approval_requests(id),
        event TEXT NOT NULL,
        actor_session TEXT NOT NULL,
        actor_role TEXT NOT NULL,
        data TEXT NOT NULL,
        timestamp_ms INTEGER NOT NULL,
        hash TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_audit_request
        ON approval_audit(request_id);
";

const REQUEST_COLUMNS: &str = "id, action_name, arguments_summary, requester_session, \
     requester_role, agent_id, policy_id, risk_class, side_effects, reason_codes, \
     request_hash, status, created_at_ms, expires_at_ms, updated_at_ms";

/// A [`RequestStore`] backed by SQLite.
///
/// One connection behind a mutex: audit appends for a request read the
/// previous head and insert the new entry under the same lock, so chains
/// never interleave.
pub struct SqliteRequestStore {
    conn: Mutex<Connection>,
}

impl SqliteRequestStore {
    /// Open (or create) a store at the given path.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the database cannot be opened or migrated.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init(&conn)?;
        info!(path = %path.display(), "opened approval request store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory store. State is lost on drop; meant for tests.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the database cannot be initialized.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init(conn: &Connection) -> StoreResult<()> {
        // journal_mode returns the resulting mode as a row; in-memory
        // databases report "memory" instead of "wal", which is fine.
        conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))?;
        conn.execute_batch(&format!(
            "PRAGMA foreign_keys=ON; PRAGMA busy_timeout={BUSY_TIMEOUT_MS};"
        ))?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Storage("connection mutex poisoned".to_string()))
    }

    fn fetch_request(conn: &Connection, id: RequestId) -> StoreResult<ApprovalRequestRecord> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM approval_requests WHERE id = ?1");
        let row: Option<RequestRow> = conn
            .query_row(&sql, params![id.0.to_string()], RequestRow::from_row)
            .optional()?;
        row.map_or(Err(StoreError::NotFound(id)), RequestRow::into_record)
    }

    fn fetch_status(conn: &Connection, id: RequestId) -> StoreResult<Option<RequestStatus>> {
        let status: Option<String> = conn
            .query_row(
                "SELECT status FROM approval_requests WHERE id = ?1",
                params![id.0.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match status {
            None => Ok(None),
            Some(s) => RequestStatus::parse(&s)
                .map(Some)
                .ok_or_else(|| StoreError::Storage(format!("unknown stored status '{s}'"))),
        }
    }

    /// Transition one request out of `Pending`, inside `conn`.
    fn transition(
        conn: &Connection,
        id: RequestId,
        status: RequestStatus,
        now_ms: i64,
    ) -> StoreResult<ApprovalRequestRecord> {
        let changed = conn.execute(
            "UPDATE approval_requests SET status = ?1, updated_at_ms = ?2 \
             WHERE id = ?3 AND status = 'pending'",
            params![status.as_str(), now_ms, id.0.to_string()],
        )?;
        if changed == 0 {
            return match Self::fetch_status(conn, id)? {
                None => Err(StoreError::NotFound(id)),
                Some(current) => Err(StoreError::AlreadyResolved { status: current }),
            };
        }
        Self::fetch_request(conn, id)
    }

    fn append_audit(conn: &Connection, new: NewAudit) -> StoreResult<AuditEntry> {
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM approval_requests WHERE id = ?1",
                params![new.request_id.0.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::NotFound(new.request_id));
        }

        let previous: Option<String> = conn
            .query_row(
                "SELECT hash FROM approval_audit WHERE request_id = ?1 \
                 ORDER BY rowid DESC LIMIT 1",
                params![new.request_id.0.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let previous = match previous {
            Some(hex) => ContentHash::from_hex(&hex)
                .map_err(|e| StoreError::Storage(format!("corrupt stored audit hash: {e}")))?,
            None => chain_seed(new.request_id),
        };

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
        conn.execute(
            "INSERT INTO approval_audit \
             (id, request_id, event, actor_session, actor_role, data, timestamp_ms, hash) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.id.0.to_string(),
                entry.request_id.0.to_string(),
                entry.event.as_str(),
                entry.actor_session,
                entry.actor_role,
                entry.data.to_string(),
                entry.timestamp.as_millis(),
                entry.hash.to_hex(),
            ],
        )?;
        Ok(entry)
    }
}

impl RequestStore for SqliteRequestStore {
    fn create_request(&self, new: NewRequest) -> StoreResult<ApprovalRequestRecord> {
        let conn = self.lock()?;
        let now_ms = Timestamp::now().as_millis();
        let expires_at_ms = now_ms.saturating_add(i64::try_from(new.timeout_ms).unwrap_or(i64::MAX));

        let side_effects = serde_json::to_string(&new.side_effects)
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let reason_codes = serde_json::to_string(&new.reason_codes)
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        let result = conn.execute(
            "INSERT INTO approval_requests \
             (id, action_name, arguments_summary, requester_session, requester_role, \
              agent_id, policy_id, risk_class, side_effects, reason_codes, request_hash, \
              status, created_at_ms, expires_at_ms, updated_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                new.id.0.to_string(),
                new.action_name,
                new.arguments_summary,
                new.requester_session,
                new.requester_role,
                new.agent_id,
                new.policy_id,
                new.risk_class.as_str(),
                side_effects,
                reason_codes,
                new.request_hash.to_hex(),
                RequestStatus::Pending.as_str(),
                now_ms,
                expires_at_ms,
                now_ms,
            ],
        );
        match result {
            Ok(_) => {},
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::DuplicateRequest(new.id));
            },
            Err(e) => return Err(e.into()),
        }
        debug!(request_id = %new.id, action = %new.action_name, "created approval request");
        Self::fetch_request(&conn, new.id)
    }

    fn get_request(&self, id: RequestId) -> StoreResult<ApprovalRequestRecord> {
        let conn = self.lock()?;
        Self::fetch_request(&conn, id)
    }

    fn list_requests(&self, filter: &RequestFilter) -> StoreResult<Vec<ApprovalRequestRecord>> {
        let conn = self.lock()?;
        let mut sql = format!("SELECT {REQUEST_COLUMNS} FROM approval_requests WHERE 1=1");
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            args.push(Box::new(status.as_str().to_string()));
        }
        if let Some(session) = &filter.session {
            sql.push_str(" AND requester_session = ?");
            args.push(Box::new(session.clone()));
        }
        if let Some(agent) = &filter.agent {
            sql.push_str(" AND agent_id = ?");
            args.push(Box::new(agent.clone()));
        }
        sql.push_str(" ORDER BY created_at_ms DESC, rowid DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            args.push(Box::new(i64::try_from(limit).unwrap_or(i64::MAX)));
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(args.iter().map(AsRef::as_ref)),
            RequestRow::from_row,
        )?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }

    fn update_request_status(
        &self,
        id: RequestId,
        status: RequestStatus,
        now_ms: i64,
    ) -> StoreResult<ApprovalRequestRecord> {
        let conn = self.lock()?;
        Self::transition(&conn, id, status, now_ms)
    }

    fn record_decision(&self, new: NewDecision) -> StoreResult<DecisionRecord> {
        let conn = self.lock()?;
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM approval_requests WHERE id = ?1",
                params![new.request_id.0.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
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
        conn.execute(
            "INSERT INTO approval_decisions \
             (id, request_id, actor_session, actor_role, decision, reason, kind, created_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id.0.to_string(),
                record.request_id.0.to_string(),
                record.actor_session,
                record.actor_role,
                record.decision.as_str(),
                record.reason,
                record.kind.as_str(),
                record.created_at_ms,
            ],
        )?;
        Ok(record)
    }

    fn record_audit(&self, new: NewAudit) -> StoreResult<AuditEntry> {
        let conn = self.lock()?;
        Self::append_audit(&conn, new)
    }

    fn list_decisions(&self, id: RequestId) -> StoreResult<Vec<DecisionRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, request_id, actor_session, actor_role, decision, reason, kind, \
             created_at_ms FROM approval_decisions WHERE request_id = ?1 \
             ORDER BY created_at_ms ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![id.0.to_string()], DecisionRow::from_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }

    fn list_audit(&self, id: RequestId) -> StoreResult<Vec<AuditEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, request_id, event, actor_session, actor_role, data, timestamp_ms, hash \
             FROM approval_audit WHERE request_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![id.0.to_string()], AuditRow::from_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_entry()?);
        }
        Ok(entries)
    }

    fn request_with_timeline(&self, id: RequestId) -> StoreResult<RequestTimeline> {
        let request = self.get_request(id)?;
        let decisions = self.list_decisions(id)?;
        let audit = self.list_audit(id)?;
        Ok(RequestTimeline {
            request,
            decisions,
            audit,
        })
    }

    fn sweep_expired(&self, now_ms: i64) -> StoreResult<Vec<ApprovalRequestRecord>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let overdue: Vec<String> = {
            let mut stmt = tx.prepare(
                "SELECT id FROM approval_requests \
                 WHERE status = 'pending' AND expires_at_ms <= ?1 \
                 ORDER BY created_at_ms ASC",
            )?;
            let rows = stmt.query_map(params![now_ms], |row| row.get(0))?;
            rows.collect::<Result<_, _>>()?
        };

        let mut expired = Vec::new();
        for raw_id in overdue {
            let id = RequestId::parse(&raw_id)
                .ok_or_else(|| StoreError::Storage(format!("corrupt stored id '{raw_id}'")))?;
            match Self::transition(&tx, id, RequestStatus::Expired, now_ms) {
                Ok(record) => expired.push(record),
                // Lost the race against a concurrent resolve.
                Err(StoreError::AlreadyResolved { .. }) => {},
                Err(e) => return Err(e),
            }
        }
        tx.commit()?;

        if !expired.is_empty() {
            debug!(count = expired.len(), "swept expired approval requests");
        }
        Ok(expired)
    }
}

// ---- row mapping ----

struct RequestRow {
    id: String,
    action_name: String,
    arguments_summary: String,
    requester_session: String,
    requester_role: String,
    agent_id: Option<String>,
    policy_id: Option<String>,
    risk_class: String,
    side_effects: String,
    reason_codes: String,
    request_hash: String,
    status: String,
    created_at_ms: i64,
    expires_at_ms: i64,
    updated_at_ms: i64,
}

impl RequestRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            action_name: row.get(1)?,
            arguments_summary: row.get(2)?,
            requester_session: row.get(3)?,
            requester_role: row.get(4)?,
            agent_id: row.get(5)?,
            policy_id: row.get(6)?,
            risk_class: row.get(7)?,
            side_effects: row.get(8)?,
            reason_codes: row.get(9)?,
            request_hash: row.get(10)?,
            status: row.get(11)?,
            created_at_ms: row.get(12)?,
            expires_at_ms: row.get(13)?,
            updated_at_ms: row.get(14)?,
        })
    }

    fn into_record(self) -> StoreResult<ApprovalRequestRecord> {
        let corrupt = |what: &str| StoreError::Storage(format!("corrupt stored {what}"));
        Ok(ApprovalRequestRecord {
            id: RequestId::parse(&self.id).ok_or_else(|| corrupt("request id"))?,
            action_name: self.action_name,
            arguments_summary: self.arguments_summary,
            requester_session: self.requester_session,
            requester_role: self.requester_role,
            agent_id: self.agent_id,
            policy_id: self.policy_id,
            risk_class: self
                .risk_class
                .parse::<RiskClass>()
                .map_err(|_| corrupt("risk class"))?,
            side_effects: serde_json::from_str::<Vec<SideEffect>>(&self.side_effects)
                .map_err(|_| corrupt("side effects"))?,
            reason_codes: serde_json::from_str::<Vec<ReasonCode>>(&self.reason_codes)
                .map_err(|_| corrupt("reason codes"))?,
            request_hash: ContentHash::from_hex(&self.request_hash)
                .map_err(|_| corrupt("request hash"))?,
            status: RequestStatus::parse(&self.status).ok_or_else(|| corrupt("status"))?,
            created_at_ms: self.created_at_ms,
            expires_at_ms: self.expires_at_ms,
            updated_at_ms: self.updated_at_ms,
        })
    }
}

struct DecisionRow {
    id: String,
    request_id: String,
    actor_session: String,
    actor_role: String,
    decision: String,
    reason: Option<String>,
    kind: String,
    created_at_ms: i64,
}

impl DecisionRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            request_id: row.get(1)?,
            actor_session: row.get(2)?,
            actor_role: row.get(3)?,
            decision: row.get(4)?,
            reason: row.get(5)?,
            kind: row.get(6)?,
            created_at_ms: row.get(7)?,
        })
    }

    fn into_record(self) -> StoreResult<DecisionRecord> {
        let corrupt = |what: &str| StoreError::Storage(format!("corrupt stored {what}"));
        let decision_uuid = uuid::Uuid::parse_str(&self.id).map_err(|_| corrupt("decision id"))?;
        Ok(DecisionRecord {
            id: DecisionId::from_uuid(decision_uuid),
            request_id: RequestId::parse(&self.request_id).ok_or_else(|| corrupt("request id"))?,
            actor_session: self.actor_session,
            actor_role: self.actor_role,
            decision: DecisionOutcome::parse(&self.decision).ok_or_else(|| corrupt("decision"))?,
            reason: self.reason,
            kind: DecisionKind::parse(&self.kind).ok_or_else(|| corrupt("decision kind"))?,
            created_at_ms: self.created_at_ms,
        })
    }
}

struct AuditRow {
    id: String,
    request_id: String,
    event: String,
    actor_session: String,
    actor_role: String,
    data: String,
    timestamp_ms: i64,
    hash: String,
}

impl AuditRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            request_id: row.get(1)?,
            event: row.get(2)?,
            actor_session: row.get(3)?,
            actor_role: row.get(4)?,
            data: row.get(5)?,
            timestamp_ms: row.get(6)?,
            hash: row.get(7)?,
        })
    }

    fn into_entry(self) -> StoreResult<AuditEntry> {
        let corrupt = |what: &str| StoreError::Storage(format!("corrupt stored {what}"));
        let entry_uuid = uuid::Uuid::parse_str(&self.id).map_err(|_| corrupt("audit id"))?;
        Ok(AuditEntry {
            id: AuditEntryId::from_uuid(entry_uuid),
            request_id: RequestId::parse(&self.request_id).ok_or_else(|| corrupt("request id"))?,
            event: AuditEvent::from(self.event),
            actor_session: self.actor_session,
            actor_role: self.actor_role,
            data: serde_json::from_str(&self.data).map_err(|_| corrupt("audit data"))?,
            timestamp: Timestamp::from_millis(self.timestamp_ms),
            hash: ContentHash::from_hex(&self.hash).map_err(|_| corrupt("audit hash"))?,
        })
    }
}
