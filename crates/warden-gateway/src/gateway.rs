//! The approval gateway.
//!
//! Owns the request lifecycle on top of a [`RequestStore`]: creation,
//! suspension on a waiter, resolution, expiry, and the event broadcast.
//! Every lifecycle step writes to the per-request audit chain.

use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, warn};

use warden_audit::AuditEvent;
use warden_core::{RequestId, Timestamp};
use warden_store::{
    ApprovalRequestRecord, DecisionKind, DecisionOutcome, DecisionRecord, NewAudit, NewDecision,
    NewRequest, RequestFilter, RequestStatus, RequestStore, RequestTimeline, StoreError,
};

use crate::error::{GatewayError, GatewayResult};
use crate::hash::compute_request_hash;
use crate::prompter::{ApprovalPrompter, PromptRequest};
use crate::wire::{
    PendingApprovals, ToolApprovalRequestParams, ToolApprovalRequested, ToolApprovalResolveParams,
};

/// Role recorded for the proposing agent on request creation.
const ROLE_AGENT: &str = "agent";
/// Actor recorded for system-originated transitions (expiry).
const ACTOR_SYSTEM: &str = "system";

/// Capacity of the lifecycle event broadcast channel.
const EVENT_CAPACITY: usize = 64;

/// A lifecycle event observed on the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayEvent {
    /// A new request entered `pending`.
    Requested {
        /// The new request.
        id: RequestId,
    },
    /// A human resolved a request.
    Resolved {
        /// The resolved request.
        id: RequestId,
        /// Its terminal status.
        status: RequestStatus,
    },
    /// A request expired without a decision.
    Expired {
        /// The expired request.
        id: RequestId,
    },
}

/// The terminal state a waiter observed.
#[derive(Debug, Clone)]
pub struct AwaitedDecision {
    /// The request that was awaited.
    pub id: RequestId,
    /// Its terminal status.
    pub status: RequestStatus,
    /// The decision record, when one was written.
    pub decision: Option<DecisionRecord>,
}

/// The result of an explicit resolve.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// The request after its terminal transition.
    pub request: ApprovalRequestRecord,
    /// The decision that resolved it.
    pub decision: DecisionRecord,
}

/// Coordinates approval requests between agents, the store, and humans.
pub struct ApprovalGateway {
    store: Arc<dyn RequestStore>,
    waiters: DashMap<RequestId, oneshot::Sender<AwaitedDecision>>,
    events: broadcast::Sender<GatewayEvent>,
    prompter: RwLock<Option<Arc<dyn ApprovalPrompter>>>,
}

impl ApprovalGateway {
    /// Create a gateway over a request store.
    #[must_use]
    pub fn new(store: Arc<dyn RequestStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            waiters: DashMap::new(),
            events,
            prompter: RwLock::new(None),
        }
    }

    /// Register a prompt delivery frontend.
    pub fn set_prompter(&self, prompter: Arc<dyn ApprovalPrompter>) {
        if let Ok(mut guard) = self.prompter.write() {
            *guard = Some(prompter);
        }
    }

    /// Subscribe to lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.events.subscribe()
    }

    /// Submit a new approval request.
    ///
    /// Validates the parameters, persists the request as `pending`, writes
    /// the `request.created` audit entry, broadcasts `Requested`, and
    /// dispatches a prompt fire-and-forget if a prompter is registered.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` when validation fails (empty tool name, zero
    /// timeout, or a request hash that does not match the content), store
    /// errors when persistence fails.
    pub async fn request(
        &self,
        params: ToolApprovalRequestParams,
    ) -> GatewayResult<ToolApprovalRequested> {
        if params.tool_name.trim().is_empty() {
            return Err(GatewayError::InvalidRequest(
                "tool_name must not be empty".to_string(),
            ));
        }
        if params.timeout_ms == 0 {
            return Err(GatewayError::InvalidRequest(
                "timeout_ms must be positive".to_string(),
            ));
        }
        let expected = compute_request_hash(&params)?;
        if params.request_hash != expected {
            return Err(GatewayError::InvalidRequest(
                "request_hash does not match request content".to_string(),
            ));
        }

        let id = RequestId::new();
        let record = self.store.create_request(NewRequest {
            id,
            action_name: params.tool_name.clone(),
            arguments_summary: params.params_summary.clone(),
            requester_session: params.session_key.clone(),
            requester_role: ROLE_AGENT.to_string(),
            agent_id: params.agent_id.clone(),
            policy_id: params.policy_version.clone(),
            risk_class: params.risk_class,
            side_effects: params.side_effects.clone(),
            reason_codes: params.reason_codes.clone(),
            request_hash: params.request_hash,
            timeout_ms: params.timeout_ms,
        })?;

        self.store.record_audit(NewAudit {
            request_id: id,
            event: AuditEvent::RequestCreated,
            actor_session: params.session_key.clone(),
            actor_role: ROLE_AGENT.to_string(),
            data: serde_json::json!({
                "tool_name": record.action_name,
                "risk_class": record.risk_class,
                "reason_codes": record.reason_codes,
                "expires_at_ms": record.expires_at_ms,
            }),
        })?;

        debug!(id = %id, tool = %record.action_name, "approval request created");
        let _ = self.events.send(GatewayEvent::Requested { id });
        self.dispatch_prompt(&record);

        Ok(ToolApprovalRequested {
            id,
            status: RequestStatus::Pending,
        })
    }

    /// Suspend until a request reaches a terminal state, or until `timeout`.
    ///
    /// Only the timeout cancels the wait. When it fires, the gateway
    /// realizes the expiry itself: conditional transition to `expired`, a
    /// timeout-kind decision, and the `request.expired` audit entry.
    ///
    /// # Errors
    ///
    /// Store errors when the request cannot be read or the expiry cannot be
    /// persisted.
    pub async fn await_decision(
        &self,
        id: RequestId,
        timeout: Duration,
    ) -> GatewayResult<AwaitedDecision> {
        let (tx, rx) = oneshot::channel();
        self.waiters.insert(id, tx);

        // Registered before the terminal check so a concurrent resolve
        // cannot slip between the two.
        let record = match self.store.get_request(id) {
            Ok(record) => record,
            Err(e) => {
                self.waiters.remove(&id);
                return Err(e.into());
            },
        };
        if record.status.is_terminal() {
            self.waiters.remove(&id);
            let decision = self.store.list_decisions(id)?.pop();
            return Ok(AwaitedDecision {
                id,
                status: record.status,
                decision,
            });
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(awaited)) => Ok(awaited),
            Ok(Err(_)) => {
                self.waiters.remove(&id);
                Err(GatewayError::Store(StoreError::Storage(
                    "approval waiter dropped without a decision".to_string(),
                )))
            },
            Err(_) => {
                self.waiters.remove(&id);
                self.expire_request(id)
            },
        }
    }

    /// Resolve a pending request with a human decision.
    ///
    /// The request hash is compared against the stored request before any
    /// mutation: a mismatch is a stale resolve and the request stays
    /// `pending`, untouched. A pending request past its deadline is expired
    /// here rather than approved.
    ///
    /// # Errors
    ///
    /// `StaleRequest` on hash mismatch, `RequestExpired` when the deadline
    /// passed, `AlreadyResolved` when the request already left `pending`,
    /// `NotFound` or other store errors otherwise.
    pub async fn resolve(
        &self,
        params: ToolApprovalResolveParams,
        actor_session: &str,
        actor_role: &str,
    ) -> GatewayResult<Resolved> {
        let record = self.store.get_request(params.id)?;
        if record.status.is_terminal() {
            return Err(StoreError::AlreadyResolved {
                status: record.status,
            }
            .into());
        }
        if params.request_hash != record.request_hash {
            warn!(id = %params.id, "stale resolve rejected, hash mismatch");
            return Err(GatewayError::StaleRequest(params.id));
        }

        let now_ms = Timestamp::now().as_millis();
        if now_ms >= record.expires_at_ms {
            self.expire_request(params.id)?;
            return Err(GatewayError::RequestExpired(params.id));
        }

        let (status, outcome, event) = if params.decision.is_approval() {
            (
                RequestStatus::Approved,
                DecisionOutcome::Approve,
                AuditEvent::DecisionApproved,
            )
        } else {
            (
                RequestStatus::Denied,
                DecisionOutcome::Deny,
                AuditEvent::DecisionDenied,
            )
        };

        let request = self.store.update_request_status(params.id, status, now_ms)?;
        let decision = self.store.record_decision(NewDecision {
            request_id: params.id,
            actor_session: actor_session.to_string(),
            actor_role: actor_role.to_string(),
            decision: outcome,
            reason: None,
            kind: DecisionKind::Explicit,
        })?;
        self.store.record_audit(NewAudit {
            request_id: params.id,
            event,
            actor_session: actor_session.to_string(),
            actor_role: actor_role.to_string(),
            data: serde_json::json!({
                "decision": params.decision,
                "kind": DecisionKind::Explicit,
            }),
        })?;

        debug!(id = %params.id, status = %status, "approval request resolved");
        self.fire_waiter(params.id, status, Some(decision.clone()));
        let _ = self.events.send(GatewayEvent::Resolved {
            id: params.id,
            status,
        });

        Ok(Resolved { request, decision })
    }

    /// All pending requests, optionally filtered by session or agent.
    ///
    /// # Errors
    ///
    /// Store errors when listing fails.
    pub fn pending(&self, mut filter: RequestFilter) -> GatewayResult<PendingApprovals> {
        filter.status = Some(RequestStatus::Pending);
        Ok(PendingApprovals {
            pending: self.store.list_requests(&filter)?,
        })
    }

    /// A request with its full decision and audit history.
    ///
    /// # Errors
    ///
    /// `NotFound` when there is no such request, store errors otherwise.
    pub fn timeline(&self, id: RequestId) -> GatewayResult<RequestTimeline> {
        Ok(self.store.request_with_timeline(id)?)
    }

    /// Expire every pending request past its deadline.
    ///
    /// Each expired request gets a timeout-kind decision and a
    /// `request.expired` audit entry, its waiter is fired, and `Expired` is
    /// broadcast. Returns how many requests were expired.
    ///
    /// # Errors
    ///
    /// Store errors when the sweep or its follow-up writes fail.
    pub fn sweep_once(&self) -> GatewayResult<usize> {
        let now_ms = Timestamp::now().as_millis();
        let expired = self.store.sweep_expired(now_ms)?;
        let count = expired.len();
        for record in expired {
            let decision = self.record_expiry(&record)?;
            self.fire_waiter(record.id, RequestStatus::Expired, Some(decision));
            let _ = self.events.send(GatewayEvent::Expired { id: record.id });
        }
        if count > 0 {
            debug!(count, "expired overdue approval requests");
        }
        Ok(count)
    }

    /// Spawn the background sweeper.
    ///
    /// Runs [`sweep_once`](Self::sweep_once) every `interval` until the
    /// returned handle is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let gateway = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = gateway.sweep_once() {
                    warn!("expiry sweep failed: {e}");
                }
            }
        })
    }

    /// Transition one request to `expired`, tolerating a lost race against
    /// a concurrent resolve or sweep.
    fn expire_request(&self, id: RequestId) -> GatewayResult<AwaitedDecision> {
        let now_ms = Timestamp::now().as_millis();
        match self
            .store
            .update_request_status(id, RequestStatus::Expired, now_ms)
        {
            Ok(record) => {
                let decision = self.record_expiry(&record)?;
                self.fire_waiter(id, RequestStatus::Expired, Some(decision.clone()));
                let _ = self.events.send(GatewayEvent::Expired { id });
                Ok(AwaitedDecision {
                    id,
                    status: RequestStatus::Expired,
                    decision: Some(decision),
                })
            },
            Err(StoreError::AlreadyResolved { status }) => {
                let decision = self.store.list_decisions(id)?.pop();
                Ok(AwaitedDecision {
                    id,
                    status,
                    decision,
                })
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Write the timeout decision and `request.expired` audit entry for an
    /// already-transitioned request.
    fn record_expiry(&self, record: &ApprovalRequestRecord) -> GatewayResult<DecisionRecord> {
        let decision = self.store.record_decision(NewDecision {
            request_id: record.id,
            actor_session: ACTOR_SYSTEM.to_string(),
            actor_role: ACTOR_SYSTEM.to_string(),
            decision: DecisionOutcome::Deny,
            reason: Some("approval request expired".to_string()),
            kind: DecisionKind::Timeout,
        })?;
        self.store.record_audit(NewAudit {
            request_id: record.id,
            event: AuditEvent::RequestExpired,
            actor_session: ACTOR_SYSTEM.to_string(),
            actor_role: ACTOR_SYSTEM.to_string(),
            data: serde_json::json!({
                "expires_at_ms": record.expires_at_ms,
            }),
        })?;
        Ok(decision)
    }

    fn fire_waiter(&self, id: RequestId, status: RequestStatus, decision: Option<DecisionRecord>) {
        if let Some((_, tx)) = self.waiters.remove(&id) {
            let _ = tx.send(AwaitedDecision {
                id,
                status,
                decision,
            });
        }
    }

    fn dispatch_prompt(&self, record: &ApprovalRequestRecord) {
        let prompter = match self.prompter.read() {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        };
        if let Some(prompter) = prompter {
            let prompt = PromptRequest::from(record);
            let id = record.id;
            tokio::spawn(async move {
                let outcome = prompter.send_prompt(prompt).await;
                debug!(
                    id = %id,
                    confirmed = outcome.confirmed,
                    timed_out = outcome.timed_out,
                    "approval prompt dispatched"
                );
            });
        }
    }
}

impl fmt::Debug for ApprovalGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApprovalGateway")
            .field("waiters", &self.waiters.len())
            .finish_non_exhaustive()
    }
}
