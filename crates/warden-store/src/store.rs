//! The store trait.

use warden_audit::AuditEntry;
use warden_core::RequestId;

use crate::error::StoreResult;
use crate::types::{
    ApprovalRequestRecord, DecisionRecord, NewAudit, NewDecision, NewRequest, RequestFilter,
    RequestStatus, RequestTimeline,
};

/// Durable persistence for the approval lifecycle.
///
/// Implementations must uphold three guarantees:
///
/// - **Exactly-once transition**: [`update_request_status`] only succeeds
///   from `Pending`, and concurrent attempts on one request yield one
///   success and `AlreadyResolved` for the rest.
/// - **Reads never mutate**: [`get_request`] and [`list_requests`] report
///   what is stored, even for pendings past their deadline; expiry is
///   realized only by [`sweep_expired`] or by the resolve path.
/// - **Chained audit**: [`record_audit`] hashes each entry against the
///   previous entry for the same request, seeded from the request id.
///
/// [`update_request_status`]: RequestStore::update_request_status
/// [`get_request`]: RequestStore::get_request
/// [`list_requests`]: RequestStore::list_requests
/// [`sweep_expired`]: RequestStore::sweep_expired
/// [`record_audit`]: RequestStore::record_audit
pub trait RequestStore: Send + Sync {
    /// Persist a new pending request.
    ///
    /// # Errors
    ///
    /// `DuplicateRequest` if the id exists, `Storage` on infrastructure
    /// failure.
    fn create_request(&self, new: NewRequest) -> StoreResult<ApprovalRequestRecord>;

    /// Fetch a request by id.
    ///
    /// # Errors
    ///
    /// `NotFound` if no such request, `Storage` on infrastructure failure.
    fn get_request(&self, id: RequestId) -> StoreResult<ApprovalRequestRecord>;

    /// List requests matching a filter, newest first.
    ///
    /// # Errors
    ///
    /// `Storage` on infrastructure failure.
    fn list_requests(&self, filter: &RequestFilter) -> StoreResult<Vec<ApprovalRequestRecord>>;

    /// Transition a pending request to a terminal status.
    ///
    /// # Errors
    ///
    /// `NotFound` if no such request, `AlreadyResolved` if it already left
    /// `Pending`, `Storage` on infrastructure failure.
    fn update_request_status(
        &self,
        id: RequestId,
        status: RequestStatus,
        now_ms: i64,
    ) -> StoreResult<ApprovalRequestRecord>;

    /// Persist a decision.
    ///
    /// # Errors
    ///
    /// `NotFound` if the request does not exist, `Storage` on
    /// infrastructure failure.
    fn record_decision(&self, new: NewDecision) -> StoreResult<DecisionRecord>;

    /// Append an audit entry to a request's chain and return it with its
    /// computed hash.
    ///
    /// # Errors
    ///
    /// `NotFound` if the request does not exist, `Storage` on
    /// infrastructure failure.
    fn record_audit(&self, new: NewAudit) -> StoreResult<AuditEntry>;

    /// All decisions for a request in creation order.
    ///
    /// # Errors
    ///
    /// `Storage` on infrastructure failure.
    fn list_decisions(&self, id: RequestId) -> StoreResult<Vec<DecisionRecord>>;

    /// All audit entries for a request in chain order.
    ///
    /// # Errors
    ///
    /// `Storage` on infrastructure failure.
    fn list_audit(&self, id: RequestId) -> StoreResult<Vec<AuditEntry>>;

    /// A request together with its decisions and audit chain.
    ///
    /// # Errors
    ///
    /// `NotFound` if no such request, `Storage` on infrastructure failure.
    fn request_with_timeline(&self, id: RequestId) -> StoreResult<RequestTimeline>;

    /// Transition every pending request past its deadline to `Expired` and
    /// return the transitioned records.
    ///
    /// # Errors
    ///
    /// `Storage` on infrastructure failure.
    fn sweep_expired(&self, now_ms: i64) -> StoreResult<Vec<ApprovalRequestRecord>>;
}
