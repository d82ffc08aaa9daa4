use chrono::{DateTime, Utc};
use uuid::Uuid;

use lrx_types::{Document, DocumentKey, StatementRecord, TenantId};

use crate::error::StoreResult;
use crate::filter::{SortOrder, StatementFilter};
use crate::pipeline::{AggregateResult, Pipeline};

/// Statement ledger boundary.
///
/// All implementations must satisfy these invariants:
/// - Every operation is tenant-scoped; records of one tenant are never
///   visible to another.
/// - A statement id is unique within a tenant; `insert` fails on a second
///   insert rather than overwriting.
/// - Statement bodies are immutable once inserted. Only the envelope fields
///   (`active`, `voided`, `refs`) are ever updated.
/// - All I/O errors are propagated, never silently ignored, and never
///   retried at this layer.
pub trait StatementStore: Send + Sync {
    /// Insert a new record. Fails with `DuplicateId` if the id exists.
    fn insert(&self, record: StatementRecord) -> StoreResult<()>;

    /// Read one record by id, active or not.
    fn get(&self, tenant: &TenantId, id: Uuid) -> StoreResult<Option<StatementRecord>>;

    /// Read records matching `filter`, sorted by `stored`, paginated.
    fn find(
        &self,
        tenant: &TenantId,
        filter: &StatementFilter,
        order: SortOrder,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<StatementRecord>>;

    /// Count records matching `filter`, independent of pagination.
    fn count(&self, tenant: &TenantId, filter: &StatementFilter) -> StoreResult<u64>;

    /// All persisted statements whose object is a StatementRef to `id`.
    fn find_referrers(&self, tenant: &TenantId, id: Uuid) -> StoreResult<Vec<StatementRecord>>;

    /// Replace the denormalized reference chain of one statement.
    fn set_refs(&self, tenant: &TenantId, id: Uuid, refs: Vec<Uuid>) -> StoreResult<()>;

    /// Mark one statement voided.
    fn set_voided(&self, tenant: &TenantId, id: Uuid) -> StoreResult<()>;

    /// Flip `active` on for every listed id in one bulk update. Returns the
    /// number of records updated.
    fn activate(&self, tenant: &TenantId, ids: &[Uuid]) -> StoreResult<u64>;

    /// Execute a guarded aggregation pipeline over the tenant's ledger.
    fn aggregate(&self, tenant: &TenantId, pipeline: &Pipeline) -> StoreResult<AggregateResult>;
}

/// Document resource boundary.
///
/// A document's identity is its composite key (agents compared by resolved
/// identity); `get`/`put`/`delete` address exactly one document, while the
/// `_matching` and `list` operations take partial keys.
pub trait DocumentStore: Send + Sync {
    /// Read the document with exactly this key.
    fn get(&self, key: &DocumentKey) -> StoreResult<Option<Document>>;

    /// Insert or replace the document with the given key.
    fn put(&self, document: Document) -> StoreResult<()>;

    /// Delete the document with exactly this key. Returns `true` if it
    /// existed.
    fn delete(&self, key: &DocumentKey) -> StoreResult<bool>;

    /// Delete every document covered by this (partial) key. Returns the
    /// number deleted.
    fn delete_matching(&self, key: &DocumentKey) -> StoreResult<u64>;

    /// List documents covered by this (partial) key, newest first,
    /// optionally restricted to those updated strictly after `since`.
    fn list(&self, key: &DocumentKey, since: Option<DateTime<Utc>>) -> StoreResult<Vec<Document>>;
}
