//! In-memory store for tests, local demos, and embedding.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use lrx_types::{Document, DocumentKey, StatementRecord, TenantId};

use crate::error::{StoreError, StoreResult};
use crate::filter::{SortOrder, StatementFilter};
use crate::pipeline::{
    time_bucket, AggregateResult, Dimension, ObjectBucket, Pipeline, Stage, TimeBucket,
};
use crate::traits::{DocumentStore, StatementStore};

/// In-memory implementation of both store boundaries.
///
/// Records live in per-tenant vectors behind one `RwLock`; insertion order
/// is preserved, which keeps `stored`-equal sorts stable.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<StoreState>,
}

#[derive(Default)]
struct StoreState {
    statements: HashMap<TenantId, Vec<StatementRecord>>,
    documents: HashMap<TenantId, Vec<Document>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, StoreState>> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, StoreState>> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }
}

fn matching<'a>(
    state: &'a StoreState,
    tenant: &TenantId,
    filter: &StatementFilter,
) -> Vec<&'a StatementRecord> {
    state
        .statements
        .get(tenant)
        .map(|records| records.iter().filter(|r| filter.matches(r)).collect())
        .unwrap_or_default()
}

impl StatementStore for InMemoryStore {
    fn insert(&self, record: StatementRecord) -> StoreResult<()> {
        let mut state = self.write()?;
        let records = state.statements.entry(record.tenant.clone()).or_default();
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::DuplicateId { id: record.id });
        }
        debug!(tenant = %record.tenant, id = %record.id, "inserting statement");
        records.push(record);
        Ok(())
    }

    fn get(&self, tenant: &TenantId, id: Uuid) -> StoreResult<Option<StatementRecord>> {
        let state = self.read()?;
        Ok(state
            .statements
            .get(tenant)
            .and_then(|records| records.iter().find(|r| r.id == id))
            .cloned())
    }

    fn find(
        &self,
        tenant: &TenantId,
        filter: &StatementFilter,
        order: SortOrder,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<StatementRecord>> {
        let state = self.read()?;
        let mut records = matching(&state, tenant, filter);
        match order {
            SortOrder::Ascending => records.sort_by_key(|r| r.stored),
            SortOrder::Descending => {
                records.sort_by_key(|r| r.stored);
                records.reverse();
            }
        }
        Ok(records
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn count(&self, tenant: &TenantId, filter: &StatementFilter) -> StoreResult<u64> {
        let state = self.read()?;
        Ok(matching(&state, tenant, filter).len() as u64)
    }

    fn find_referrers(&self, tenant: &TenantId, id: Uuid) -> StoreResult<Vec<StatementRecord>> {
        let state = self.read()?;
        Ok(state
            .statements
            .get(tenant)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.statement.statement_ref_target() == Some(id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn set_refs(&self, tenant: &TenantId, id: Uuid, refs: Vec<Uuid>) -> StoreResult<()> {
        let mut state = self.write()?;
        let record = state
            .statements
            .get_mut(tenant)
            .and_then(|records| records.iter_mut().find(|r| r.id == id))
            .ok_or(StoreError::StatementNotFound { id })?;
        record.refs = refs;
        Ok(())
    }

    fn set_voided(&self, tenant: &TenantId, id: Uuid) -> StoreResult<()> {
        let mut state = self.write()?;
        let record = state
            .statements
            .get_mut(tenant)
            .and_then(|records| records.iter_mut().find(|r| r.id == id))
            .ok_or(StoreError::StatementNotFound { id })?;
        record.voided = true;
        Ok(())
    }

    fn activate(&self, tenant: &TenantId, ids: &[Uuid]) -> StoreResult<u64> {
        let mut state = self.write()?;
        let mut updated = 0;
        if let Some(records) = state.statements.get_mut(tenant) {
            for record in records.iter_mut().filter(|r| ids.contains(&r.id)) {
                record.active = true;
                updated += 1;
            }
        }
        debug!(tenant = %tenant, updated, "activated batch");
        Ok(updated)
    }

    fn aggregate(&self, tenant: &TenantId, pipeline: &Pipeline) -> StoreResult<AggregateResult> {
        pipeline.guard()?;

        let state = self.read()?;
        let mut working: Vec<&StatementRecord> = state
            .statements
            .get(tenant)
            .map(|records| records.iter().collect())
            .unwrap_or_default();
        let mut result = None;

        for stage in pipeline.stages() {
            match stage {
                Stage::Match(filter) => {
                    working.retain(|r| filter.matches(r));
                }
                Stage::GroupTime { interval, length } => {
                    if result.is_some() {
                        return Err(StoreError::InvalidPipeline);
                    }
                    result = Some(group_time(&working, *interval, *length));
                }
                Stage::GroupBy(dimension) => {
                    if result.is_some() {
                        return Err(StoreError::InvalidPipeline);
                    }
                    result = Some(group_objects(&working, *dimension));
                }
                // guard() ran first
                Stage::Export { .. } => return Err(StoreError::InvalidPipeline),
            }
        }

        result.ok_or(StoreError::InvalidPipeline)
    }
}

fn group_time(
    records: &[&StatementRecord],
    interval: crate::pipeline::Interval,
    length: u32,
) -> AggregateResult {
    let mut buckets: BTreeMap<DateTime<Utc>, u64> = BTreeMap::new();
    for record in records {
        *buckets
            .entry(time_bucket(record.stored, interval, length))
            .or_default() += 1;
    }
    AggregateResult::Time(
        buckets
            .into_iter()
            .map(|(date, count)| TimeBucket { date, count })
            .collect(),
    )
}

fn group_objects(records: &[&StatementRecord], dimension: Dimension) -> AggregateResult {
    struct Group {
        data: serde_json::Value,
        count: u64,
        dates: BTreeSet<DateTime<Utc>>,
    }

    let mut groups: BTreeMap<String, Group> = BTreeMap::new();
    for record in records {
        let data = match dimension {
            Dimension::User => serde_json::to_value(&record.statement.actor),
            Dimension::Verb => serde_json::to_value(&record.statement.verb),
            Dimension::Activity => serde_json::to_value(&record.statement.object),
        }
        .unwrap_or(serde_json::Value::Null);
        let key = data.to_string();
        let group = groups.entry(key).or_insert_with(|| Group {
            data,
            count: 0,
            dates: BTreeSet::new(),
        });
        group.count += 1;
        group.dates.insert(record.stored);
    }

    let mut buckets: Vec<ObjectBucket> = groups
        .into_values()
        .map(|g| ObjectBucket {
            data: g.data,
            count: g.count,
            dates: g.dates.into_iter().collect(),
        })
        .collect();
    buckets.sort_by(|a, b| b.count.cmp(&a.count));
    AggregateResult::Objects(buckets)
}

impl DocumentStore for InMemoryStore {
    fn get(&self, key: &DocumentKey) -> StoreResult<Option<Document>> {
        let state = self.read()?;
        Ok(state
            .documents
            .get(&key.tenant)
            .and_then(|docs| docs.iter().find(|d| d.key.same_document(key)))
            .cloned())
    }

    fn put(&self, document: Document) -> StoreResult<()> {
        let mut state = self.write()?;
        let docs = state
            .documents
            .entry(document.key.tenant.clone())
            .or_default();
        match docs.iter_mut().find(|d| d.key.same_document(&document.key)) {
            Some(existing) => *existing = document,
            None => docs.push(document),
        }
        Ok(())
    }

    fn delete(&self, key: &DocumentKey) -> StoreResult<bool> {
        let mut state = self.write()?;
        let Some(docs) = state.documents.get_mut(&key.tenant) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| !d.key.same_document(key));
        Ok(docs.len() < before)
    }

    fn delete_matching(&self, key: &DocumentKey) -> StoreResult<u64> {
        let mut state = self.write()?;
        let Some(docs) = state.documents.get_mut(&key.tenant) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !key.covers(&d.key));
        Ok((before - docs.len()) as u64)
    }

    fn list(&self, key: &DocumentKey, since: Option<DateTime<Utc>>) -> StoreResult<Vec<Document>> {
        let state = self.read()?;
        let mut docs: Vec<Document> = state
            .documents
            .get(&key.tenant)
            .map(|docs| {
                docs.iter()
                    .filter(|d| key.covers(&d.key))
                    .filter(|d| since.map(|s| d.updated_at > s).unwrap_or(true))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        docs.sort_by_key(|d| std::cmp::Reverse(d.updated_at));
        Ok(docs)
    }
}
