//! Duplicate and conflict detection for statement batches.
//!
//! Runs after ids are assigned and before any write. Two statements sharing
//! an id must be canonically equal (excluding `stored` and `authority`);
//! equal persisted copies are treated as already stored, unequal ones are
//! conflicts. `timestamp` is still unstamped here: a submission that omitted
//! it compares against persisted copies with the timestamp ignored, so
//! resubmissions stay idempotent across differing default times.

use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use lrx_store::StatementStore;
use lrx_types::{Statement, TenantId};

use crate::error::LedgerError;

/// Result of duplicate detection over one batch.
#[derive(Clone, Debug, PartialEq)]
pub struct DedupOutcome {
    /// Unique statements that still need persisting.
    pub fresh: Vec<Statement>,
    /// Every batch id in submission order, duplicates collapsed to their
    /// first occurrence. Already-stored ids are included.
    pub ids: Vec<Uuid>,
}

fn conflict(id: Uuid, submitted: &Statement, existing: &Statement) -> LedgerError {
    LedgerError::Conflict {
        id,
        submitted: submitted.canonical_value(),
        existing: existing.canonical_value(),
    }
}

/// Detect duplicates and conflicts for a stamped batch.
///
/// Errors abort before any write; the caller persists `fresh` afterwards.
pub fn detect_duplicates(
    store: &dyn StatementStore,
    tenant: &TenantId,
    statements: Vec<Statement>,
) -> Result<DedupOutcome, LedgerError> {
    let mut seen: HashMap<Uuid, Statement> = HashMap::new();
    let mut ids = Vec::new();

    // In-batch pass: same id twice must be the same statement.
    for statement in statements {
        let id = statement.id.ok_or_else(|| {
            LedgerError::invalid("statement.id", "statement reached dedup without an id")
        })?;
        match seen.get(&id) {
            None => {
                seen.insert(id, statement);
                ids.push(id);
            }
            Some(first) => {
                if !first.matches(&statement) {
                    return Err(conflict(id, &statement, first));
                }
            }
        }
    }

    // Ledger pass: equal persisted copies are no-ops, unequal are conflicts.
    let mut fresh = Vec::with_capacity(ids.len());
    for id in &ids {
        let statement = seen
            .remove(id)
            .ok_or(LedgerError::NotFound { id: *id })?;
        match store.get(tenant, *id)? {
            None => fresh.push(statement),
            Some(persisted) => {
                if statement.matches_persisted(&persisted.statement) {
                    debug!(%id, "statement already stored; skipping insert");
                } else {
                    return Err(conflict(*id, &statement, &persisted.statement));
                }
            }
        }
    }

    Ok(DedupOutcome { fresh, ids })
}
