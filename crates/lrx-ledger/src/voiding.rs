//! Void semantics.
//!
//! A statement voids another when its verb is the void verb and its object
//! is a StatementRef to the target. Voiding runs after the batch is
//! persisted (inactive) and linked; it marks the target's record, it never
//! deletes anything.

use tracing::info;
use uuid::Uuid;

use lrx_store::StatementStore;
use lrx_types::TenantId;

use crate::error::LedgerError;

/// Apply void semantics for every voiding statement in the batch.
///
/// The target must exist and must not itself be a voiding statement; either
/// case is a validation failure. The target's own active/refs state is
/// irrelevant.
pub fn apply_voids(
    store: &dyn StatementStore,
    tenant: &TenantId,
    batch_ids: &[Uuid],
) -> Result<(), LedgerError> {
    for id in batch_ids {
        let Some(record) = store.get(tenant, *id)? else {
            return Err(LedgerError::NotFound { id: *id });
        };
        if !record.statement.is_voiding() {
            continue;
        }
        let Some(target) = record.statement.statement_ref_target() else {
            continue;
        };

        let Some(target_record) = store.get(tenant, target)? else {
            return Err(LedgerError::invalid(
                "statement.object.id",
                format!("cannot void `{target}`: statement does not exist"),
            ));
        };
        if target_record.statement.is_voiding() {
            return Err(LedgerError::invalid(
                "statement.object.id",
                format!("cannot void `{target}`: voiding statements cannot be voided"),
            ));
        }

        store.set_voided(tenant, target)?;
        info!(voider = %id, voided = %target, "voided statement");
    }

    Ok(())
}
