//! The two-phase batch storer.
//!
//! Orchestrates one submission end to end: validation, duplicate detection,
//! inactive persistence, linking, voiding, and the final bulk activation
//! that makes the whole batch visible at once.

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use lrx_store::{StatementStore, StoreError};
use lrx_types::{Authority, FieldError, Statement, StatementRecord};
use lrx_validate::validate_statement;

use crate::attachments::{check_declared_hashes, parse_part, AttachmentPart, AttachmentSink};
use crate::dedup::detect_duplicates;
use crate::error::LedgerError;
use crate::linker::Linker;
use crate::voiding::apply_voids;

/// The states a batch moves through, in order.
///
/// A failure leaves the batch at the last state it reached; rows persisted
/// by then stay durable but permanently invisible (`active` is never set).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum BatchState {
    Received,
    Validated,
    PersistedInactive,
    Linked,
    Voided,
    Active,
}

/// Stores statement batches with atomic visibility.
pub struct Storer<'a> {
    store: &'a dyn StatementStore,
    sink: Option<&'a dyn AttachmentSink>,
}

impl<'a> Storer<'a> {
    pub fn new(store: &'a dyn StatementStore) -> Self {
        Self { store, sink: None }
    }

    /// Attach a sink for validated attachment bytes.
    pub fn with_attachment_sink(mut self, sink: &'a dyn AttachmentSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Store one batch. Returns the batch's statement ids in submission
    /// order, duplicates collapsed to their first occurrence.
    pub fn store(
        &self,
        authority: &Authority,
        statements: Vec<Statement>,
        attachments: &[Vec<u8>],
    ) -> Result<Vec<Uuid>, LedgerError> {
        let mut state = BatchState::Received;
        let tenant = &authority.tenant;
        debug!(%tenant, batch_len = statements.len(), ?state, "batch received");

        // Stamp ids and the canonical-excluded server fields up front.
        // `stored` is shared by the whole batch. `timestamp` defaults only
        // after dedup: a defaulted value differs per batch and would turn
        // identical resubmissions into conflicts.
        let stored = Utc::now();
        let statements: Vec<Statement> = statements
            .into_iter()
            .map(|mut statement| {
                statement.authority = Some(authority.agent.clone());
                statement.stored = Some(stored);
                statement.id.get_or_insert_with(Uuid::new_v4);
                statement
            })
            .collect();

        let parts = self.validate(&statements, attachments)?;
        state = BatchState::Validated;
        debug!(%tenant, ?state, "batch validated");

        let outcome = detect_duplicates(self.store, tenant, statements)?;

        for mut statement in outcome.fresh {
            let id = statement
                .id
                .ok_or_else(|| LedgerError::invalid("statement.id", "lost id after dedup"))?;
            statement.timestamp.get_or_insert(stored);
            self.store
                .insert(StatementRecord::new(tenant.clone(), id, statement, stored))?;
        }
        state = BatchState::PersistedInactive;
        debug!(%tenant, ids = outcome.ids.len(), ?state, "batch persisted inactive");

        Linker::new(self.store, tenant).link(&outcome.ids)?;
        state = BatchState::Linked;
        debug!(%tenant, ?state, "batch linked");

        apply_voids(self.store, tenant, &outcome.ids)?;
        state = BatchState::Voided;
        debug!(%tenant, ?state, "batch voided");

        let activated = self.store.activate(tenant, &outcome.ids)?;
        state = BatchState::Active;
        debug!(%tenant, activated, ?state, "batch active");

        self.sink_attachments(authority, &parts)?;

        Ok(outcome.ids)
    }

    /// Validate every statement and attachment part, aggregating all field
    /// errors into one failure.
    fn validate(
        &self,
        statements: &[Statement],
        attachments: &[Vec<u8>],
    ) -> Result<Vec<AttachmentPart>, LedgerError> {
        let mut errors: Vec<FieldError> = Vec::new();
        for (i, statement) in statements.iter().enumerate() {
            for error in validate_statement(statement) {
                let rest = error
                    .path
                    .strip_prefix("statement.")
                    .unwrap_or(&error.path);
                errors.push(FieldError::new(
                    format!("statements[{i}].{rest}"),
                    error.message,
                ));
            }
        }
        if !errors.is_empty() {
            warn!(count = errors.len(), "batch failed validation");
            return Err(LedgerError::Validation(errors));
        }

        let parts = attachments
            .iter()
            .map(|raw| parse_part(raw))
            .collect::<Result<Vec<_>, _>>()?;
        check_declared_hashes(statements, &parts)?;
        Ok(parts)
    }

    fn sink_attachments(
        &self,
        authority: &Authority,
        parts: &[AttachmentPart],
    ) -> Result<(), LedgerError> {
        if parts.is_empty() {
            return Ok(());
        }
        let sink = self.sink.ok_or_else(|| {
            LedgerError::Store(StoreError::Io("no attachment sink configured".into()))
        })?;
        for part in parts {
            sink.store(&authority.tenant, &part.hash, &part.content_type, &part.body)?;
        }
        Ok(())
    }
}
