use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use lrx_store::StoreError;
use lrx_types::FieldError;

/// Errors produced by ingestion operations.
///
/// `Validation` carries every field error collected for the batch, not just
/// the first; `Conflict` is distinct so callers can map it to a conflict
/// status.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("validation failed with {} field error(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("conflicting statements share id {id}")]
    Conflict {
        id: Uuid,
        submitted: Value,
        existing: Value,
    },

    #[error("statement {id} not found")]
    NotFound { id: Uuid },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Wrap a single field error as a validation failure.
    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        LedgerError::Validation(vec![FieldError::new(path, message)])
    }
}
