use thiserror::Error;
use uuid::Uuid;

use lrx_store::StoreError;
use lrx_types::FieldError;

/// Errors produced by query operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("validation failed with {} field error(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("statement {id} not found")]
    NotFound { id: Uuid },

    #[error(transparent)]
    Store(#[from] StoreError),
}
