use thiserror::Error;

use lrx_store::StoreError;
use lrx_types::FieldError;

/// Errors produced by document operations.
///
/// `Conflict` and `PreconditionFailed` are distinct so callers can map them
/// to their respective statuses.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DocumentError {
    #[error("validation failed with {} field error(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("document not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PreconditionFailed(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DocumentError {
    /// Wrap a single field error as a validation failure.
    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        DocumentError::Validation(vec![FieldError::new(path, message)])
    }
}
