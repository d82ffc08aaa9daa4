use thiserror::Error;
use uuid::Uuid;

/// Errors produced by store operations.
///
/// Store failures are never retried here; retry/backoff belongs to the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("statement {id} already exists")]
    DuplicateId { id: Uuid },

    #[error("statement {id} not found")]
    StatementNotFound { id: Uuid },

    #[error("pipeline stage would export data out of the datastore: {target}")]
    ExportRejected { target: String },

    #[error("pipeline must contain exactly one grouping stage")]
    InvalidPipeline,

    #[error("store lock poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
