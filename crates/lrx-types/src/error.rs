use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single validation failure, tied to the field path it occurred at.
///
/// Validators collect these instead of failing fast; callers aggregate the
/// full list into one validation error.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{path}: {message}")]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}
