use std::fmt;

use super::statements::Statement;

/// Failure of a single backend statement.
///
/// Connection, SQL, constraint and decode failures all collapse into this
/// one type. `message` is the backend's own error text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{statement} failed: {message}")]
pub struct StorageError {
    pub statement: Statement,
    pub message: String,
}

impl StorageError {
    #[must_use]
    pub fn new(statement: Statement, cause: impl fmt::Display) -> Self {
        Self {
            statement,
            message: cause.to_string(),
        }
    }
}
