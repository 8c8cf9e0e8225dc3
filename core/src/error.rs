//! Error taxonomy for todo operations.

use crate::todo::TodoId;
use thiserror::Error;

/// Errors that can occur while reading or mutating todos.
///
/// The type is `Clone` so a failure can be fanned out to several observers
/// (for example over a broadcast channel) without losing information.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TodoError {
    /// The record was rejected before reaching the store
    ///
    /// Raised for blank titles, records whose completion fields disagree,
    /// and writes that reference an id the store never assigned.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// An update or delete referenced an id that does not exist
    #[error("Todo {0} not found")]
    NotFound(TodoId),

    /// The underlying storage engine failed
    ///
    /// Not recoverable by the repository; the persisted data is unchanged.
    #[error("Store error: {0}")]
    Store(String),
}

impl TodoError {
    /// Shorthand for a [`TodoError::Validation`] error
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for a [`TodoError::Store`] error
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }
}

/// Result type for todo operations.
pub type Result<T> = std::result::Result<T, TodoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            TodoError::validation("Todo title cannot be empty").to_string(),
            "Validation failed: Todo title cannot be empty"
        );
        assert_eq!(TodoError::NotFound(TodoId::new(7)).to_string(), "Todo 7 not found");
        assert_eq!(TodoError::store("disk full").to_string(), "Store error: disk full");
    }
}
