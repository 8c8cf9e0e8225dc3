//! # todoflow Runtime
//!
//! Reactive runtime for the todoflow task tracker.
//!
//! This crate turns a [`TodoStore`](todoflow_core::TodoStore) into the live,
//! filtered list a user interface displays, and routes user intents back to
//! the store.
//!
//! ## Core Components
//!
//! - **Repository**: three live lists plus the mutation rules (stamps, validation)
//! - **Filter Controller**: the current [`FilterState`](todoflow_core::FilterState) as shared state
//! - **Derived List**: joins the filter with the three live lists, lazily started
//! - **View Model**: spawns each intent as a task and reports failures
//!
//! ## Example
//!
//! ```ignore
//! use todoflow_runtime::{TodoRepository, TodoViewModel, ViewConfig};
//! use todoflow_sqlite::SqliteTodoStore;
//!
//! let repository = TodoRepository::with_system_clock(SqliteTodoStore::in_memory().await?);
//! let view_model = TodoViewModel::new(repository, ViewConfig::default());
//!
//! let mut todos = view_model.todos();
//! view_model.add_todo("Buy milk", "").wait().await?;
//! todos.changed().await?;
//! assert_eq!(todos.borrow().len(), 1);
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// The derived list combinator
pub mod derived;

/// The filter controller
pub mod filter;

/// Business rules over the record store
pub mod repository;

/// Intent handling and failure reporting
pub mod view_model;

/// Error types for the runtime
pub mod error {
    use thiserror::Error;
    use todoflow_core::TodoError;

    /// Errors surfaced when awaiting a spawned mutation
    #[derive(Error, Debug)]
    pub enum RuntimeError {
        /// The mutation ran and failed
        ///
        /// The same failure is also published on the view model's failure
        /// channel.
        #[error(transparent)]
        Todo(#[from] TodoError),

        /// The mutation task did not finish
        ///
        /// This typically means the task panicked or the runtime was shut
        /// down while it was pending.
        #[error("Mutation task failed: {0}")]
        TaskJoinError(#[from] tokio::task::JoinError),
    }

    impl RuntimeError {
        /// The todo error, if the mutation itself failed
        #[must_use]
        pub const fn as_todo_error(&self) -> Option<&TodoError> {
            match self {
                Self::Todo(error) => Some(error),
                Self::TaskJoinError(_) => None,
            }
        }
    }
}

/// Tuning for the view model and its derived list
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use todoflow_runtime::ViewConfig;
///
/// let config = ViewConfig::default()
///     .with_idle_timeout(Duration::from_secs(1))
///     .with_failure_capacity(8);
/// assert_eq!(config.idle_timeout, Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// How long the derived list keeps running without subscribers
    pub idle_timeout: Duration,
    /// Buffered failures per failure subscriber before old ones are dropped
    pub failure_capacity: usize,
}

impl ViewConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(idle_timeout: Duration, failure_capacity: usize) -> Self {
        Self {
            idle_timeout,
            failure_capacity,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// `TODO_IDLE_TIMEOUT_MS` sets the idle timeout; anything missing or
    /// unparseable keeps its default.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            idle_timeout: env::var("TODO_IDLE_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map_or(defaults.idle_timeout, Duration::from_millis),
            ..defaults
        }
    }

    /// Set the idle timeout
    #[must_use]
    pub const fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the failure channel capacity
    #[must_use]
    pub const fn with_failure_capacity(mut self, capacity: usize) -> Self {
        self.failure_capacity = capacity;
        self
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(5),
            failure_capacity: 32,
        }
    }
}

pub use derived::DerivedTodoList;
pub use error::RuntimeError;
pub use filter::FilterController;
pub use repository::TodoRepository;
pub use view_model::{MutationFailure, MutationHandle, MutationIntent, TodoViewModel};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_view_config() {
        let config = ViewConfig::default();
        assert_eq!(config.idle_timeout, Duration::from_secs(5));
        assert_eq!(config.failure_capacity, 32);
    }

    #[test]
    fn runtime_error_exposes_todo_error() {
        let error = RuntimeError::from(todoflow_core::TodoError::validation("nope"));
        assert_eq!(error.to_string(), "Validation failed: nope");
        assert!(error.as_todo_error().is_some());
    }
}
