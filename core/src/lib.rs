//! # todoflow Core
//!
//! Core types and traits for the todoflow task tracker.
//!
//! This crate holds everything that does not depend on a concrete storage
//! engine or on the tokio runtime's task machinery:
//!
//! - **Todo**: the single record type, plus its completion transition
//! - **`FilterState` / `TodoQuery`**: the user-facing filter and the three store queries
//! - **`TodoStore`**: the record store contract (point reads, writes, live queries)
//! - **Live queries**: invalidation-driven streams of result sets
//! - **Environment**: injected dependencies such as the [`Clock`](environment::Clock)
//!
//! ## Example
//!
//! ```
//! use todoflow_core::{FilterState, Todo};
//! use chrono::Utc;
//!
//! let todo = Todo::new("Buy milk", "", Utc::now());
//! assert!(FilterState::Active.matches(&todo));
//!
//! let done = todo.toggled(Utc::now());
//! assert!(done.is_completed);
//! assert!(done.is_consistent());
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

/// Error types shared by every todoflow crate
pub mod error;

/// Filter states and store queries
pub mod filter;

/// Invalidation tracking and live query streams
pub mod live;

/// The record store contract
pub mod store;

/// The Todo record and its identifier
pub mod todo;

pub use error::{Result, TodoError};
pub use filter::{FilterState, ParseFilterStateError, TodoQuery};
pub use live::{InvalidationTracker, LiveList};
pub use store::TodoStore;
pub use todo::{Todo, TodoId};

/// Environment module - Dependency injection traits
///
/// All sources of nondeterminism the repository needs are abstracted behind
/// traits so tests can substitute deterministic implementations.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use todoflow_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let first = clock.now();
    /// assert!(clock.now() >= first);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
