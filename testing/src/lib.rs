//! # todoflow Testing
//!
//! Testing utilities and helpers for todoflow.
//!
//! This crate provides:
//! - Deterministic implementations of Environment traits (clocks)
//! - An in-memory [`TodoStore`](todoflow_core::TodoStore) with live queries
//!   and failure injection
//! - Helpers for awaiting live lists and watch channels with a timeout
//! - Property-based testing strategies for todo fixtures
//!
//! ## Example
//!
//! ```ignore
//! use todoflow_runtime::TodoRepository;
//! use todoflow_testing::{InMemoryTodoStore, helpers, test_clock};
//!
//! #[tokio::test]
//! async fn test_insert() {
//!     let store = InMemoryTodoStore::new();
//!     let repository = TodoRepository::new(store.clone(), Arc::new(test_clock()));
//!
//!     repository.insert_todo("Buy milk", "").await.unwrap();
//!
//!     let todos = helpers::next_emission(&mut repository.all_todos()).await.unwrap();
//!     assert_eq!(todos.len(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use todoflow_core::environment::Clock;

/// In-memory record store
pub mod store_mocks;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::Duration;
    use std::sync::{Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use todoflow_testing::mocks::FixedClock;
    /// use todoflow_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that moves forward by a fixed step on every reading.
    ///
    /// The first reading returns the start time. Useful when a test needs
    /// distinct, strictly increasing creation or completion stamps.
    ///
    /// # Example
    ///
    /// ```
    /// use todoflow_testing::mocks::SteppingClock;
    /// use todoflow_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = SteppingClock::new(Utc::now(), Duration::seconds(1));
    /// let first = clock.now();
    /// assert_eq!(clock.now() - first, Duration::seconds(1));
    /// ```
    #[derive(Debug)]
    pub struct SteppingClock {
        next: Mutex<DateTime<Utc>>,
        step: Duration,
    }

    impl SteppingClock {
        /// Create a clock starting at `start` that advances by `step`
        #[must_use]
        pub const fn new(start: DateTime<Utc>, step: Duration) -> Self {
            Self {
                next: Mutex::new(start),
                step,
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
            let now = *next;
            *next = now + self.step;
            now
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Create a stepping clock for tests, starting at 2025-01-01 00:00:00 UTC
    /// and advancing one second per reading
    #[must_use]
    pub fn stepping_test_clock() -> SteppingClock {
        SteppingClock::new(test_clock().now(), Duration::seconds(1))
    }
}

/// Test helpers and utilities
///
/// Every helper waits with a timeout so a broken reactive pipeline fails the
/// test instead of hanging it.
pub mod helpers {
    use futures::StreamExt;
    use std::time::Duration;
    use todoflow_core::{LiveList, Todo};
    use tokio::sync::watch;

    /// How long helpers wait before giving up
    pub const DEFAULT_WAIT: Duration = Duration::from_secs(2);

    /// Next result set from a live list.
    ///
    /// Returns `None` if the stream ended or nothing arrived within
    /// [`DEFAULT_WAIT`].
    pub async fn next_emission(stream: &mut LiveList) -> Option<Vec<Todo>> {
        tokio::time::timeout(DEFAULT_WAIT, stream.next())
            .await
            .ok()
            .flatten()
    }

    /// Wait until the watched value satisfies `predicate`, and return it.
    ///
    /// The current value is checked first. Returns `None` on timeout or when
    /// the sender is dropped.
    pub async fn wait_for<T, F>(receiver: &mut watch::Receiver<T>, mut predicate: F) -> Option<T>
    where
        T: Clone,
        F: FnMut(&T) -> bool,
    {
        let waited = tokio::time::timeout(DEFAULT_WAIT, receiver.wait_for(|value| predicate(value)))
            .await
            .ok()?;
        waited.ok().map(|value| value.clone())
    }

    /// Titles of a list, in order
    #[must_use]
    pub fn titles(todos: &[Todo]) -> Vec<String> {
        todos.iter().map(|todo| todo.title.clone()).collect()
    }

    /// Install a `tracing` subscriber that writes through the test harness.
    ///
    /// Honours `RUST_LOG`; safe to call from every test.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// A non-blank title of up to 24 characters
    pub fn arb_title() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 ]{0,23}"
    }

    /// A small table fixture: `(title, completed)` pairs
    pub fn arb_fixture() -> impl Strategy<Value = Vec<(String, bool)>> {
        proptest::collection::vec((arb_title(), any::<bool>()), 0..12)
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, SteppingClock, stepping_test_clock, test_clock};
pub use store_mocks::InMemoryTodoStore;
