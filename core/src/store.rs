//! The record store contract.
//!
//! A [`TodoStore`] is the single durable owner of todo records. Everything
//! above it (repository, combinator, presentation) only ever holds snapshots
//! obtained from point reads or live queries.
//!
//! # Implementations
//!
//! - `SqliteTodoStore` (`todoflow-sqlite`) - for production (embedded SQLite)
//! - `InMemoryTodoStore` (`todoflow-testing`) - for tests (fast, failure injection)

use crate::error::Result;
use crate::filter::TodoQuery;
use crate::live::LiveList;
use crate::todo::{Todo, TodoId};
use std::future::Future;

/// Persistent table of todo records.
///
/// All writes are single atomic operations: a failed write leaves the table,
/// and therefore every live query, unchanged. After each committed write the
/// store re-delivers fresh result sets to the live queries it affected.
///
/// # Example
///
/// ```ignore
/// let id = store.insert(&Todo::new("Buy milk", "", Utc::now())).await?;
/// let mut active = store.query_active();
/// let rows = active.next().await; // [Buy milk]
/// ```
pub trait TodoStore: Send + Sync {
    /// Subscribe to a live query.
    ///
    /// The stream yields the current result set first, then a fresh ordered
    /// result set each time a committed write changes it.
    fn observe(&self, query: TodoQuery) -> LiveList;

    /// Point lookup by id (not live).
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::Store`](crate::TodoError::Store) if the read fails.
    fn get_by_id(&self, id: TodoId) -> impl Future<Output = Result<Option<Todo>>> + Send;

    /// Insert a record and return its id.
    ///
    /// An unassigned id gets a fresh store-assigned id. An assigned id
    /// replaces any existing row with that id (upsert).
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::Store`](crate::TodoError::Store) if the write fails.
    fn insert(&self, todo: &Todo) -> impl Future<Output = Result<TodoId>> + Send;

    /// Replace the row with the record's id.
    ///
    /// # Errors
    ///
    /// - [`TodoError::NotFound`](crate::TodoError::NotFound) if no row has that id
    /// - [`TodoError::Store`](crate::TodoError::Store) if the write fails
    fn update(&self, todo: &Todo) -> impl Future<Output = Result<()>> + Send;

    /// Remove the row with the record's id.
    ///
    /// # Errors
    ///
    /// - [`TodoError::NotFound`](crate::TodoError::NotFound) if no row has that id
    /// - [`TodoError::Store`](crate::TodoError::Store) if the write fails
    fn delete(&self, todo: &Todo) -> impl Future<Output = Result<()>> + Send;

    /// Remove every completed row in one atomic operation.
    ///
    /// Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::Store`](crate::TodoError::Store) if the write fails.
    fn delete_completed(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Every todo, newest first
    fn query_all(&self) -> LiveList {
        self.observe(TodoQuery::All)
    }

    /// Open todos, newest first
    fn query_active(&self) -> LiveList {
        self.observe(TodoQuery::Active)
    }

    /// Completed todos, most recently completed first
    fn query_completed(&self) -> LiveList {
        self.observe(TodoQuery::Completed)
    }
}
