//! The todo repository.
//!
//! [`TodoRepository`] is the single entry point above the record store. It
//! hands out the three live lists unchanged and wraps every write with the
//! business rules the store does not know about: creation and completion
//! stamps come from the injected [`Clock`], blank titles are rejected, and
//! an update may never break `is_completed == completed_date.is_some()`.

use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;
use todoflow_core::environment::{Clock, SystemClock};
use todoflow_core::todo::validate_title;
use todoflow_core::{LiveList, Result, Todo, TodoError, TodoId, TodoStore};

/// Business-rule layer over a [`TodoStore`].
///
/// Cloning is cheap and shares the store and the clock.
///
/// # Example
///
/// ```ignore
/// let repository = TodoRepository::new(store, Arc::new(SystemClock));
///
/// let id = repository.insert_todo("Buy milk", "").await?;
/// let todo = repository.get_todo_by_id(id).await?.unwrap();
/// let done = repository.toggle_todo_completed(&todo).await?;
/// assert!(done.completed_date.is_some());
/// ```
pub struct TodoRepository<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for TodoRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S> std::fmt::Debug for TodoRepository<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoRepository").finish_non_exhaustive()
    }
}

impl<S: TodoStore> TodoRepository<S> {
    /// Create a repository over `store`, stamping times with `clock`
    #[must_use]
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Arc::new(store),
            clock,
        }
    }

    /// Create a repository that stamps times with the system clock
    #[must_use]
    pub fn with_system_clock(store: S) -> Self {
        Self::new(store, Arc::new(SystemClock))
    }

    /// The underlying record store
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Every todo, newest first
    #[must_use]
    pub fn all_todos(&self) -> LiveList {
        self.store.query_all()
    }

    /// Open todos, newest first
    #[must_use]
    pub fn active_todos(&self) -> LiveList {
        self.store.query_active()
    }

    /// Completed todos, most recently completed first
    #[must_use]
    pub fn completed_todos(&self) -> LiveList {
        self.store.query_completed()
    }

    /// Create and persist a new, open todo.
    ///
    /// Title and description are stored exactly as given; `created_date` is
    /// taken from the clock.
    ///
    /// # Errors
    ///
    /// - [`TodoError::Validation`] if the title is blank
    /// - [`TodoError::Store`] if the write fails
    #[tracing::instrument(skip(self, description), name = "repository_insert")]
    pub async fn insert_todo(&self, title: &str, description: &str) -> Result<TodoId> {
        let result: Result<TodoId> = async {
            validate_title(title)?;
            let todo = Todo::new(title, description, self.now());
            self.store.insert(&todo).await
        }
        .await;

        record("insert", &result);
        if let Ok(id) = &result {
            tracing::debug!(%id, "Todo created");
        }
        result
    }

    /// Flip a todo's completion and persist it.
    ///
    /// Completing stamps `completed_date` with the clock; reopening clears
    /// it. The record passed in is the one written back, so a concurrent
    /// writer that changed the row in between is overwritten.
    ///
    /// Returns the record as written.
    ///
    /// # Errors
    ///
    /// - [`TodoError::Validation`] if the todo was never inserted
    /// - [`TodoError::NotFound`] if the row no longer exists
    /// - [`TodoError::Store`] if the write fails
    #[tracing::instrument(skip(self, todo), fields(id = %todo.id), name = "repository_toggle")]
    pub async fn toggle_todo_completed(&self, todo: &Todo) -> Result<Todo> {
        let result: Result<Todo> = async {
            require_assigned(todo)?;
            let toggled = todo.toggled(self.now());
            self.store.update(&toggled).await?;
            Ok(toggled)
        }
        .await;

        record("toggle", &result);
        if let Ok(toggled) = &result {
            tracing::debug!(completed = toggled.is_completed, "Todo toggled");
        }
        result
    }

    /// Replace a todo's stored fields.
    ///
    /// # Errors
    ///
    /// - [`TodoError::Validation`] if the title is blank, the completion
    ///   fields disagree, or the todo was never inserted
    /// - [`TodoError::NotFound`] if the row no longer exists
    /// - [`TodoError::Store`] if the write fails
    #[tracing::instrument(skip(self, todo), fields(id = %todo.id), name = "repository_update")]
    pub async fn update_todo(&self, todo: &Todo) -> Result<()> {
        let result: Result<()> = async {
            require_assigned(todo)?;
            todo.validate()?;
            self.store.update(todo).await
        }
        .await;

        record("update", &result);
        result
    }

    /// Delete a single todo.
    ///
    /// # Errors
    ///
    /// - [`TodoError::Validation`] if the todo was never inserted
    /// - [`TodoError::NotFound`] if the row no longer exists
    /// - [`TodoError::Store`] if the write fails
    #[tracing::instrument(skip(self, todo), fields(id = %todo.id), name = "repository_delete")]
    pub async fn delete_todo(&self, todo: &Todo) -> Result<()> {
        let result: Result<()> = async {
            require_assigned(todo)?;
            self.store.delete(todo).await
        }
        .await;

        record("delete", &result);
        result
    }

    /// Delete every completed todo. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::Store`] if the write fails; nothing is removed.
    #[tracing::instrument(skip(self), name = "repository_delete_completed")]
    pub async fn delete_all_completed_todos(&self) -> Result<u64> {
        let result = self.store.delete_completed().await;

        record("delete_completed", &result);
        if let Ok(removed) = &result {
            tracing::debug!(removed, "Completed todos cleared");
        }
        result
    }

    /// Point lookup by id (not live).
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::Store`] if the read fails.
    pub async fn get_todo_by_id(&self, id: TodoId) -> Result<Option<Todo>> {
        self.store.get_by_id(id).await
    }

    /// Current time at the precision the store keeps
    fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(3)
    }
}

fn require_assigned(todo: &Todo) -> Result<()> {
    if todo.id.is_assigned() {
        Ok(())
    } else {
        Err(TodoError::validation("Todo has not been saved yet"))
    }
}

fn record<T>(operation: &'static str, result: &Result<T>) {
    match result {
        Ok(_) => {
            metrics::counter!("todo.repository.operations", "operation" => operation).increment(1);
        },
        Err(error) => {
            metrics::counter!("todo.repository.failures", "operation" => operation).increment(1);
            tracing::warn!(operation, %error, "Repository operation failed");
        },
    }
}
