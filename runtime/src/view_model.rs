//! The view model: the inbound intent surface.
//!
//! Every mutation intent is spawned as its own task and answered with a
//! [`MutationHandle`]. Callers may await the handle or drop it; either way a
//! failure is logged and published on the failure channel, so no error is
//! silently lost.
//!
//! Mutations pass through one async gate, so the read-modify-write of one
//! intent never interleaves with another intent sent through the same view
//! model. A toggle re-reads its row inside the gate, so toggling the same
//! snapshot twice completes and then reopens it. Writers that bypass the
//! view model are not covered by the gate.

use crate::derived::DerivedTodoList;
use crate::error::RuntimeError;
use crate::filter::FilterController;
use crate::repository::TodoRepository;
use crate::ViewConfig;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use todoflow_core::{FilterState, Result, Todo, TodoError, TodoId, TodoStore};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;

/// Which intent a mutation came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MutationIntent {
    /// `add_todo`
    Add,
    /// `toggle_todo_completed`
    Toggle(TodoId),
    /// `update_todo`
    Update(TodoId),
    /// `delete_todo`
    Delete(TodoId),
    /// `delete_all_completed_todos`
    ClearCompleted,
}

impl MutationIntent {
    /// Short label used in logs and metrics
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Toggle(_) => "toggle",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
            Self::ClearCompleted => "clear_completed",
        }
    }
}

impl fmt::Display for MutationIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add | Self::ClearCompleted => f.write_str(self.name()),
            Self::Toggle(id) | Self::Update(id) | Self::Delete(id) => {
                write!(f, "{} #{id}", self.name())
            },
        }
    }
}

/// A failed mutation, as published on the failure channel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationFailure {
    /// The intent that failed
    pub intent: MutationIntent,
    /// Why it failed
    pub error: TodoError,
}

impl fmt::Display for MutationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.intent, self.error)
    }
}

/// Handle to a spawned mutation.
///
/// Dropping the handle does not cancel the mutation.
///
/// # Example
///
/// ```ignore
/// let id = view_model.add_todo("Buy milk", "").wait().await?;
///
/// // Fire and forget: failures still reach `subscribe_failures()`
/// let _ = view_model.delete_all_completed_todos();
/// ```
#[derive(Debug)]
pub struct MutationHandle<T> {
    intent: MutationIntent,
    task: JoinHandle<Result<T>>,
}

impl<T> MutationHandle<T> {
    /// The intent this handle belongs to
    #[must_use]
    pub const fn intent(&self) -> MutationIntent {
        self.intent
    }

    /// Whether the mutation has finished
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the mutation and return its result.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::Todo`] if the mutation failed
    /// - [`RuntimeError::TaskJoinError`] if the task panicked or was cancelled
    pub async fn wait(self) -> std::result::Result<T, RuntimeError> {
        Ok(self.task.await??)
    }
}

/// Intent surface over a repository, a filter and the derived list.
///
/// # Example
///
/// ```ignore
/// let view_model = TodoViewModel::new(repository, &ViewConfig::default());
/// let mut failures = view_model.subscribe_failures();
/// let mut todos = view_model.todos();
///
/// view_model.set_filter(FilterState::Active);
/// let id = view_model.add_todo("Write docs", "").wait().await?;
/// ```
pub struct TodoViewModel<S> {
    repository: TodoRepository<S>,
    filter: Arc<FilterController>,
    todos: DerivedTodoList<S>,
    gate: Arc<Mutex<()>>,
    failures: broadcast::Sender<MutationFailure>,
}

impl<S: TodoStore + 'static> TodoViewModel<S> {
    /// Create a view model with its own filter, starting at `All`
    #[must_use]
    pub fn new(repository: TodoRepository<S>, config: &ViewConfig) -> Self {
        Self::with_filter(repository, Arc::new(FilterController::new()), config)
    }

    /// Create a view model around an existing filter controller
    #[must_use]
    pub fn with_filter(
        repository: TodoRepository<S>,
        filter: Arc<FilterController>,
        config: &ViewConfig,
    ) -> Self {
        let todos = DerivedTodoList::new(repository.clone(), filter.subscribe(), config.idle_timeout);
        let (failures, _) = broadcast::channel(config.failure_capacity.max(1));

        Self {
            repository,
            filter,
            todos,
            gate: Arc::new(Mutex::new(())),
            failures,
        }
    }

    /// The repository intents are sent to
    #[must_use]
    pub const fn repository(&self) -> &TodoRepository<S> {
        &self.repository
    }

    /// The filter controller
    #[must_use]
    pub const fn filter(&self) -> &Arc<FilterController> {
        &self.filter
    }

    /// The derived list combinator
    #[must_use]
    pub const fn derived(&self) -> &DerivedTodoList<S> {
        &self.todos
    }

    // ========================================================================
    // Outbound
    // ========================================================================

    /// The filtered live list
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn todos(&self) -> watch::Receiver<Vec<Todo>> {
        self.todos.subscribe()
    }

    /// The current filter state
    #[must_use]
    pub fn filter_state(&self) -> watch::Receiver<FilterState> {
        self.filter.subscribe()
    }

    /// Failed mutations from now on
    #[must_use]
    pub fn subscribe_failures(&self) -> broadcast::Receiver<MutationFailure> {
        self.failures.subscribe()
    }

    // ========================================================================
    // Inbound intents
    // ========================================================================

    /// Create a todo. Resolves to its id.
    pub fn add_todo(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> MutationHandle<TodoId> {
        let title = title.into();
        let description = description.into();
        self.spawn(MutationIntent::Add, move |repository| async move {
            repository.insert_todo(&title, &description).await
        })
    }

    /// Flip a todo's completion. Resolves to the record as written.
    ///
    /// Only the id of `todo` is used: the stored row is read again once the
    /// mutation holds the gate, and that record is toggled.
    pub fn toggle_todo_completed(&self, todo: Todo) -> MutationHandle<Todo> {
        self.spawn(MutationIntent::Toggle(todo.id), move |repository| async move {
            let current = if todo.id.is_assigned() {
                repository
                    .get_todo_by_id(todo.id)
                    .await?
                    .ok_or(TodoError::NotFound(todo.id))?
            } else {
                // Let the repository reject it
                todo
            };
            repository.toggle_todo_completed(&current).await
        })
    }

    /// Replace a todo's stored fields
    pub fn update_todo(&self, todo: Todo) -> MutationHandle<()> {
        self.spawn(MutationIntent::Update(todo.id), move |repository| async move {
            repository.update_todo(&todo).await
        })
    }

    /// Delete a todo
    pub fn delete_todo(&self, todo: Todo) -> MutationHandle<()> {
        self.spawn(MutationIntent::Delete(todo.id), move |repository| async move {
            repository.delete_todo(&todo).await
        })
    }

    /// Delete every completed todo. Resolves to the number removed.
    pub fn delete_all_completed_todos(&self) -> MutationHandle<u64> {
        self.spawn(MutationIntent::ClearCompleted, |repository| async move {
            repository.delete_all_completed_todos().await
        })
    }

    /// Change the filter. Returns `true` if it changed.
    pub fn set_filter(&self, filter: FilterState) -> bool {
        metrics::counter!("todo.view.intents", "intent" => "set_filter").increment(1);
        self.filter.set_filter(filter)
    }

    /// Point lookup by id.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::Store`] if the read fails.
    pub async fn get_todo_by_id(&self, id: TodoId) -> Result<Option<Todo>> {
        self.repository.get_todo_by_id(id).await
    }

    fn spawn<T, F, Fut>(&self, intent: MutationIntent, mutation: F) -> MutationHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(TodoRepository<S>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        metrics::counter!("todo.view.intents", "intent" => intent.name()).increment(1);

        let repository = self.repository.clone();
        let gate = Arc::clone(&self.gate);
        let failures = self.failures.clone();

        let task = tokio::spawn(async move {
            let _turn = gate.lock().await;
            let result = mutation(repository).await;

            if let Err(error) = &result {
                tracing::warn!(%intent, %error, "Mutation failed");
                metrics::counter!("todo.view.failures", "intent" => intent.name()).increment(1);
                // Err only means nobody is listening for failures
                let _ = failures.send(MutationFailure {
                    intent,
                    error: error.clone(),
                });
            }
            result
        });

        MutationHandle { intent, task }
    }
}

impl<S> fmt::Debug for TodoViewModel<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TodoViewModel")
            .field("filter", &self.filter.current())
            .field("todos", &self.todos)
            .finish_non_exhaustive()
    }
}
