//! In-memory record store for fast, deterministic tests
//!
//! - [`InMemoryTodoStore`]: `BTreeMap`-backed [`TodoStore`] with live queries
//!   and failure injection

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only happens after a test already panicked

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use todoflow_core::live::live_query;
use todoflow_core::{
    InvalidationTracker, LiveList, Result, Todo, TodoError, TodoId, TodoQuery, TodoStore,
};

/// In-memory record store for fast, deterministic testing.
///
/// Behaves like the `SQLite` store: ids are handed out in increasing order and
/// never reused, inserts with an assigned id upsert, updates and deletes of a
/// missing id report [`TodoError::NotFound`], and every committed write
/// re-delivers the live queries it changed.
///
/// Failures can be injected per direction with
/// [`fail_writes`](Self::fail_writes) and [`fail_reads`](Self::fail_reads).
/// A failed write leaves the table untouched.
///
/// # Example
///
/// ```
/// use todoflow_testing::InMemoryTodoStore;
/// use todoflow_core::{Todo, TodoStore, Utc};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryTodoStore::new();
///
/// let id = store.insert(&Todo::new("Buy milk", "", Utc::now())).await?;
/// assert_eq!(store.get_by_id(id).await?.unwrap().title, "Buy milk");
/// assert_eq!(store.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryTodoStore {
    rows: Arc<RwLock<BTreeMap<TodoId, Todo>>>,
    next_id: Arc<AtomicI64>,
    tracker: InvalidationTracker,
    fail_writes: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryTodoStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
            tracker: InvalidationTracker::new(),
            fail_writes: Arc::new(AtomicBool::new(false)),
            fail_reads: Arc::new(AtomicBool::new(false)),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Make every subsequent write fail with [`TodoError::Store`]
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent read (point lookups and live refreshes) fail
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of every row, in id order
    #[must_use]
    pub fn rows(&self) -> Vec<Todo> {
        self.rows.read().unwrap().values().cloned().collect()
    }

    /// Number of stored rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().unwrap().len()
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().unwrap().is_empty()
    }

    /// Number of committed writes so far
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of live queries currently subscribed
    ///
    /// Useful for asserting that a consumer released its subscriptions.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.tracker.observer_count()
    }

    /// Put rows directly into the table, bypassing validation.
    ///
    /// Existing rows with the same ids are replaced. Live queries are
    /// refreshed once for the whole batch.
    pub fn seed(&self, todos: impl IntoIterator<Item = Todo>) {
        {
            let mut rows = self.rows.write().unwrap();
            for todo in todos {
                let id = if todo.id.is_assigned() {
                    self.next_id.fetch_max(todo.id.get() + 1, Ordering::SeqCst);
                    todo.id
                } else {
                    TodoId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
                };
                rows.insert(id, todo.with_id(id));
            }
        }
        self.tracker.invalidate();
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TodoError::store("Injected write failure"));
        }
        Ok(())
    }

    fn check_readable(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(TodoError::store("Injected read failure"));
        }
        Ok(())
    }

    fn committed(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.tracker.invalidate();
    }
}

impl Default for InMemoryTodoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TodoStore for InMemoryTodoStore {
    fn observe(&self, query: TodoQuery) -> LiveList {
        let store = self.clone();
        live_query(&self.tracker, query, move || {
            let store = store.clone();
            async move {
                store.check_readable()?;
                Ok(query.apply(store.rows.read().unwrap().values()))
            }
        })
    }

    async fn get_by_id(&self, id: TodoId) -> Result<Option<Todo>> {
        self.check_readable()?;
        Ok(self.rows.read().unwrap().get(&id).cloned())
    }

    async fn insert(&self, todo: &Todo) -> Result<TodoId> {
        self.check_writable()?;

        let id = if todo.id.is_assigned() {
            self.next_id.fetch_max(todo.id.get() + 1, Ordering::SeqCst);
            todo.id
        } else {
            TodoId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
        };
        self.rows.write().unwrap().insert(id, todo.clone().with_id(id));

        self.committed();
        Ok(id)
    }

    async fn update(&self, todo: &Todo) -> Result<()> {
        self.check_writable()?;

        {
            let mut rows = self.rows.write().unwrap();
            let row = rows.get_mut(&todo.id).ok_or(TodoError::NotFound(todo.id))?;
            *row = todo.clone();
        }

        self.committed();
        Ok(())
    }

    async fn delete(&self, todo: &Todo) -> Result<()> {
        self.check_writable()?;

        self.rows
            .write()
            .unwrap()
            .remove(&todo.id)
            .ok_or(TodoError::NotFound(todo.id))?;

        self.committed();
        Ok(())
    }

    async fn delete_completed(&self) -> Result<u64> {
        self.check_writable()?;

        let removed = {
            let mut rows = self.rows.write().unwrap();
            let before = rows.len();
            rows.retain(|_, todo| !todo.is_completed);
            before - rows.len()
        };

        if removed > 0 {
            self.committed();
        }
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }
}
