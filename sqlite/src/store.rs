//! `SQLite`-backed todo store.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE todos (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     title TEXT NOT NULL,
//!     description TEXT NOT NULL DEFAULT '',
//!     is_completed INTEGER NOT NULL DEFAULT 0,
//!     created_date INTEGER NOT NULL,      -- epoch millis
//!     completed_date INTEGER              -- epoch millis, NULL while open
//! );
//! ```
//!
//! `AUTOINCREMENT` keeps ids stable for a record's whole lifetime: a deleted
//! id is never handed out again.

use crate::config::SqliteConfig;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use todoflow_core::live::live_query;
use todoflow_core::{
    InvalidationTracker, LiveList, Result, Todo, TodoError, TodoId, TodoQuery, TodoStore,
};

const SELECT_TODOS: &str =
    "SELECT id, title, description, is_completed, created_date, completed_date FROM todos";

/// Row shape of the `todos` table
#[derive(Debug, sqlx::FromRow)]
struct TodoRow {
    id: i64,
    title: String,
    description: String,
    is_completed: bool,
    created_date: i64,
    completed_date: Option<i64>,
}

impl TryFrom<TodoRow> for Todo {
    type Error = TodoError;

    fn try_from(row: TodoRow) -> Result<Self> {
        Ok(Self {
            id: TodoId::new(row.id),
            title: row.title,
            description: row.description,
            is_completed: row.is_completed,
            created_date: from_millis(row.created_date)?,
            completed_date: row.completed_date.map(from_millis).transpose()?,
        })
    }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| TodoError::store(format!("Corrupt timestamp in todos table: {millis}")))
}

/// `SQLite`-backed record store.
///
/// Cloning is cheap: clones share the connection pool and the invalidation
/// tracker, so a write through any clone refreshes live queries taken from
/// every other clone.
///
/// # Example
///
/// ```ignore
/// use todoflow_sqlite::SqliteTodoStore;
///
/// let store = SqliteTodoStore::in_memory().await?;
/// let id = store.insert(&Todo::new("Test Todo", "", Utc::now())).await?;
/// assert_eq!(store.get_by_id(id).await?.unwrap().title, "Test Todo");
/// ```
#[derive(Clone, Debug)]
pub struct SqliteTodoStore {
    pool: SqlitePool,
    tracker: InvalidationTracker,
}

impl SqliteTodoStore {
    /// Create a store using an existing connection pool.
    ///
    /// The schema is not touched; call [`migrate`](Self::migrate) when the
    /// database may be fresh.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            tracker: InvalidationTracker::new(),
        }
    }

    /// Open a connection pool from configuration.
    ///
    /// File databases are created if missing and run in WAL mode.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::Store`] if the URL is invalid or the connection fails.
    pub async fn connect(config: &SqliteConfig) -> Result<Self> {
        let mut options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| TodoError::store(format!("Invalid database URL {:?}: {e}", config.url)))?
            .create_if_missing(true)
            .busy_timeout(config.busy_timeout());

        let mut pool_options = SqlitePoolOptions::new().max_connections(config.max_connections.max(1));

        if config.is_in_memory() {
            // The database lives exactly as long as its one connection
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| TodoError::store(format!("Failed to connect: {e}")))?;

        tracing::debug!(url = %config.url, "Connected to SQLite");
        Ok(Self::new(pool))
    }

    /// Open a private, migrated in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::Store`] if the connection or migration fails.
    pub async fn in_memory() -> Result<Self> {
        let store = Self::connect(&SqliteConfig::in_memory()).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Run the embedded migrations.
    ///
    /// Creates the `todos` table and its indexes if they don't already exist.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::Store`] if migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| TodoError::store(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the tracker that drives this store's live queries.
    #[must_use]
    pub const fn tracker(&self) -> &InvalidationTracker {
        &self.tracker
    }

    /// Close every pooled connection.
    ///
    /// Subsequent operations fail with [`TodoError::Store`].
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn fetch_query(pool: &SqlitePool, query: TodoQuery) -> Result<Vec<Todo>> {
    let sql = match query {
        TodoQuery::All => format!("{SELECT_TODOS} ORDER BY created_date DESC, id DESC"),
        TodoQuery::Active => {
            format!("{SELECT_TODOS} WHERE is_completed = 0 ORDER BY created_date DESC, id DESC")
        },
        TodoQuery::Completed => {
            format!("{SELECT_TODOS} WHERE is_completed = 1 ORDER BY completed_date DESC, id DESC")
        },
    };

    let rows: Vec<TodoRow> = sqlx::query_as(&sql)
        .fetch_all(pool)
        .await
        .map_err(|e| TodoError::store(format!("Failed to query {query} todos: {e}")))?;

    rows.into_iter().map(Todo::try_from).collect()
}

impl TodoStore for SqliteTodoStore {
    fn observe(&self, query: TodoQuery) -> LiveList {
        let pool = self.pool.clone();
        live_query(&self.tracker, query, move || {
            let pool = pool.clone();
            async move { fetch_query(&pool, query).await }
        })
    }

    async fn get_by_id(&self, id: TodoId) -> Result<Option<Todo>> {
        let sql = format!("{SELECT_TODOS} WHERE id = ?");

        let row: Option<TodoRow> = sqlx::query_as(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TodoError::store(format!("Failed to get todo {id}: {e}")))?;

        row.map(Todo::try_from).transpose()
    }

    async fn insert(&self, todo: &Todo) -> Result<TodoId> {
        let created = todo.created_date.timestamp_millis();
        let completed = todo.completed_date.map(|at| at.timestamp_millis());

        let query = if todo.id.is_assigned() {
            sqlx::query(
                "INSERT OR REPLACE INTO todos
                     (id, title, description, is_completed, created_date, completed_date)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(todo.id.get())
        } else {
            sqlx::query(
                "INSERT INTO todos (title, description, is_completed, created_date, completed_date)
                 VALUES (?, ?, ?, ?, ?)",
            )
        };

        let result = query
            .bind(&todo.title)
            .bind(&todo.description)
            .bind(todo.is_completed)
            .bind(created)
            .bind(completed)
            .execute(&self.pool)
            .await
            .map_err(|e| TodoError::store(format!("Failed to insert todo: {e}")))?;

        let id = if todo.id.is_assigned() {
            todo.id
        } else {
            TodoId::new(result.last_insert_rowid())
        };

        tracing::debug!(%id, "Inserted todo");
        self.tracker.invalidate();
        Ok(id)
    }

    async fn update(&self, todo: &Todo) -> Result<()> {
        let result = sqlx::query(
            "UPDATE todos
             SET title = ?, description = ?, is_completed = ?, created_date = ?, completed_date = ?
             WHERE id = ?",
        )
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.is_completed)
        .bind(todo.created_date.timestamp_millis())
        .bind(todo.completed_date.map(|at| at.timestamp_millis()))
        .bind(todo.id.get())
        .execute(&self.pool)
        .await
        .map_err(|e| TodoError::store(format!("Failed to update todo {}: {e}", todo.id)))?;

        if result.rows_affected() == 0 {
            return Err(TodoError::NotFound(todo.id));
        }

        tracing::debug!(id = %todo.id, "Updated todo");
        self.tracker.invalidate();
        Ok(())
    }

    async fn delete(&self, todo: &Todo) -> Result<()> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(todo.id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| TodoError::store(format!("Failed to delete todo {}: {e}", todo.id)))?;

        if result.rows_affected() == 0 {
            return Err(TodoError::NotFound(todo.id));
        }

        tracing::debug!(id = %todo.id, "Deleted todo");
        self.tracker.invalidate();
        Ok(())
    }

    async fn delete_completed(&self) -> Result<u64> {
        let removed = sqlx::query("DELETE FROM todos WHERE is_completed = 1")
            .execute(&self.pool)
            .await
            .map_err(|e| TodoError::store(format!("Failed to delete completed todos: {e}")))?
            .rows_affected();

        tracing::debug!(removed, "Deleted completed todos");
        if removed > 0 {
            self.tracker.invalidate();
        }
        Ok(removed)
    }
}
