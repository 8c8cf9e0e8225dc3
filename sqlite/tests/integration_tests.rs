//! Integration tests for the `SQLite` todo store
//!
//! Every test runs against its own private in-memory database; the
//! persistence test uses a temporary file.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use chrono::{DateTime, TimeZone, Utc};
use futures::StreamExt;
use std::time::Duration;
use todoflow_core::{LiveList, Todo, TodoError, TodoId, TodoStore};
use todoflow_sqlite::{SqliteConfig, SqliteTodoStore};

// ============================================================================
// Helpers
// ============================================================================

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_735_689_600 + secs, 0).single().unwrap()
}

fn active(title: &str, created: i64) -> Todo {
    Todo::new(title, "", at(created))
}

fn completed(title: &str, created: i64, completed: i64) -> Todo {
    Todo::new(title, "", at(created)).toggled(at(completed))
}

async fn next(stream: &mut LiveList) -> Vec<Todo> {
    tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("live query did not emit in time")
        .expect("live query ended")
}

fn titles(todos: &[Todo]) -> Vec<&str> {
    todos.iter().map(|t| t.title.as_str()).collect()
}

// ============================================================================
// Point operations
// ============================================================================

#[tokio::test]
async fn insert_and_get_todo() {
    let store = SqliteTodoStore::in_memory().await.unwrap();

    let id = store.insert(&active("Test Todo", 0)).await.unwrap();
    let loaded = store.get_by_id(id).await.unwrap().unwrap();

    assert!(id.is_assigned());
    assert_eq!(loaded.id, id);
    assert_eq!(loaded.title, "Test Todo");
    assert!(!loaded.is_completed);
    assert_eq!(loaded.completed_date, None);
    assert_eq!(loaded.created_date, at(0));
}

#[tokio::test]
async fn update_todo() {
    let store = SqliteTodoStore::in_memory().await.unwrap();
    let id = store.insert(&active("Original", 0)).await.unwrap();

    let loaded = store.get_by_id(id).await.unwrap().unwrap();
    let updated = Todo {
        title: "Updated".to_string(),
        ..loaded
    };
    store.update(&updated).await.unwrap();

    let reloaded = store.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(reloaded.title, "Updated");
}

#[tokio::test]
async fn delete_todo() {
    let store = SqliteTodoStore::in_memory().await.unwrap();
    let id = store.insert(&active("X", 0)).await.unwrap();

    let loaded = store.get_by_id(id).await.unwrap().unwrap();
    store.delete(&loaded).await.unwrap();

    assert!(store.get_by_id(id).await.unwrap().is_none());
}

#[tokio::test]
async fn update_missing_row_is_not_found() {
    let store = SqliteTodoStore::in_memory().await.unwrap();
    let ghost = active("Ghost", 0).with_id(TodoId::new(99));

    assert_eq!(store.update(&ghost).await, Err(TodoError::NotFound(TodoId::new(99))));
    assert_eq!(store.delete(&ghost).await, Err(TodoError::NotFound(TodoId::new(99))));
}

#[tokio::test]
async fn insert_with_existing_id_replaces_row() {
    let store = SqliteTodoStore::in_memory().await.unwrap();
    let id = store.insert(&active("First", 0)).await.unwrap();

    let replacement = active("Second", 5).with_id(id);
    let returned = store.insert(&replacement).await.unwrap();

    assert_eq!(returned, id);
    let loaded = store.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(loaded.title, "Second");
    assert_eq!(next(&mut store.query_all()).await.len(), 1);
}

#[tokio::test]
async fn deleted_ids_are_not_reused() {
    let store = SqliteTodoStore::in_memory().await.unwrap();
    let first = store.insert(&active("First", 0)).await.unwrap();
    store.delete(&active("First", 0).with_id(first)).await.unwrap();

    let second = store.insert(&active("Second", 1)).await.unwrap();

    assert_ne!(first, second);
}

#[tokio::test]
async fn completion_fields_round_trip() {
    let store = SqliteTodoStore::in_memory().await.unwrap();

    let id = store.insert(&completed("Done", 0, 30)).await.unwrap();
    let loaded = store.get_by_id(id).await.unwrap().unwrap();

    assert!(loaded.is_completed);
    assert_eq!(loaded.completed_date, Some(at(30)));
}

// ============================================================================
// Queries
// ============================================================================

#[tokio::test]
async fn get_active_todos() {
    let store = SqliteTodoStore::in_memory().await.unwrap();
    store.insert(&active("Active1", 0)).await.unwrap();
    store.insert(&active("Active2", 1)).await.unwrap();
    store.insert(&completed("Completed", 2, 3)).await.unwrap();

    let todos = next(&mut store.query_active()).await;

    assert_eq!(todos.len(), 2);
    let mut names = titles(&todos);
    names.sort_unstable();
    assert_eq!(names, vec!["Active1", "Active2"]);
    assert!(todos.iter().all(|t| !t.is_completed));
}

#[tokio::test]
async fn get_completed_todos() {
    let store = SqliteTodoStore::in_memory().await.unwrap();
    store.insert(&active("Active", 0)).await.unwrap();
    store.insert(&completed("Completed1", 1, 10)).await.unwrap();
    store.insert(&completed("Completed2", 2, 5)).await.unwrap();

    let todos = next(&mut store.query_completed()).await;

    // Most recently completed first
    assert_eq!(titles(&todos), vec!["Completed1", "Completed2"]);
}

#[tokio::test]
async fn all_todos_newest_first() {
    let store = SqliteTodoStore::in_memory().await.unwrap();
    store.insert(&active("Old", 0)).await.unwrap();
    store.insert(&completed("Middle", 10, 50)).await.unwrap();
    store.insert(&active("New", 20)).await.unwrap();

    let todos = next(&mut store.query_all()).await;

    assert_eq!(titles(&todos), vec!["New", "Middle", "Old"]);
}

#[tokio::test]
async fn delete_all_completed_todos() {
    let store = SqliteTodoStore::in_memory().await.unwrap();
    store.insert(&active("Active", 0)).await.unwrap();
    store.insert(&completed("Completed1", 1, 2)).await.unwrap();
    store.insert(&completed("Completed2", 3, 4)).await.unwrap();

    let removed = store.delete_completed().await.unwrap();

    assert_eq!(removed, 2);
    let all = next(&mut store.query_all()).await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "Active");
    assert!(next(&mut store.query_completed()).await.is_empty());
}

#[tokio::test]
async fn active_and_completed_partition_all() {
    let store = SqliteTodoStore::in_memory().await.unwrap();
    for (i, done) in [false, true, true, false, true].into_iter().enumerate() {
        let secs = i64::try_from(i).unwrap();
        let todo = if done {
            completed(&format!("t{i}"), secs, secs + 100)
        } else {
            active(&format!("t{i}"), secs)
        };
        store.insert(&todo).await.unwrap();
    }

    let all = next(&mut store.query_all()).await;
    let active = next(&mut store.query_active()).await;
    let completed = next(&mut store.query_completed()).await;

    assert_eq!(active.len() + completed.len(), all.len());
    for todo in &all {
        let in_active = active.iter().any(|t| t.id == todo.id);
        let in_completed = completed.iter().any(|t| t.id == todo.id);
        assert!(in_active ^ in_completed, "todo {} must be in exactly one list", todo.id);
    }
}

// ============================================================================
// Live queries
// ============================================================================

#[tokio::test]
async fn live_query_follows_writes() {
    let store = SqliteTodoStore::in_memory().await.unwrap();
    let mut all = store.query_all();
    assert!(next(&mut all).await.is_empty());

    let id = store.insert(&active("Write docs", 0)).await.unwrap();
    assert_eq!(titles(&next(&mut all).await), vec!["Write docs"]);

    let done = store.get_by_id(id).await.unwrap().unwrap().toggled(at(10));
    store.update(&done).await.unwrap();
    let after_update = next(&mut all).await;
    assert!(after_update[0].is_completed);

    store.delete(&done).await.unwrap();
    assert!(next(&mut all).await.is_empty());
}

#[tokio::test]
async fn live_query_ignores_unrelated_writes() {
    let store = SqliteTodoStore::in_memory().await.unwrap();
    let mut completed_todos = store.query_completed();
    assert!(next(&mut completed_todos).await.is_empty());

    store.insert(&active("Still open", 0)).await.unwrap();

    let emitted = tokio::time::timeout(Duration::from_secs(1), completed_todos.next()).await;
    assert!(emitted.is_err(), "completed list must not re-emit for an active insert");
}

#[tokio::test]
async fn clones_share_live_queries() {
    let store = SqliteTodoStore::in_memory().await.unwrap();
    let writer = store.clone();
    let mut active_todos = store.query_active();
    assert!(next(&mut active_todos).await.is_empty());

    writer.insert(&active("From clone", 0)).await.unwrap();

    assert_eq!(titles(&next(&mut active_todos).await), vec!["From clone"]);
}

// ============================================================================
// Failures and persistence
// ============================================================================

#[tokio::test]
async fn closed_pool_reports_store_error() {
    let store = SqliteTodoStore::in_memory().await.unwrap();
    store.close().await;

    let result = store.insert(&active("Nope", 0)).await;

    assert!(matches!(result, Err(TodoError::Store(_))));
}

#[tokio::test]
async fn file_database_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("todos.db").display());
    let config = SqliteConfig::new(url);

    let id = {
        let store = SqliteTodoStore::connect(&config).await.unwrap();
        store.migrate().await.unwrap();
        let id = store.insert(&active("Survives restart", 0)).await.unwrap();
        store.close().await;
        id
    };

    let reopened = SqliteTodoStore::connect(&config).await.unwrap();
    reopened.migrate().await.unwrap();
    let loaded = reopened.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(loaded.title, "Survives restart");
    reopened.close().await;
}
