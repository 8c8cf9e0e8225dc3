//! Integration tests for the view model intents

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use std::sync::Arc;
use std::time::Duration;
use todoflow_core::{FilterState, TodoError, TodoId};
use todoflow_runtime::{
    FilterController, MutationFailure, MutationIntent, RuntimeError, TodoRepository,
    TodoViewModel, ViewConfig,
};
use todoflow_sqlite::SqliteTodoStore;
use todoflow_testing::helpers::{titles, wait_for};
use todoflow_testing::{InMemoryTodoStore, stepping_test_clock};

fn view_model(store: &InMemoryTodoStore) -> TodoViewModel<InMemoryTodoStore> {
    let repository = TodoRepository::new(store.clone(), Arc::new(stepping_test_clock()));
    TodoViewModel::new(repository, &ViewConfig::default())
}

async fn next_failure(
    failures: &mut tokio::sync::broadcast::Receiver<MutationFailure>,
) -> MutationFailure {
    tokio::time::timeout(Duration::from_secs(2), failures.recv())
        .await
        .expect("no failure published")
        .unwrap()
}

// ============================================================================
// Handles
// ============================================================================

#[tokio::test]
async fn add_resolves_with_the_new_id() {
    let store = InMemoryTodoStore::new();
    let vm = view_model(&store);

    let handle = vm.add_todo("Buy milk", "2 litres");
    assert_eq!(handle.intent(), MutationIntent::Add);
    let id = handle.wait().await.unwrap();

    let todo = vm.get_todo_by_id(id).await.unwrap().unwrap();
    assert_eq!(todo.title, "Buy milk");
    assert_eq!(todo.description, "2 litres");
}

#[tokio::test]
async fn toggle_update_delete_round() {
    let store = InMemoryTodoStore::new();
    let vm = view_model(&store);
    let id = vm.add_todo("Draft", "").wait().await.unwrap();
    let todo = vm.get_todo_by_id(id).await.unwrap().unwrap();

    let done = vm.toggle_todo_completed(todo).wait().await.unwrap();
    assert!(done.is_completed);

    let renamed = todoflow_core::Todo {
        title: "Final".to_string(),
        ..done
    };
    vm.update_todo(renamed.clone()).wait().await.unwrap();
    assert_eq!(vm.get_todo_by_id(id).await.unwrap(), Some(renamed.clone()));

    vm.delete_todo(renamed).wait().await.unwrap();
    assert_eq!(vm.get_todo_by_id(id).await.unwrap(), None);
}

#[tokio::test]
async fn clear_completed_reports_count() {
    let store = InMemoryTodoStore::new();
    let vm = view_model(&store);
    vm.add_todo("Active", "").wait().await.unwrap();
    for title in ["Done1", "Done2"] {
        let id = vm.add_todo(title, "").wait().await.unwrap();
        let todo = vm.get_todo_by_id(id).await.unwrap().unwrap();
        vm.toggle_todo_completed(todo).wait().await.unwrap();
    }

    assert_eq!(vm.delete_all_completed_todos().wait().await.unwrap(), 2);
    assert_eq!(titles(&store.rows()), vec!["Active"]);
}

#[tokio::test]
async fn dropped_handle_still_runs() {
    let store = InMemoryTodoStore::new();
    let vm = view_model(&store);
    let mut todos = vm.todos();

    drop(vm.add_todo("Fire and forget", ""));

    let list = wait_for(&mut todos, |list| !list.is_empty()).await.unwrap();
    assert_eq!(titles(&list), vec!["Fire and forget"]);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn failures_resolve_the_handle_and_are_published() {
    let store = InMemoryTodoStore::new();
    let vm = view_model(&store);
    let mut failures = vm.subscribe_failures();

    let error = vm.add_todo("   ", "").wait().await.unwrap_err();

    assert!(matches!(error, RuntimeError::Todo(TodoError::Validation(_))));
    let failure = next_failure(&mut failures).await;
    assert_eq!(failure.intent, MutationIntent::Add);
    assert!(matches!(failure.error, TodoError::Validation(_)));
}

#[tokio::test]
async fn ignored_failures_are_still_published() {
    let store = InMemoryTodoStore::new();
    let vm = view_model(&store);
    let id = vm.add_todo("Task", "").wait().await.unwrap();
    let todo = vm.get_todo_by_id(id).await.unwrap().unwrap();
    let mut failures = vm.subscribe_failures();

    store.fail_writes(true);
    drop(vm.toggle_todo_completed(todo));

    let failure = next_failure(&mut failures).await;
    assert_eq!(failure.intent, MutationIntent::Toggle(id));
    assert_eq!(failure.error, TodoError::store("Injected write failure"));
    assert!(!store.rows()[0].is_completed);
}

#[tokio::test]
async fn deleting_a_missing_todo_is_not_found() {
    let store = InMemoryTodoStore::new();
    let vm = view_model(&store);
    let ghost = todoflow_core::Todo::new("Ghost", "", chrono::Utc::now()).with_id(TodoId::new(7));

    let error = vm.delete_todo(ghost).wait().await.unwrap_err();

    assert_eq!(error.as_todo_error(), Some(&TodoError::NotFound(TodoId::new(7))));
}

// ============================================================================
// Gate
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_toggles_of_one_snapshot_alternate() {
    let store = InMemoryTodoStore::new();
    let vm = view_model(&store);
    let id = vm.add_todo("Task", "").wait().await.unwrap();
    let snapshot = vm.get_todo_by_id(id).await.unwrap().unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| vm.toggle_todo_completed(snapshot.clone()))
        .collect();
    let mut completed = 0;
    for handle in handles {
        let written = handle.wait().await.unwrap();
        assert!(written.is_consistent());
        completed += usize::from(written.is_completed);
    }

    assert_eq!(completed, 4);
    let stored = vm.get_todo_by_id(id).await.unwrap().unwrap();
    assert!(!stored.is_completed);
    assert_eq!(stored.completed_date, None);
}

#[tokio::test]
async fn toggling_a_stale_snapshot_uses_the_stored_row() {
    let store = InMemoryTodoStore::new();
    let vm = view_model(&store);
    let id = vm.add_todo("Task", "").wait().await.unwrap();
    let stale = vm.get_todo_by_id(id).await.unwrap().unwrap();

    let first = vm.toggle_todo_completed(stale.clone()).wait().await.unwrap();
    let second = vm.toggle_todo_completed(stale).wait().await.unwrap();

    assert!(first.is_completed);
    assert!(!second.is_completed);
    assert!(!store.rows()[0].is_completed);
}

#[tokio::test]
async fn toggling_a_deleted_todo_is_not_found() {
    let store = InMemoryTodoStore::new();
    let vm = view_model(&store);
    let id = vm.add_todo("Task", "").wait().await.unwrap();
    let todo = vm.get_todo_by_id(id).await.unwrap().unwrap();
    vm.delete_todo(todo.clone()).wait().await.unwrap();

    let error = vm.toggle_todo_completed(todo).wait().await.unwrap_err();

    assert_eq!(error.as_todo_error(), Some(&TodoError::NotFound(id)));
}

// ============================================================================
// Filter
// ============================================================================

#[tokio::test]
async fn set_filter_drives_the_list() {
    let store = InMemoryTodoStore::new();
    let vm = view_model(&store);
    let mut filter_state = vm.filter_state();
    let mut todos = vm.todos();
    vm.add_todo("Open", "").wait().await.unwrap();
    let id = vm.add_todo("Closed", "").wait().await.unwrap();
    let closed = vm.get_todo_by_id(id).await.unwrap().unwrap();
    vm.toggle_todo_completed(closed).wait().await.unwrap();
    wait_for(&mut todos, |list| list.len() == 2).await.unwrap();

    assert!(vm.set_filter(FilterState::Completed));
    assert!(!vm.set_filter(FilterState::Completed));
    assert_eq!(*filter_state.borrow_and_update(), FilterState::Completed);

    let list = wait_for(&mut todos, |list| list.len() == 1).await.unwrap();
    assert_eq!(titles(&list), vec!["Closed"]);
}

#[tokio::test]
async fn shares_an_injected_filter() {
    let store = InMemoryTodoStore::new();
    let filter = Arc::new(FilterController::with_initial(FilterState::Active));
    let repository = TodoRepository::new(store.clone(), Arc::new(stepping_test_clock()));
    let vm = TodoViewModel::with_filter(repository, Arc::clone(&filter), &ViewConfig::default());

    filter.set_filter(FilterState::Completed);

    assert_eq!(*vm.filter_state().borrow(), FilterState::Completed);
    assert!(Arc::ptr_eq(vm.filter(), &filter));
}

#[tokio::test]
async fn works_over_sqlite() {
    let repository = TodoRepository::new(
        SqliteTodoStore::in_memory().await.unwrap(),
        Arc::new(stepping_test_clock()),
    );
    let vm = TodoViewModel::new(repository, &ViewConfig::default());
    let mut todos = vm.todos();

    vm.add_todo("First", "").wait().await.unwrap();
    vm.add_todo("Second", "").wait().await.unwrap();

    let list = wait_for(&mut todos, |list| list.len() == 2).await.unwrap();
    assert_eq!(titles(&list), vec!["Second", "First"]);
}
