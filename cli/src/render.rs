//! Text rendering of todos.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use todoflow_core::{FilterState, Todo};

/// Shown instead of an empty list
pub const EMPTY_LIST: &str = "No todos yet. Add some!";

/// `Jan 05, 2025`
#[must_use]
pub fn date(at: DateTime<Utc>) -> String {
    at.format("%b %d, %Y").to_string()
}

/// The date line under an item: completion date if done, else creation date
#[must_use]
pub fn date_line(todo: &Todo) -> String {
    match todo.completed_date {
        Some(completed) if todo.is_completed => format!("Completed: {}", date(completed)),
        _ => format!("Created: {}", date(todo.created_date)),
    }
}

/// One list entry
#[must_use]
pub fn item(todo: &Todo) -> String {
    let status = if todo.is_completed { "✓" } else { " " };
    let mut out = format!("[{status}] #{} {}", todo.id, todo.title);
    if !todo.description.is_empty() {
        let _ = write!(out, "\n      {}", todo.description);
    }
    let _ = write!(out, "\n      {}", date_line(todo));
    out
}

/// A whole list under a filter heading
#[must_use]
pub fn list(todos: &[Todo], filter: FilterState) -> String {
    let mut out = format!("== {filter} ({}) ==\n", todos.len());
    if todos.is_empty() {
        out.push_str(EMPTY_LIST);
        return out;
    }
    let items: Vec<String> = todos.iter().map(item).collect();
    out.push_str(&items.join("\n"));
    out
}

/// Every field of one todo
#[must_use]
pub fn detail(todo: &Todo) -> String {
    let mut out = format!("#{} {}\n", todo.id, todo.title);
    if !todo.description.is_empty() {
        let _ = writeln!(out, "  {}", todo.description);
    }
    let status = if todo.is_completed { "completed" } else { "active" };
    let _ = writeln!(out, "  Status:  {status}");
    let _ = write!(out, "  Created: {}", date(todo.created_date));
    if let Some(completed) = todo.completed_date {
        let _ = write!(out, "\n  Completed: {}", date(completed));
    }
    out
}
