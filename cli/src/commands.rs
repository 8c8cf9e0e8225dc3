//! One-shot commands.
//!
//! Each command sends its intent through the view model, waits for the
//! result, prints it and returns.

use crate::render;
use anyhow::{Context, Result, anyhow};
use futures::StreamExt;
use std::io::Write;
use todoflow_core::{FilterState, Todo, TodoId, TodoStore};
use todoflow_runtime::TodoViewModel;

/// The first result set of the live list behind `filter`
pub async fn snapshot<S: TodoStore + 'static>(
    view_model: &TodoViewModel<S>,
    filter: FilterState,
) -> Result<Vec<Todo>> {
    let repository = view_model.repository();
    let mut live = match filter {
        FilterState::All => repository.all_todos(),
        FilterState::Active => repository.active_todos(),
        FilterState::Completed => repository.completed_todos(),
    };
    live.next()
        .await
        .ok_or_else(|| anyhow!("The {filter} list closed before delivering"))
}

/// Look a todo up, failing if it does not exist
pub async fn find<S: TodoStore + 'static>(view_model: &TodoViewModel<S>, id: TodoId) -> Result<Todo> {
    view_model
        .get_todo_by_id(id)
        .await?
        .ok_or_else(|| anyhow!("No todo #{id}"))
}

/// `todo add`
pub async fn add<S: TodoStore + 'static>(
    view_model: &TodoViewModel<S>,
    title: &str,
    description: &str,
    out: &mut impl Write,
) -> Result<()> {
    let id = view_model.add_todo(title, description).wait().await?;
    writeln!(out, "Added #{id} {title}")?;
    Ok(())
}

/// `todo list`
pub async fn list<S: TodoStore + 'static>(
    view_model: &TodoViewModel<S>,
    filter: FilterState,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let todos = snapshot(view_model, filter).await?;
    if json {
        serde_json::to_writer_pretty(&mut *out, &todos).context("Failed to encode todos")?;
        writeln!(out)?;
    } else {
        writeln!(out, "{}", render::list(&todos, filter))?;
    }
    Ok(())
}

/// `todo show`
pub async fn show<S: TodoStore + 'static>(
    view_model: &TodoViewModel<S>,
    id: TodoId,
    out: &mut impl Write,
) -> Result<()> {
    let todo = find(view_model, id).await?;
    writeln!(out, "{}", render::detail(&todo))?;
    Ok(())
}

/// `todo toggle`
pub async fn toggle<S: TodoStore + 'static>(
    view_model: &TodoViewModel<S>,
    id: TodoId,
    out: &mut impl Write,
) -> Result<()> {
    let todo = find(view_model, id).await?;
    let written = view_model.toggle_todo_completed(todo).wait().await?;
    let verb = if written.is_completed { "Completed" } else { "Reopened" };
    writeln!(out, "{verb} #{id} {}", written.title)?;
    Ok(())
}

/// `todo edit`
pub async fn edit<S: TodoStore + 'static>(
    view_model: &TodoViewModel<S>,
    id: TodoId,
    title: Option<String>,
    description: Option<String>,
    out: &mut impl Write,
) -> Result<()> {
    let todo = find(view_model, id).await?;
    let edited = Todo {
        title: title.map_or(todo.title, |title| title.trim().to_string()),
        description: description.map_or(todo.description, |text| text.trim().to_string()),
        ..todo
    };
    view_model.update_todo(edited.clone()).wait().await?;
    writeln!(out, "Updated #{id} {}", edited.title)?;
    Ok(())
}

/// `todo delete`
pub async fn delete<S: TodoStore + 'static>(
    view_model: &TodoViewModel<S>,
    id: TodoId,
    out: &mut impl Write,
) -> Result<()> {
    let todo = find(view_model, id).await?;
    view_model.delete_todo(todo.clone()).wait().await?;
    writeln!(out, "Deleted #{id} {}", todo.title)?;
    Ok(())
}

/// `todo clear-completed`
pub async fn clear_completed<S: TodoStore + 'static>(
    view_model: &TodoViewModel<S>,
    out: &mut impl Write,
) -> Result<()> {
    let removed = view_model.delete_all_completed_todos().wait().await?;
    let noun = if removed == 1 { "todo" } else { "todos" };
    writeln!(out, "Removed {removed} completed {noun}")?;
    Ok(())
}
