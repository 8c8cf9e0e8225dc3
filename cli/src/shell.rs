//! Interactive shell: the live presentation layer.
//!
//! Prints the derived list every time it changes and turns typed lines into
//! intents. Mutations are fire-and-forget; their failures come back on the
//! view model's failure channel and are printed as they arrive.

use crate::commands;
use crate::intent::{HELP, Intent};
use crate::render;
use anyhow::Result;
use std::io::Write;
use todoflow_core::{FilterState, Todo, TodoId, TodoStore};
use todoflow_runtime::TodoViewModel;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;

/// Whether the shell keeps reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line
    Continue,
    /// Leave the shell
    Quit,
}

/// The last list printed and the filter it was printed under
#[derive(Debug, PartialEq, Eq)]
struct Screen {
    filter: FilterState,
    todos: Vec<Todo>,
}

impl Screen {
    /// Replace the screen, returning `false` if nothing would change
    fn replace(&mut self, next: Self) -> bool {
        if *self == next {
            return false;
        }
        *self = next;
        true
    }
}

/// Run the shell on stdin/stdout until `quit`, end of input or Ctrl-C.
pub async fn run<S: TodoStore + 'static>(view_model: &TodoViewModel<S>) -> Result<()> {
    let mut stdout = std::io::stdout();
    let mut todos = view_model.todos();
    let mut failures = view_model.subscribe_failures();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // The derived list only publishes changes, so print the starting view once
    let filter = view_model.filter().current();
    let mut screen = Screen {
        filter,
        todos: commands::snapshot(view_model, filter).await?,
    };
    writeln!(stdout, "{}", render::list(&screen.todos, filter))?;
    writeln!(stdout, "Type `help` for commands.")?;

    loop {
        tokio::select! {
            changed = todos.changed() => {
                if changed.is_err() {
                    break;
                }
                let next = Screen {
                    filter: view_model.filter().current(),
                    todos: todos.borrow_and_update().clone(),
                };
                if screen.replace(next) {
                    writeln!(stdout, "{}", render::list(&screen.todos, screen.filter))?;
                }
            }
            failure = failures.recv() => match failure {
                Ok(failure) => writeln!(stdout, "error: {failure}")?,
                Err(RecvError::Lagged(missed)) => writeln!(stdout, "error: {missed} failures not shown")?,
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let intent = match line.parse::<Intent>() {
                    Ok(intent) => intent,
                    Err(crate::intent::ParseIntentError::Empty) => continue,
                    Err(error) => {
                        writeln!(stdout, "error: {error}")?;
                        continue;
                    }
                };
                if apply(view_model, &todos, intent, &mut stdout).await? == Flow::Quit {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
        stdout.flush()?;
    }

    tracing::debug!("Shell finished");
    Ok(())
}

/// Carry out one intent.
///
/// Only lookups and local output happen here; mutations are handed to the
/// view model and not awaited.
pub async fn apply<S: TodoStore + 'static>(
    view_model: &TodoViewModel<S>,
    todos: &watch::Receiver<Vec<Todo>>,
    intent: Intent,
    out: &mut impl Write,
) -> Result<Flow> {
    match intent {
        Intent::Add { title, description } => {
            view_model.add_todo(title, description);
        },
        Intent::Toggle(id) => {
            if let Some(todo) = lookup(view_model, todos, id, out).await? {
                view_model.toggle_todo_completed(todo);
            }
        },
        Intent::Edit { id, title } => {
            if let Some(todo) = lookup(view_model, todos, id, out).await? {
                view_model.update_todo(Todo { title, ..todo });
            }
        },
        Intent::Delete(id) => {
            if let Some(todo) = lookup(view_model, todos, id, out).await? {
                view_model.delete_todo(todo);
            }
        },
        Intent::Filter(filter) => {
            view_model.set_filter(filter);
            writeln!(out, "Showing {filter} todos")?;
        },
        Intent::Clear => {
            view_model.delete_all_completed_todos();
        },
        Intent::Show(id) => {
            if let Some(todo) = lookup(view_model, todos, id, out).await? {
                writeln!(out, "{}", render::detail(&todo))?;
            }
        },
        Intent::List => {
            let list = todos.borrow().clone();
            writeln!(out, "{}", render::list(&list, view_model.filter().current()))?;
        },
        Intent::Help => writeln!(out, "{HELP}")?,
        Intent::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

/// Find a todo in the visible list, falling back to the store
async fn lookup<S: TodoStore + 'static>(
    view_model: &TodoViewModel<S>,
    todos: &watch::Receiver<Vec<Todo>>,
    id: TodoId,
    out: &mut impl Write,
) -> Result<Option<Todo>> {
    let visible = todos.borrow().iter().find(|todo| todo.id == id).cloned();
    let todo = match visible {
        Some(todo) => Some(todo),
        None => view_model.get_todo_by_id(id).await?,
    };
    if todo.is_none() {
        writeln!(out, "error: No todo #{id}")?;
    }
    Ok(todo)
}
