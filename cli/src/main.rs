//! `todo`: command-line front end for todoflow.
//!
//! One-shot subcommands run a single intent and exit; `todo shell` keeps a
//! live view of the filtered list open and reads intents from stdin.
//!
//! ```text
//! todo add "Buy milk" -d "2 litres"
//! todo list --filter active
//! todo toggle 1
//! todo shell
//! ```

#![forbid(unsafe_code)]

mod commands;
mod config;
mod intent;
mod render;
mod shell;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::AppConfig;
use std::io::Write;
use todoflow_core::{FilterState, TodoId};
use todoflow_runtime::{TodoRepository, TodoViewModel};
use todoflow_sqlite::SqliteTodoStore;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(author, version, about = "todoflow: a reactive todo list over SQLite", long_about = None)]
struct Cli {
    /// Database file or `sqlite:` URL (overrides `TODO_DATABASE_URL`)
    #[arg(long, global = true)]
    database: Option<String>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a todo
    Add {
        /// Title of the todo
        title: String,
        /// Optional longer text
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Print the todos matching a filter
    List {
        /// all, active or completed
        #[arg(short, long, default_value_t = FilterState::All)]
        filter: FilterState,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show every field of one todo
    Show {
        /// Todo id
        id: TodoId,
    },
    /// Complete or reopen a todo
    Toggle {
        /// Todo id
        id: TodoId,
    },
    /// Change a todo's title or description
    Edit {
        /// Todo id
        id: TodoId,
        /// New title
        #[arg(short, long)]
        title: Option<String>,
        /// New description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete a todo
    Delete {
        /// Todo id
        id: TodoId,
    },
    /// Delete every completed todo
    ClearCompleted,
    /// Open an interactive shell with a live list
    Shell {
        /// Filter to start with
        #[arg(short, long, default_value_t = FilterState::All)]
        filter: FilterState,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = AppConfig::from_env().with_database(cli.database.as_deref());
    tracing::debug!(url = %config.database.url, "Opening database");

    let store = SqliteTodoStore::connect(&config.database)
        .await
        .with_context(|| format!("Failed to open {}", config.database.url))?;
    store.migrate().await.context("Failed to migrate database")?;

    let repository = TodoRepository::with_system_clock(store.clone());
    let view_model = TodoViewModel::new(repository, &config.view);

    let result = run(cli.command, &view_model).await;
    store.close().await;
    result
}

async fn run(command: Command, view_model: &TodoViewModel<SqliteTodoStore>) -> Result<()> {
    let mut stdout = std::io::stdout();
    match command {
        Command::Add { title, description } => {
            commands::add(view_model, &title, &description, &mut stdout).await?;
        },
        Command::List { filter, json } => commands::list(view_model, filter, json, &mut stdout).await?,
        Command::Show { id } => commands::show(view_model, id, &mut stdout).await?,
        Command::Toggle { id } => commands::toggle(view_model, id, &mut stdout).await?,
        Command::Edit { id, title, description } => {
            commands::edit(view_model, id, title, description, &mut stdout).await?;
        },
        Command::Delete { id } => commands::delete(view_model, id, &mut stdout).await?,
        Command::ClearCompleted => commands::clear_completed(view_model, &mut stdout).await?,
        Command::Shell { filter } => {
            view_model.set_filter(filter);
            return shell::run(view_model).await;
        },
    }
    stdout.flush()?;
    Ok(())
}
