//! Parsing of interactive shell lines into intents.

use std::str::FromStr;
use thiserror::Error;
use todoflow_core::{FilterState, TodoId};

/// Help text for the interactive shell
pub const HELP: &str = "\
Commands:
  add <title> [| description]   create a todo
  toggle <id>                   complete or reopen a todo
  edit <id> <title>             rename a todo
  delete <id>                   delete a todo
  filter all|active|completed   change the view
  clear                         delete every completed todo
  show <id>                     show one todo
  list                          print the current view
  help                          show this text
  quit                          leave the shell";

/// One line typed into the shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// `add <title> [| description]`
    Add {
        /// Title of the new todo
        title: String,
        /// Description, empty when omitted
        description: String,
    },
    /// `toggle <id>`
    Toggle(TodoId),
    /// `edit <id> <title>`
    Edit {
        /// Todo to rename
        id: TodoId,
        /// New title
        title: String,
    },
    /// `delete <id>`
    Delete(TodoId),
    /// `filter <state>`
    Filter(FilterState),
    /// `clear`
    Clear,
    /// `show <id>`
    Show(TodoId),
    /// `list`
    List,
    /// `help`
    Help,
    /// `quit`
    Quit,
}

/// Why a shell line could not be understood
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseIntentError {
    /// Blank line
    #[error("Empty command")]
    Empty,

    /// First word is not a known command
    #[error("Unknown command {0:?} (type `help`)")]
    UnknownCommand(String),

    /// A required argument is missing
    #[error("Usage: {0}")]
    Usage(&'static str),

    /// An argument did not parse
    #[error("{0}")]
    InvalidArgument(String),
}

impl FromStr for Intent {
    type Err = ParseIntentError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (command, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(command, rest)| (command, rest.trim()));

        match command.to_ascii_lowercase().as_str() {
            "" => Err(ParseIntentError::Empty),
            "add" | "a" => {
                let (title, description) = rest.split_once('|').unwrap_or((rest, ""));
                let title = title.trim();
                if title.is_empty() {
                    return Err(ParseIntentError::Usage("add <title> [| description]"));
                }
                Ok(Self::Add {
                    title: title.to_string(),
                    description: description.trim().to_string(),
                })
            },
            "toggle" | "t" | "done" => id_argument(rest, "toggle <id>").map(Self::Toggle),
            "delete" | "del" | "rm" => id_argument(rest, "delete <id>").map(Self::Delete),
            "show" => id_argument(rest, "show <id>").map(Self::Show),
            "edit" => {
                let (id, title) = rest
                    .split_once(char::is_whitespace)
                    .ok_or(ParseIntentError::Usage("edit <id> <title>"))?;
                let title = title.trim();
                if title.is_empty() {
                    return Err(ParseIntentError::Usage("edit <id> <title>"));
                }
                Ok(Self::Edit {
                    id: id_argument(id, "edit <id> <title>")?,
                    title: title.to_string(),
                })
            },
            "filter" | "f" => {
                if rest.is_empty() {
                    return Err(ParseIntentError::Usage("filter all|active|completed"));
                }
                rest.parse()
                    .map(Self::Filter)
                    .map_err(|e| ParseIntentError::InvalidArgument(e.to_string()))
            },
            "clear" => Ok(Self::Clear),
            "list" | "ls" => Ok(Self::List),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(ParseIntentError::UnknownCommand(other.to_string())),
        }
    }
}

fn id_argument(raw: &str, usage: &'static str) -> Result<TodoId, ParseIntentError> {
    if raw.is_empty() {
        return Err(ParseIntentError::Usage(usage));
    }
    raw.parse()
        .map_err(|e: todoflow_core::TodoError| ParseIntentError::InvalidArgument(e.to_string()))
}
