//! The Todo record.
//!
//! A todo is created in memory with [`TodoId::UNASSIGNED`], receives its real
//! id from the store on insertion, and is afterwards replaced wholesale by id
//! whenever its title, description or completion changes.

use crate::error::{Result, TodoError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Store-assigned identifier for a todo.
///
/// `TodoId` is a newtype wrapper around the `INTEGER PRIMARY KEY` the store
/// hands out. The zero value means "not inserted yet".
///
/// # Examples
///
/// ```
/// use todoflow_core::TodoId;
///
/// let id: TodoId = "42".parse().unwrap();
/// assert_eq!(id.get(), 42);
/// assert!(id.is_assigned());
/// assert!(!TodoId::UNASSIGNED.is_assigned());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(i64);

impl TodoId {
    /// Identifier of a todo that has not been inserted yet
    pub const UNASSIGNED: Self = Self(0);

    /// Wrap a raw store identifier
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Whether the store has assigned this identifier
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TodoId {
    type Err = TodoError;

    fn from_str(s: &str) -> Result<Self> {
        let raw: i64 = s
            .trim()
            .trim_start_matches('#')
            .parse()
            .map_err(|_| TodoError::validation(format!("Invalid todo id: {s:?}")))?;
        if raw <= 0 {
            return Err(TodoError::validation(format!("Invalid todo id: {s:?}")));
        }
        Ok(Self(raw))
    }
}

impl From<i64> for TodoId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A single todo item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    /// Store-assigned identifier ([`TodoId::UNASSIGNED`] before insertion)
    pub id: TodoId,
    /// Display title, never blank
    pub title: String,
    /// Optional longer text, empty when absent
    pub description: String,
    /// Whether the todo is done
    pub is_completed: bool,
    /// When the todo was created
    pub created_date: DateTime<Utc>,
    /// When the todo was completed; `Some` exactly when `is_completed`
    pub completed_date: Option<DateTime<Utc>>,
}

impl Todo {
    /// Creates a new, active, not-yet-inserted todo
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        created_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TodoId::UNASSIGNED,
            title: title.into(),
            description: description.into(),
            is_completed: false,
            created_date,
            completed_date: None,
        }
    }

    /// Returns a copy carrying the given identifier
    #[must_use]
    pub fn with_id(mut self, id: TodoId) -> Self {
        self.id = id;
        self
    }

    /// Returns the record after flipping its completion.
    ///
    /// Completing stamps `completed_date` with `now`; reopening clears it.
    /// This is the only transition that keeps
    /// `is_completed == completed_date.is_some()` by construction.
    #[must_use]
    pub fn toggled(&self, now: DateTime<Utc>) -> Self {
        if self.is_completed {
            Self {
                is_completed: false,
                completed_date: None,
                ..self.clone()
            }
        } else {
            Self {
                is_completed: true,
                completed_date: Some(now),
                ..self.clone()
            }
        }
    }

    /// Whether the completion flag and completion date agree
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.is_completed == self.completed_date.is_some()
    }

    /// Checks the rules a record must satisfy before it is written.
    ///
    /// # Errors
    ///
    /// Returns [`TodoError::Validation`] if the title is blank or the
    /// completion fields disagree.
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        if !self.is_consistent() {
            return Err(TodoError::validation(format!(
                "Todo {} has is_completed={} but completed_date={:?}",
                self.id, self.is_completed, self.completed_date
            )));
        }
        Ok(())
    }
}

/// Rejects blank titles.
///
/// # Errors
///
/// Returns [`TodoError::Validation`] if the title is empty or whitespace only.
pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(TodoError::validation("Todo title cannot be empty"));
    }
    Ok(())
}
