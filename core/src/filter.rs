//! Filter states and the three store queries behind them.

use crate::todo::Todo;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for `FilterState` parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid filter: {0:?} (expected all, active or completed)")]
pub struct ParseFilterStateError(String);

/// The user-selected view of the todo list.
///
/// Exactly three states; the initial state is [`FilterState::All`].
///
/// # Examples
///
/// ```
/// use todoflow_core::FilterState;
///
/// let filter: FilterState = "completed".parse().unwrap();
/// assert_eq!(filter, FilterState::Completed);
/// assert_eq!(FilterState::default(), FilterState::All);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterState {
    /// Every todo
    #[default]
    All,
    /// Todos that are not completed
    Active,
    /// Completed todos
    Completed,
}

impl FilterState {
    /// All filter states, in display order
    pub const ALL_STATES: [Self; 3] = [Self::All, Self::Active, Self::Completed];

    /// The store query whose result set this filter displays
    #[must_use]
    pub const fn query(self) -> TodoQuery {
        match self {
            Self::All => TodoQuery::All,
            Self::Active => TodoQuery::Active,
            Self::Completed => TodoQuery::Completed,
        }
    }

    /// Whether a todo belongs to this filter's view
    #[must_use]
    pub const fn matches(self, todo: &Todo) -> bool {
        self.query().matches(todo)
    }

    /// Lowercase name used by the CLI and serde
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterState {
    type Err = ParseFilterStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "completed" | "done" => Ok(Self::Completed),
            _ => Err(ParseFilterStateError(s.to_string())),
        }
    }
}

/// One of the three live queries a record store must serve.
///
/// | Query | Rows | Order |
/// |---|---|---|
/// | `All` | every todo | `created_date` DESC |
/// | `Active` | `is_completed = false` | `created_date` DESC |
/// | `Completed` | `is_completed = true` | `completed_date` DESC |
///
/// Ties fall back to `id` DESC so the newest insertion comes first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoQuery {
    /// Every todo, newest first
    All,
    /// Open todos, newest first
    Active,
    /// Completed todos, most recently completed first
    Completed,
}

impl TodoQuery {
    /// Whether a row belongs to this query's result set
    #[must_use]
    pub const fn matches(self, todo: &Todo) -> bool {
        match self {
            Self::All => true,
            Self::Active => !todo.is_completed,
            Self::Completed => todo.is_completed,
        }
    }

    /// Orders two rows the way the query's `ORDER BY` clause does
    #[must_use]
    pub fn compare(self, a: &Todo, b: &Todo) -> Ordering {
        let primary = match self {
            Self::All | Self::Active => b.created_date.cmp(&a.created_date),
            // DESC with NULLs last, as SQLite sorts them
            Self::Completed => match (a.completed_date, b.completed_date) {
                (Some(a), Some(b)) => b.cmp(&a),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };
        primary.then_with(|| b.id.cmp(&a.id))
    }

    /// Filters and orders a full table scan into this query's result set
    #[must_use]
    pub fn apply<'a>(self, rows: impl IntoIterator<Item = &'a Todo>) -> Vec<Todo> {
        let mut result: Vec<Todo> = rows
            .into_iter()
            .filter(|todo| self.matches(todo))
            .cloned()
            .collect();
        result.sort_by(|a, b| self.compare(a, b));
        result
    }
}

impl fmt::Display for TodoQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Active => f.write_str("active"),
            Self::Completed => f.write_str("completed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todo::TodoId;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    fn todo(id: i64, created: i64, completed: Option<i64>) -> Todo {
        let todo = Todo::new(format!("todo {id}"), "", at(created)).with_id(TodoId::new(id));
        match completed {
            Some(secs) => todo.toggled(at(secs)),
            None => todo,
        }
    }

    #[test]
    fn parse_and_display_round_trip() {
        for state in FilterState::ALL_STATES {
            assert_eq!(state.to_string().parse::<FilterState>().unwrap(), state);
        }
        assert_eq!(" Active ".parse::<FilterState>().unwrap(), FilterState::Active);
        assert!("everything".parse::<FilterState>().is_err());
    }

    #[test]
    fn filters_map_to_queries() {
        assert_eq!(FilterState::All.query(), TodoQuery::All);
        assert_eq!(FilterState::Active.query(), TodoQuery::Active);
        assert_eq!(FilterState::Completed.query(), TodoQuery::Completed);
    }

    #[test]
    fn all_orders_by_created_desc() {
        let rows = [todo(1, 10, None), todo(2, 30, Some(40)), todo(3, 20, None)];

        let ids: Vec<i64> = TodoQuery::All.apply(&rows).iter().map(|t| t.id.get()).collect();

        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn active_excludes_completed() {
        let rows = [todo(1, 10, None), todo(2, 30, Some(40)), todo(3, 20, None)];

        let ids: Vec<i64> = TodoQuery::Active.apply(&rows).iter().map(|t| t.id.get()).collect();

        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn completed_orders_by_completed_desc_with_nulls_last() {
        let mut broken = todo(4, 50, None);
        broken.is_completed = true;
        let rows = [todo(1, 10, Some(100)), todo(2, 30, Some(40)), broken, todo(3, 20, None)];

        let ids: Vec<i64> = TodoQuery::Completed.apply(&rows).iter().map(|t| t.id.get()).collect();

        assert_eq!(ids, vec![1, 2, 4]);
    }

    #[test]
    fn ties_break_on_id_desc() {
        let rows = [todo(1, 10, None), todo(2, 10, None)];

        let ids: Vec<i64> = TodoQuery::All.apply(&rows).iter().map(|t| t.id.get()).collect();

        assert_eq!(ids, vec![2, 1]);
    }
}
