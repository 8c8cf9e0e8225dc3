//! Application configuration.
//!
//! Loads configuration from environment variables with sensible defaults;
//! command-line flags override the environment.

use serde::{Deserialize, Serialize};
use todoflow_runtime::ViewConfig;
use todoflow_sqlite::SqliteConfig;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database configuration
    pub database: SqliteConfig,
    /// View model configuration
    pub view: ViewConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            database: SqliteConfig::from_env(),
            view: ViewConfig::from_env(),
        }
    }

    /// Point the database at `location` when given.
    ///
    /// Accepts a full `sqlite:` URL or a plain file path.
    #[must_use]
    pub fn with_database(mut self, location: Option<&str>) -> Self {
        if let Some(location) = location {
            self.database = self.database.with_url(database_url(location));
        }
        self
    }
}

fn database_url(location: &str) -> String {
    if location.starts_with("sqlite:") {
        location.to_string()
    } else {
        format!("sqlite://{location}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_become_urls() {
        assert_eq!(database_url("todos.db"), "sqlite://todos.db");
        assert_eq!(database_url("/tmp/t.db"), "sqlite:///tmp/t.db");
        assert_eq!(database_url("sqlite::memory:"), "sqlite::memory:");
    }

    #[test]
    fn override_replaces_only_the_url() {
        let base = AppConfig {
            database: SqliteConfig::default().with_max_connections(2),
            view: ViewConfig::default(),
        };

        let config = base.clone().with_database(Some("other.db"));
        assert_eq!(config.database.url, "sqlite://other.db");
        assert_eq!(config.database.max_connections, 2);

        assert_eq!(base.clone().with_database(None), base);
    }
}
