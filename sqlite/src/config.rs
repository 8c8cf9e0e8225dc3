//! Connection configuration for the `SQLite` store.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Default database location (created on first use)
pub const DEFAULT_DATABASE_URL: &str = "sqlite://todos.db";

/// URL of a private in-memory database
pub const IN_MEMORY_URL: &str = "sqlite::memory:";

/// `SQLite` connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// `SQLite` connection URL (`sqlite://path.db` or `sqlite::memory:`)
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// How long a connection waits on a locked database, in milliseconds
    pub busy_timeout_ms: u64,
}

impl SqliteConfig {
    /// Configuration for the given URL with default pool settings
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Configuration for a private in-memory database.
    ///
    /// Uses a single connection: every `SQLite` in-memory connection is its own
    /// database, so a second connection would see an empty schema.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            url: IN_MEMORY_URL.to_string(),
            max_connections: 1,
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `TODO_DATABASE_URL` | `sqlite://todos.db` |
    /// | `TODO_DATABASE_MAX_CONNECTIONS` | `4` |
    /// | `TODO_DATABASE_BUSY_TIMEOUT_MS` | `5000` |
    ///
    /// Unparseable numbers fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: env::var("TODO_DATABASE_URL").unwrap_or(defaults.url),
            max_connections: env::var("TODO_DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_connections),
            busy_timeout_ms: env::var("TODO_DATABASE_BUSY_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.busy_timeout_ms),
        }
    }

    /// Set the connection URL
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the maximum pool size
    #[must_use]
    pub const fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Set the busy timeout.
    ///
    /// Timeouts beyond `u64::MAX` milliseconds saturate.
    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Busy timeout as a `Duration`
    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Whether the URL names an in-memory database
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 4,
            busy_timeout_ms: 5000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SqliteConfig::default();
        assert_eq!(config.url, "sqlite://todos.db");
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
        assert!(!config.is_in_memory());
    }

    #[test]
    fn in_memory_uses_single_connection() {
        let config = SqliteConfig::in_memory();
        assert!(config.is_in_memory());
        assert_eq!(config.max_connections, 1);
    }

    #[test]
    fn builder_setters() {
        let config = SqliteConfig::new("sqlite://other.db")
            .with_max_connections(8)
            .with_busy_timeout(Duration::from_millis(250));

        assert_eq!(config.url, "sqlite://other.db");
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.busy_timeout_ms, 250);
    }

    #[test]
    fn oversized_busy_timeout_saturates() {
        let config = SqliteConfig::default().with_busy_timeout(Duration::MAX);
        assert_eq!(config.busy_timeout_ms, u64::MAX);
    }
}
