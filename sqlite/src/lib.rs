//! `SQLite` record store for todoflow.
//!
//! This crate provides the production [`TodoStore`](todoflow_core::TodoStore)
//! implementation on top of an embedded `SQLite` database accessed through
//! sqlx. It supports:
//!
//! - Embedded migrations (`sqlite/migrations`)
//! - Store-assigned ids with upsert-on-insert
//! - Live queries re-delivered after every committed write
//! - File-backed (WAL) and in-memory databases
//!
//! # Example
//!
//! ```ignore
//! use todoflow_sqlite::{SqliteConfig, SqliteTodoStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteTodoStore::connect(&SqliteConfig::new("sqlite://todos.db")).await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Connection configuration
pub mod config;

/// The `SQLite`-backed store
pub mod store;

pub use config::SqliteConfig;
pub use store::SqliteTodoStore;
