//! Relational backend adapter for the page store.
//!
//! - [`config`]: pool settings and driver selection by URL scheme
//! - [`statements`]: the seven named statements, loaded from JSON
//! - [`sql`]: [`SqlPageBackend`], the sqlx implementation of
//!   [`PageBackend`](crate::traits::PageBackend)
//! - [`error`]: [`StorageError`], the single failure type of the adapter

pub mod config;
pub mod error;
pub mod sql;
pub mod statements;

pub use config::{ConfigError, DatabaseConfig, Driver};
pub use error::StorageError;
pub use sql::{sqlite_file_url, SqlPageBackend};
pub use statements::{SqlStatements, Statement};
