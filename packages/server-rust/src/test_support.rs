//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use tempfile::TempDir;
use wiki_core::ClockSource;

use crate::storage::{sqlite_file_url, DatabaseConfig, SqlPageBackend};
use crate::traits::PageBackend;

/// Database config for a fresh SQLite file inside `dir`.
pub(crate) fn sqlite_config(dir: &TempDir) -> DatabaseConfig {
    DatabaseConfig {
        url: sqlite_file_url(&dir.path().join("wiki.db")),
        max_pool_size: 4,
        ..DatabaseConfig::default()
    }
}

/// A backend over a fresh SQLite file whose schema has not been created.
pub(crate) async fn bare_sqlite_backend() -> (SqlPageBackend, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let backend = SqlPageBackend::connect(&sqlite_config(&dir)).await.unwrap();
    (backend, dir)
}

/// A backend over a fresh SQLite file with the pages table in place.
/// Keep the returned directory alive for as long as the backend is used.
pub(crate) async fn sqlite_backend() -> (SqlPageBackend, TempDir) {
    let (backend, dir) = bare_sqlite_backend().await;
    backend.initialize().await.unwrap();
    (backend, dir)
}

/// Clock advancing by a fixed step on every reading.
pub(crate) struct StepClock {
    micros: AtomicI64,
    step_micros: i64,
}

impl StepClock {
    pub(crate) fn starting_at(start: DateTime<Utc>, step_micros: i64) -> Self {
        Self {
            micros: AtomicI64::new(start.timestamp_micros()),
            step_micros,
        }
    }
}

impl ClockSource for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let micros = self.micros.fetch_add(self.step_micros, Ordering::SeqCst);
        DateTime::from_timestamp_micros(micros).unwrap()
    }
}
