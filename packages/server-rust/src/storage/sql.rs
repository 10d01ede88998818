//! [`PageBackend`] over a pooled sqlx connection.
//!
//! One pool is created at startup and shared by every request. Each method
//! runs exactly one statement on a connection borrowed from the pool; the
//! pool guard hands the connection back on every exit path.

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use tracing::{debug, info};
use wiki_core::{Page, PageSummary};

use super::config::DatabaseConfig;
use super::error::StorageError;
use super::statements::{SqlStatements, Statement};
use crate::traits::PageBackend;

/// Relational page backend driven by externalized statements.
pub struct SqlPageBackend {
    pool: AnyPool,
    statements: SqlStatements,
}

impl SqlPageBackend {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: AnyPool, statements: SqlStatements) -> Self {
        Self { pool, statements }
    }

    /// Opens the pool described by `config`.
    ///
    /// The statement set is read from `config.sql_queries_file` when given,
    /// otherwise the bundled set for the URL's driver is used. No statement
    /// is executed here; the schema is created by [`PageBackend::initialize`].
    ///
    /// # Errors
    ///
    /// Returns an error if the driver is unsupported, the statement file is
    /// invalid, or the database cannot be reached.
    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let driver = config.driver()?;
        let statements = match &config.sql_queries_file {
            Some(path) => SqlStatements::from_file(path)?,
            None => SqlStatements::bundled(driver),
        };

        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(config.max_pool_size)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await
            .with_context(|| format!("failed to open {} connection pool", driver.as_str()))?;

        info!(
            driver = driver.as_str(),
            max_pool_size = config.max_pool_size,
            "database pool ready"
        );
        Ok(Self::new(pool, statements))
    }

    fn sql(&self, statement: Statement) -> &str {
        self.statements.get(statement)
    }

    async fn execute(
        &self,
        statement: Statement,
        params: [&str; 3],
    ) -> Result<u64, StorageError> {
        let [a, b, c] = params;
        sqlx::query(self.sql(statement))
            .bind(a.to_string())
            .bind(b.to_string())
            .bind(c.to_string())
            .execute(&self.pool)
            .await
            .map(|done| done.rows_affected())
            .map_err(|e| StorageError::new(statement, e))
    }

    async fn fetch_page(
        &self,
        statement: Statement,
        key: &str,
    ) -> Result<Option<Page>, StorageError> {
        let row = sqlx::query(self.sql(statement))
            .bind(key.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::new(statement, e))?;

        row.as_ref()
            .map(page_from_row)
            .transpose()
            .map_err(|e| StorageError::new(statement, e))
    }
}

#[async_trait]
impl PageBackend for SqlPageBackend {
    async fn initialize(&self) -> Result<(), StorageError> {
        let statement = Statement::CreatePagesTable;
        sqlx::query(self.sql(statement))
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::new(statement, e))?;
        debug!("pages table ready");
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<PageSummary>, StorageError> {
        let statement = Statement::AllPages;
        let rows = sqlx::query(self.sql(statement))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::new(statement, e))?;

        rows.iter()
            .map(|row| {
                Ok(PageSummary {
                    id: row.try_get(0)?,
                    name: row.try_get(1)?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| StorageError::new(statement, e))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Page>, StorageError> {
        self.fetch_page(Statement::GetPageById, id).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Page>, StorageError> {
        self.fetch_page(Statement::GetPageByName, name).await
    }

    async fn insert(
        &self,
        id: &str,
        name: &str,
        creation_date: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let statement = Statement::CreatePage;
        sqlx::query(self.sql(statement))
            .bind(id.to_string())
            .bind(name.to_string())
            .bind(String::new())
            .bind(encode_timestamp(creation_date))
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::new(statement, e))?;
        Ok(())
    }

    async fn update_content(
        &self,
        id: &str,
        content: &str,
        update_date: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let update_date = encode_timestamp(update_date);
        self.execute(Statement::SavePage, [content, &update_date, id])
            .await
    }

    async fn mark_deleted(
        &self,
        id: &str,
        deleted_name: &str,
        delete_date: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let delete_date = encode_timestamp(delete_date);
        self.execute(Statement::DeletePage, [deleted_name, &delete_date, id])
            .await
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

// ---------------------------------------------------------------------------
// Row and timestamp codecs
// ---------------------------------------------------------------------------

/// Timestamps are stored as RFC 3339 text in UTC with nanosecond precision,
/// which round-trips losslessly and sorts chronologically.
pub(crate) fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn decode_timestamp(text: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn decode_optional_timestamp(text: Option<String>) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    text.as_deref().map(decode_timestamp).transpose()
}

/// Reads `id, name, content, creation_date, update_date, delete_date`.
fn page_from_row(row: &AnyRow) -> Result<Page, sqlx::Error> {
    let creation_date: String = row.try_get(3)?;
    Ok(Page {
        id: row.try_get(0)?,
        name: row.try_get(1)?,
        content: row.try_get::<Option<String>, _>(2)?.unwrap_or_default(),
        creation_date: decode_timestamp(&creation_date)?,
        update_date: decode_optional_timestamp(row.try_get(4)?)?,
        delete_date: decode_optional_timestamp(row.try_get(5)?)?,
    })
}

/// Connection URL for a SQLite file that is created on first use.
#[must_use]
pub fn sqlite_file_url(path: &std::path::Path) -> String {
    format!("sqlite://{}?mode=rwc", path.display())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
