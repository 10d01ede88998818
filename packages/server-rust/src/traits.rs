use async_trait::async_trait;
use chrono::{DateTime, Utc};
use wiki_core::{Page, PageSummary, ReplyFailure};

use crate::storage::StorageError;

/// Pluggable relational persistence for pages.
/// Implementations: sqlx over `SQLite` or `PostgreSQL`, scripted fakes (tests).
///
/// Each method runs exactly one named statement. Methods that mutate an
/// existing page only touch active (non-deleted) rows and report how many
/// rows they changed.
#[async_trait]
pub trait PageBackend: Send + Sync {
    /// Create the pages table if it does not exist yet.
    async fn initialize(&self) -> Result<(), StorageError>;

    /// `(id, name)` of every active page, ordered by name.
    async fn list_active(&self) -> Result<Vec<PageSummary>, StorageError>;

    /// Look a page up by id. Deleted pages are returned too.
    async fn find_by_id(&self, id: &str) -> Result<Option<Page>, StorageError>;

    /// Look an active page up by its exact name.
    async fn find_by_name(&self, name: &str) -> Result<Option<Page>, StorageError>;

    /// Insert a new page with empty content.
    async fn insert(
        &self,
        id: &str,
        name: &str,
        creation_date: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Overwrite the content and update date of an active page.
    async fn update_content(
        &self,
        id: &str,
        content: &str,
        update_date: DateTime<Utc>,
    ) -> Result<u64, StorageError>;

    /// Rename an active page and stamp its delete date.
    async fn mark_deleted(
        &self,
        id: &str,
        deleted_name: &str,
        delete_date: DateTime<Utc>,
    ) -> Result<u64, StorageError>;

    /// Release pooled connections.
    async fn close(&self);
}

/// The page store's operations as seen by a caller.
///
/// Implemented by the store itself (in-process) and by the bus proxy, so a
/// caller does not know which transport sits in between. A lookup miss is
/// `Ok(None)`, never a failure.
#[async_trait]
pub trait PageStoreApi: Send + Sync {
    async fn list_pages(&self) -> Result<Vec<PageSummary>, ReplyFailure>;

    async fn get_page_by_id(&self, id: &str) -> Result<Option<Page>, ReplyFailure>;

    async fn get_page_by_name(&self, name: &str) -> Result<Option<Page>, ReplyFailure>;

    async fn create_page(
        &self,
        id: &str,
        name: &str,
        creation_date: DateTime<Utc>,
    ) -> Result<(), ReplyFailure>;

    async fn save_page(
        &self,
        id: &str,
        content: &str,
        update_date: DateTime<Utc>,
    ) -> Result<(), ReplyFailure>;

    async fn delete_page(&self, id: &str) -> Result<(), ReplyFailure>;
}
