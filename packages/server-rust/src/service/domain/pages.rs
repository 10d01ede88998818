//! The page store: sole owner of durable page state.
//!
//! Enforces the page invariants on top of a [`PageBackend`]: names are stored
//! lowercase, deletion is soft (the row stays, its name is rewritten to free
//! the original), and a deleted page accepts no further mutation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tower::Service;
use tracing::{debug, error, info, warn};
use wiki_core::{ClockSource, Page, PageSummary, ReplyFailure};

use crate::service::operation::{Operation, OperationError, OperationResponse};
use crate::service::registry::{ManagedService, ServiceContext};
use crate::storage::StorageError;
use crate::traits::{PageBackend, PageStoreApi};

/// Registry name of the page store.
pub const PAGE_STORE: &str = "pages";

/// Name a page is given when it is deleted.
///
/// The suffix is the store clock's reading at deletion, in microseconds since
/// the epoch, so the rewritten name no longer collides with the original.
#[must_use]
pub fn deleted_name(name: &str, deleted_at: DateTime<Utc>) -> String {
    format!("{name}_deleted_{}", deleted_at.timestamp_micros())
}

pub struct PageStoreService {
    backend: Arc<dyn PageBackend>,
    clock: Arc<dyn ClockSource>,
}

impl PageStoreService {
    #[must_use]
    pub fn new(backend: Arc<dyn PageBackend>, clock: Arc<dyn ClockSource>) -> Self {
        Self { backend, clock }
    }

    /// Active pages, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::Storage` if the backend fails.
    pub async fn list_pages(&self) -> Result<Vec<PageSummary>, OperationError> {
        let pages = self.backend.list_active().await.map_err(storage_failure)?;
        debug!(count = pages.len(), "listed pages");
        Ok(pages)
    }

    /// Looks a page up by id. Deleted pages are returned as well.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::Storage` if the backend fails. A miss is `Ok(None)`.
    pub async fn get_page_by_id(&self, id: &str) -> Result<Option<Page>, OperationError> {
        let page = self.backend.find_by_id(id).await.map_err(storage_failure)?;
        debug!(id, found = page.is_some(), "page lookup by id");
        Ok(page)
    }

    /// Looks an active page up by its exact stored name.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::Storage` if the backend fails. A miss is `Ok(None)`.
    pub async fn get_page_by_name(&self, name: &str) -> Result<Option<Page>, OperationError> {
        let page = self
            .backend
            .find_by_name(name)
            .await
            .map_err(storage_failure)?;
        debug!(name, found = page.is_some(), "page lookup by name");
        Ok(page)
    }

    /// Creates an empty page. The name is stored lowercase.
    ///
    /// There is no existence pre-check: a name already held by an active page
    /// is rejected by the backend's uniqueness constraint.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::Storage` if the insert fails, including a
    /// duplicate id or name.
    pub async fn create_page(
        &self,
        id: &str,
        name: &str,
        creation_date: DateTime<Utc>,
    ) -> Result<(), OperationError> {
        let name = name.to_lowercase();
        self.backend
            .insert(id, &name, creation_date)
            .await
            .map_err(storage_failure)?;
        info!(id, name = %name, "page created");
        Ok(())
    }

    /// Replaces the content of an active page and stamps `update_date`.
    ///
    /// # Errors
    ///
    /// - `OperationError::PageNotFound` if no page has this id
    /// - `OperationError::PageDeleted` if the page was deleted
    /// - `OperationError::Storage` if the backend fails
    pub async fn save_page(
        &self,
        id: &str,
        content: &str,
        update_date: DateTime<Utc>,
    ) -> Result<(), OperationError> {
        let rows = self
            .backend
            .update_content(id, content, update_date)
            .await
            .map_err(storage_failure)?;
        if rows > 0 {
            debug!(id, bytes = content.len(), "page saved");
            return Ok(());
        }

        // Nothing active matched; tell a missing page from a deleted one.
        let err = match self.backend.find_by_id(id).await.map_err(storage_failure)? {
            None => OperationError::PageNotFound { id: id.to_string() },
            Some(_) => OperationError::PageDeleted { id: id.to_string() },
        };
        warn!(id, error = %err, "save rejected");
        Err(err)
    }

    /// Soft-deletes a page: stamps `delete_date` and rewrites the name to
    /// `<name>_deleted_<micros>` so the original name can be reused.
    ///
    /// The name suffix is always the current clock reading. The delete date
    /// is that same reading, raised if necessary so it is never earlier than
    /// any timestamp already on the page.
    ///
    /// # Errors
    ///
    /// - `OperationError::PageNotFound` if no page has this id
    /// - `OperationError::PageDeleted` if the page was already deleted,
    ///   including by a concurrent delete
    /// - `OperationError::Storage` if the backend fails
    pub async fn delete_page(&self, id: &str) -> Result<(), OperationError> {
        let page = self.backend.find_by_id(id).await.map_err(storage_failure)?;
        let page = match page {
            None => return Err(rejected_delete(OperationError::PageNotFound { id: id.to_string() })),
            Some(page) if page.is_deleted() => {
                return Err(rejected_delete(OperationError::PageDeleted { id: id.to_string() }))
            }
            Some(page) => page,
        };

        // Caller-supplied timestamps may run ahead of the clock; only the
        // clock reading keeps suffixes distinct between deletes.
        let now = self.clock.now();
        let delete_date = now.max(page.last_changed());
        let new_name = deleted_name(&page.name, now);
        let rows = self
            .backend
            .mark_deleted(id, &new_name, delete_date)
            .await
            .map_err(storage_failure)?;
        if rows == 0 {
            return Err(rejected_delete(OperationError::PageDeleted { id: id.to_string() }));
        }

        info!(id, name = %page.name, renamed = %new_name, "page deleted");
        Ok(())
    }

    async fn handle(&self, op: Operation) -> Result<OperationResponse, OperationError> {
        let call_id = op.ctx().call_id;
        match op {
            Operation::ListPages { .. } => self.list_pages().await.map(OperationResponse::Pages),
            Operation::GetPageById { id, .. } => {
                self.get_page_by_id(&id).await.map(OperationResponse::Page)
            }
            Operation::GetPageByName { name, .. } => {
                self.get_page_by_name(&name).await.map(OperationResponse::Page)
            }
            Operation::CreatePage { payload, .. } => {
                self.create_page(&payload.id, &payload.name, payload.creation_date)
                    .await?;
                Ok(OperationResponse::Ack { call_id })
            }
            Operation::SavePage { payload, .. } => {
                self.save_page(&payload.id, &payload.content, payload.update_date)
                    .await?;
                Ok(OperationResponse::Ack { call_id })
            }
            Operation::DeletePage { id, .. } => {
                self.delete_page(&id).await?;
                Ok(OperationResponse::Ack { call_id })
            }
        }
    }
}

fn storage_failure(err: StorageError) -> OperationError {
    error!(statement = %err.statement, error = %err.message, "backend failure");
    err.into()
}

fn rejected_delete(err: OperationError) -> OperationError {
    warn!(error = %err, "delete rejected");
    err
}

// ---------------------------------------------------------------------------
// Lifecycle and request handling
// ---------------------------------------------------------------------------

#[async_trait]
impl ManagedService for PageStoreService {
    fn name(&self) -> &'static str {
        PAGE_STORE
    }

    async fn init(&self, _ctx: &ServiceContext) -> anyhow::Result<()> {
        self.backend.initialize().await?;
        Ok(())
    }

    async fn shutdown(&self, _terminate: bool) -> anyhow::Result<()> {
        self.backend.close().await;
        Ok(())
    }
}

impl Service<Operation> for Arc<PageStoreService> {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let store = Arc::clone(self);
        Box::pin(async move { store.handle(op).await })
    }
}

#[async_trait]
impl PageStoreApi for PageStoreService {
    async fn list_pages(&self) -> Result<Vec<PageSummary>, ReplyFailure> {
        Self::list_pages(self).await.map_err(Into::into)
    }

    async fn get_page_by_id(&self, id: &str) -> Result<Option<Page>, ReplyFailure> {
        Self::get_page_by_id(self, id).await.map_err(Into::into)
    }

    async fn get_page_by_name(&self, name: &str) -> Result<Option<Page>, ReplyFailure> {
        Self::get_page_by_name(self, name).await.map_err(Into::into)
    }

    async fn create_page(
        &self,
        id: &str,
        name: &str,
        creation_date: DateTime<Utc>,
    ) -> Result<(), ReplyFailure> {
        Self::create_page(self, id, name, creation_date)
            .await
            .map_err(Into::into)
    }

    async fn save_page(
        &self,
        id: &str,
        content: &str,
        update_date: DateTime<Utc>,
    ) -> Result<(), ReplyFailure> {
        Self::save_page(self, id, content, update_date)
            .await
            .map_err(Into::into)
    }

    async fn delete_page(&self, id: &str) -> Result<(), ReplyFailure> {
        Self::delete_page(self, id).await.map_err(Into::into)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
