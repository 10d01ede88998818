//! Typed operations flowing through the pipeline, their replies, and errors.

use serde_json::Value;
use wiki_core::{
    Action, CreatePagePayload, FailureCode, Page, PageList, PageLookup, PageSummary,
    ReplyFailure, SavePagePayload,
};

use crate::storage::StorageError;

/// Context carried with every operation through the pipeline.
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// Unique per classified request.
    pub call_id: u64,
    /// Bus address the request was sent to; selects the handling service.
    pub service_name: String,
    pub action: Action,
    /// Transport-imposed limit; `0` means unbounded.
    pub call_timeout_ms: u64,
}

impl OperationContext {
    #[must_use]
    pub fn new(
        call_id: u64,
        service_name: impl Into<String>,
        action: Action,
        call_timeout_ms: u64,
    ) -> Self {
        Self {
            call_id,
            service_name: service_name.into(),
            action,
            call_timeout_ms,
        }
    }
}

/// A classified page store request.
#[derive(Debug)]
pub enum Operation {
    ListPages { ctx: OperationContext },
    GetPageById { ctx: OperationContext, id: String },
    GetPageByName { ctx: OperationContext, name: String },
    CreatePage { ctx: OperationContext, payload: CreatePagePayload },
    SavePage { ctx: OperationContext, payload: SavePagePayload },
    DeletePage { ctx: OperationContext, id: String },
}

impl Operation {
    #[must_use]
    pub fn ctx(&self) -> &OperationContext {
        match self {
            Operation::ListPages { ctx }
            | Operation::GetPageById { ctx, .. }
            | Operation::GetPageByName { ctx, .. }
            | Operation::CreatePage { ctx, .. }
            | Operation::SavePage { ctx, .. }
            | Operation::DeletePage { ctx, .. } => ctx,
        }
    }

    #[must_use]
    pub fn action(&self) -> Action {
        self.ctx().action
    }
}

/// Successful reply of an operation handler.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationResponse {
    /// Active pages, ordered by name.
    Pages(Vec<PageSummary>),
    /// Lookup result; `None` is a miss, not a failure.
    Page(Option<Page>),
    /// Completed mutation with no reply body.
    Ack { call_id: u64 },
}

impl OperationResponse {
    /// The JSON reply body sent back to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if a page cannot be serialized.
    pub fn into_body(self) -> Result<Value, serde_json::Error> {
        match self {
            OperationResponse::Pages(pages) => serde_json::to_value(PageList { pages }),
            OperationResponse::Page(page) => serde_json::to_value(PageLookup::from(page)),
            OperationResponse::Ack { .. } => Ok(Value::Null),
        }
    }
}

/// Errors returned by operation handlers and pipeline layers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OperationError {
    #[error("no handlers for address {name}")]
    UnknownService { name: String },
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("server overloaded, try again later")]
    Overloaded,
    #[error("page not found: {id}")]
    PageNotFound { id: String },
    #[error("page already deleted: {id}")]
    PageDeleted { id: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl OperationError {
    #[must_use]
    pub fn code(&self) -> FailureCode {
        match self {
            OperationError::UnknownService { .. } => FailureCode::NoHandlers,
            OperationError::Timeout { .. } => FailureCode::Timeout,
            OperationError::Overloaded => FailureCode::Overloaded,
            OperationError::PageNotFound { .. } => FailureCode::PageNotFound,
            OperationError::PageDeleted { .. } => FailureCode::PageDeleted,
            OperationError::Storage(_) => FailureCode::Storage,
        }
    }
}

impl From<OperationError> for ReplyFailure {
    fn from(err: OperationError) -> Self {
        ReplyFailure::new(err.code(), err.to_string())
    }
}

/// Errors from classifying an envelope into an `Operation`.
///
/// These are protocol failures: the request is rejected before any store
/// logic runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("No action header specified")]
    NoActionSpecified,
    #[error("Bad action: {action}")]
    BadAction { action: String },
    #[error("invalid {action} payload: {reason}")]
    InvalidPayload { action: Action, reason: String },
}

impl ClassifyError {
    #[must_use]
    pub fn code(&self) -> FailureCode {
        match self {
            ClassifyError::NoActionSpecified => FailureCode::NoActionSpecified,
            ClassifyError::BadAction { .. } => FailureCode::BadAction,
            ClassifyError::InvalidPayload { .. } => FailureCode::InvalidPayload,
        }
    }
}

impl From<ClassifyError> for ReplyFailure {
    fn from(err: ClassifyError) -> Self {
        ReplyFailure::new(err.code(), err.to_string())
    }
}
