//! Envelope classification: converts an action-tagged `Envelope` into a typed
//! `Operation`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use wiki_core::{Action, Envelope, PageIdPayload, PageNamePayload};

use super::config::ServerConfig;
use super::operation::{ClassifyError, Operation, OperationContext};

// ---------------------------------------------------------------------------
// OperationService
// ---------------------------------------------------------------------------

/// Classifies incoming envelopes into typed `Operation` variants.
///
/// The action tag is read from the `action` header only. Each classified
/// request gets a unique call ID and the configured transport timeout.
pub struct OperationService {
    config: Arc<ServerConfig>,
    call_id_counter: AtomicU64,
}

impl OperationService {
    #[must_use]
    pub fn new(config: Arc<ServerConfig>) -> Self {
        Self {
            config,
            call_id_counter: AtomicU64::new(1),
        }
    }

    fn next_call_id(&self) -> u64 {
        self.call_id_counter.fetch_add(1, Ordering::Relaxed)
    }

    fn make_ctx(&self, address: String, action: Action) -> OperationContext {
        OperationContext::new(
            self.next_call_id(),
            address,
            action,
            self.config.default_operation_timeout_ms,
        )
    }

    /// Classify an envelope into an `Operation`.
    ///
    /// # Errors
    ///
    /// - `ClassifyError::NoActionSpecified` when the `action` header is absent
    /// - `ClassifyError::BadAction` when the header names no known operation
    /// - `ClassifyError::InvalidPayload` when the body does not decode as the
    ///   action's payload
    pub fn classify(&self, envelope: Envelope) -> Result<Operation, ClassifyError> {
        let tag = envelope
            .action_tag()
            .ok_or(ClassifyError::NoActionSpecified)?;
        let action: Action = tag.parse().map_err(|_| ClassifyError::BadAction {
            action: tag.to_string(),
        })?;

        let Envelope { address, body, .. } = envelope;
        let ctx = self.make_ctx(address, action);

        match action {
            // The listing takes no parameters; any body is ignored.
            Action::ListPages => Ok(Operation::ListPages { ctx }),
            Action::GetPageById => {
                let PageIdPayload { id } = decode(action, body)?;
                Ok(Operation::GetPageById { ctx, id })
            }
            Action::GetPageByName => {
                let PageNamePayload { name } = decode(action, body)?;
                Ok(Operation::GetPageByName { ctx, name })
            }
            Action::CreatePage => {
                let payload = decode(action, body)?;
                Ok(Operation::CreatePage { ctx, payload })
            }
            Action::SavePage => {
                let payload = decode(action, body)?;
                Ok(Operation::SavePage { ctx, payload })
            }
            Action::DeletePage => {
                let PageIdPayload { id } = decode(action, body)?;
                Ok(Operation::DeletePage { ctx, id })
            }
        }
    }
}

fn decode<T: DeserializeOwned>(action: Action, body: Value) -> Result<T, ClassifyError> {
    serde_json::from_value(body).map_err(|e| ClassifyError::InvalidPayload {
        action,
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
