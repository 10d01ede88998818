//! Failure replies delivered in place of a successful reply body.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureCode {
    /// Nothing is bound at the requested address.
    NoHandlers,
    /// The request carried no action tag.
    NoActionSpecified,
    /// The action tag names no known operation.
    BadAction,
    /// The body could not be decoded as the action's payload.
    InvalidPayload,
    /// The targeted page does not exist.
    PageNotFound,
    /// The targeted page was already deleted.
    PageDeleted,
    /// The relational backend reported an error.
    Storage,
    /// The transport gave up waiting for the operation.
    Timeout,
    /// The transport refused the request because too many are in flight.
    Overloaded,
    /// The request or its reply was lost in transit.
    Transport,
    /// A reply arrived but could not be decoded.
    InvalidReply,
}

impl FailureCode {
    /// Protocol failures are rejected before any business logic runs.
    #[must_use]
    pub fn is_protocol(self) -> bool {
        matches!(
            self,
            FailureCode::NoHandlers
                | FailureCode::NoActionSpecified
                | FailureCode::BadAction
                | FailureCode::InvalidPayload
        )
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FailureCode::NoHandlers => "no-handlers",
            FailureCode::NoActionSpecified => "no-action-specified",
            FailureCode::BadAction => "bad-action",
            FailureCode::InvalidPayload => "invalid-payload",
            FailureCode::PageNotFound => "page-not-found",
            FailureCode::PageDeleted => "page-deleted",
            FailureCode::Storage => "storage",
            FailureCode::Timeout => "timeout",
            FailureCode::Overloaded => "overloaded",
            FailureCode::Transport => "transport",
            FailureCode::InvalidReply => "invalid-reply",
        }
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed request, as delivered to the single caller that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ReplyFailure {
    pub code: FailureCode,
    /// Human-readable description. For storage failures this is the
    /// backend's own error text.
    pub message: String,
}

impl ReplyFailure {
    #[must_use]
    pub fn new(code: FailureCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_protocol(&self) -> bool {
        self.code.is_protocol()
    }
}
