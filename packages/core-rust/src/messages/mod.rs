//! Messages exchanged between callers and the page store over the bus.
//!
//! Requests are [`Envelope`]s tagged with an [`Action`] in the `action`
//! header. Replies are either an action-specific JSON body or a
//! [`ReplyFailure`].

pub mod action;
pub mod envelope;
pub mod failure;
pub mod pages;

pub use action::{Action, UnknownAction, ACTION_HEADER};
pub use envelope::Envelope;
pub use failure::{FailureCode, ReplyFailure};
pub use pages::{CreatePagePayload, PageIdPayload, PageNamePayload, SavePagePayload};
