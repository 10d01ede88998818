//! Wiki Core: page model, bus envelopes, action tags, and reply failures.

pub mod clock;
pub mod messages;
pub mod page;

pub use clock::{ClockSource, SystemClock};
pub use messages::{
    Action, CreatePagePayload, Envelope, FailureCode, PageIdPayload, PageNamePayload,
    ReplyFailure, SavePagePayload, ACTION_HEADER,
};
pub use page::{Page, PageList, PageLookup, PageSummary};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
