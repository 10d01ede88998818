//! Request envelopes carried by the bus.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::action::{Action, ACTION_HEADER};

/// A request addressed to a named service.
///
/// Routing metadata (the action tag) lives in `headers`; `body` holds only
/// the operation's parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Address the target service is bound to.
    pub address: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Value,
}

impl Envelope {
    /// Creates an envelope without headers.
    #[must_use]
    pub fn new(address: impl Into<String>, body: Value) -> Self {
        Self {
            address: address.into(),
            headers: BTreeMap::new(),
            body,
        }
    }

    /// Sets an arbitrary header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Tags the envelope with an action.
    #[must_use]
    pub fn with_action(self, action: Action) -> Self {
        self.with_header(ACTION_HEADER, action.as_str())
    }

    /// Raw action tag, if any.
    #[must_use]
    pub fn action_tag(&self) -> Option<&str> {
        self.headers.get(ACTION_HEADER).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn with_action_sets_header_not_body() {
        let env = Envelope::new("wikidb.queue", json!({ "id": "x" }))
            .with_action(Action::GetPageById);
        assert_eq!(env.action_tag(), Some("get-page-by-id"));
        assert_eq!(env.body, json!({ "id": "x" }));
    }

    #[test]
    fn untagged_envelope_has_no_action() {
        let env = Envelope::new("wikidb.queue", Value::Null);
        assert_eq!(env.action_tag(), None);
    }

    #[test]
    fn action_in_body_is_not_an_action_tag() {
        let env = Envelope::new("wikidb.queue", json!({ "action": "all-pages" }));
        assert_eq!(env.action_tag(), None);
    }

    #[test]
    fn later_header_overrides_earlier() {
        let env = Envelope::new("a", Value::Null)
            .with_header(ACTION_HEADER, "nope")
            .with_action(Action::ListPages);
        assert_eq!(env.action_tag(), Some("all-pages"));
    }
}
