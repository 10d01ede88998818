//! Action tags selecting which page store operation a request invokes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Header carrying the action tag. The tag is never read from the body.
pub const ACTION_HEADER: &str = "action";

/// The operations the page store answers to, keyed by their wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// `all-pages`: active pages ordered by name.
    #[serde(rename = "all-pages")]
    ListPages,
    GetPageById,
    GetPageByName,
    CreatePage,
    SavePage,
    DeletePage,
}

impl Action {
    /// Every action, in declaration order.
    pub const ALL: [Action; 6] = [
        Action::ListPages,
        Action::GetPageById,
        Action::GetPageByName,
        Action::CreatePage,
        Action::SavePage,
        Action::DeletePage,
    ];

    /// The wire name used in the `action` header.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Action::ListPages => "all-pages",
            Action::GetPageById => "get-page-by-id",
            Action::GetPageByName => "get-page-by-name",
            Action::CreatePage => "create-page",
            Action::SavePage => "save-page",
            Action::DeletePage => "delete-page",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known action name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}
