//! The wiki page record and the shapes derived from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored wiki page.
///
/// A page is either *active* or *deleted*. Deleted pages keep their row (and
/// their id) but carry a `delete_date` and a rewritten `name`, so the original
/// name can be reused by a new page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Opaque unique identifier, assigned by the caller at creation.
    pub id: String,
    /// Human-readable unique name (lowercase) among active pages.
    pub name: String,
    /// Markdown source. Empty until the first save.
    pub content: String,
    /// Set once, at creation.
    pub creation_date: DateTime<Utc>,
    /// Set on every successful content save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_date: Option<DateTime<Utc>>,
    /// Set on deletion. Its presence marks the page as soft-deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_date: Option<DateTime<Utc>>,
}

impl Page {
    /// Whether the page has been soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.delete_date.is_some()
    }

    /// The most recent timestamp recorded on the page.
    #[must_use]
    pub fn last_changed(&self) -> DateTime<Utc> {
        [self.update_date, self.delete_date]
            .into_iter()
            .flatten()
            .fold(self.creation_date, std::cmp::max)
    }
}

/// An `(id, name)` pair as returned by page listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub id: String,
    pub name: String,
}

/// Reply body of a lookup by id or by name.
///
/// A miss is a normal reply (`{"found": false}`), not a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLookup {
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<Page>,
}

impl PageLookup {
    #[must_use]
    pub fn found(page: Page) -> Self {
        Self {
            found: true,
            page: Some(page),
        }
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self {
            found: false,
            page: None,
        }
    }

    /// Collapses the reply into an `Option`. A `found: true` reply without a
    /// page body is treated as a miss.
    #[must_use]
    pub fn into_page(self) -> Option<Page> {
        if self.found {
            self.page
        } else {
            None
        }
    }
}

impl From<Option<Page>> for PageLookup {
    fn from(page: Option<Page>) -> Self {
        page.map_or_else(Self::not_found, Self::found)
    }
}

/// Reply body of a page listing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageList {
    pub pages: Vec<PageSummary>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn page() -> Page {
        Page {
            id: "8f14e45f-ceea-467f-a0a4-1f1b6d6e2a10".to_string(),
            name: "home".to_string(),
            content: String::new(),
            creation_date: Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
            update_date: None,
            delete_date: None,
        }
    }

    #[test]
    fn fresh_page_is_active() {
        assert!(!page().is_deleted());
    }

    #[test]
    fn delete_date_marks_page_deleted() {
        let mut p = page();
        p.delete_date = Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
        assert!(p.is_deleted());
    }

    #[test]
    fn last_changed_picks_latest_timestamp() {
        let mut p = page();
        assert_eq!(p.last_changed(), p.creation_date);

        let saved = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        p.update_date = Some(saved);
        assert_eq!(p.last_changed(), saved);
    }

    #[test]
    fn miss_serializes_as_found_false_only() {
        let value = serde_json::to_value(PageLookup::not_found()).unwrap();
        assert_eq!(value, json!({ "found": false }));
    }

    #[test]
    fn hit_carries_full_page() {
        let value = serde_json::to_value(PageLookup::found(page())).unwrap();
        assert_eq!(value["found"], true);
        assert_eq!(value["page"]["name"], "home");
        assert_eq!(value["page"]["content"], "");
        assert!(value["page"].get("update_date").is_none());
    }

    #[test]
    fn found_without_body_collapses_to_none() {
        let lookup: PageLookup = serde_json::from_value(json!({ "found": true })).unwrap();
        assert!(lookup.into_page().is_none());
    }

    #[test]
    fn option_converts_into_lookup() {
        assert!(!PageLookup::from(None).found);
        assert_eq!(PageLookup::from(Some(page())).into_page(), Some(page()));
    }
}
