//! Request payloads for the page store operations.
//!
//! `all-pages` takes no payload; every other action decodes its body into one
//! of these structs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `get-page-by-id` and `delete-page`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageIdPayload {
    pub id: String,
}

/// Body of `get-page-by-name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageNamePayload {
    pub name: String,
}

/// Body of `create-page`. Id and timestamp are chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePagePayload {
    pub id: String,
    pub name: String,
    pub creation_date: DateTime<Utc>,
}

/// Body of `save-page`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavePagePayload {
    pub id: String,
    pub content: String,
    pub update_date: DateTime<Utc>,
}
