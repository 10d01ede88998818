//! Wiki Server: the page store, the message bus it answers on, sqlx storage
//! and an axum health surface.

pub mod app;
pub mod network;
pub mod service;
pub mod storage;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use app::{WikiConfig, WikiNode};
pub use service::{PageStoreProxy, PageStoreService};
pub use traits::{PageBackend, PageStoreApi};
