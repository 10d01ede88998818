//! Domain services bound on the bus.
//!
//! Each service implements both `ManagedService` (lifecycle) and
//! `tower::Service<Operation>` (request handling).

pub mod pages;

pub use pages::PageStoreService;
