//! HTTP handlers and the state they share.

pub mod health;

pub use health::{health_handler, liveness_handler, readiness_handler};

use std::sync::Arc;
use std::time::Instant;

use super::{NetworkConfig, ShutdownController};

/// Shared application state passed to all axum handlers via `State` extraction.
#[derive(Clone)]
pub struct AppState {
    /// Node lifecycle and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    pub config: Arc<NetworkConfig>,
    /// Bus address the page store answers on.
    pub bus_address: Arc<str>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
