//! Wall-clock abstraction for timestamps the store assigns itself.

use chrono::{DateTime, Utc};

/// Source of the current instant.
///
/// Allows deterministic testing by replacing the real clock with a scripted
/// one. The default implementation ([`SystemClock`]) reads the system time.
pub trait ClockSource: Send + Sync {
    /// Returns the current UTC instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Default clock source that reads the real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
