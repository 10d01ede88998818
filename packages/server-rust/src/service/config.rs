/// Server-level configuration for the operation pipeline and the bus.
///
/// Controls the bus address, operation timeouts and concurrency limits.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bus address the page store is bound to.
    pub bus_address: String,
    /// Transport timeout for operations in milliseconds. `0` disables it;
    /// the store itself never times out.
    pub default_operation_timeout_ms: u64,
    /// Maximum number of concurrent operations before load shedding.
    pub max_concurrent_operations: u32,
    /// Capacity of the bus delivery channel.
    pub bus_channel_capacity: usize,
    /// Interval between bus housekeeping ticks in milliseconds.
    pub bus_tick_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bus_address: "wikidb.queue".to_string(),
            default_operation_timeout_ms: 30_000,
            max_concurrent_operations: 1000,
            bus_channel_capacity: 256,
            bus_tick_interval_ms: 10_000,
        }
    }
}
