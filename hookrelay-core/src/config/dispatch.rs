//! Delivery worker pool configuration.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Number of delivery workers draining the dispatch queue.
    pub workers: usize,
    /// Upper bound on a single delivery attempt.
    pub delivery_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            delivery_timeout: Duration::from_secs(5),
        }
    }
}
