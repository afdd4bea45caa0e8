//! Observability responses: health, status and the recent-dispatch listing.

use serde::{Deserialize, Serialize};

use super::channel::ChannelTag;

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: i64,
    /// Entries currently held by the in-memory dedup index.
    pub cache_size: usize,
    pub workers: usize,
}

/// Delivery counters for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCounters {
    pub channel: ChannelTag,
    pub delivered: u64,
    pub failed: u64,
}

/// Response of `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub queue_depth: usize,
    pub cache_size: usize,
    pub workers: usize,
    pub accepted: u64,
    pub duplicates: u64,
    pub rejected: u64,
    pub channels: Vec<ChannelCounters>,
}

/// One accepted event in the recent listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentDispatch {
    pub job_id: String,
    pub channel: Option<ChannelTag>,
    pub category: Option<String>,
    /// Unix timestamp (seconds) of acceptance.
    pub timestamp: i64,
}

/// Response of `GET /servers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentDispatchList {
    pub servers: Vec<RecentDispatch>,
    pub count: usize,
    pub cache_hits: usize,
}

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

/// Query parameters for the recent listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ListRecentQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

/// Clamp a requested listing size to a safe range.
pub fn clamp_limit(limit: i64) -> usize {
    // Always within 1..=MAX_LIMIT, so the cast cannot truncate.
    limit.clamp(1, MAX_LIMIT) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(-4), 1);
        assert_eq!(clamp_limit(10), 10);
        assert_eq!(clamp_limit(5_000), 100);
    }
}
