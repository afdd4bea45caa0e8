use serde::{Deserialize, Serialize};

use super::channel::ChannelTag;

/// Outcome of submitting a report to the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    /// The event was new and dispatch jobs were queued.
    Accepted,
    /// The event was already dispatched within the retention window.
    Duplicate,
    /// The report was not usable (missing identifier, bad body).
    Rejected,
}

impl std::fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestStatus::Accepted => write!(f, "accepted"),
            IngestStatus::Duplicate => write!(f, "duplicate"),
            IngestStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Response body of `POST /webhook-filter`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestResponse {
    pub status: IngestStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Primary channel the event was routed to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelTag>,
    /// Number of dispatch jobs queued for this report.
    #[serde(default)]
    pub parallel_tasks: usize,
    pub processing_time_ms: f64,
}
