use axum::{Json, extract::State, response::IntoResponse};
use hookrelay_sdk::objects::{HealthResponse, StatusResponse};

use crate::state::AppState;

/// `GET /health`: returns OK while the server is running.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: time::OffsetDateTime::now_utc().unix_timestamp(),
        cache_size: state.dedup.len(),
        workers: state.workers,
    })
}

/// `GET /status`: queue, index and per-channel delivery counters.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let stats = &state.stats;
    Json(StatusResponse {
        queue_depth: state.queue.depth(),
        cache_size: state.dedup.len(),
        workers: state.workers,
        accepted: stats.accepted(),
        duplicates: stats.duplicates(),
        rejected: stats.rejected(),
        channels: stats.channel_counters(),
    })
}
