use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use hookrelay_core::dedup::Namespace;
use hookrelay_sdk::objects::{ListRecentQuery, RecentDispatch, RecentDispatchList, clamp_limit};

use super::ApiError;
use crate::state::AppState;

/// `GET /servers?limit=N`: newest accepted events, newest first.
pub async fn list_recent(
    State(state): State<AppState>,
    Query(query): Query<ListRecentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = clamp_limit(query.limit);
    let entries = state
        .ledger
        .recent(Namespace::Primary, limit)
        .await
        .map_err(ApiError::Ledger)?;

    let servers: Vec<RecentDispatch> = entries
        .into_iter()
        .map(|entry| RecentDispatch {
            job_id: entry.key.event_id.to_string(),
            channel: entry.meta.channel,
            category: entry.meta.category.map(|c| c.to_string()),
            timestamp: entry.created_at.unix_timestamp(),
        })
        .collect();

    Ok(Json(RecentDispatchList {
        count: servers.len(),
        servers,
        cache_hits: state.dedup.len(),
    }))
}
