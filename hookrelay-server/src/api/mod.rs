//! HTTP API handlers.
//!
//! # Endpoints
//!
//! - `POST /webhook-filter` – submit a scanner report
//! - `GET  /health`         – liveness and basic counters
//! - `GET  /status`         – full relay status
//! - `GET  /servers`        – most recently accepted events

use axum::{
    Json, Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use hookrelay_core::dedup::LedgerError;
use serde_json::json;

use crate::state::AppState;

mod ingest;
mod recent;
mod status;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook-filter", post(ingest::webhook_filter))
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .route("/servers", get(recent::list_recent))
}

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

/// Errors that can occur in API handlers.
#[derive(Debug)]
pub(crate) enum ApiError {
    Ledger(LedgerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Ledger(e) => {
                tracing::error!(error = %e, "API ledger error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "status": "error", "message": "ledger unavailable" })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    /// Send `request` through `router`, returning the status and JSON body.
    pub async fn send(
        router: axum::Router,
        request: Request<Body>,
    ) -> (axum::http::StatusCode, serde_json::Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}
