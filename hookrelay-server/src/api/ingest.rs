use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use hookrelay_core::processors::IngestOutcome;
use hookrelay_sdk::objects::{EventReport, IngestResponse, IngestStatus};
use std::time::Instant;

use crate::state::AppState;

/// `POST /webhook-filter`: submit a scanner report.
///
/// Answers as soon as the dispatch jobs are queued; delivery happens in the
/// background.
pub async fn webhook_filter(
    State(state): State<AppState>,
    payload: Result<Json<EventReport>, JsonRejection>,
) -> impl IntoResponse {
    let started = Instant::now();

    let report = match payload {
        Ok(Json(report)) => report,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unreadable report body");
            state.stats.record_ingest(IngestStatus::Rejected);
            let response = IngestResponse {
                status: IngestStatus::Rejected,
                message: "No data".to_string(),
                job_id: None,
                channel: None,
                parallel_tasks: 0,
                processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
            };
            return (StatusCode::BAD_REQUEST, Json(response));
        }
    };

    let outcome = state.gate.ingest(report).await;
    let code = match outcome.status {
        IngestStatus::Rejected => StatusCode::BAD_REQUEST,
        IngestStatus::Accepted | IngestStatus::Duplicate => StatusCode::OK,
    };
    (code, Json(to_response(outcome)))
}

fn to_response(outcome: IngestOutcome) -> IngestResponse {
    let message = match outcome.status {
        IngestStatus::Accepted => "Processing started",
        IngestStatus::Duplicate => "Already sent",
        IngestStatus::Rejected => "No job_id",
    };
    IngestResponse {
        status: outcome.status,
        message: message.to_string(),
        job_id: outcome.event_id.map(|id| id.to_string()),
        channel: outcome.channel,
        parallel_tasks: outcome.dispatched,
        processing_time_ms: outcome.elapsed.as_secs_f64() * 1000.0,
    }
}

#[cfg(test)]
mod tests {
    use crate::api::test_util::send;
    use crate::server::build_router;
    use crate::state::test_support::test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use hookrelay_sdk::objects::ChannelTag;
    use serde_json::json;

    fn post(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhook-filter")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap()
    }

    fn report(job_id: &str) -> String {
        json!({
            "job_id": job_id,
            "players": 50,
            "max_players": 60,
            "category": "NORMAL",
            "server_id": "srv-1",
            "embed_info": {
                "description": "two finds",
                "highest_brainrot": { "name": "Crown" },
                "top_brainrots": [
                    { "name": "Crown", "numericGen": 200000000, "valuePerSecond": "200M/s" },
                    { "name": "Pebble", "numericGen": "12", "valuePerSecond": "12/s" }
                ]
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_accept_then_duplicate() {
        let mut t = test_state();
        let router = build_router(t.state.clone());

        let (status, body) = send(router.clone(), post(report("A1"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "accepted");
        assert_eq!(body["job_id"], "A1");
        assert_eq!(body["channel"], json!(ChannelTag::UltraHigh));
        assert_eq!(body["parallel_tasks"], 2);
        assert!(body["processing_time_ms"].as_f64().unwrap() >= 0.0);

        let first = t.jobs.try_recv().unwrap();
        let second = t.jobs.try_recv().unwrap();
        assert_eq!(first.channel, ChannelTag::UltraHigh);
        assert_eq!(second.channel, ChannelTag::HighValueAlert);

        let (status, body) = send(router, post(report("A1"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "duplicate");
        assert!(t.jobs.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_missing_job_id_is_bad_request() {
        let mut t = test_state();
        let router = build_router(t.state.clone());
        let (status, body) = send(router, post(json!({ "players": 3 }).to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "rejected");
        assert!(t.jobs.try_recv().is_none());
        assert!(t.state.dedup.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_entities_still_accepted() {
        let mut t = test_state();
        let router = build_router(t.state.clone());
        let bodies = [
            ("B1", json!([{ "name": 7 }])),
            ("B2", json!([{ "valuePerSecond": 150 }])),
            ("B3", json!(["Crown"])),
            ("B4", json!(null)),
        ];

        for (job_id, entities) in bodies {
            let body = json!({ "job_id": job_id, "embed_info": { "top_brainrots": entities } });
            let (status, json) = send(router.clone(), post(body.to_string())).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(json["status"], "accepted");
            assert_eq!(json["channel"], json!(ChannelTag::Normal));
            let job = t.jobs.try_recv().unwrap();
            assert_eq!(job.channel, ChannelTag::Normal);
        }
        assert_eq!(t.state.stats.accepted(), 4);
        assert_eq!(t.state.stats.rejected(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_body_is_bad_request() {
        let t = test_state();
        let router = build_router(t.state.clone());
        for body in ["", "not json"] {
            let (status, json) = send(router.clone(), post(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["status"], "rejected");
        }
        assert_eq!(t.state.stats.rejected(), 2);
    }
}
