use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::json;
use tracing::warn;

use super::board::{JobBoard, JobBoardFilter};
use super::repository::JobRepository;

/// Public job board over active postings.
pub fn job_board_router<J>(jobs: Arc<J>) -> Router
where
    J: JobRepository + 'static,
{
    Router::new()
        .route("/api/v1/jobs", get(board_handler::<J>))
        .with_state(jobs)
}

pub(crate) async fn board_handler<J>(
    State(jobs): State<Arc<J>>,
    Query(filter): Query<JobBoardFilter>,
) -> Response
where
    J: JobRepository + 'static,
{
    match jobs.active_jobs().await {
        Ok(postings) => {
            let board = JobBoard::new(postings);
            let payload = json!({
                "jobs": board.filter(&filter),
                "facets": board.facets(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => {
            warn!(%error, "job board lookup failed");
            let payload = json!({ "error": error.to_string() });
            (StatusCode::BAD_GATEWAY, axum::Json(payload)).into_response()
        }
    }
}
