use crate::infra::{AppState, Services};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;

use blueox::workflows::admin::{admin_router, AdminStore};
use blueox::workflows::applications::DocumentStorage;
use blueox::workflows::conversation::conversation_router;
use blueox::workflows::jobs::job_board_router;

pub(crate) fn with_service_routes<B>(services: &Services<B>) -> axum::Router
where
    B: AdminStore + DocumentStorage + 'static,
{
    conversation_router(services.conversations.clone())
        .merge(job_board_router(services.backend.clone()))
        .merge(admin_router(services.console.clone()))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use blueox::backend::InMemoryBackend;
    use blueox::config::MatchingConfig;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(ready: bool) -> axum::Router {
        let services = Services::new(
            Arc::new(InMemoryBackend::with_sample_jobs()),
            MatchingConfig::default(),
        );
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        state.readiness.store(ready, Ordering::Release);
        with_service_routes(&services).layer(Extension(state))
    }

    async fn get(router: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router dispatch");
        let status = response.status();
        let body = to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("body");
        (status, serde_json::from_slice(&body).expect("json"))
    }

    #[tokio::test]
    async fn readiness_tracks_the_startup_flag() {
        let (status, payload) = get(app(false), "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload["status"], "initializing");

        let (status, payload) = get(app(true), "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["status"], "ready");
    }

    #[tokio::test]
    async fn workflow_routers_are_mounted() {
        let (status, payload) = get(app(true), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["status"], "ok");

        let (status, payload) = get(app(true), "/api/v1/paths").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["paths"].as_array().map(Vec::len), Some(4));

        let (status, payload) = get(app(true), "/api/v1/jobs?country=Poland").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["jobs"].as_array().map(Vec::len), Some(2));

        let (status, _) = get(app(true), "/api/v1/admin/dashboard").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
