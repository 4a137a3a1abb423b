use crate::cli::ServeArgs;
use crate::infra::{AppState, Services};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use blueox::backend::{HostedBackend, InMemoryBackend};
use blueox::config::AppConfig;
use blueox::error::AppError;
use blueox::telemetry;
use blueox::workflows::admin::AdminStore;
use blueox::workflows::applications::DocumentStorage;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    if config.backend.is_configured() {
        let backend = HostedBackend::from_config(&config.backend)?;
        info!(bucket = %config.backend.documents_bucket, "using hosted backend");
        serve(config, Arc::new(backend)).await
    } else {
        warn!("BACKEND_URL or BACKEND_ANON_KEY unset; using in-memory backend with sample jobs");
        serve(config, Arc::new(InMemoryBackend::with_sample_jobs())).await
    }
}

async fn serve<B>(config: AppConfig, backend: Arc<B>) -> Result<(), AppError>
where
    B: AdminStore + DocumentStorage + 'static,
{
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let services = Services::new(backend, config.matching);
    let app = with_service_routes(&services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, match_limit = config.matching.limit, "blue ox service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
