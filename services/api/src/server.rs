use crate::cli::ServeArgs;
use crate::infra::{open_engine, AppState};
use crate::routes::with_ledger_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use traffic_ledger::config::AppConfig;
use traffic_ledger::error::AppError;
use traffic_ledger::telemetry;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let engine = open_engine(&config)?;
    let report = AppError::from_outcome(engine.reconcile())?;
    info!(
        stickers = report.stickers,
        vehicles_created = report.vehicles_created,
        "startup reconcile complete"
    );

    let app = with_ledger_routes(Arc::new(Mutex::new(engine)))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        data_dir = %config.storage.data_dir.display(),
        "traffic ledger ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
