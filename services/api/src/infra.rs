use metrics_exporter_prometheus::PrometheusHandle;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use traffic_ledger::config::AppConfig;
use traffic_ledger::error::AppError;
use traffic_ledger::{JsonFileStore, TrafficEngine};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// One engine per process; every request runs its operation under this lock.
pub(crate) type SharedEngine<S> = Arc<Mutex<TrafficEngine<S>>>;

pub(crate) fn open_engine(config: &AppConfig) -> Result<TrafficEngine<JsonFileStore>, AppError> {
    let store = JsonFileStore::open(&config.storage.data_dir)?;
    Ok(TrafficEngine::new(Arc::new(store), &config.ledger))
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let raw = fs::read(path)?;
    Ok(serde_json::from_slice(&raw)?)
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
