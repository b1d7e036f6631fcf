use crate::infra::{AppState, SharedEngine};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::Cursor;
use traffic_ledger::engine::LinkedDataDocument;
use traffic_ledger::error::AppError;
use traffic_ledger::ledger::{
    NewViolation, PaymentDetails, RecognizedPlate, ViolationPatch, ViolationSearch,
};
use traffic_ledger::linkage::{MisuseStatus, NewDelivery, NewMisuseReport, Sticker};
use traffic_ledger::registry::{
    GateInfo, NewVehicle, NewVehicleImage, VehiclePatch, VehicleSearch,
};
use traffic_ledger::{DocumentStore, ErrorKind, OperationResult, TrafficEngine};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ReasonRequest {
    pub(crate) reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppealResponseRequest {
    pub(crate) approved: bool,
    #[serde(default)]
    pub(crate) response: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecognizedViolationRequest {
    pub(crate) recognition: RecognizedPlate,
    #[serde(default)]
    pub(crate) violation: NewViolation,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResolutionRequest {
    pub(crate) resolution: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct MisuseFilter {
    pub(crate) status: Option<MisuseStatus>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PeriodQuery {
    pub(crate) from: NaiveDate,
    pub(crate) to: NaiveDate,
}

pub(crate) fn with_ledger_routes<S>(engine: SharedEngine<S>) -> Router
where
    S: DocumentStore + 'static,
{
    ledger_router(engine)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) fn ledger_router<S>(engine: SharedEngine<S>) -> Router
where
    S: DocumentStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/vehicles",
            get(search_vehicles::<S>).post(add_vehicle::<S>),
        )
        .route("/api/v1/vehicles/import", post(import_vehicles::<S>))
        .route("/api/v1/vehicles/recompute", post(recompute_vehicles::<S>))
        .route("/api/v1/vehicles/export", get(export_vehicles_csv::<S>))
        .route(
            "/api/v1/vehicles/:id",
            get(find_vehicle::<S>)
                .patch(update_vehicle::<S>)
                .delete(delete_vehicle::<S>),
        )
        .route("/api/v1/vehicles/:id/suspend", post(suspend_vehicle::<S>))
        .route("/api/v1/vehicles/:id/activate", post(activate_vehicle::<S>))
        .route("/api/v1/vehicles/:id/entries", post(record_entry::<S>))
        .route("/api/v1/vehicles/:id/images", post(add_vehicle_image::<S>))
        .route("/api/v1/plates/:plate", get(plate_lookup::<S>))
        .route("/api/v1/plates/:plate/sticker", get(validate_sticker::<S>))
        .route(
            "/api/v1/plates/:plate/violations",
            get(plate_violations::<S>),
        )
        .route(
            "/api/v1/violations",
            get(search_violations::<S>).post(add_violation::<S>),
        )
        .route(
            "/api/v1/violations/recognized",
            post(record_recognized::<S>),
        )
        .route(
            "/api/v1/violations/statistics",
            get(violation_period_statistics::<S>),
        )
        .route(
            "/api/v1/violations/export",
            get(export_violations_csv::<S>),
        )
        .route(
            "/api/v1/violations/number/:number",
            get(find_violation_by_number::<S>),
        )
        .route(
            "/api/v1/violations/:id",
            get(find_violation::<S>)
                .patch(update_violation::<S>)
                .delete(delete_violation::<S>),
        )
        .route("/api/v1/violations/:id/pay", post(pay_violation::<S>))
        .route("/api/v1/violations/:id/appeal", post(appeal_violation::<S>))
        .route(
            "/api/v1/violations/:id/appeal-response",
            post(respond_to_appeal::<S>),
        )
        .route("/api/v1/violations/:id/cancel", post(cancel_violation::<S>))
        .route(
            "/api/v1/stickers",
            get(list_stickers::<S>).post(register_sticker::<S>),
        )
        .route("/api/v1/stickers/import", post(import_stickers::<S>))
        .route("/api/v1/stickers/reconcile", post(reconcile::<S>))
        .route("/api/v1/owners/:national_id", get(owner_lookup::<S>))
        .route(
            "/api/v1/deliveries",
            get(unactivated_deliveries::<S>).post(register_delivery::<S>),
        )
        .route(
            "/api/v1/deliveries/:sticker_number/activate",
            post(activate_delivery::<S>),
        )
        .route(
            "/api/v1/misuse-reports",
            get(misuse_reports::<S>).post(register_misuse::<S>),
        )
        .route(
            "/api/v1/misuse-reports/:id/confirm",
            post(confirm_misuse::<S>),
        )
        .route(
            "/api/v1/misuse-reports/:id/resolve",
            post(resolve_misuse::<S>),
        )
        .route("/api/v1/statistics", get(statistics::<S>))
        .route("/api/v1/export", get(export_data::<S>))
        .route("/api/v1/import", post(import_data::<S>))
        .with_state(engine)
}

/// Run one engine operation under the lock and render its envelope.
fn call<S, T, F>(engine: &SharedEngine<S>, status: StatusCode, operation: F) -> Response
where
    S: DocumentStore + 'static,
    T: Serialize,
    F: FnOnce(&TrafficEngine<S>) -> OperationResult<T>,
{
    let result = match engine.lock() {
        Ok(guard) => operation(&guard),
        Err(_) => {
            return AppError::Rejected {
                kind: ErrorKind::StoreFailure,
                message: "engine lock poisoned".to_string(),
            }
            .into_response()
        }
    };

    match AppError::from_outcome(result) {
        Ok(data) => (status, Json(OperationResult::ok(data))).into_response(),
        Err(error) => error.into_response(),
    }
}

/// Like [`call`], but the operation writes CSV and the body is returned as-is.
fn csv_call<S, F>(engine: &SharedEngine<S>, operation: F) -> Response
where
    S: DocumentStore + 'static,
    F: FnOnce(&TrafficEngine<S>, &mut Vec<u8>) -> OperationResult<usize>,
{
    let mut buffer = Vec::new();
    let result = match engine.lock() {
        Ok(guard) => operation(&guard, &mut buffer),
        Err(_) => {
            return AppError::Rejected {
                kind: ErrorKind::StoreFailure,
                message: "engine lock poisoned".to_string(),
            }
            .into_response()
        }
    };

    match AppError::from_outcome(result) {
        Ok(_) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            buffer,
        )
            .into_response(),
        Err(error) => error.into_response(),
    }
}

pub(crate) async fn healthcheck() -> Json<Value> {
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

// Vehicles

async fn search_vehicles<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Query(criteria): Query<VehicleSearch>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| {
        engine.search_vehicles(&criteria)
    })
}

async fn add_vehicle<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Json(input): Json<NewVehicle>,
) -> Response {
    call(&engine, StatusCode::CREATED, |engine| engine.add_vehicle(input))
}

async fn import_vehicles<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    body: String,
) -> Response {
    call(&engine, StatusCode::OK, |engine| {
        engine.import_vehicles_csv(Cursor::new(body.into_bytes()))
    })
}

async fn recompute_vehicles<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| engine.recompute_all())
}

async fn find_vehicle<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Path(id): Path<String>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| engine.find_vehicle(&id))
}

async fn update_vehicle<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Path(id): Path<String>,
    Json(patch): Json<VehiclePatch>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| {
        engine.update_vehicle(&id, patch)
    })
}

async fn delete_vehicle<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Path(id): Path<String>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| engine.delete_vehicle(&id))
}

async fn suspend_vehicle<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Path(id): Path<String>,
    Json(request): Json<ReasonRequest>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| {
        engine.suspend_vehicle(&id, request.reason)
    })
}

async fn activate_vehicle<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Path(id): Path<String>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| engine.activate_vehicle(&id))
}

async fn record_entry<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Path(id): Path<String>,
    Json(gate): Json<GateInfo>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| engine.record_entry(&id, gate))
}

async fn add_vehicle_image<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Path(id): Path<String>,
    Json(image): Json<NewVehicleImage>,
) -> Response {
    call(&engine, StatusCode::CREATED, |engine| {
        engine.add_vehicle_image(&id, image)
    })
}

async fn export_vehicles_csv<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
) -> Response {
    csv_call(&engine, |engine, buffer| engine.export_vehicles_csv(buffer))
}

// Plates and owners

async fn plate_lookup<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Path(plate): Path<String>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| {
        engine.find_vehicle_by_plate(&plate)
    })
}

async fn validate_sticker<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Path(plate): Path<String>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| engine.validate_sticker(&plate))
}

async fn plate_violations<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Path(plate): Path<String>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| {
        engine.violations_for_plate(&plate)
    })
}

async fn owner_lookup<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Path(national_id): Path<String>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| {
        engine.find_by_national_id(&national_id)
    })
}

// Violations

async fn search_violations<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Query(criteria): Query<ViolationSearch>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| {
        engine.search_violations(&criteria)
    })
}

async fn add_violation<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Json(input): Json<NewViolation>,
) -> Response {
    call(&engine, StatusCode::CREATED, |engine| {
        engine.add_violation(input)
    })
}

async fn record_recognized<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Json(request): Json<RecognizedViolationRequest>,
) -> Response {
    call(&engine, StatusCode::CREATED, |engine| {
        engine.record_recognized(request.recognition, request.violation)
    })
}

async fn find_violation<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Path(id): Path<String>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| engine.find_violation(&id))
}

async fn find_violation_by_number<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Path(number): Path<String>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| {
        engine.find_violation_by_number(&number)
    })
}

async fn update_violation<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Path(id): Path<String>,
    Json(patch): Json<ViolationPatch>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| {
        engine.update_violation(&id, patch)
    })
}

async fn delete_violation<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Path(id): Path<String>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| engine.delete_violation(&id))
}

async fn pay_violation<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Path(id): Path<String>,
    Json(payment): Json<PaymentDetails>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| {
        engine.pay_violation(&id, payment)
    })
}

async fn appeal_violation<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Path(id): Path<String>,
    Json(request): Json<ReasonRequest>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| {
        engine.appeal_violation(&id, request.reason)
    })
}

async fn respond_to_appeal<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Path(id): Path<String>,
    Json(request): Json<AppealResponseRequest>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| {
        engine.respond_to_appeal(&id, request.approved, request.response)
    })
}

async fn cancel_violation<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Path(id): Path<String>,
    Json(request): Json<ReasonRequest>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| {
        engine.cancel_violation(&id, request.reason)
    })
}

async fn violation_period_statistics<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Query(period): Query<PeriodQuery>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| {
        engine.violation_statistics_for_period(period.from, period.to)
    })
}

async fn export_violations_csv<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
) -> Response {
    csv_call(&engine, |engine, buffer| engine.export_violations_csv(buffer))
}

// Stickers, deliveries, misuse

async fn list_stickers<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| engine.list_stickers())
}

async fn register_sticker<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Json(sticker): Json<Sticker>,
) -> Response {
    call(&engine, StatusCode::CREATED, |engine| {
        engine.register_sticker(sticker)
    })
}

async fn import_stickers<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Json(documents): Json<Vec<Value>>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| {
        engine.import_stickers(documents)
    })
}

async fn reconcile<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| engine.reconcile())
}

async fn unactivated_deliveries<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| {
        engine.unactivated_deliveries()
    })
}

async fn register_delivery<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Json(input): Json<NewDelivery>,
) -> Response {
    call(&engine, StatusCode::CREATED, |engine| {
        engine.register_delivery(input)
    })
}

async fn activate_delivery<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Path(sticker_number): Path<String>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| {
        engine.activate_delivery(&sticker_number)
    })
}

async fn misuse_reports<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Query(filter): Query<MisuseFilter>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| {
        engine.misuse_reports(filter.status)
    })
}

async fn register_misuse<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Json(input): Json<NewMisuseReport>,
) -> Response {
    call(&engine, StatusCode::CREATED, |engine| {
        engine.register_misuse(input)
    })
}

async fn confirm_misuse<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Path(id): Path<String>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| engine.confirm_misuse(&id))
}

async fn resolve_misuse<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Path(id): Path<String>,
    Json(request): Json<ResolutionRequest>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| {
        engine.resolve_misuse(&id, &request.resolution)
    })
}

// Aggregates

async fn statistics<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| engine.get_statistics())
}

async fn export_data<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| engine.export_linked_data())
}

async fn import_data<S: DocumentStore + 'static>(
    State(engine): State<SharedEngine<S>>,
    Json(document): Json<LinkedDataDocument>,
) -> Response {
    call(&engine, StatusCode::OK, |engine| {
        engine.import_linked_data(document.data)
    })
}
