use crate::config::ConfigError;
use crate::engine::{EngineError, ErrorKind, OperationResult};
use crate::registry::ImportError;
use crate::store::StoreError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Engine(EngineError),
    Store(StoreError),
    Import(ImportError),
    Payload(serde_json::Error),
    Rejected { kind: ErrorKind, message: String },
}

impl AppError {
    /// Unwrap an operation envelope, turning a failure back into an error.
    pub fn from_outcome<T>(result: OperationResult<T>) -> Result<T, Self> {
        match result.data {
            Some(data) => Ok(data),
            None => Err(Self::Rejected {
                kind: result.kind.unwrap_or(ErrorKind::StoreFailure),
                message: result.error.unwrap_or_default(),
            }),
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            AppError::Engine(err) => Some(err.kind()),
            AppError::Rejected { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    fn status(&self) -> StatusCode {
        if let Some(kind) = self.kind() {
            return status_for(kind);
        }
        match self {
            AppError::Import(_) | AppError::Payload(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::MissingField | ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::DuplicateKey => StatusCode::CONFLICT,
        ErrorKind::InvalidTransition => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::StoreFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Engine(err) => write!(f, "{}", err),
            AppError::Store(err) => write!(f, "store error: {}", err),
            AppError::Import(err) => write!(f, "import error: {}", err),
            AppError::Payload(err) => write!(f, "invalid payload: {}", err),
            AppError::Rejected { message, .. } => f.write_str(message),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Engine(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Import(err) => Some(err),
            AppError::Payload(err) => Some(err),
            AppError::Rejected { .. } => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self.kind() {
            Some(kind) => json!({ "success": false, "kind": kind, "error": self.to_string() }),
            None => json!({ "success": false, "error": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<EngineError> for AppError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<ImportError> for AppError {
    fn from(value: ImportError) -> Self {
        Self::Import(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Payload(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_map_to_http_status_by_kind() {
        let cases = [
            (EngineError::MissingField("plateNumber"), StatusCode::BAD_REQUEST),
            (EngineError::not_found("vehicle", "VEH-1"), StatusCode::NOT_FOUND),
            (
                EngineError::DuplicateKey {
                    entity: "vehicle",
                    field: "plateNumber",
                    value: "ABC-1".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                EngineError::InvalidTransition {
                    entity: "violation",
                    status: "paid",
                    action: "pay",
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                EngineError::Store(StoreError::Unavailable("down".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            let response = AppError::from(error).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn failed_envelopes_become_rejections() {
        let envelope: OperationResult<()> =
            Err(EngineError::not_found("violation", "VIO-1")).into();
        match AppError::from_outcome(envelope) {
            Err(error @ AppError::Rejected { .. }) => {
                assert_eq!(error.to_string(), "violation 'VIO-1' not found");
                assert_eq!(error.into_response().status(), StatusCode::NOT_FOUND);
            }
            other => panic!("expected rejection, got {other:?}"),
        }

        let ok = AppError::from_outcome(OperationResult::ok(7)).expect("success unwraps");
        assert_eq!(ok, 7);
    }

    #[test]
    fn import_errors_are_client_errors() {
        let response = AppError::from(ImportError::MissingPlateColumn).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
