use serde::Serialize;

use crate::registry::ImportError;
use crate::store::StoreError;

/// Coarse classification surfaced in operation results and HTTP responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingField,
    DuplicateKey,
    NotFound,
    InvalidTransition,
    InvalidInput,
    StoreFailure,
}

impl ErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::DuplicateKey => "duplicate_key",
            Self::NotFound => "not_found",
            Self::InvalidTransition => "invalid_transition",
            Self::InvalidInput => "invalid_input",
            Self::StoreFailure => "store_failure",
        }
    }
}

/// Error raised by registry, ledger, and linkage operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{entity} with {field} '{value}' already exists")]
    DuplicateKey {
        entity: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("cannot {action} {entity} in status '{status}'")]
    InvalidTransition {
        entity: &'static str,
        status: &'static str,
        action: &'static str,
    },
    #[error("recognition confidence {confidence:.2} is below the minimum {minimum:.2}")]
    LowConfidence { confidence: f32, minimum: f32 },
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error("CSV export failed: {0}")]
    Export(#[from] csv::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField(_) => ErrorKind::MissingField,
            Self::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::LowConfidence { .. } | Self::InvalidInput(_) | Self::Import(_) => {
                ErrorKind::InvalidInput
            }
            Self::Export(_) | Self::Store(_) => ErrorKind::StoreFailure,
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}
