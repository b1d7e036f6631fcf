use serde::Serialize;

use super::error::{EngineError, ErrorKind};

/// Envelope returned across the engine's public boundary.
///
/// Success carries the operation payload under `data`; failure carries the
/// rendered message and its kind. Callers never see a panic or a raw error.
#[derive(Debug, Clone, Serialize)]
pub struct OperationResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl<T> OperationResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
        }
    }

    pub fn failed(error: &EngineError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            kind: Some(error.kind()),
        }
    }

    pub fn into_result(self) -> Option<T> {
        self.data
    }
}

impl<T> From<Result<T, EngineError>> for OperationResult<T> {
    fn from(result: Result<T, EngineError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(error) => {
                tracing::warn!(kind = error.kind().label(), %error, "operation rejected");
                Self::failed(&error)
            }
        }
    }
}

/// Per-item tally for batch operations; one bad row never aborts the batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<BatchItemError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemError {
    /// 1-based position of the item within the batch.
    pub item: usize,
    pub kind: ErrorKind,
    pub error: String,
}

impl BatchReport {
    pub fn record<T>(&mut self, item: usize, result: &Result<T, EngineError>) {
        match result {
            Ok(_) => self.succeeded += 1,
            Err(error) => self.reject(item, error.kind(), error.to_string()),
        }
    }

    pub fn reject(&mut self, item: usize, kind: ErrorKind, error: String) {
        self.failed += 1;
        self.errors.push(BatchItemError { item, kind, error });
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_envelope_carries_kind_and_message() {
        let result: Result<(), EngineError> = Err(EngineError::MissingField("plateNumber"));
        let envelope = OperationResult::from(result);
        assert!(!envelope.success);
        assert_eq!(envelope.kind, Some(ErrorKind::MissingField));
        assert_eq!(envelope.error.as_deref(), Some("plateNumber is required"));

        let body = serde_json::to_value(&envelope).expect("serializes");
        assert_eq!(body["success"], false);
        assert_eq!(body["kind"], "missing_field");
        assert!(body.get("data").is_none());
    }

    #[test]
    fn batch_report_counts_each_item() {
        let mut report = BatchReport::default();
        report.record(1, &Ok::<_, EngineError>(()));
        report.record(2, &Err::<(), _>(EngineError::not_found("vehicle", "VEH-9")));
        report.record(3, &Ok::<_, EngineError>(()));

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.total(), 3);
        assert_eq!(report.errors[0].item, 2);
        assert_eq!(report.errors[0].kind, ErrorKind::NotFound);
    }
}
