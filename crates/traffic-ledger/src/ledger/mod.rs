//! Violation ledger: taxonomy, numbering, and the settlement state machine.

pub mod domain;
mod export;
mod sequence;
pub mod service;
pub mod taxonomy;

pub use domain::{
    AppealStatus, NewViolation, PaymentDetails, PeriodStatistics, RecognizedPlate, Violation,
    ViolationAction, ViolationLink, ViolationPatch, ViolationSearch, ViolationStatus,
};
pub use service::{ViolationLedger, DEFAULT_MIN_CONFIDENCE};
pub use taxonomy::{Severity, ViolationKind};
