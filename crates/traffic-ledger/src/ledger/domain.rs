use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::taxonomy::Severity;
use crate::linkage::StickerStatus;

/// Settlement status of a violation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationStatus {
    #[default]
    Pending,
    Paid,
    Appealed,
    Cancelled,
}

impl ViolationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Appealed => "appealed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Paid and cancelled close the normal workflow; an administrative cancel
    /// of a paid violation is the only move out of either.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }

    /// Target status for `action`, or `None` when the move is not allowed.
    pub const fn apply(self, action: ViolationAction) -> Option<Self> {
        match (self, action) {
            (Self::Pending, ViolationAction::Pay) => Some(Self::Paid),
            (Self::Pending, ViolationAction::Appeal) => Some(Self::Appealed),
            (Self::Appealed, ViolationAction::ApproveAppeal) => Some(Self::Cancelled),
            (Self::Appealed, ViolationAction::RejectAppeal) => Some(Self::Pending),
            (Self::Pending | Self::Paid | Self::Appealed, ViolationAction::Cancel) => {
                Some(Self::Cancelled)
            }
            _ => None,
        }
    }
}

/// Requests accepted by the violation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationAction {
    Pay,
    Appeal,
    ApproveAppeal,
    RejectAppeal,
    Cancel,
}

impl ViolationAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pay => "pay",
            Self::Appeal => "appeal",
            Self::ApproveAppeal | Self::RejectAppeal => "respond to appeal on",
            Self::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppealStatus {
    Pending,
    Approved,
    Rejected,
}

/// Read-time copy of the sticker matched to a violation's plate.
///
/// Refreshed by every reconcile pass; the sticker collection stays authoritative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationLink {
    pub sticker_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub has_sticker: bool,
    pub has_vehicle: bool,
    pub sticker_status: Option<StickerStatus>,
    pub owner_name: Option<String>,
    pub building: Option<String>,
    pub unit: Option<String>,
}

/// Persisted violation document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub id: String,
    pub violation_number: String,
    pub plate_number: String,
    #[serde(default)]
    pub vehicle_id: Option<String>,
    pub violation_type: String,
    pub violation_name: String,
    #[serde(default)]
    pub violation_name_en: String,
    #[serde(default)]
    pub description: String,
    pub fine: u32,
    pub points: u8,
    pub severity: Severity,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub gate: String,
    #[serde(default)]
    pub camera: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub evidence_images: Vec<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub recorded_by: String,
    #[serde(default)]
    pub officer_name: String,
    #[serde(default)]
    pub is_auto_detected: bool,
    #[serde(default)]
    pub recognition_data: Option<Value>,
    #[serde(default)]
    pub status: ViolationStatus,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub payment_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub is_appealed: bool,
    #[serde(default)]
    pub appeal_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub appeal_reason: Option<String>,
    #[serde(default)]
    pub appeal_status: Option<AppealStatus>,
    #[serde(default)]
    pub appeal_response: Option<String>,
    #[serde(default)]
    pub appeal_response_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
    #[serde(default, rename = "_linked", skip_serializing_if = "Option::is_none")]
    pub linked: Option<ViolationLink>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
}

impl Violation {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Input accepted by `ViolationLedger::add`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewViolation {
    pub plate_number: Option<String>,
    pub violation_type: Option<String>,
    pub vehicle_id: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub gate: String,
    pub camera: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub evidence_images: Vec<String>,
    pub video_url: Option<String>,
    pub recorded_by: Option<String>,
    pub officer_name: String,
    pub notes: String,
    pub created_by: Option<String>,
    #[serde(skip)]
    pub is_auto_detected: bool,
    #[serde(skip)]
    pub recognition_data: Option<Value>,
}

impl NewViolation {
    pub fn new(plate_number: impl Into<String>, violation_type: impl Into<String>) -> Self {
        Self {
            plate_number: Some(plate_number.into()),
            violation_type: Some(violation_type.into()),
            ..Self::default()
        }
    }
}

/// Descriptive fields an operator may correct after creation.
///
/// Fine, points, and severity are frozen at creation; status only moves
/// through the state machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViolationPatch {
    pub description: Option<String>,
    pub location: Option<String>,
    pub gate: Option<String>,
    pub camera: Option<String>,
    pub evidence_images: Option<Vec<String>>,
    pub video_url: Option<String>,
    pub officer_name: Option<String>,
    pub notes: Option<String>,
}

impl ViolationPatch {
    pub(crate) fn apply(self, violation: &mut Violation) {
        fn merge<T>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }

        merge(&mut violation.description, self.description);
        merge(&mut violation.location, self.location);
        merge(&mut violation.gate, self.gate);
        merge(&mut violation.camera, self.camera);
        merge(&mut violation.evidence_images, self.evidence_images);
        if self.video_url.is_some() {
            violation.video_url = self.video_url;
        }
        merge(&mut violation.officer_name, self.officer_name);
        merge(&mut violation.notes, self.notes);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaymentDetails {
    pub method: Option<String>,
    pub reference: Option<String>,
}

/// Filters for `ViolationLedger::search`; every populated field must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViolationSearch {
    pub plate_number: Option<String>,
    pub violation_number: Option<String>,
    pub violation_type: Option<String>,
    pub status: Option<ViolationStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub location: Option<String>,
    pub severity: Option<Severity>,
}

/// Violations dated inside an inclusive range, with their fine totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStatistics {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total: usize,
    pub total_fines: u64,
    pub paid_fines: u64,
    pub violations: Vec<Violation>,
}

impl PeriodStatistics {
    pub(crate) fn collect(from: NaiveDate, to: NaiveDate, violations: Vec<Violation>) -> Self {
        let violations: Vec<Violation> = violations
            .into_iter()
            .filter(|violation| (from..=to).contains(&violation.date()))
            .collect();
        let total_fines = violations.iter().map(|violation| u64::from(violation.fine)).sum();
        let paid_fines = violations
            .iter()
            .filter(|violation| violation.is_paid)
            .map(|violation| u64::from(violation.fine))
            .sum();
        Self {
            from,
            to,
            total: violations.len(),
            total_fines,
            paid_fines,
            violations,
        }
    }
}

/// Plate payload produced by an external recognition provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizedPlate {
    pub plate: String,
    pub confidence: f32,
    #[serde(default)]
    pub vehicle: Option<Value>,
    #[serde(default)]
    pub image: Option<String>,
}
