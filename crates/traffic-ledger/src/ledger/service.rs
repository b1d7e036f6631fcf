use std::io::Write;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::domain::{
    AppealStatus, NewViolation, PaymentDetails, PeriodStatistics, RecognizedPlate, Violation,
    ViolationAction, ViolationPatch, ViolationSearch,
};
use super::export::write_violation_rows;
use super::sequence::next_violation_number;
use super::taxonomy::{self, FALLBACK_KIND};
use crate::engine::EngineError;
use crate::keys::{normalize_plate, present, record_id, SYSTEM_ACTOR};
use crate::registry::{Vehicle, VehicleRegistry};
use crate::store::{load_typed, save_typed, Collection, DocumentStore};

const ENTITY: &str = "violation";
const DEFAULT_PAYMENT_METHOD: &str = "cash";
const AUTO_RECORDER: &str = "auto-system";
const UNSPECIFIED_LOCATION: &str = "unspecified";
const APPEAL_APPROVED: &str = "appeal approved";

/// Default recognition confidence below which automatic violations are refused.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.7;

/// Violation CRUD, the status state machine, and the appeal sub-workflow.
///
/// Every operation that changes a violation's status or existence reclassifies
/// the affected vehicle before returning.
pub struct ViolationLedger<S> {
    store: Arc<S>,
    registry: VehicleRegistry<S>,
    min_confidence: f32,
}

impl<S> ViolationLedger<S>
where
    S: DocumentStore + 'static,
{
    pub fn new(store: Arc<S>, registry: VehicleRegistry<S>, min_confidence: f32) -> Self {
        let min_confidence = if (0.0..=1.0).contains(&min_confidence) {
            min_confidence
        } else {
            DEFAULT_MIN_CONFIDENCE
        };
        Self {
            store,
            registry,
            min_confidence,
        }
    }

    /// Record a violation with fine, points, and severity frozen from the taxonomy.
    pub fn add(&self, input: NewViolation) -> Result<Violation, EngineError> {
        let plate = present(input.plate_number.as_deref())
            .ok_or(EngineError::MissingField("plateNumber"))?
            .to_string();
        let requested_type = present(input.violation_type.as_deref())
            .ok_or(EngineError::MissingField("violationType"))?;
        let kind = taxonomy::resolve(requested_type);

        let mut violations = self.load()?;
        let vehicle_id = match present(input.vehicle_id.as_deref()) {
            Some(id) => Some(id.to_string()),
            None => self.vehicle_for(&plate)?.map(|vehicle| vehicle.id),
        };

        let now = Utc::now();
        let timestamp = input.timestamp.unwrap_or(now);
        let violation_number =
            next_violation_number(&*self.store, timestamp.year(), &violations)?;
        let actor = |value: Option<&str>| present(value).unwrap_or(SYSTEM_ACTOR).to_string();

        let violation = Violation {
            id: record_id("VIO"),
            violation_number,
            plate_number: plate,
            vehicle_id,
            violation_type: kind.key.to_string(),
            violation_name: kind.name.to_string(),
            violation_name_en: kind.name_en.to_string(),
            description: input.description.unwrap_or_else(|| kind.name.to_string()),
            fine: kind.fine,
            points: kind.points,
            severity: kind.severity,
            location: input
                .location
                .unwrap_or_else(|| UNSPECIFIED_LOCATION.to_string()),
            gate: input.gate,
            camera: input.camera,
            timestamp,
            evidence_images: input.evidence_images,
            video_url: input.video_url,
            recorded_by: actor(input.recorded_by.as_deref()),
            officer_name: input.officer_name,
            is_auto_detected: input.is_auto_detected,
            recognition_data: input.recognition_data,
            status: Default::default(),
            is_paid: false,
            payment_date: None,
            payment_method: None,
            payment_reference: None,
            is_appealed: false,
            appeal_date: None,
            appeal_reason: None,
            appeal_status: None,
            appeal_response: None,
            appeal_response_date: None,
            cancellation_reason: None,
            cancelled_at: None,
            notes: input.notes,
            linked: None,
            created_at: now,
            updated_at: now,
            created_by: actor(input.created_by.as_deref()),
        };

        violations.push(violation.clone());
        self.save(&violations)?;
        info!(
            number = %violation.violation_number,
            plate = %violation.plate_number,
            kind = %violation.violation_type,
            "violation recorded"
        );
        self.registry.recompute_plate(&violation.plate_number)?;
        Ok(violation)
    }

    /// Automatic violation from a recognized plate; `context` supplies type and place.
    pub fn record_recognized(
        &self,
        recognized: RecognizedPlate,
        context: NewViolation,
    ) -> Result<Violation, EngineError> {
        if !(0.0..=1.0).contains(&recognized.confidence) {
            return Err(EngineError::InvalidInput(format!(
                "recognition confidence {} is outside 0..=1",
                recognized.confidence
            )));
        }
        if recognized.confidence < self.min_confidence {
            return Err(EngineError::LowConfidence {
                confidence: recognized.confidence,
                minimum: self.min_confidence,
            });
        }

        let mut input = context;
        input.plate_number = Some(recognized.plate.clone());
        if present(input.violation_type.as_deref()).is_none() {
            input.violation_type = Some(FALLBACK_KIND.to_string());
        }
        if present(input.recorded_by.as_deref()).is_none() {
            input.recorded_by = Some(AUTO_RECORDER.to_string());
        }
        if let Some(image) = recognized.image.clone() {
            input.evidence_images.push(image);
        }
        input.is_auto_detected = true;
        input.recognition_data = Some(json!({
            "plate": recognized.plate,
            "confidence": recognized.confidence,
            "vehicle": recognized.vehicle,
        }));
        self.add(input)
    }

    /// Correct descriptive fields; status and fine are untouched.
    pub fn update(&self, id: &str, patch: ViolationPatch) -> Result<Violation, EngineError> {
        let mut violations = self.load()?;
        let index = position(&violations, id)?;
        let violation = &mut violations[index];
        patch.apply(violation);
        violation.updated_at = Utc::now();
        let updated = violation.clone();
        self.save(&violations)?;
        info!(number = %updated.violation_number, "violation updated");
        Ok(updated)
    }

    /// Administrative hard delete; the vehicle is reclassified afterwards.
    pub fn delete(&self, id: &str) -> Result<Violation, EngineError> {
        let mut violations = self.load()?;
        let index = position(&violations, id)?;
        let removed = violations.remove(index);
        self.save(&violations)?;
        info!(number = %removed.violation_number, "violation deleted");
        self.registry.recompute_plate(&removed.plate_number)?;
        Ok(removed)
    }

    pub fn pay(&self, id: &str, payment: PaymentDetails) -> Result<Violation, EngineError> {
        self.transition(id, ViolationAction::Pay, |violation, now| {
            violation.is_paid = true;
            violation.payment_date = Some(now);
            violation.payment_method = Some(
                payment
                    .method
                    .filter(|method| !method.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
            );
            violation.payment_reference = Some(
                payment
                    .reference
                    .filter(|reference| !reference.trim().is_empty())
                    .unwrap_or_else(payment_reference),
            );
        })
    }

    pub fn appeal(&self, id: &str, reason: Option<String>) -> Result<Violation, EngineError> {
        self.transition(id, ViolationAction::Appeal, |violation, now| {
            violation.is_appealed = true;
            violation.appeal_date = Some(now);
            violation.appeal_reason = Some(reason.unwrap_or_default());
            violation.appeal_status = Some(AppealStatus::Pending);
        })
    }

    /// Approval cancels the violation; rejection returns it to pending.
    pub fn respond_to_appeal(
        &self,
        id: &str,
        approved: bool,
        response: Option<String>,
    ) -> Result<Violation, EngineError> {
        let action = if approved {
            ViolationAction::ApproveAppeal
        } else {
            ViolationAction::RejectAppeal
        };
        self.transition(id, action, |violation, now| {
            violation.appeal_status = Some(if approved {
                AppealStatus::Approved
            } else {
                AppealStatus::Rejected
            });
            violation.appeal_response = response;
            violation.appeal_response_date = Some(now);
            if approved {
                violation.cancellation_reason = Some(APPEAL_APPROVED.to_string());
                violation.cancelled_at = Some(now);
            }
        })
    }

    /// Administrative cancel, accepted from pending, paid, and appealed.
    pub fn cancel(&self, id: &str, reason: Option<String>) -> Result<Violation, EngineError> {
        self.transition(id, ViolationAction::Cancel, |violation, now| {
            violation.cancellation_reason = reason;
            violation.cancelled_at = Some(now);
        })
    }

    pub fn find_by_id(&self, id: &str) -> Result<Violation, EngineError> {
        self.load()?
            .into_iter()
            .find(|violation| violation.id == id)
            .ok_or_else(|| EngineError::not_found(ENTITY, id))
    }

    pub fn find_by_number(&self, number: &str) -> Result<Violation, EngineError> {
        let number = number.trim();
        self.load()?
            .into_iter()
            .find(|violation| violation.violation_number == number)
            .ok_or_else(|| EngineError::not_found(ENTITY, number))
    }

    pub fn for_plate(&self, plate: &str) -> Result<Vec<Violation>, EngineError> {
        let key = normalize_plate(plate);
        Ok(self
            .load()?
            .into_iter()
            .filter(|violation| normalize_plate(&violation.plate_number) == key)
            .collect())
    }

    pub fn list(&self) -> Result<Vec<Violation>, EngineError> {
        self.load()
    }

    pub fn search(&self, criteria: &ViolationSearch) -> Result<Vec<Violation>, EngineError> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|violation| matches_search(violation, criteria))
            .collect())
    }

    /// Count and fine totals for violations dated `from..=to`.
    pub fn statistics_for_period(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PeriodStatistics, EngineError> {
        if from > to {
            return Err(EngineError::InvalidInput(format!(
                "period start {from} is after its end {to}"
            )));
        }
        Ok(PeriodStatistics::collect(from, to, self.load()?))
    }

    /// Write every violation as CSV; returns the number of data rows.
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize, EngineError> {
        let violations = self.load()?;
        let written = write_violation_rows(writer, &violations)?;
        info!(rows = written, "violations exported to csv");
        Ok(written)
    }

    pub(crate) fn load(&self) -> Result<Vec<Violation>, EngineError> {
        Ok(load_typed(&*self.store, Collection::Violations)?)
    }

    pub(crate) fn save(&self, violations: &[Violation]) -> Result<(), EngineError> {
        Ok(save_typed(&*self.store, Collection::Violations, violations)?)
    }

    fn vehicle_for(&self, plate: &str) -> Result<Option<Vehicle>, EngineError> {
        match self.registry.find_by_plate(plate) {
            Ok(vehicle) => Ok(Some(vehicle)),
            Err(EngineError::NotFound { .. }) => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn transition<F>(
        &self,
        id: &str,
        action: ViolationAction,
        stamp: F,
    ) -> Result<Violation, EngineError>
    where
        F: FnOnce(&mut Violation, chrono::DateTime<Utc>),
    {
        let mut violations = self.load()?;
        let index = position(&violations, id)?;
        let violation = &mut violations[index];
        let target =
            violation
                .status
                .apply(action)
                .ok_or_else(|| EngineError::InvalidTransition {
                    entity: ENTITY,
                    status: violation.status.label(),
                    action: action.label(),
                })?;

        let now = Utc::now();
        let from = violation.status;
        violation.status = target;
        stamp(&mut *violation, now);
        violation.updated_at = now;
        let updated = violation.clone();

        self.save(&violations)?;
        info!(
            number = %updated.violation_number,
            from = from.label(),
            to = target.label(),
            "violation status changed"
        );
        self.registry.recompute_plate(&updated.plate_number)?;
        Ok(updated)
    }
}

fn payment_reference() -> String {
    let token = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("PAY-{}", &token[..12])
}

fn position(violations: &[Violation], id: &str) -> Result<usize, EngineError> {
    violations
        .iter()
        .position(|violation| violation.id == id)
        .ok_or_else(|| EngineError::not_found(ENTITY, id))
}

fn matches_search(violation: &Violation, criteria: &ViolationSearch) -> bool {
    let date = violation.date();
    present(criteria.plate_number.as_deref()).map_or(true, |plate| {
        normalize_plate(&violation.plate_number).contains(&normalize_plate(plate))
    }) && present(criteria.violation_number.as_deref())
        .map_or(true, |number| violation.violation_number.contains(number))
        && present(criteria.violation_type.as_deref())
            .map_or(true, |kind| violation.violation_type == kind)
        && criteria
            .status
            .map_or(true, |status| violation.status == status)
        && criteria.date_from.map_or(true, |from| date >= from)
        && criteria.date_to.map_or(true, |to| date <= to)
        && present(criteria.location.as_deref()).map_or(true, |location| {
            violation
                .location
                .to_lowercase()
                .contains(&location.to_lowercase())
        })
        && criteria
            .severity
            .map_or(true, |severity| violation.severity == severity)
}
