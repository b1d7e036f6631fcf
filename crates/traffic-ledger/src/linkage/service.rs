use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use super::domain::{
    DeliveryStatus, MisuseReport, MisuseStatus, NewDelivery, NewMisuseReport, OwnerLookup,
    PlateLookup, ReconcileReport, Sticker, StickerCheck, StickerDelivery, StickerLink,
    StickerStatus, StickerValidation,
};
use super::index::{preferred_by_plate, VehicleIndex};
use crate::engine::{BatchReport, EngineError, ErrorKind};
use crate::keys::{normalize_plate, present, record_id, SYSTEM_ACTOR};
use crate::ledger::{Violation, ViolationLink};
use crate::registry::{NewVehicle, Vehicle, VehicleRegistry, VehicleSource};
use crate::store::{load_typed, save_typed, Collection, DocumentStore};

const STICKER: &str = "sticker";
const DELIVERY: &str = "pending delivery";
const MISUSE: &str = "misuse report";
const DERIVED_NOTE: &str = "linked automatically from sticker records";
const DEFAULT_MISUSE_TYPE: &str = "استخدام من قبل أقارب";
const DEFAULT_ACTUAL_USER: &str = "غير محدد";
const DEFAULT_RELATION: &str = "قريب";

/// Joins stickers, vehicles, and violations, and owns the delivery and misuse workflows.
pub struct StickerLinkageIndex<S> {
    store: Arc<S>,
    registry: VehicleRegistry<S>,
}

impl<S> StickerLinkageIndex<S>
where
    S: DocumentStore + 'static,
{
    pub fn new(store: Arc<S>, registry: VehicleRegistry<S>) -> Self {
        Self { store, registry }
    }

    /// Link every sticker to its vehicles, backfill vehicles for active stickers,
    /// and refresh the sticker snapshot on every violation.
    pub fn reconcile(&self) -> Result<ReconcileReport, EngineError> {
        let mut stickers = self.stickers()?;
        let mut vehicles = self.registry.load()?;
        let mut violations: Vec<Violation> = load_typed(&*self.store, Collection::Violations)?;
        let mut index = VehicleIndex::build(&vehicles);
        let mut report = ReconcileReport {
            stickers: stickers.len(),
            violations: violations.len(),
            ..ReconcileReport::default()
        };

        for sticker in &mut stickers {
            let mut linked = index.matches(sticker);
            let plate_known = index.first_for_plate(&sticker.plate_number).is_some();
            if !plate_known && sticker.is_active() && !sticker.plate_number.trim().is_empty() {
                match self
                    .registry
                    .insert(&mut vehicles, vehicle_from_sticker(sticker), &violations)
                {
                    Ok(_) => {
                        let position = vehicles.len() - 1;
                        index.insert(position, &vehicles[position]);
                        linked.push(position);
                        report.vehicles_created += 1;
                    }
                    Err(error) => warn!(
                        sticker = sticker.number(),
                        %error,
                        "could not derive vehicle from sticker"
                    ),
                }
            }

            let ids: Vec<String> = linked
                .iter()
                .map(|&position| vehicles[position].id.clone())
                .collect();
            if !ids.is_empty() {
                report.stickers_linked += 1;
            }
            sticker.linked = Some(StickerLink {
                has_vehicle: !ids.is_empty(),
                vehicles: ids,
            });
        }

        {
            let preferred = preferred_by_plate(&stickers);
            for violation in &mut violations {
                let sticker = preferred
                    .get(&normalize_plate(&violation.plate_number))
                    .copied();
                let vehicle = index
                    .first_for_plate(&violation.plate_number)
                    .map(|position| &vehicles[position]);
                if sticker.is_some() {
                    report.violations_linked += 1;
                }
                if violation.vehicle_id.is_none() {
                    violation.vehicle_id = vehicle.map(|vehicle| vehicle.id.clone());
                }
                violation.linked = Some(snapshot(sticker, vehicle));
            }
        }

        save_typed(&*self.store, Collection::Stickers, &stickers)?;
        if report.vehicles_created > 0 {
            self.registry.save(&vehicles)?;
        }
        save_typed(&*self.store, Collection::Violations, &violations)?;

        info!(
            stickers = report.stickers,
            stickers_linked = report.stickers_linked,
            vehicles_created = report.vehicles_created,
            violations_linked = report.violations_linked,
            "reconcile finished"
        );
        Ok(report)
    }

    /// Register one sticker; an owner may hold many, but not the same plate twice on one date.
    pub fn register_sticker(&self, sticker: Sticker) -> Result<Sticker, EngineError> {
        let mut stickers = self.stickers()?;
        let sticker = accept_sticker(&stickers, sticker)?;
        stickers.push(sticker.clone());
        self.save_stickers(&stickers)?;
        info!(
            sticker = sticker.number(),
            plate = %sticker.plate_number,
            status = sticker.status.label(),
            "sticker registered"
        );
        Ok(sticker)
    }

    /// Import raw sticker documents, English or Arabic keyed, one at a time.
    pub fn import_stickers(&self, documents: Vec<Value>) -> Result<BatchReport, EngineError> {
        let mut stickers = self.stickers()?;
        let mut report = BatchReport::default();

        for (position, document) in documents.into_iter().enumerate() {
            let item = position + 1;
            let sticker = match serde_json::from_value::<Sticker>(document) {
                Ok(sticker) => sticker,
                Err(error) => {
                    report.reject(item, ErrorKind::InvalidInput, error.to_string());
                    continue;
                }
            };
            let result = accept_sticker(&stickers, sticker);
            report.record(item, &result);
            if let Ok(sticker) = result {
                stickers.push(sticker);
            }
        }

        if report.succeeded > 0 {
            self.save_stickers(&stickers)?;
        }
        info!(
            imported = report.succeeded,
            rejected = report.failed,
            "sticker import finished"
        );
        Ok(report)
    }

    pub fn stickers(&self) -> Result<Vec<Sticker>, EngineError> {
        Ok(load_typed(&*self.store, Collection::Stickers)?)
    }

    pub fn find_vehicle_by_plate(&self, plate: &str) -> Result<PlateLookup, EngineError> {
        let key = normalize_plate(plate);
        let stickers = self.stickers()?;
        let vehicle = self
            .registry
            .load()?
            .into_iter()
            .find(|vehicle| normalize_plate(&vehicle.plate_number) == key);
        let sticker = preferred_by_plate(&stickers).get(&key).map(|&sticker| sticker.clone());
        let violations: Vec<Violation> = self
            .violations()?
            .into_iter()
            .filter(|violation| normalize_plate(&violation.plate_number) == key)
            .collect();

        let owner_name = sticker
            .as_ref()
            .map(|sticker| sticker.owner_name.clone())
            .or_else(|| vehicle.as_ref().map(|vehicle| vehicle.owner_name.clone()));
        let building = sticker
            .as_ref()
            .map(|sticker| sticker.building.clone())
            .or_else(|| vehicle.as_ref().map(|vehicle| vehicle.building.clone()));

        Ok(PlateLookup {
            has_sticker: sticker.is_some(),
            sticker_status: sticker.as_ref().map(|sticker| sticker.status),
            violations_count: violations.len(),
            owner_name,
            building,
            vehicle,
            sticker,
            violations,
        })
    }

    pub fn find_by_national_id(&self, national_id: &str) -> Result<OwnerLookup, EngineError> {
        let national_id = national_id.trim();
        let stickers: Vec<Sticker> = self
            .stickers()?
            .into_iter()
            .filter(|sticker| sticker.national_id == national_id)
            .collect();
        let plates: Vec<String> = stickers
            .iter()
            .map(|sticker| normalize_plate(&sticker.plate_number))
            .filter(|plate| !plate.is_empty())
            .collect();
        let numbers: Vec<&str> = stickers.iter().map(Sticker::number).collect();

        let vehicles: Vec<Vehicle> = self
            .registry
            .load()?
            .into_iter()
            .filter(|vehicle| {
                plates.contains(&normalize_plate(&vehicle.plate_number))
                    || vehicle.sticker_number == national_id
                    || numbers.contains(&vehicle.sticker_number.trim())
            })
            .collect();
        let violations: Vec<Violation> = self
            .violations()?
            .into_iter()
            .filter(|violation| plates.contains(&normalize_plate(&violation.plate_number)))
            .collect();

        let count = |status: StickerStatus| {
            stickers
                .iter()
                .filter(|sticker| sticker.status == status)
                .count()
        };

        Ok(OwnerLookup {
            national_id: national_id.to_string(),
            owner_name: stickers.first().map(|sticker| sticker.owner_name.clone()),
            stickers_count: stickers.len(),
            active_stickers_count: count(StickerStatus::Active),
            cancelled_stickers_count: count(StickerStatus::Cancelled),
            violations_count: violations.len(),
            stickers,
            vehicles,
            violations,
        })
    }

    /// Only a cancelled sticker fails validation; any other sticker on file passes.
    pub fn validate_sticker(&self, plate: &str) -> Result<StickerValidation, EngineError> {
        let stickers = self.stickers()?;
        let sticker = preferred_by_plate(&stickers)
            .get(&normalize_plate(plate))
            .map(|&sticker| sticker.clone());

        Ok(match sticker {
            None => StickerValidation::new(StickerCheck::NoSticker, None),
            Some(sticker) if sticker.status == StickerStatus::Cancelled => {
                StickerValidation::new(StickerCheck::Cancelled, Some(sticker))
            }
            Some(sticker) => StickerValidation::new(StickerCheck::Valid, Some(sticker)),
        })
    }

    pub fn register_delivery(&self, input: NewDelivery) -> Result<StickerDelivery, EngineError> {
        let sticker_number = present(input.sticker_number.as_deref())
            .ok_or(EngineError::MissingField("stickerNumber"))?
            .to_string();
        let now = Utc::now();
        let delivery = StickerDelivery {
            id: record_id("DLV"),
            sticker_number,
            resident_name: input.resident_name,
            plate_number: input.plate_number,
            delivery_date: input.delivery_date.unwrap_or_else(|| now.date_naive()),
            delivered_by: present(input.delivered_by.as_deref())
                .unwrap_or(SYSTEM_ACTOR)
                .to_string(),
            building: input.building,
            apartment: input.apartment,
            notes: input.notes,
            status: DeliveryStatus::DeliveredNotActivated,
            activation_date: None,
            created_at: now,
        };

        let mut deliveries = self.deliveries()?;
        deliveries.push(delivery.clone());
        save_typed(&*self.store, Collection::StickerDeliveries, &deliveries)?;
        info!(sticker = %delivery.sticker_number, "sticker delivery registered");
        Ok(delivery)
    }

    /// Activate the pending delivery for `sticker_number`.
    pub fn activate_delivery(&self, sticker_number: &str) -> Result<StickerDelivery, EngineError> {
        let sticker_number = sticker_number.trim();
        let mut deliveries = self.deliveries()?;
        let delivery = deliveries
            .iter_mut()
            .find(|delivery| {
                delivery.sticker_number == sticker_number
                    && delivery.status == DeliveryStatus::DeliveredNotActivated
            })
            .ok_or_else(|| EngineError::not_found(DELIVERY, sticker_number))?;

        delivery.status = DeliveryStatus::Activated;
        delivery.activation_date = Some(Utc::now().date_naive());
        let activated = delivery.clone();

        save_typed(&*self.store, Collection::StickerDeliveries, &deliveries)?;
        info!(sticker = %activated.sticker_number, "sticker delivery activated");
        Ok(activated)
    }

    pub fn unactivated_deliveries(&self) -> Result<Vec<StickerDelivery>, EngineError> {
        Ok(self
            .deliveries()?
            .into_iter()
            .filter(|delivery| delivery.status == DeliveryStatus::DeliveredNotActivated)
            .collect())
    }

    pub fn deliveries(&self) -> Result<Vec<StickerDelivery>, EngineError> {
        Ok(load_typed(&*self.store, Collection::StickerDeliveries)?)
    }

    /// Open a misuse case and flag the stickers it concerns.
    pub fn register_misuse(&self, input: NewMisuseReport) -> Result<MisuseReport, EngineError> {
        let sticker_number = present(input.sticker_number.as_deref())
            .ok_or(EngineError::MissingField("stickerNumber"))?
            .to_string();
        let now = Utc::now();
        let or_default = |value: Option<String>, fallback: &str| {
            value
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };

        let report = MisuseReport {
            id: record_id("MIS"),
            sticker_number,
            original_owner: input.original_owner,
            registered_plate: input.registered_plate,
            actual_plate: input.actual_plate,
            misuse_type: or_default(input.misuse_type, DEFAULT_MISUSE_TYPE),
            detected_date: input.detected_date.unwrap_or_else(|| now.date_naive()),
            detected_by: or_default(input.detected_by, SYSTEM_ACTOR),
            actual_user: or_default(input.actual_user, DEFAULT_ACTUAL_USER),
            relation_to_owner: or_default(input.relation_to_owner, DEFAULT_RELATION),
            status: MisuseStatus::Reported,
            confirmed_at: None,
            resolution: None,
            resolution_date: None,
            notes: input.notes,
            created_at: now,
        };

        let mut reports = self.misuse_reports(None)?;
        reports.push(report.clone());
        save_typed(&*self.store, Collection::StickerMisuseReports, &reports)?;

        let mut stickers = self.stickers()?;
        let mut flagged = 0;
        let concerns = |sticker: &Sticker| {
            sticker.number() == report.sticker_number
                || sticker.national_id == report.sticker_number
        };
        for sticker in stickers.iter_mut().filter(|sticker| concerns(sticker)) {
            sticker.misused = true;
            flagged += 1;
        }
        if flagged > 0 {
            self.save_stickers(&stickers)?;
        }

        info!(sticker = %report.sticker_number, flagged, "sticker misuse reported");
        Ok(report)
    }

    pub fn confirm_misuse(&self, id: &str) -> Result<MisuseReport, EngineError> {
        self.advance_misuse(id, "confirm", |report| match report.status {
            MisuseStatus::Reported => {
                report.status = MisuseStatus::Confirmed;
                report.confirmed_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        })
    }

    /// Close a case from reported or confirmed; the resolution is permanent.
    ///
    /// An unknown id is NotFound before the resolution text is checked.
    pub fn resolve_misuse(&self, id: &str, resolution: &str) -> Result<MisuseReport, EngineError> {
        self.advance_misuse(id, "resolve", |report| match report.status {
            MisuseStatus::Reported | MisuseStatus::Confirmed => {
                let resolution =
                    present(Some(resolution)).ok_or(EngineError::MissingField("resolution"))?;
                report.status = MisuseStatus::Resolved;
                report.resolution = Some(resolution.to_string());
                report.resolution_date = Some(Utc::now().date_naive());
                Ok(true)
            }
            MisuseStatus::Resolved => Ok(false),
        })
    }

    /// All misuse reports, optionally narrowed to one status.
    pub fn misuse_reports(
        &self,
        status: Option<MisuseStatus>,
    ) -> Result<Vec<MisuseReport>, EngineError> {
        let reports: Vec<MisuseReport> =
            load_typed(&*self.store, Collection::StickerMisuseReports)?;
        Ok(match status {
            Some(status) => reports
                .into_iter()
                .filter(|report| report.status == status)
                .collect(),
            None => reports,
        })
    }

    fn advance_misuse<F>(
        &self,
        id: &str,
        action: &'static str,
        advance: F,
    ) -> Result<MisuseReport, EngineError>
    where
        F: FnOnce(&mut MisuseReport) -> Result<bool, EngineError>,
    {
        let mut reports = self.misuse_reports(None)?;
        let report = reports
            .iter_mut()
            .find(|report| report.id == id)
            .ok_or_else(|| EngineError::not_found(MISUSE, id))?;

        let from = report.status;
        if !advance(&mut *report)? {
            return Err(EngineError::InvalidTransition {
                entity: MISUSE,
                status: from.label(),
                action,
            });
        }
        let updated = report.clone();

        save_typed(&*self.store, Collection::StickerMisuseReports, &reports)?;
        info!(
            id = %updated.id,
            from = from.label(),
            to = updated.status.label(),
            "misuse report advanced"
        );
        Ok(updated)
    }

    fn violations(&self) -> Result<Vec<Violation>, EngineError> {
        Ok(load_typed(&*self.store, Collection::Violations)?)
    }

    fn save_stickers(&self, stickers: &[Sticker]) -> Result<(), EngineError> {
        Ok(save_typed(&*self.store, Collection::Stickers, stickers)?)
    }
}

fn accept_sticker(existing: &[Sticker], mut sticker: Sticker) -> Result<Sticker, EngineError> {
    let national_id = present(Some(sticker.national_id.as_str()))
        .ok_or(EngineError::MissingField("nationalId"))?
        .to_string();
    let plate = present(Some(sticker.plate_number.as_str()))
        .ok_or(EngineError::MissingField("plateNumber"))?
        .to_string();
    let key = normalize_plate(&plate);

    if existing.iter().any(|other| {
        other.national_id == national_id
            && normalize_plate(&other.plate_number) == key
            && other.issue_date == sticker.issue_date
    }) {
        let issued = sticker
            .issue_date
            .map_or_else(|| "undated".to_string(), |date| date.to_string());
        return Err(EngineError::DuplicateKey {
            entity: STICKER,
            field: "nationalId/plateNumber/issueDate",
            value: format!("{national_id}/{plate}/{issued}"),
        });
    }

    sticker.national_id = national_id;
    sticker.plate_number = plate;
    sticker.linked = None;
    Ok(sticker)
}

fn vehicle_from_sticker(sticker: &Sticker) -> NewVehicle {
    NewVehicle {
        plate_number: Some(sticker.plate_number.clone()),
        vehicle_type: sticker.vehicle_type.clone(),
        owner_name: sticker.owner_name.clone(),
        national_id: sticker.national_id.clone(),
        building: sticker.building.clone(),
        unit: sticker.unit.clone(),
        sticker_number: sticker.number().to_string(),
        sticker_issue_date: sticker.issue_date,
        notes: DERIVED_NOTE.to_string(),
        source: VehicleSource::StickerDerived,
        ..NewVehicle::default()
    }
}

fn snapshot(sticker: Option<&Sticker>, vehicle: Option<&Vehicle>) -> ViolationLink {
    ViolationLink {
        sticker_id: sticker.map(|sticker| sticker.number().to_string()),
        vehicle_id: vehicle.map(|vehicle| vehicle.id.clone()),
        has_sticker: sticker.is_some(),
        has_vehicle: vehicle.is_some(),
        sticker_status: sticker.map(|sticker| sticker.status),
        owner_name: sticker.map(|sticker| sticker.owner_name.clone()),
        building: sticker.map(|sticker| sticker.building.clone()),
        unit: sticker.map(|sticker| sticker.unit.clone()),
    }
}
