use std::io::{Read, Write};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::classification::{apply_tally, tally_by_plate, tally_for, ClassificationPolicy};
use super::domain::{
    GateEntry, GateInfo, NewVehicle, NewVehicleImage, Vehicle, VehicleImage, VehiclePatch,
    VehicleSearch, VehicleSource, VehicleStatus,
};
use super::export::write_vehicle_rows;
use super::import::parse_vehicle_rows;
use crate::engine::{BatchReport, EngineError, ErrorKind};
use crate::keys::{normalize_plate, present, record_id, SYSTEM_ACTOR};
use crate::ledger::Violation;
use crate::store::{load_typed, save_typed, Collection, DocumentStore};

const ENTITY: &str = "vehicle";
const UNKNOWN_GATE: &str = "unknown";
const DEFAULT_IMAGE_TYPE: &str = "general";

/// Vehicle CRUD plus derived risk classification.
pub struct VehicleRegistry<S> {
    store: Arc<S>,
    policy: ClassificationPolicy,
}

impl<S> Clone for VehicleRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: self.policy,
        }
    }
}

impl<S> VehicleRegistry<S>
where
    S: DocumentStore + 'static,
{
    pub fn new(store: Arc<S>, policy: ClassificationPolicy) -> Self {
        Self { store, policy }
    }

    /// Register a vehicle and classify it against violations already on file.
    pub fn add(&self, input: NewVehicle) -> Result<Vehicle, EngineError> {
        let mut vehicles = self.load()?;
        let violations = self.violations()?;
        let vehicle = self.insert(&mut vehicles, input, &violations)?;
        self.save(&vehicles)?;
        info!(
            id = %vehicle.id,
            plate = %vehicle.plate_number,
            source = vehicle.source.label(),
            "vehicle registered"
        );
        Ok(vehicle)
    }

    /// Merge `patch` into the stored vehicle; status is never patchable.
    pub fn update(&self, id: &str, mut patch: VehiclePatch) -> Result<Vehicle, EngineError> {
        let mut vehicles = self.load()?;
        let index = position(&vehicles, id)?;

        let plate_changed = match patch.plate_number.as_deref() {
            Some(raw) => {
                let plate = present(Some(raw)).ok_or(EngineError::MissingField("plateNumber"))?;
                let key = normalize_plate(plate);
                if vehicles.iter().enumerate().any(|(other, vehicle)| {
                    other != index && normalize_plate(&vehicle.plate_number) == key
                }) {
                    return Err(duplicate_plate(plate));
                }
                key != normalize_plate(&vehicles[index].plate_number)
            }
            None => false,
        };

        let vehicle = &mut vehicles[index];
        patch.plate_number = patch.plate_number.map(|plate| plate.trim().to_string());
        patch.apply(vehicle);
        vehicle.updated_at = Utc::now();

        if plate_changed {
            let violations = self.violations()?;
            let tally = tally_for(&violations, &vehicle.plate_number);
            apply_tally(vehicle, &tally, &self.policy);
        }

        let updated = vehicle.clone();
        self.save(&vehicles)?;
        info!(id = %updated.id, "vehicle updated");
        Ok(updated)
    }

    pub fn delete(&self, id: &str) -> Result<Vehicle, EngineError> {
        let mut vehicles = self.load()?;
        let index = position(&vehicles, id)?;
        let removed = vehicles.remove(index);
        self.save(&vehicles)?;
        info!(id = %removed.id, plate = %removed.plate_number, "vehicle deleted");
        Ok(removed)
    }

    /// Administrative override that survives every recompute until `activate`.
    pub fn suspend(&self, id: &str, reason: Option<String>) -> Result<Vehicle, EngineError> {
        self.modify(id, |vehicle| {
            let now = Utc::now();
            vehicle.status = VehicleStatus::Suspended;
            vehicle.suspension_reason = reason.filter(|reason| !reason.trim().is_empty());
            vehicle.suspended_at = Some(now);
            vehicle.updated_at = now;
        })
        .inspect(|vehicle| info!(id = %vehicle.id, "vehicle suspended"))
    }

    /// Lift a suspension and hand the vehicle back to the classifier.
    pub fn activate(&self, id: &str) -> Result<Vehicle, EngineError> {
        let violations = self.violations()?;
        let policy = self.policy;
        self.modify(id, |vehicle| {
            let now = Utc::now();
            vehicle.status = VehicleStatus::Active;
            vehicle.suspension_reason = None;
            vehicle.suspended_at = None;
            vehicle.reactivated_at = Some(now);
            vehicle.updated_at = now;
            let tally = tally_for(&violations, &vehicle.plate_number);
            apply_tally(vehicle, &tally, &policy);
        })
        .inspect(|vehicle| {
            info!(id = %vehicle.id, status = vehicle.status.label(), "vehicle reactivated")
        })
    }

    /// Count a gate passage and remember it as the latest entry.
    pub fn record_entry(&self, id: &str, gate: GateInfo) -> Result<Vehicle, EngineError> {
        self.modify(id, |vehicle| {
            let now = Utc::now();
            vehicle.entries_count += 1;
            vehicle.last_entry = Some(GateEntry {
                timestamp: now,
                gate: gate.gate.unwrap_or_else(|| UNKNOWN_GATE.to_string()),
                camera: gate.camera.unwrap_or_else(|| UNKNOWN_GATE.to_string()),
                image: gate.image,
                recognition_data: gate.recognition_data,
            });
            vehicle.updated_at = now;
        })
    }

    /// Append a photo to the vehicle's image list.
    pub fn add_image(&self, id: &str, image: NewVehicleImage) -> Result<Vehicle, EngineError> {
        let url = present(image.url.as_deref())
            .ok_or(EngineError::MissingField("url"))?
            .to_string();
        let image_type = present(image.image_type.as_deref())
            .unwrap_or(DEFAULT_IMAGE_TYPE)
            .to_string();
        self.modify(id, |vehicle| {
            let now = Utc::now();
            vehicle.images.push(VehicleImage {
                id: record_id("IMG"),
                url,
                image_type,
                uploaded_at: now,
            });
            vehicle.updated_at = now;
        })
        .inspect(|vehicle| debug!(id = %vehicle.id, images = vehicle.images.len(), "image added"))
    }

    pub fn find_by_id(&self, id: &str) -> Result<Vehicle, EngineError> {
        self.load()?
            .into_iter()
            .find(|vehicle| vehicle.id == id)
            .ok_or_else(|| EngineError::not_found(ENTITY, id))
    }

    pub fn find_by_plate(&self, plate: &str) -> Result<Vehicle, EngineError> {
        let key = normalize_plate(plate);
        self.load()?
            .into_iter()
            .find(|vehicle| normalize_plate(&vehicle.plate_number) == key)
            .ok_or_else(|| EngineError::not_found(ENTITY, plate))
    }

    pub fn list(&self) -> Result<Vec<Vehicle>, EngineError> {
        self.load()
    }

    pub fn search(&self, criteria: &VehicleSearch) -> Result<Vec<Vehicle>, EngineError> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|vehicle| matches_search(vehicle, criteria))
            .collect())
    }

    /// Refresh the vehicle carrying `plate`, if any, from the current violation set.
    pub fn recompute_plate(&self, plate: &str) -> Result<Option<Vehicle>, EngineError> {
        let key = normalize_plate(plate);
        let mut vehicles = self.load()?;
        let Some(vehicle) = vehicles
            .iter_mut()
            .find(|vehicle| normalize_plate(&vehicle.plate_number) == key)
        else {
            debug!(plate = %key, "no vehicle to reclassify");
            return Ok(None);
        };

        let violations = self.violations()?;
        let tally = tally_for(&violations, &vehicle.plate_number);
        let changed = apply_tally(vehicle, &tally, &self.policy);
        let refreshed = vehicle.clone();
        if changed {
            self.save(&vehicles)?;
            debug!(
                plate = %refreshed.plate_number,
                violations = refreshed.violations_count,
                status = refreshed.status.label(),
                "vehicle reclassified"
            );
        }
        Ok(Some(refreshed))
    }

    /// Recompute every vehicle in one pass; returns how many changed.
    pub fn recompute_all(&self) -> Result<usize, EngineError> {
        let mut vehicles = self.load()?;
        let tallies = tally_by_plate(&self.violations()?);
        let mut changed = 0;
        for vehicle in &mut vehicles {
            let tally = tallies
                .get(&normalize_plate(&vehicle.plate_number))
                .copied()
                .unwrap_or_default();
            if apply_tally(vehicle, &tally, &self.policy) {
                changed += 1;
            }
        }
        if changed > 0 {
            self.save(&vehicles)?;
        }
        info!(vehicles = vehicles.len(), changed, "classification recomputed");
        Ok(changed)
    }

    /// Add each row independently; one bad row never blocks the rest.
    pub fn import_rows(&self, rows: Vec<NewVehicle>) -> Result<BatchReport, EngineError> {
        self.import_numbered(
            rows.into_iter()
                .enumerate()
                .map(|(index, row)| (index + 1, Ok(row))),
        )
    }

    /// Parse a CSV export and import its rows; header problems reject the file.
    pub fn import_csv<R: Read>(&self, reader: R) -> Result<BatchReport, EngineError> {
        let rows = parse_vehicle_rows(reader)?;
        self.import_numbered(rows.into_iter().map(|row| (row.line, row.vehicle)))
    }

    /// Write every vehicle as CSV in the column layout `import_csv` accepts.
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize, EngineError> {
        let vehicles = self.load()?;
        let written = write_vehicle_rows(writer, &vehicles)?;
        info!(rows = written, "vehicles exported to csv");
        Ok(written)
    }

    fn import_numbered<I>(&self, rows: I) -> Result<BatchReport, EngineError>
    where
        I: IntoIterator<Item = (usize, Result<NewVehicle, String>)>,
    {
        let mut vehicles = self.load()?;
        let violations = self.violations()?;
        let mut report = BatchReport::default();

        for (item, row) in rows {
            match row {
                Ok(mut input) => {
                    input.source = VehicleSource::Import;
                    let result = self.insert(&mut vehicles, input, &violations);
                    report.record(item, &result);
                }
                Err(error) => report.reject(item, ErrorKind::InvalidInput, error),
            }
        }

        if report.succeeded > 0 {
            self.save(&vehicles)?;
        }
        info!(
            imported = report.succeeded,
            rejected = report.failed,
            "vehicle import finished"
        );
        Ok(report)
    }

    /// Validate and append a vehicle to an already-loaded collection.
    pub(crate) fn insert(
        &self,
        vehicles: &mut Vec<Vehicle>,
        input: NewVehicle,
        violations: &[Violation],
    ) -> Result<Vehicle, EngineError> {
        let plate = present(input.plate_number.as_deref())
            .ok_or(EngineError::MissingField("plateNumber"))?
            .to_string();
        let key = normalize_plate(&plate);
        if vehicles
            .iter()
            .any(|vehicle| normalize_plate(&vehicle.plate_number) == key)
        {
            return Err(duplicate_plate(&plate));
        }

        let mut vehicle = build_vehicle(input, plate);
        let tally = tally_for(violations, &vehicle.plate_number);
        apply_tally(&mut vehicle, &tally, &self.policy);
        vehicles.push(vehicle.clone());
        Ok(vehicle)
    }

    pub(crate) fn load(&self) -> Result<Vec<Vehicle>, EngineError> {
        Ok(load_typed(&*self.store, Collection::Vehicles)?)
    }

    pub(crate) fn save(&self, vehicles: &[Vehicle]) -> Result<(), EngineError> {
        Ok(save_typed(&*self.store, Collection::Vehicles, vehicles)?)
    }

    fn violations(&self) -> Result<Vec<Violation>, EngineError> {
        Ok(load_typed(&*self.store, Collection::Violations)?)
    }

    fn modify<F>(&self, id: &str, change: F) -> Result<Vehicle, EngineError>
    where
        F: FnOnce(&mut Vehicle),
    {
        let mut vehicles = self.load()?;
        let index = position(&vehicles, id)?;
        change(&mut vehicles[index]);
        let updated = vehicles[index].clone();
        self.save(&vehicles)?;
        Ok(updated)
    }
}

fn build_vehicle(input: NewVehicle, plate_number: String) -> Vehicle {
    let now = Utc::now();
    let created_by = input
        .created_by
        .as_deref()
        .and_then(|actor| present(Some(actor)))
        .unwrap_or(SYSTEM_ACTOR)
        .to_string();

    Vehicle {
        id: record_id("VEH"),
        plate_number,
        make: input.make,
        model: input.model,
        year: input.year,
        color: input.color,
        vehicle_type: input.vehicle_type,
        owner_name: input.owner_name,
        owner_category: input.owner_category,
        national_id: input.national_id,
        mobile: input.mobile,
        email: input.email,
        university_id: input.university_id,
        department: input.department,
        college: input.college,
        building: input.building,
        unit: input.unit,
        sticker_number: input.sticker_number,
        sticker_issue_date: input.sticker_issue_date,
        sticker_expiry_date: input.sticker_expiry_date,
        status: VehicleStatus::Active,
        suspension_reason: None,
        suspended_at: None,
        reactivated_at: None,
        violations_count: 0,
        last_violation_date: None,
        entries_count: 0,
        last_entry: None,
        images: Vec::new(),
        source: input.source,
        notes: input.notes,
        created_at: now,
        updated_at: now,
        created_by,
    }
}

fn position(vehicles: &[Vehicle], id: &str) -> Result<usize, EngineError> {
    vehicles
        .iter()
        .position(|vehicle| vehicle.id == id)
        .ok_or_else(|| EngineError::not_found(ENTITY, id))
}

fn duplicate_plate(plate: &str) -> EngineError {
    EngineError::DuplicateKey {
        entity: ENTITY,
        field: "plateNumber",
        value: plate.to_string(),
    }
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    normalize_plate(haystack).contains(&normalize_plate(needle))
}

fn matches_search(vehicle: &Vehicle, criteria: &VehicleSearch) -> bool {
    let text = |value: &Option<String>, field: &str| {
        present(value.as_deref()).map_or(true, |wanted| contains_folded(field, wanted))
    };
    let exact = |value: &Option<String>, field: &str| {
        present(value.as_deref()).map_or(true, |wanted| field.trim().eq_ignore_ascii_case(wanted))
    };

    text(&criteria.plate_number, &vehicle.plate_number)
        && text(&criteria.owner_name, &vehicle.owner_name)
        && criteria
            .owner_category
            .map_or(true, |category| vehicle.owner_category == category)
        && exact(&criteria.department, &vehicle.department)
        && exact(&criteria.college, &vehicle.college)
        && exact(&criteria.vehicle_type, &vehicle.vehicle_type)
        && criteria.status.map_or(true, |status| vehicle.status == status)
}
