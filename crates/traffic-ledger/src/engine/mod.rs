//! Engine facade: one explicit instance owning the store handle and every component.
//!
//! Components return `Result<T, EngineError>`; the facade converts each into an
//! [`OperationResult`] envelope so callers never handle a raw error or a panic.

mod error;
mod outcome;
mod transfer;

pub use error::{EngineError, ErrorKind};
pub use outcome::{BatchItemError, BatchReport, OperationResult};
pub use transfer::{ImportSummary, LinkedData, LinkedDataDocument, LinkedDataExport};

use std::io::{Read, Write};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::Value;
use tracing::info;

use crate::config::LedgerSettings;
use crate::ledger::{
    NewViolation, PaymentDetails, PeriodStatistics, RecognizedPlate, Violation, ViolationLedger,
    ViolationPatch, ViolationSearch,
};
use crate::linkage::{
    MisuseReport, MisuseStatus, NewDelivery, NewMisuseReport, OwnerLookup, PlateLookup,
    ReconcileReport, Sticker, StickerDelivery, StickerLinkageIndex, StickerValidation,
};
use crate::registry::{
    ClassificationPolicy, GateInfo, NewVehicle, NewVehicleImage, Vehicle, VehiclePatch,
    VehicleRegistry, VehicleSearch,
};
use crate::statistics::{self, Snapshot, Statistics};
use crate::store::{load_typed, save_typed, Collection, DocumentStore};

/// Vehicle, violation, and sticker engine over a single document store.
pub struct TrafficEngine<S> {
    store: Arc<S>,
    registry: VehicleRegistry<S>,
    ledger: ViolationLedger<S>,
    linkage: StickerLinkageIndex<S>,
    top_violators: usize,
}

impl<S> TrafficEngine<S>
where
    S: DocumentStore + 'static,
{
    pub fn new(store: Arc<S>, settings: &LedgerSettings) -> Self {
        let policy =
            ClassificationPolicy::new(settings.warning_threshold, settings.danger_threshold);
        let registry = VehicleRegistry::new(Arc::clone(&store), policy);
        let ledger = ViolationLedger::new(
            Arc::clone(&store),
            registry.clone(),
            settings.min_confidence,
        );
        let linkage = StickerLinkageIndex::new(Arc::clone(&store), registry.clone());

        Self {
            store,
            registry,
            ledger,
            linkage,
            top_violators: settings.top_violators,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn registry(&self) -> &VehicleRegistry<S> {
        &self.registry
    }

    pub fn ledger(&self) -> &ViolationLedger<S> {
        &self.ledger
    }

    pub fn linkage(&self) -> &StickerLinkageIndex<S> {
        &self.linkage
    }

    // Vehicles

    pub fn add_vehicle(&self, input: NewVehicle) -> OperationResult<Vehicle> {
        self.registry.add(input).into()
    }

    pub fn update_vehicle(&self, id: &str, patch: VehiclePatch) -> OperationResult<Vehicle> {
        self.registry.update(id, patch).into()
    }

    pub fn delete_vehicle(&self, id: &str) -> OperationResult<Vehicle> {
        self.registry.delete(id).into()
    }

    pub fn find_vehicle(&self, id: &str) -> OperationResult<Vehicle> {
        self.registry.find_by_id(id).into()
    }

    pub fn vehicle_by_plate(&self, plate: &str) -> OperationResult<Vehicle> {
        self.registry.find_by_plate(plate).into()
    }

    pub fn list_vehicles(&self) -> OperationResult<Vec<Vehicle>> {
        self.registry.list().into()
    }

    pub fn search_vehicles(&self, criteria: &VehicleSearch) -> OperationResult<Vec<Vehicle>> {
        self.registry.search(criteria).into()
    }

    pub fn suspend_vehicle(&self, id: &str, reason: Option<String>) -> OperationResult<Vehicle> {
        self.registry.suspend(id, reason).into()
    }

    pub fn activate_vehicle(&self, id: &str) -> OperationResult<Vehicle> {
        self.registry.activate(id).into()
    }

    pub fn record_entry(&self, id: &str, gate: GateInfo) -> OperationResult<Vehicle> {
        self.registry.record_entry(id, gate).into()
    }

    pub fn add_vehicle_image(&self, id: &str, image: NewVehicleImage) -> OperationResult<Vehicle> {
        self.registry.add_image(id, image).into()
    }

    pub fn import_vehicles(&self, rows: Vec<NewVehicle>) -> OperationResult<BatchReport> {
        self.registry.import_rows(rows).into()
    }

    pub fn import_vehicles_csv<R: Read>(&self, reader: R) -> OperationResult<BatchReport> {
        self.registry.import_csv(reader).into()
    }

    pub fn export_vehicles_csv<W: Write>(&self, writer: W) -> OperationResult<usize> {
        self.registry.export_csv(writer).into()
    }

    pub fn recompute_all(&self) -> OperationResult<usize> {
        self.registry.recompute_all().into()
    }

    // Violations

    pub fn add_violation(&self, input: NewViolation) -> OperationResult<Violation> {
        self.ledger.add(input).into()
    }

    pub fn record_recognized(
        &self,
        recognized: RecognizedPlate,
        context: NewViolation,
    ) -> OperationResult<Violation> {
        self.ledger.record_recognized(recognized, context).into()
    }

    pub fn update_violation(&self, id: &str, patch: ViolationPatch) -> OperationResult<Violation> {
        self.ledger.update(id, patch).into()
    }

    pub fn delete_violation(&self, id: &str) -> OperationResult<Violation> {
        self.ledger.delete(id).into()
    }

    pub fn find_violation(&self, id: &str) -> OperationResult<Violation> {
        self.ledger.find_by_id(id).into()
    }

    pub fn find_violation_by_number(&self, number: &str) -> OperationResult<Violation> {
        self.ledger.find_by_number(number).into()
    }

    pub fn violations_for_plate(&self, plate: &str) -> OperationResult<Vec<Violation>> {
        self.ledger.for_plate(plate).into()
    }

    pub fn list_violations(&self) -> OperationResult<Vec<Violation>> {
        self.ledger.list().into()
    }

    pub fn search_violations(&self, criteria: &ViolationSearch) -> OperationResult<Vec<Violation>> {
        self.ledger.search(criteria).into()
    }

    pub fn pay_violation(&self, id: &str, payment: PaymentDetails) -> OperationResult<Violation> {
        self.ledger.pay(id, payment).into()
    }

    pub fn appeal_violation(&self, id: &str, reason: Option<String>) -> OperationResult<Violation> {
        self.ledger.appeal(id, reason).into()
    }

    pub fn respond_to_appeal(
        &self,
        id: &str,
        approved: bool,
        response: Option<String>,
    ) -> OperationResult<Violation> {
        self.ledger.respond_to_appeal(id, approved, response).into()
    }

    pub fn cancel_violation(&self, id: &str, reason: Option<String>) -> OperationResult<Violation> {
        self.ledger.cancel(id, reason).into()
    }

    pub fn violation_statistics_for_period(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> OperationResult<PeriodStatistics> {
        self.ledger.statistics_for_period(from, to).into()
    }

    pub fn export_violations_csv<W: Write>(&self, writer: W) -> OperationResult<usize> {
        self.ledger.export_csv(writer).into()
    }

    // Stickers

    pub fn reconcile(&self) -> OperationResult<ReconcileReport> {
        self.linkage.reconcile().into()
    }

    pub fn register_sticker(&self, sticker: Sticker) -> OperationResult<Sticker> {
        self.linkage.register_sticker(sticker).into()
    }

    pub fn import_stickers(&self, documents: Vec<Value>) -> OperationResult<BatchReport> {
        self.linkage.import_stickers(documents).into()
    }

    pub fn list_stickers(&self) -> OperationResult<Vec<Sticker>> {
        self.linkage.stickers().into()
    }

    pub fn find_vehicle_by_plate(&self, plate: &str) -> OperationResult<PlateLookup> {
        self.linkage.find_vehicle_by_plate(plate).into()
    }

    pub fn find_by_national_id(&self, national_id: &str) -> OperationResult<OwnerLookup> {
        self.linkage.find_by_national_id(national_id).into()
    }

    pub fn validate_sticker(&self, plate: &str) -> OperationResult<StickerValidation> {
        self.linkage.validate_sticker(plate).into()
    }

    pub fn register_delivery(&self, input: NewDelivery) -> OperationResult<StickerDelivery> {
        self.linkage.register_delivery(input).into()
    }

    pub fn activate_delivery(&self, sticker_number: &str) -> OperationResult<StickerDelivery> {
        self.linkage.activate_delivery(sticker_number).into()
    }

    pub fn unactivated_deliveries(&self) -> OperationResult<Vec<StickerDelivery>> {
        self.linkage.unactivated_deliveries().into()
    }

    pub fn register_misuse(&self, input: NewMisuseReport) -> OperationResult<MisuseReport> {
        self.linkage.register_misuse(input).into()
    }

    pub fn confirm_misuse(&self, id: &str) -> OperationResult<MisuseReport> {
        self.linkage.confirm_misuse(id).into()
    }

    pub fn resolve_misuse(&self, id: &str, resolution: &str) -> OperationResult<MisuseReport> {
        self.linkage.resolve_misuse(id, resolution).into()
    }

    pub fn misuse_reports(
        &self,
        status: Option<MisuseStatus>,
    ) -> OperationResult<Vec<MisuseReport>> {
        self.linkage.misuse_reports(status).into()
    }

    // Aggregates and transfer

    pub fn get_statistics(&self) -> OperationResult<Statistics> {
        self.statistics().into()
    }

    pub fn export_linked_data(&self) -> OperationResult<LinkedDataExport> {
        self.export().into()
    }

    pub fn import_linked_data(&self, data: LinkedData) -> OperationResult<ImportSummary> {
        self.import(data).into()
    }

    pub fn statistics(&self) -> Result<Statistics, EngineError> {
        let data = self.linked_data()?;
        Ok(self.aggregate(&data))
    }

    pub fn export(&self) -> Result<LinkedDataExport, EngineError> {
        let data = self.linked_data()?;
        let summary = self.aggregate(&data);
        info!(
            vehicles = data.vehicles.len(),
            violations = data.violations.len(),
            stickers = data.stickers.len(),
            "linked data exported"
        );
        Ok(LinkedDataExport {
            timestamp: Utc::now(),
            summary,
            data,
        })
    }

    /// Restore every collection from `data`, replacing what the store holds.
    ///
    /// Records keep their ids and numbers. The violation-number counters are
    /// cleared so the next number is reseeded from the restored violations.
    pub fn import(&self, data: LinkedData) -> Result<ImportSummary, EngineError> {
        let store = &*self.store;
        save_typed(store, Collection::Stickers, &data.stickers)?;
        save_typed(store, Collection::Vehicles, &data.vehicles)?;
        save_typed(store, Collection::Violations, &data.violations)?;
        save_typed(store, Collection::StickerDeliveries, &data.deliveries)?;
        save_typed(store, Collection::StickerMisuseReports, &data.misuses)?;
        store.save_collection(Collection::Counters, &[])?;

        let summary = data.summary();
        info!(
            vehicles = summary.vehicles,
            violations = summary.violations,
            stickers = summary.stickers,
            "linked data imported"
        );
        Ok(summary)
    }

    fn linked_data(&self) -> Result<LinkedData, EngineError> {
        let store = &*self.store;
        Ok(LinkedData {
            stickers: load_typed(store, Collection::Stickers)?,
            vehicles: load_typed(store, Collection::Vehicles)?,
            violations: load_typed(store, Collection::Violations)?,
            deliveries: load_typed(store, Collection::StickerDeliveries)?,
            misuses: load_typed(store, Collection::StickerMisuseReports)?,
        })
    }

    fn aggregate(&self, data: &LinkedData) -> Statistics {
        let snapshot = Snapshot {
            stickers: &data.stickers,
            vehicles: &data.vehicles,
            violations: &data.violations,
            deliveries: &data.deliveries,
            misuse_reports: &data.misuses,
        };
        statistics::aggregate(&snapshot, self.top_violators)
    }
}
