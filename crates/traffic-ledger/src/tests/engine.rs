use super::common::*;
use crate::engine::{ErrorKind, LinkedData};
use crate::ledger::{NewViolation, PaymentDetails};
use crate::registry::{NewVehicle, VehicleStatus};
use crate::store::{save_typed, Collection};

#[test]
fn failures_surface_as_envelopes() {
    let engine = engine();
    let result = engine.pay_violation("VIO-unknown", PaymentDetails::default());
    assert!(!result.success);
    assert!(result.data.is_none());
    assert_eq!(result.kind, Some(ErrorKind::NotFound));
    assert_eq!(
        result.error.as_deref(),
        Some("violation 'VIO-unknown' not found")
    );
}

#[test]
fn recompute_all_repairs_stale_counts() {
    let engine = engine();
    let mut stale = vehicle("STL-1");
    stale.violations_count = 9;
    stale.status = VehicleStatus::Danger;
    let violations: Vec<_> = (0..3).map(|_| violation_for("stl-1")).collect();
    save_typed(&**engine.store(), Collection::Vehicles, &[stale.clone()]).expect("seeded");
    save_typed(&**engine.store(), Collection::Violations, &violations).expect("seeded");

    assert_eq!(engine.recompute_all().into_result(), Some(1));
    let repaired = engine.find_vehicle(&stale.id).into_result().expect("found");
    assert_eq!(repaired.violations_count, 3);
    assert_eq!(repaired.status, VehicleStatus::Warning);

    assert_eq!(engine.recompute_all().into_result(), Some(0));
}

#[test]
fn statistics_reflect_every_collection() {
    let engine = engine();
    engine.add_vehicle(NewVehicle {
        sticker_number: "1".to_string(),
        ..NewVehicle::with_plate("STA-1")
    });
    engine.add_vehicle(NewVehicle::with_plate("STA-2"));
    engine.register_sticker(sticker("1", "STA-1"));
    let paid = engine
        .add_violation(NewViolation::new("STA-1", "speeding"))
        .into_result()
        .expect("recorded");
    engine.add_violation(NewViolation::new("STA-2", "speeding"));
    engine.pay_violation(&paid.id, PaymentDetails::default());

    let stats = engine.get_statistics().into_result().expect("statistics");
    assert_eq!(stats.vehicles.total, 2);
    assert_eq!(stats.vehicles.with_stickers, 1);
    assert_eq!(stats.stickers.total, 1);
    assert_eq!(stats.violations.total, 2);
    assert_eq!(stats.violations.paid, 1);
    assert_eq!(stats.violations.with_stickers, 1);
    assert_eq!(stats.top_violators.len(), 1);
    assert_eq!(stats.top_violators[0].national_id, "1");
}

#[test]
fn import_replaces_collections_and_reseeds_numbers() {
    let source = engine();
    source.add_vehicle(NewVehicle::with_plate("RST-1"));
    for _ in 0..2 {
        source.add_violation(NewViolation::new("RST-1", "speeding"));
    }
    let export = source.export_linked_data().into_result().expect("exported");

    let target = engine();
    target.add_vehicle(NewVehicle::with_plate("GONE-1"));
    for _ in 0..5 {
        target.add_violation(NewViolation::new("GONE-1", "speeding"));
    }

    let summary = target
        .import_linked_data(export.data.clone())
        .into_result()
        .expect("imported");
    assert_eq!(summary.vehicles, 1);
    assert_eq!(summary.violations, 2);
    assert_eq!(target.vehicle_by_plate("GONE-1").kind, Some(ErrorKind::NotFound));

    let next = target
        .add_violation(NewViolation::new("RST-1", "speeding"))
        .into_result()
        .expect("recorded");
    assert!(next.violation_number.ends_with("000003"));

    let emptied = target
        .import_linked_data(LinkedData::default())
        .into_result()
        .expect("imported");
    assert_eq!(emptied.vehicles, 0);
    assert_eq!(target.list_violations().into_result().map(|v| v.len()), Some(0));
}
