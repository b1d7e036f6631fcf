use std::fs;
use std::sync::Arc;

use traffic_ledger::config::LedgerSettings;
use traffic_ledger::engine::LinkedDataDocument;
use traffic_ledger::ledger::NewViolation;
use traffic_ledger::linkage::{NewDelivery, NewMisuseReport};
use traffic_ledger::registry::NewVehicle;
use traffic_ledger::{JsonFileStore, TrafficEngine};

fn file_engine(root: &std::path::Path) -> TrafficEngine<JsonFileStore> {
    let store = JsonFileStore::open(root).expect("store opens");
    TrafficEngine::new(Arc::new(store), &LedgerSettings::default())
}

#[test]
fn export_then_import_reproduces_every_collection() {
    let source_dir = tempfile::tempdir().expect("temp dir");
    let source = file_engine(source_dir.path());

    source.add_vehicle(NewVehicle::with_plate("RND-1"));
    source
        .import_stickers(vec![serde_json::json!({
            "رقم الهوية": "2223334445",
            "رقم لوحة السيارة": "RND-2",
            "اسم الساكن": "Omar",
            "حالة": "فعال",
            "تاريخ الملصق": "15/08/2024",
        })])
        .into_result()
        .expect("sticker import");
    source.add_violation(NewViolation::new("RND-1", "speeding"));
    source.add_violation(NewViolation::new("RND-2", "wrong_parking"));
    source.register_delivery(NewDelivery {
        sticker_number: Some("2223334445".to_string()),
        ..NewDelivery::default()
    });
    source.register_misuse(NewMisuseReport {
        sticker_number: Some("2223334445".to_string()),
        ..NewMisuseReport::default()
    });
    source.reconcile().into_result().expect("reconcile");

    let export = source.export_linked_data().into_result().expect("export");
    assert_eq!(export.data.vehicles.len(), 2);
    assert_eq!(export.summary.violations.total, 2);

    let path = source_dir.path().join("export.json");
    fs::write(&path, serde_json::to_vec_pretty(&export).expect("serializes")).expect("written");
    let document: LinkedDataDocument =
        serde_json::from_slice(&fs::read(&path).expect("read back")).expect("parses");

    let target_dir = tempfile::tempdir().expect("temp dir");
    let target = file_engine(target_dir.path());
    let summary = target
        .import_linked_data(document.data)
        .into_result()
        .expect("import");
    assert_eq!(summary.vehicles, 2);
    assert_eq!(summary.stickers, 1);
    assert_eq!(summary.violations, 2);
    assert_eq!(summary.deliveries, 1);
    assert_eq!(summary.misuses, 1);

    let reexport = target.export_linked_data().into_result().expect("re-export");
    assert_eq!(reexport.data, export.data);
    assert_eq!(reexport.summary, export.summary);
}

#[test]
fn file_store_survives_reopening() {
    let dir = tempfile::tempdir().expect("temp dir");
    {
        let engine = file_engine(dir.path());
        engine.add_vehicle(NewVehicle::with_plate("PER-1"));
        engine.add_violation(NewViolation::new("PER-1", "speeding"));
    }

    let reopened = file_engine(dir.path());
    let vehicle = reopened
        .vehicle_by_plate("per-1")
        .into_result()
        .expect("vehicle persisted");
    assert_eq!(vehicle.violations_count, 1);

    let next = reopened
        .add_violation(NewViolation::new("PER-1", "speeding"))
        .into_result()
        .expect("recorded");
    assert!(next.violation_number.ends_with("000002"));
}
