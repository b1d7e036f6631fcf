use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;

use super::common::*;
use crate::engine::{EngineError, ErrorKind};
use crate::ledger::{
    AppealStatus, NewViolation, PaymentDetails, RecognizedPlate, Severity, ViolationPatch,
    ViolationSearch, ViolationStatus,
};
use crate::registry::{NewVehicle, VehicleStatus};

fn recognized(plate: &str, confidence: f32) -> RecognizedPlate {
    RecognizedPlate {
        plate: plate.to_string(),
        confidence,
        vehicle: Some(json!({ "color": "white" })),
        image: Some("frames/gate-2/0001.jpg".to_string()),
    }
}

#[test]
fn new_violation_freezes_taxonomy_values() {
    let engine = engine();
    let violation = engine
        .add_violation(NewViolation::new("TAX-1", "no_license"))
        .into_result()
        .expect("violation recorded");

    assert_eq!(violation.violation_type, "no_license");
    assert_eq!(violation.severity, Severity::Critical);
    assert_eq!(violation.status, ViolationStatus::Pending);
    assert_eq!(violation.location, "unspecified");
    assert_eq!(violation.created_by, "system");
    assert!(violation.violation_number.starts_with("V-"));
}

#[test]
fn unknown_types_fall_back_to_other() {
    let engine = engine();
    let violation = engine
        .add_violation(NewViolation::new("TAX-2", "blocking-fire-lane-twice"))
        .into_result()
        .expect("violation recorded");
    assert_eq!(violation.violation_type, "other");
}

#[test]
fn missing_plate_or_type_is_rejected() {
    let engine = engine();
    let no_plate = engine.add_violation(NewViolation {
        violation_type: Some("speeding".to_string()),
        ..NewViolation::default()
    });
    assert_eq!(no_plate.error.as_deref(), Some("plateNumber is required"));

    let no_type = engine.add_violation(NewViolation {
        plate_number: Some("TAX-3".to_string()),
        ..NewViolation::default()
    });
    assert_eq!(no_type.error.as_deref(), Some("violationType is required"));
}

#[test]
fn numbers_follow_the_violation_year() {
    let engine = engine();
    let dated = |year| NewViolation {
        timestamp: Utc.with_ymd_and_hms(year, 3, 1, 8, 0, 0).single(),
        ..NewViolation::new("NUM-1", "speeding")
    };

    let first = engine.add_violation(dated(2025)).into_result().expect("recorded");
    let second = engine.add_violation(dated(2025)).into_result().expect("recorded");
    let next_year = engine.add_violation(dated(2026)).into_result().expect("recorded");

    assert_eq!(first.violation_number, "V-2025-000001");
    assert_eq!(second.violation_number, "V-2025-000002");
    assert_eq!(next_year.violation_number, "V-2026-000001");

    engine.delete_violation(&second.id);
    let third = engine.add_violation(dated(2025)).into_result().expect("recorded");
    assert_eq!(third.violation_number, "V-2025-000003");

    let found = engine
        .find_violation_by_number("V-2025-000003")
        .into_result()
        .expect("lookup by number");
    assert_eq!(found.id, third.id);
}

#[test]
fn adding_a_violation_links_and_reclassifies_the_vehicle() {
    let engine = engine();
    let vehicle = engine
        .add_vehicle(NewVehicle::with_plate("LNK-1"))
        .into_result()
        .expect("vehicle registered");

    let mut last = None;
    for _ in 0..3 {
        last = engine
            .add_violation(NewViolation::new("lnk-1", "speeding"))
            .into_result();
    }
    let last = last.expect("violation recorded");
    assert_eq!(last.vehicle_id.as_deref(), Some(vehicle.id.as_str()));

    let refreshed = engine.find_vehicle(&vehicle.id).into_result().expect("found");
    assert_eq!(refreshed.violations_count, 3);
    assert_eq!(refreshed.status, VehicleStatus::Warning);
    assert_eq!(refreshed.last_violation_date, Some(last.timestamp));
}

#[test]
fn payment_closes_the_violation() {
    let engine = engine();
    let violation = engine
        .add_violation(NewViolation::new("PAY-1", "speeding"))
        .into_result()
        .expect("violation recorded");

    let paid = engine
        .pay_violation(&violation.id, PaymentDetails::default())
        .into_result()
        .expect("paid");
    assert_eq!(paid.status, ViolationStatus::Paid);
    assert!(paid.is_paid);
    assert_eq!(paid.payment_method.as_deref(), Some("cash"));
    let reference = paid.payment_reference.expect("reference generated");
    assert!(reference.starts_with("PAY-"));
    assert_eq!(reference.len(), 16);

    for result in [
        engine.pay_violation(&violation.id, PaymentDetails::default()),
        engine.appeal_violation(&violation.id, None),
        engine.respond_to_appeal(&violation.id, true, None),
    ] {
        assert_eq!(result.kind, Some(ErrorKind::InvalidTransition));
    }
}

#[test]
fn approved_appeal_cancels_and_clears_the_count() {
    let engine = engine();
    let vehicle = engine
        .add_vehicle(NewVehicle::with_plate("APL-1"))
        .into_result()
        .expect("vehicle registered");
    let ids: Vec<String> = (0..3)
        .filter_map(|_| {
            engine
                .add_violation(NewViolation::new("APL-1", "speeding"))
                .into_result()
        })
        .map(|violation| violation.id)
        .collect();
    assert_eq!(
        engine.find_vehicle(&vehicle.id).into_result().map(|v| v.status),
        Some(VehicleStatus::Warning)
    );

    let appealed = engine
        .appeal_violation(&ids[0], Some("camera misread".to_string()))
        .into_result()
        .expect("appealed");
    assert_eq!(appealed.status, ViolationStatus::Appealed);
    assert_eq!(appealed.appeal_status, Some(AppealStatus::Pending));

    let approved = engine
        .respond_to_appeal(&ids[0], true, Some("evidence unclear".to_string()))
        .into_result()
        .expect("approved");
    assert_eq!(approved.status, ViolationStatus::Cancelled);
    assert_eq!(approved.appeal_status, Some(AppealStatus::Approved));
    assert_eq!(approved.cancellation_reason.as_deref(), Some("appeal approved"));

    let refreshed = engine.find_vehicle(&vehicle.id).into_result().expect("found");
    assert_eq!(refreshed.violations_count, 3);
    assert_eq!(refreshed.status, VehicleStatus::Active);
}

#[test]
fn rejected_appeal_returns_to_pending() {
    let engine = engine();
    let violation = engine
        .add_violation(NewViolation::new("APL-2", "speeding"))
        .into_result()
        .expect("violation recorded");
    engine.appeal_violation(&violation.id, None);

    let rejected = engine
        .respond_to_appeal(&violation.id, false, None)
        .into_result()
        .expect("rejected");
    assert_eq!(rejected.status, ViolationStatus::Pending);
    assert_eq!(rejected.appeal_status, Some(AppealStatus::Rejected));
    assert!(rejected.is_appealed);
}

#[test]
fn cancelled_violations_accept_no_further_moves() {
    let engine = engine();
    let violation = engine
        .add_violation(NewViolation::new("CAN-1", "speeding"))
        .into_result()
        .expect("violation recorded");
    let cancelled = engine
        .cancel_violation(&violation.id, Some("duplicate entry".to_string()))
        .into_result()
        .expect("cancelled");
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("duplicate entry"));

    let again = engine.cancel_violation(&violation.id, None);
    assert_eq!(again.kind, Some(ErrorKind::InvalidTransition));
    assert_eq!(
        again.error.as_deref(),
        Some("cannot cancel violation in status 'cancelled'")
    );
}

#[test]
fn update_leaves_status_and_fine_alone() {
    let engine = engine();
    let violation = engine
        .add_violation(NewViolation::new("UPD-1", "speeding"))
        .into_result()
        .expect("violation recorded");

    let updated = engine
        .update_violation(
            &violation.id,
            ViolationPatch {
                location: Some("Lot B".to_string()),
                notes: Some("second camera confirms".to_string()),
                ..ViolationPatch::default()
            },
        )
        .into_result()
        .expect("updated");
    assert_eq!(updated.location, "Lot B");
    assert_eq!(updated.fine, violation.fine);
    assert_eq!(updated.status, ViolationStatus::Pending);
}

#[test]
fn recognized_plates_respect_the_confidence_floor() {
    let engine = engine();

    let low = engine.record_recognized(recognized("CAM-1", 0.42), NewViolation::default());
    assert_eq!(low.kind, Some(ErrorKind::InvalidInput));
    let out_of_range = engine.record_recognized(recognized("CAM-1", 1.4), NewViolation::default());
    assert_eq!(out_of_range.kind, Some(ErrorKind::InvalidInput));

    let recorded = engine
        .record_recognized(
            recognized("CAM-1", 0.93),
            NewViolation {
                gate: "gate-2".to_string(),
                ..NewViolation::default()
            },
        )
        .into_result()
        .expect("recorded");
    assert!(recorded.is_auto_detected);
    assert_eq!(recorded.violation_type, "other");
    assert_eq!(recorded.recorded_by, "auto-system");
    assert_eq!(recorded.evidence_images, vec!["frames/gate-2/0001.jpg"]);
    let data = recorded.recognition_data.expect("recognition data kept");
    assert_eq!(data["plate"], "CAM-1");
    assert_eq!(data["vehicle"]["color"], "white");
}

#[test]
fn ledger_reports_low_confidence_distinctly() {
    let engine = engine();
    match engine
        .ledger()
        .record_recognized(recognized("CAM-2", 0.5), NewViolation::default())
    {
        Err(EngineError::LowConfidence { minimum, .. }) => assert_eq!(minimum, 0.7),
        other => panic!("expected low confidence rejection, got {other:?}"),
    }
}

#[test]
fn search_filters_by_status_and_plate() {
    let engine = engine();
    let first = engine
        .add_violation(NewViolation::new("SRCH-1", "speeding"))
        .into_result()
        .expect("recorded");
    engine.add_violation(NewViolation::new("SRCH-1", "wrong_parking"));
    engine.add_violation(NewViolation::new("OTHER-9", "speeding"));
    engine.pay_violation(&first.id, PaymentDetails::default());

    let pending_on_plate = engine
        .search_violations(&ViolationSearch {
            plate_number: Some("srch".to_string()),
            status: Some(ViolationStatus::Pending),
            ..ViolationSearch::default()
        })
        .into_result()
        .expect("search succeeds");
    assert_eq!(pending_on_plate.len(), 1);
    assert_eq!(pending_on_plate[0].violation_type, "wrong_parking");

    let on_plate = engine
        .violations_for_plate("srch-1")
        .into_result()
        .expect("plate lookup");
    assert_eq!(on_plate.len(), 2);
}

#[test]
fn period_statistics_cover_an_inclusive_date_range() {
    let engine = engine();
    let on = |day: u32, kind: &str| NewViolation {
        timestamp: Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).single(),
        ..NewViolation::new("PER-1", kind)
    };
    let first = engine
        .add_violation(on(1, "speeding"))
        .into_result()
        .expect("recorded");
    engine.add_violation(on(15, "wrong_parking"));
    engine.add_violation(on(30, "no_sticker"));
    engine.add_violation(on(2, "no_license"));
    engine.pay_violation(&first.id, PaymentDetails::default());

    let day = |day: u32| NaiveDate::from_ymd_opt(2024, 6, day).expect("valid date");
    let june_first_half = engine
        .violation_statistics_for_period(day(1), day(15))
        .into_result()
        .expect("period statistics");
    assert_eq!(june_first_half.total, 3);
    assert_eq!(june_first_half.total_fines, 500 + 150 + 1500);
    assert_eq!(june_first_half.paid_fines, 500);
    assert!(june_first_half
        .violations
        .iter()
        .all(|violation| violation.date() <= day(15)));

    let single_day = engine
        .violation_statistics_for_period(day(30), day(30))
        .into_result()
        .expect("period statistics");
    assert_eq!(single_day.total, 1);
    assert_eq!(single_day.total_fines, 300);

    let reversed = engine.violation_statistics_for_period(day(15), day(1));
    assert_eq!(reversed.kind, Some(ErrorKind::InvalidInput));
}

#[test]
fn violation_csv_export_lists_every_violation() {
    let engine = engine();
    engine.add_violation(NewViolation::new("CSV-1", "speeding"));
    engine.add_violation(NewViolation {
        description: Some("blocked the north gate, twice".to_string()),
        ..NewViolation::new("CSV-2", "blocking_traffic")
    });

    let mut buffer = Vec::new();
    let rows = engine
        .export_violations_csv(&mut buffer)
        .into_result()
        .expect("export succeeds");
    assert_eq!(rows, 2);

    let text = String::from_utf8(buffer).expect("utf-8");
    assert_eq!(text.lines().count(), 3);
    assert!(text.contains(",CSV-1,speeding,"));
    assert!(text.contains("\"blocked the north gate, twice\""));
}
