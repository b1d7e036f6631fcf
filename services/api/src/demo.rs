use crate::infra::print_json;
use chrono::Local;
use clap::Args;
use serde_json::json;
use std::sync::Arc;
use traffic_ledger::config::LedgerSettings;
use traffic_ledger::error::AppError;
use traffic_ledger::ledger::{NewViolation, PaymentDetails, RecognizedPlate};
use traffic_ledger::registry::{NewVehicle, OwnerCategory};
use traffic_ledger::{MemoryStore, TrafficEngine};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the sticker reconcile step (sticker-only plates stay unlinked).
    #[arg(long)]
    pub(crate) skip_reconcile: bool,
    /// Print the closing statistics as JSON instead of a summary.
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        skip_reconcile,
        json: as_json,
    } = args;
    let engine = TrafficEngine::new(Arc::new(MemoryStore::new()), &LedgerSettings::default());

    println!("Traffic ledger demo ({})", Local::now().format("%Y-%m-%d"));

    println!("\nRegistry");
    for (plate, owner, category) in [
        ("ABC-1", "Layla Hassan", OwnerCategory::Staff),
        ("KSA-220", "Omar Salem", OwnerCategory::Student),
    ] {
        let vehicle = AppError::from_outcome(engine.add_vehicle(NewVehicle {
            owner_name: owner.to_string(),
            owner_category: category,
            ..NewVehicle::with_plate(plate)
        }))?;
        println!(
            "  {} registered for {} ({})",
            vehicle.plate_number,
            vehicle.owner_name,
            vehicle.owner_category.label()
        );
    }

    let duplicate = engine.add_vehicle(NewVehicle::with_plate("abc-1"));
    if let Some(error) = duplicate.error {
        println!("  Duplicate rejected: {error}");
    }

    println!("\nViolations");
    let mut recorded = Vec::new();
    for (plate, kind) in [
        ("ABC-1", "speeding"),
        ("ABC-1", "speeding"),
        ("ABC-1", "wrong_parking"),
        ("KSA-220", "no_sticker"),
        ("XYZ-9", "unknown_offence"),
    ] {
        let violation =
            AppError::from_outcome(engine.add_violation(NewViolation::new(plate, kind)))?;
        println!(
            "  {} {} {} fine {} ({})",
            violation.violation_number,
            violation.plate_number,
            violation.violation_type,
            violation.fine,
            violation.severity.label()
        );
        recorded.push(violation);
    }

    let recognition = engine.record_recognized(
        RecognizedPlate {
            plate: "KSA-220".to_string(),
            confidence: 0.42,
            vehicle: None,
            image: None,
        },
        NewViolation::default(),
    );
    if let Some(error) = recognition.error {
        println!("  Recognition skipped: {error}");
    }

    let abc = AppError::from_outcome(engine.vehicle_by_plate("ABC-1"))?;
    println!(
        "  ABC-1 now has {} violation(s), status {}",
        abc.violations_count,
        abc.status.label()
    );

    println!("\nSettlement");
    if let Some(first) = recorded.first() {
        let paid = AppError::from_outcome(engine.pay_violation(
            &first.id,
            PaymentDetails {
                method: Some("card".to_string()),
                reference: None,
            },
        ))?;
        println!(
            "  {} {} via {}",
            paid.violation_number,
            paid.status.label(),
            paid.payment_method.as_deref().unwrap_or("cash")
        );
        if let Some(error) = engine.appeal_violation(&first.id, None).error {
            println!("  Appeal after payment refused: {error}");
        }
    }
    if let Some(second) = recorded.get(1) {
        AppError::from_outcome(
            engine.appeal_violation(&second.id, Some("radar miscalibrated".to_string())),
        )?;
        let decided = AppError::from_outcome(engine.respond_to_appeal(
            &second.id,
            true,
            Some("calibration log confirms the fault".to_string()),
        ))?;
        println!(
            "  {} appeal approved, now {}",
            decided.violation_number,
            decided.status.label()
        );
    }

    println!("\nStickers");
    let imported = AppError::from_outcome(engine.import_stickers(vec![
        json!({
            "nationalId": "1010",
            "plateNumber": "ABC-1",
            "ownerName": "Layla Hassan",
            "status": "active"
        }),
        json!({
            "رقم الهوية": 2020,
            "رقم لوحة السيارة": "XYZ-9",
            "اسم الساكن": "Ahmad Nasser",
            "حالة": "فعال",
            "تاريخ الملصق": "2024-03-01"
        }),
        json!({ "plateNumber": "NO-ID" }),
    ]))?;
    println!(
        "  Imported {} sticker(s), {} rejected",
        imported.succeeded, imported.failed
    );

    if skip_reconcile {
        println!("  Reconcile skipped");
    } else {
        let report = AppError::from_outcome(engine.reconcile())?;
        println!(
            "  Reconcile linked {} sticker(s) and {} violation(s); {} vehicle(s) derived",
            report.stickers_linked, report.violations_linked, report.vehicles_created
        );
    }

    for plate in ["XYZ-9", "KSA-220"] {
        let check = AppError::from_outcome(engine.validate_sticker(plate))?;
        println!("  {plate}: {}", check.message);
    }

    let statistics = AppError::from_outcome(engine.get_statistics())?;
    if as_json {
        return print_json(&statistics);
    }

    println!("\nStatistics");
    println!(
        "  Violations: {} total, {} pending, {} paid, {} cancelled",
        statistics.violations.total,
        statistics.violations.pending,
        statistics.violations.paid,
        statistics.violations.cancelled
    );
    println!(
        "  Fines: {} issued, {} collected ({:.1}%)",
        statistics.violations.total_fines,
        statistics.violations.paid_fines,
        statistics.violations.collection_rate
    );
    println!(
        "  Sticker coverage: {:.1}% of vehicles",
        statistics.vehicles.sticker_coverage
    );
    if statistics.top_violators.is_empty() {
        println!("  Top violators: none linked to a sticker holder");
    } else {
        println!("  Top violators:");
        for violator in &statistics.top_violators {
            println!(
                "    {} ({}): {} violation(s)",
                violator.owner_name, violator.national_id, violator.violations
            );
        }
    }

    Ok(())
}
