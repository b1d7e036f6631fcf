use std::sync::Arc;

use chrono::Utc;

use crate::config::LedgerSettings;
use crate::engine::TrafficEngine;
use crate::keys::{record_id, SYSTEM_ACTOR};
use crate::ledger::{Severity, Violation, ViolationStatus};
use crate::linkage::{Sticker, StickerStatus};
use crate::registry::{OwnerCategory, Vehicle, VehicleSource, VehicleStatus};
use crate::store::MemoryStore;

pub(crate) fn engine() -> TrafficEngine<MemoryStore> {
    TrafficEngine::new(Arc::new(MemoryStore::new()), &LedgerSettings::default())
}

pub(crate) fn vehicle(plate: &str) -> Vehicle {
    let now = Utc::now();
    Vehicle {
        id: record_id("VEH"),
        plate_number: plate.to_string(),
        make: "Toyota".to_string(),
        model: "Camry".to_string(),
        year: Some(2020),
        color: "white".to_string(),
        vehicle_type: "sedan".to_string(),
        owner_name: "Test Owner".to_string(),
        owner_category: OwnerCategory::Student,
        national_id: String::new(),
        mobile: String::new(),
        email: String::new(),
        university_id: String::new(),
        department: String::new(),
        college: String::new(),
        building: String::new(),
        unit: String::new(),
        sticker_number: String::new(),
        sticker_issue_date: None,
        sticker_expiry_date: None,
        status: VehicleStatus::Active,
        suspension_reason: None,
        suspended_at: None,
        reactivated_at: None,
        violations_count: 0,
        last_violation_date: None,
        entries_count: 0,
        last_entry: None,
        images: Vec::new(),
        source: VehicleSource::Manual,
        notes: String::new(),
        created_at: now,
        updated_at: now,
        created_by: SYSTEM_ACTOR.to_string(),
    }
}

/// A pending speeding violation (fine 500) on `plate`.
pub(crate) fn violation_for(plate: &str) -> Violation {
    let now = Utc::now();
    Violation {
        id: record_id("VIO"),
        violation_number: String::new(),
        plate_number: plate.to_string(),
        vehicle_id: None,
        violation_type: "speeding".to_string(),
        violation_name: "تجاوز السرعة المحددة".to_string(),
        violation_name_en: "Speeding".to_string(),
        description: String::new(),
        fine: 500,
        points: 2,
        severity: Severity::Medium,
        location: "unspecified".to_string(),
        gate: String::new(),
        camera: String::new(),
        timestamp: now,
        evidence_images: Vec::new(),
        video_url: None,
        recorded_by: SYSTEM_ACTOR.to_string(),
        officer_name: String::new(),
        is_auto_detected: false,
        recognition_data: None,
        status: ViolationStatus::Pending,
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
        notes: String::new(),
        linked: None,
        created_at: now,
        updated_at: now,
        created_by: SYSTEM_ACTOR.to_string(),
    }
}

pub(crate) fn sticker(national_id: &str, plate: &str) -> Sticker {
    Sticker {
        national_id: national_id.to_string(),
        sticker_number: None,
        plate_number: plate.to_string(),
        owner_name: format!("Resident {national_id}"),
        status: StickerStatus::Active,
        building: "12".to_string(),
        unit: "4B".to_string(),
        unit_type: String::new(),
        vehicle_type: String::new(),
        issue_date: None,
        misused: false,
        linked: None,
    }
}
