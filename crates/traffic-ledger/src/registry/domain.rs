use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who the vehicle belongs to on the property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerCategory {
    #[default]
    Student,
    Staff,
    Faculty,
    Visitor,
}

impl OwnerCategory {
    pub const fn ordered() -> [Self; 4] {
        [Self::Student, Self::Staff, Self::Faculty, Self::Visitor]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Staff => "staff",
            Self::Faculty => "faculty",
            Self::Visitor => "visitor",
        }
    }

    /// Accepts the English label or the Arabic export label.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "student" | "طالب" => Some(Self::Student),
            "staff" | "employee" | "موظف" => Some(Self::Staff),
            "faculty" | "عضو هيئة تدريس" => Some(Self::Faculty),
            "visitor" | "زائر" => Some(Self::Visitor),
            _ => None,
        }
    }
}

/// Risk and administrative status of a vehicle.
///
/// `Active`, `Warning`, and `Danger` are derived from violation history.
/// `Suspended` is only ever set by an administrator and survives recomputes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    #[default]
    Active,
    Warning,
    Danger,
    Suspended,
    Expired,
}

impl VehicleStatus {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Active,
            Self::Warning,
            Self::Danger,
            Self::Suspended,
            Self::Expired,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Warning => "warning",
            Self::Danger => "danger",
            Self::Suspended => "suspended",
            Self::Expired => "expired",
        }
    }
}

/// How a vehicle record entered the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleSource {
    #[default]
    #[serde(rename = "manual")]
    Manual,
    #[serde(rename = "import")]
    Import,
    #[serde(rename = "sticker-derived")]
    StickerDerived,
    #[serde(rename = "recognition")]
    Recognition,
}

impl VehicleSource {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Import => "import",
            Self::StickerDerived => "sticker-derived",
            Self::Recognition => "recognition",
        }
    }
}

/// Most recent gate passage recorded for a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateEntry {
    pub timestamp: DateTime<Utc>,
    pub gate: String,
    pub camera: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recognition_data: Option<Value>,
}

/// Photo attached to a vehicle record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleImage {
    pub id: String,
    pub url: String,
    #[serde(rename = "type")]
    pub image_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Input accepted by `VehicleRegistry::add_image`; the type defaults to `general`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewVehicleImage {
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub image_type: Option<String>,
}

/// Persisted vehicle document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
    pub plate_number: String,
    #[serde(default)]
    pub make: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub year: Option<u16>,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub vehicle_type: String,
    #[serde(default)]
    pub owner_name: String,
    #[serde(default, rename = "ownerType")]
    pub owner_category: OwnerCategory,
    #[serde(default)]
    pub national_id: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub university_id: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub college: String,
    #[serde(default)]
    pub building: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub sticker_number: String,
    #[serde(default)]
    pub sticker_issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub sticker_expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: VehicleStatus,
    #[serde(default)]
    pub suspension_reason: Option<String>,
    #[serde(default)]
    pub suspended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reactivated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub violations_count: u32,
    #[serde(default)]
    pub last_violation_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entries_count: u32,
    #[serde(default)]
    pub last_entry: Option<GateEntry>,
    #[serde(default)]
    pub images: Vec<VehicleImage>,
    #[serde(default)]
    pub source: VehicleSource,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
}

impl Vehicle {
    pub fn has_sticker(&self) -> bool {
        !self.sticker_number.trim().is_empty()
    }

    pub fn is_suspended(&self) -> bool {
        self.status == VehicleStatus::Suspended
    }
}

/// Input accepted by `VehicleRegistry::add`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewVehicle {
    pub plate_number: Option<String>,
    pub make: String,
    pub model: String,
    pub year: Option<u16>,
    pub color: String,
    pub vehicle_type: String,
    pub owner_name: String,
    #[serde(rename = "ownerType")]
    pub owner_category: OwnerCategory,
    pub national_id: String,
    pub mobile: String,
    pub email: String,
    pub university_id: String,
    pub department: String,
    pub college: String,
    pub building: String,
    pub unit: String,
    pub sticker_number: String,
    pub sticker_issue_date: Option<NaiveDate>,
    pub sticker_expiry_date: Option<NaiveDate>,
    pub notes: String,
    pub created_by: Option<String>,
    #[serde(skip)]
    pub source: VehicleSource,
}

impl NewVehicle {
    pub fn with_plate(plate_number: impl Into<String>) -> Self {
        Self {
            plate_number: Some(plate_number.into()),
            ..Self::default()
        }
    }
}

/// Field-wise merge applied by `VehicleRegistry::update`; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VehiclePatch {
    pub plate_number: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<u16>,
    pub color: Option<String>,
    pub vehicle_type: Option<String>,
    pub owner_name: Option<String>,
    #[serde(rename = "ownerType")]
    pub owner_category: Option<OwnerCategory>,
    pub national_id: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub college: Option<String>,
    pub sticker_number: Option<String>,
    pub sticker_issue_date: Option<NaiveDate>,
    pub sticker_expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl VehiclePatch {
    pub(crate) fn apply(self, vehicle: &mut Vehicle) {
        fn merge<T>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }

        merge(&mut vehicle.plate_number, self.plate_number);
        merge(&mut vehicle.make, self.make);
        merge(&mut vehicle.model, self.model);
        if self.year.is_some() {
            vehicle.year = self.year;
        }
        merge(&mut vehicle.color, self.color);
        merge(&mut vehicle.vehicle_type, self.vehicle_type);
        merge(&mut vehicle.owner_name, self.owner_name);
        merge(&mut vehicle.owner_category, self.owner_category);
        merge(&mut vehicle.national_id, self.national_id);
        merge(&mut vehicle.mobile, self.mobile);
        merge(&mut vehicle.email, self.email);
        merge(&mut vehicle.department, self.department);
        merge(&mut vehicle.college, self.college);
        merge(&mut vehicle.sticker_number, self.sticker_number);
        if self.sticker_issue_date.is_some() {
            vehicle.sticker_issue_date = self.sticker_issue_date;
        }
        if self.sticker_expiry_date.is_some() {
            vehicle.sticker_expiry_date = self.sticker_expiry_date;
        }
        merge(&mut vehicle.notes, self.notes);
    }
}

/// Gate passage details supplied by `record_entry`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GateInfo {
    pub gate: Option<String>,
    pub camera: Option<String>,
    pub image: Option<String>,
    pub recognition_data: Option<Value>,
}

/// Filters for `VehicleRegistry::search`; every populated field must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VehicleSearch {
    pub plate_number: Option<String>,
    pub owner_name: Option<String>,
    #[serde(rename = "ownerType")]
    pub owner_category: Option<OwnerCategory>,
    pub department: Option<String>,
    pub college: Option<String>,
    pub vehicle_type: Option<String>,
    pub status: Option<VehicleStatus>,
}
