use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::ledger::Violation;
use crate::registry::Vehicle;

/// Lifecycle of a parking sticker.
///
/// The Arabic labels used by the sticker office export are accepted on input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StickerStatus {
    #[default]
    #[serde(alias = "فعال")]
    Active,
    #[serde(alias = "غير فعال")]
    Inactive,
    #[serde(alias = "ملغي")]
    Cancelled,
    #[serde(alias = "مخالف")]
    Violated,
}

impl StickerStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Cancelled => "cancelled",
            Self::Violated => "violated",
        }
    }
}

/// Vehicle ids matched to a sticker by the last reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerLink {
    #[serde(default)]
    pub vehicles: Vec<String>,
    #[serde(default)]
    pub has_vehicle: bool,
}

/// Persisted sticker document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sticker {
    #[serde(alias = "رقم الهوية", deserialize_with = "text")]
    pub national_id: String,
    #[serde(
        default,
        alias = "رقم الملصق",
        deserialize_with = "optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub sticker_number: Option<String>,
    #[serde(default, alias = "رقم لوحة السيارة", deserialize_with = "text")]
    pub plate_number: String,
    #[serde(default, alias = "اسم الساكن", deserialize_with = "text")]
    pub owner_name: String,
    #[serde(default, alias = "حالة")]
    pub status: StickerStatus,
    #[serde(default, alias = "المبنى", deserialize_with = "text")]
    pub building: String,
    #[serde(default, alias = "شقة", deserialize_with = "text")]
    pub unit: String,
    #[serde(default, alias = "نوع الوحدة", deserialize_with = "text")]
    pub unit_type: String,
    #[serde(default, alias = "نوع المركبة", deserialize_with = "text")]
    pub vehicle_type: String,
    #[serde(default, alias = "تاريخ الملصق", deserialize_with = "lenient_date")]
    pub issue_date: Option<NaiveDate>,
    #[serde(default, rename = "_misused")]
    pub misused: bool,
    #[serde(default, rename = "_linked", skip_serializing_if = "Option::is_none")]
    pub linked: Option<StickerLink>,
}

impl Sticker {
    /// The office issues sticker numbers from the owner's national ID.
    pub fn number(&self) -> &str {
        self.sticker_number
            .as_deref()
            .filter(|number| !number.trim().is_empty())
            .unwrap_or(&self.national_id)
    }

    pub fn is_active(&self) -> bool {
        self.status == StickerStatus::Active
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    DeliveredNotActivated,
    Activated,
}

impl DeliveryStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::DeliveredNotActivated => "delivered_not_activated",
            Self::Activated => "activated",
        }
    }
}

/// Physical hand-over of a sticker, tracked until the sticker is activated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerDelivery {
    pub id: String,
    pub sticker_number: String,
    #[serde(default)]
    pub resident_name: String,
    #[serde(default)]
    pub plate_number: String,
    pub delivery_date: NaiveDate,
    #[serde(default)]
    pub delivered_by: String,
    #[serde(default)]
    pub building: String,
    #[serde(default)]
    pub apartment: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub status: DeliveryStatus,
    #[serde(default)]
    pub activation_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewDelivery {
    #[serde(alias = "رقم الهوية", deserialize_with = "optional_text")]
    pub sticker_number: Option<String>,
    #[serde(alias = "اسم الساكن", deserialize_with = "text")]
    pub resident_name: String,
    #[serde(alias = "رقم لوحة السيارة", deserialize_with = "text")]
    pub plate_number: String,
    pub delivery_date: Option<NaiveDate>,
    pub delivered_by: Option<String>,
    #[serde(alias = "المبنى", deserialize_with = "text")]
    pub building: String,
    #[serde(alias = "شقة", deserialize_with = "text")]
    pub apartment: String,
    pub notes: String,
}

/// Investigation stage of a misuse report; moves forward only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MisuseStatus {
    #[default]
    Reported,
    Confirmed,
    Resolved,
}

impl MisuseStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Reported => "reported",
            Self::Confirmed => "confirmed",
            Self::Resolved => "resolved",
        }
    }
}

/// A sticker seen on a vehicle other than the one it was issued for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MisuseReport {
    pub id: String,
    pub sticker_number: String,
    #[serde(default)]
    pub original_owner: String,
    #[serde(default)]
    pub registered_plate: String,
    #[serde(default)]
    pub actual_plate: String,
    #[serde(default)]
    pub misuse_type: String,
    pub detected_date: NaiveDate,
    #[serde(default)]
    pub detected_by: String,
    #[serde(default)]
    pub actual_user: String,
    #[serde(default)]
    pub relation_to_owner: String,
    #[serde(default)]
    pub status: MisuseStatus,
    #[serde(default)]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub resolution_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewMisuseReport {
    #[serde(alias = "رقم الهوية", deserialize_with = "optional_text")]
    pub sticker_number: Option<String>,
    #[serde(alias = "اسم الساكن", deserialize_with = "text")]
    pub original_owner: String,
    #[serde(alias = "رقم لوحة السيارة المسجلة", deserialize_with = "text")]
    pub registered_plate: String,
    #[serde(alias = "رقم اللوحة الفعلية", deserialize_with = "text")]
    pub actual_plate: String,
    pub misuse_type: Option<String>,
    pub detected_date: Option<NaiveDate>,
    pub detected_by: Option<String>,
    pub actual_user: Option<String>,
    pub relation_to_owner: Option<String>,
    pub notes: String,
}

/// Everything known about one plate across the three collections.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateLookup {
    pub vehicle: Option<Vehicle>,
    pub sticker: Option<Sticker>,
    pub violations: Vec<Violation>,
    pub has_sticker: bool,
    pub sticker_status: Option<StickerStatus>,
    pub violations_count: usize,
    pub owner_name: Option<String>,
    pub building: Option<String>,
}

/// Everything held by one sticker owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerLookup {
    pub national_id: String,
    pub owner_name: Option<String>,
    pub stickers: Vec<Sticker>,
    pub vehicles: Vec<Vehicle>,
    pub violations: Vec<Violation>,
    pub stickers_count: usize,
    pub active_stickers_count: usize,
    pub cancelled_stickers_count: usize,
    pub violations_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StickerCheck {
    NoSticker,
    Cancelled,
    Valid,
}

impl StickerCheck {
    pub const fn message(self) -> &'static str {
        match self {
            Self::NoSticker => "no sticker is registered for this plate",
            Self::Cancelled => "the sticker for this plate has been cancelled",
            Self::Valid => "the sticker is valid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerValidation {
    pub valid: bool,
    pub status: StickerCheck,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticker: Option<Sticker>,
}

impl StickerValidation {
    pub(crate) fn new(status: StickerCheck, sticker: Option<Sticker>) -> Self {
        Self {
            valid: status == StickerCheck::Valid,
            status,
            message: status.message(),
            sticker,
        }
    }
}

/// Summary of one reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub stickers: usize,
    pub stickers_linked: usize,
    pub vehicles_created: usize,
    pub violations: usize,
    pub violations_linked: usize,
}

/// Accepts strings, numbers, or null; spreadsheet exports mix all three.
fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_text(deserializer)?.unwrap_or_default())
}

fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let text = match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.trim().to_string()),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected text, found {other}"
            )))
        }
    };
    Ok(text.filter(|text| !text.is_empty()))
}

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y"];

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = optional_text(deserializer)? else {
        return Ok(None);
    };
    if let Ok(moment) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(moment.date_naive()));
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&raw, format).ok())
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized date '{raw}'")))
}
