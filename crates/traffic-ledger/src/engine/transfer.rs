use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::Violation;
use crate::linkage::{MisuseReport, Sticker, StickerDelivery};
use crate::registry::Vehicle;
use crate::statistics::Statistics;

/// Every linked collection, as written by an export and read back by an import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkedData {
    pub stickers: Vec<Sticker>,
    pub vehicles: Vec<Vehicle>,
    pub violations: Vec<Violation>,
    pub deliveries: Vec<StickerDelivery>,
    pub misuses: Vec<MisuseReport>,
}

/// Export envelope: the data plus the statistics computed at export time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkedDataExport {
    pub timestamp: DateTime<Utc>,
    pub summary: Statistics,
    pub data: LinkedData,
}

/// Read side of [`LinkedDataExport`]; the summary is recomputed, never trusted.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LinkedDataDocument {
    #[serde(default)]
    pub data: LinkedData,
}

/// Collection sizes written by an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub stickers: usize,
    pub vehicles: usize,
    pub violations: usize,
    pub deliveries: usize,
    pub misuses: usize,
}

impl LinkedData {
    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            stickers: self.stickers.len(),
            vehicles: self.vehicles.len(),
            violations: self.violations.len(),
            deliveries: self.deliveries.len(),
            misuses: self.misuses.len(),
        }
    }
}
