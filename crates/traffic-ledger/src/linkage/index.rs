use std::collections::HashMap;

use super::domain::Sticker;
use crate::keys::normalize_plate;
use crate::registry::Vehicle;

/// Hash indexes over the vehicle collection used by reconcile and lookups.
#[derive(Debug, Default)]
pub(crate) struct VehicleIndex {
    by_plate: HashMap<String, Vec<usize>>,
    by_sticker: HashMap<String, Vec<usize>>,
}

impl VehicleIndex {
    pub(crate) fn build(vehicles: &[Vehicle]) -> Self {
        let mut index = Self::default();
        for (position, vehicle) in vehicles.iter().enumerate() {
            index.insert(position, vehicle);
        }
        index
    }

    pub(crate) fn insert(&mut self, position: usize, vehicle: &Vehicle) {
        self.by_plate
            .entry(normalize_plate(&vehicle.plate_number))
            .or_default()
            .push(position);
        let sticker = vehicle.sticker_number.trim();
        if !sticker.is_empty() {
            self.by_sticker
                .entry(sticker.to_string())
                .or_default()
                .push(position);
        }
    }

    pub(crate) fn first_for_plate(&self, plate: &str) -> Option<usize> {
        self.by_plate
            .get(&normalize_plate(plate))
            .and_then(|positions| positions.first().copied())
    }

    /// Vehicles sharing the sticker's plate or carrying its number, in collection order.
    ///
    /// Only an explicit sticker number is matched; the national-ID fallback is
    /// shared by every sticker of one owner.
    pub(crate) fn matches(&self, sticker: &Sticker) -> Vec<usize> {
        let explicit = sticker
            .sticker_number
            .as_deref()
            .map(str::trim)
            .filter(|number| !number.is_empty());
        let mut positions: Vec<usize> = self
            .by_plate
            .get(&normalize_plate(&sticker.plate_number))
            .into_iter()
            .chain(explicit.and_then(|number| self.by_sticker.get(number)))
            .flatten()
            .copied()
            .collect();
        positions.sort_unstable();
        positions.dedup();
        positions
    }
}

/// The sticker that speaks for a plate: active beats inactive, then the latest issue.
pub(crate) fn preferred_by_plate(stickers: &[Sticker]) -> HashMap<String, &Sticker> {
    let mut preferred: HashMap<String, &Sticker> = HashMap::new();
    for sticker in stickers {
        let plate = normalize_plate(&sticker.plate_number);
        if plate.is_empty() {
            continue;
        }
        preferred
            .entry(plate)
            .and_modify(|current| {
                if outranks(sticker, current) {
                    *current = sticker;
                }
            })
            .or_insert(sticker);
    }
    preferred
}

fn outranks(candidate: &Sticker, current: &Sticker) -> bool {
    (candidate.is_active(), candidate.issue_date) > (current.is_active(), current.issue_date)
}
