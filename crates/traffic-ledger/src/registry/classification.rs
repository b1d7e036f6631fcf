use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::domain::{Vehicle, VehicleStatus};
use crate::keys::normalize_plate;
use crate::ledger::{Violation, ViolationStatus};

const DEFAULT_WARNING_THRESHOLD: u32 = 3;
const DEFAULT_DANGER_THRESHOLD: u32 = 5;

/// Violation counts at which a vehicle escalates to warning and danger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationPolicy {
    warning_threshold: u32,
    danger_threshold: u32,
}

impl ClassificationPolicy {
    /// Falls back to the 3/5 defaults unless `0 < warning < danger`.
    pub fn new(warning_threshold: u32, danger_threshold: u32) -> Self {
        if warning_threshold > 0 && danger_threshold > warning_threshold {
            Self {
                warning_threshold,
                danger_threshold,
            }
        } else {
            Self::default()
        }
    }

    pub fn warning_threshold(&self) -> u32 {
        self.warning_threshold
    }

    pub fn danger_threshold(&self) -> u32 {
        self.danger_threshold
    }

    pub fn classify(&self, active_violations: u32) -> VehicleStatus {
        if active_violations >= self.danger_threshold {
            VehicleStatus::Danger
        } else if active_violations >= self.warning_threshold {
            VehicleStatus::Warning
        } else {
            VehicleStatus::Active
        }
    }
}

impl Default for ClassificationPolicy {
    fn default() -> Self {
        Self {
            warning_threshold: DEFAULT_WARNING_THRESHOLD,
            danger_threshold: DEFAULT_DANGER_THRESHOLD,
        }
    }
}

/// Per-plate violation summary feeding a recompute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViolationTally {
    /// Every violation recorded against the plate, whatever its status.
    pub total: u32,
    /// Violations that still count toward risk (anything but cancelled).
    pub active: u32,
    pub last_violation: Option<DateTime<Utc>>,
}

impl ViolationTally {
    fn add(&mut self, violation: &Violation) {
        self.total += 1;
        if violation.status != ViolationStatus::Cancelled {
            self.active += 1;
        }
        if self
            .last_violation
            .map_or(true, |last| violation.timestamp > last)
        {
            self.last_violation = Some(violation.timestamp);
        }
    }
}

/// Index violations by normalized plate in a single pass.
pub fn tally_by_plate(violations: &[Violation]) -> HashMap<String, ViolationTally> {
    let mut tallies: HashMap<String, ViolationTally> = HashMap::new();
    for violation in violations {
        tallies
            .entry(normalize_plate(&violation.plate_number))
            .or_default()
            .add(violation);
    }
    tallies
}

/// Refresh the cached count, last violation date, and derived status of one vehicle.
///
/// Returns `true` when any persisted field changed. A suspended vehicle keeps
/// its status; only an explicit reactivation hands it back to the classifier.
pub fn recompute_classification(
    vehicle: &mut Vehicle,
    violations: &[Violation],
    policy: &ClassificationPolicy,
) -> bool {
    let tally = tally_for(violations, &vehicle.plate_number);
    apply_tally(vehicle, &tally, policy)
}

/// Tally only the violations recorded against `plate`.
pub(crate) fn tally_for(violations: &[Violation], plate: &str) -> ViolationTally {
    let key = normalize_plate(plate);
    let mut tally = ViolationTally::default();
    for violation in violations
        .iter()
        .filter(|violation| normalize_plate(&violation.plate_number) == key)
    {
        tally.add(violation);
    }
    tally
}

pub(crate) fn apply_tally(
    vehicle: &mut Vehicle,
    tally: &ViolationTally,
    policy: &ClassificationPolicy,
) -> bool {
    let status = if vehicle.is_suspended() {
        VehicleStatus::Suspended
    } else {
        policy.classify(tally.active)
    };

    let changed = vehicle.violations_count != tally.total
        || vehicle.last_violation_date != tally.last_violation
        || vehicle.status != status;

    vehicle.violations_count = tally.total;
    vehicle.last_violation_date = tally.last_violation;
    vehicle.status = status;
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::common::{vehicle, violation_for};

    #[test]
    fn thresholds_map_counts_to_statuses() {
        let policy = ClassificationPolicy::default();
        for count in 0..=2 {
            assert_eq!(policy.classify(count), VehicleStatus::Active);
        }
        for count in 3..=4 {
            assert_eq!(policy.classify(count), VehicleStatus::Warning);
        }
        assert_eq!(policy.classify(5), VehicleStatus::Danger);
        assert_eq!(policy.classify(12), VehicleStatus::Danger);
    }

    #[test]
    fn invalid_thresholds_fall_back_to_defaults() {
        assert_eq!(
            ClassificationPolicy::new(5, 3),
            ClassificationPolicy::default()
        );
        assert_eq!(
            ClassificationPolicy::new(0, 4),
            ClassificationPolicy::default()
        );
        let custom = ClassificationPolicy::new(2, 4);
        assert_eq!(custom.warning_threshold(), 2);
        assert_eq!(custom.danger_threshold(), 4);
    }

    #[test]
    fn cancelled_violations_are_counted_but_do_not_escalate() {
        let mut car = vehicle("ABC-1");
        let mut violations: Vec<_> = (0..3).map(|_| violation_for("ABC-1")).collect();
        violations[0].status = ViolationStatus::Cancelled;

        assert!(recompute_classification(
            &mut car,
            &violations,
            &ClassificationPolicy::default()
        ));
        assert_eq!(car.violations_count, 3);
        assert_eq!(car.status, VehicleStatus::Active);
        assert!(car.last_violation_date.is_some());
    }

    #[test]
    fn suspended_vehicle_ignores_classification() {
        let mut car = vehicle("ABC-1");
        car.status = VehicleStatus::Suspended;
        let violations: Vec<_> = (0..6).map(|_| violation_for("abc-1")).collect();

        recompute_classification(&mut car, &violations, &ClassificationPolicy::default());
        assert_eq!(car.status, VehicleStatus::Suspended);
        assert_eq!(car.violations_count, 6);
    }

    #[test]
    fn other_plates_are_ignored() {
        let mut car = vehicle("ABC-1");
        let violations: Vec<_> = (0..4).map(|_| violation_for("XYZ-9")).collect();

        assert!(!recompute_classification(
            &mut car,
            &violations,
            &ClassificationPolicy::default()
        ));
        assert_eq!(car.violations_count, 0);
        assert_eq!(car.status, VehicleStatus::Active);
    }

    #[test]
    fn tally_groups_by_normalized_plate() {
        let violations = vec![
            violation_for("abc 1"),
            violation_for("ABC1"),
            violation_for("XYZ-9"),
        ];
        let tallies = tally_by_plate(&violations);
        assert_eq!(tallies["ABC1"].total, 2);
        assert_eq!(tallies["XYZ-9"].total, 1);
    }
}
