//! Read-side aggregation over every collection, recomputed on each call.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::keys::{normalize_plate, percentage};
use crate::ledger::{taxonomy, Severity, Violation, ViolationStatus};
use crate::linkage::index::preferred_by_plate;
use crate::linkage::{
    DeliveryStatus, MisuseReport, MisuseStatus, Sticker, StickerDelivery, StickerStatus,
};
use crate::registry::{OwnerCategory, Vehicle, VehicleStatus};

/// Default length of the top-violators list.
pub const DEFAULT_TOP_VIOLATORS: usize = 10;

/// Borrowed view of the collections an aggregate is computed from.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub stickers: &'a [Sticker],
    pub vehicles: &'a [Vehicle],
    pub violations: &'a [Violation],
    pub deliveries: &'a [StickerDelivery],
    pub misuse_reports: &'a [MisuseReport],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub stickers: StickerStats,
    pub vehicles: VehicleStats,
    pub violations: ViolationStats,
    pub delivery_tracking: DeliveryStats,
    pub misuse_tracking: MisuseStats,
    pub top_violators: Vec<TopViolator>,
    pub data_links: DataLinkStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub cancelled: usize,
    pub violated: usize,
    pub misused: usize,
    pub active_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleStats {
    pub total: usize,
    pub with_stickers: usize,
    pub without_stickers: usize,
    pub sticker_coverage: f64,
    pub by_status: Vec<LabelCount>,
    pub by_owner_type: Vec<LabelCount>,
    pub total_entries: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationStats {
    pub total: usize,
    pub with_stickers: usize,
    pub without_stickers: usize,
    pub sticker_coverage: f64,
    pub pending: usize,
    pub paid: usize,
    pub appealed: usize,
    pub cancelled: usize,
    pub total_fines: u64,
    pub paid_fines: u64,
    pub pending_fines: u64,
    pub collection_rate: f64,
    pub by_severity: Vec<LabelCount>,
    pub by_type: Vec<TypeCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeCount {
    pub violation_type: String,
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryStats {
    pub total_deliveries: usize,
    pub delivered_not_activated: usize,
    pub activated: usize,
    pub activation_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MisuseStats {
    pub total: usize,
    pub reported: usize,
    pub confirmed: usize,
    pub resolved: usize,
    pub pending: usize,
    pub resolution_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopViolator {
    pub national_id: String,
    pub owner_name: String,
    pub violations: usize,
    pub first_violation: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataLinkStats {
    pub stickers_linked_to_vehicles: usize,
    pub violations_linked_to_stickers: usize,
    pub data_integrity: f64,
}

/// Compute every aggregate from one snapshot.
pub fn aggregate(snapshot: &Snapshot<'_>, top_violators: usize) -> Statistics {
    let preferred = preferred_by_plate(snapshot.stickers);
    let sticker_for = |violation: &Violation| {
        preferred
            .get(&normalize_plate(&violation.plate_number))
            .copied()
    };

    let violations_with_stickers = snapshot
        .violations
        .iter()
        .filter(|violation| sticker_for(violation).is_some())
        .count();

    Statistics {
        stickers: sticker_stats(snapshot.stickers),
        vehicles: vehicle_stats(snapshot.vehicles),
        violations: violation_stats(snapshot.violations, violations_with_stickers),
        delivery_tracking: delivery_stats(snapshot.deliveries),
        misuse_tracking: misuse_stats(snapshot.misuse_reports),
        top_violators: rank_violators(snapshot.violations, sticker_for, top_violators),
        data_links: data_link_stats(snapshot),
    }
}

fn sticker_stats(stickers: &[Sticker]) -> StickerStats {
    let count = |status: StickerStatus| stickers.iter().filter(|s| s.status == status).count();
    let active = count(StickerStatus::Active);
    StickerStats {
        total: stickers.len(),
        active,
        inactive: count(StickerStatus::Inactive),
        cancelled: count(StickerStatus::Cancelled),
        violated: count(StickerStatus::Violated),
        misused: stickers.iter().filter(|sticker| sticker.misused).count(),
        active_percentage: percentage(active, stickers.len()),
    }
}

fn vehicle_stats(vehicles: &[Vehicle]) -> VehicleStats {
    let with_stickers = vehicles.iter().filter(|vehicle| vehicle.has_sticker()).count();
    let by_status = VehicleStatus::ordered()
        .into_iter()
        .map(|status| LabelCount {
            label: status.label(),
            count: vehicles
                .iter()
                .filter(|vehicle| vehicle.status == status)
                .count(),
        })
        .collect();
    let by_owner_type = OwnerCategory::ordered()
        .into_iter()
        .map(|category| LabelCount {
            label: category.label(),
            count: vehicles
                .iter()
                .filter(|vehicle| vehicle.owner_category == category)
                .count(),
        })
        .collect();

    VehicleStats {
        total: vehicles.len(),
        with_stickers,
        without_stickers: vehicles.len() - with_stickers,
        sticker_coverage: percentage(with_stickers, vehicles.len()),
        by_status,
        by_owner_type,
        total_entries: vehicles
            .iter()
            .map(|vehicle| u64::from(vehicle.entries_count))
            .sum(),
    }
}

fn violation_stats(violations: &[Violation], with_stickers: usize) -> ViolationStats {
    let total = violations.len();
    let count = |status: ViolationStatus| {
        violations
            .iter()
            .filter(|violation| violation.status == status)
            .count()
    };
    let fines = |status: Option<ViolationStatus>| -> u64 {
        violations
            .iter()
            .filter(|violation| status.map_or(true, |status| violation.status == status))
            .map(|violation| u64::from(violation.fine))
            .sum()
    };
    let paid = count(ViolationStatus::Paid);

    let by_severity = Severity::ordered()
        .into_iter()
        .map(|severity| LabelCount {
            label: severity.label(),
            count: violations
                .iter()
                .filter(|violation| violation.severity == severity)
                .count(),
        })
        .collect();

    let mut by_type: Vec<TypeCount> = taxonomy::all()
        .iter()
        .map(|kind| TypeCount {
            violation_type: kind.key.to_string(),
            name: kind.name.to_string(),
            count: violations
                .iter()
                .filter(|violation| violation.violation_type == kind.key)
                .count(),
        })
        .filter(|entry| entry.count > 0)
        .collect();
    // stable sort keeps taxonomy order among equal counts
    by_type.sort_by(|left, right| right.count.cmp(&left.count));

    ViolationStats {
        total,
        with_stickers,
        without_stickers: total - with_stickers,
        sticker_coverage: percentage(with_stickers, total),
        pending: count(ViolationStatus::Pending),
        paid,
        appealed: count(ViolationStatus::Appealed),
        cancelled: count(ViolationStatus::Cancelled),
        total_fines: fines(None),
        paid_fines: fines(Some(ViolationStatus::Paid)),
        pending_fines: fines(Some(ViolationStatus::Pending)),
        collection_rate: percentage(paid, total),
        by_severity,
        by_type,
    }
}

fn delivery_stats(deliveries: &[StickerDelivery]) -> DeliveryStats {
    let activated = deliveries
        .iter()
        .filter(|delivery| delivery.status == DeliveryStatus::Activated)
        .count();
    DeliveryStats {
        total_deliveries: deliveries.len(),
        delivered_not_activated: deliveries.len() - activated,
        activated,
        activation_rate: percentage(activated, deliveries.len()),
    }
}

fn misuse_stats(reports: &[MisuseReport]) -> MisuseStats {
    let count = |status: MisuseStatus| reports.iter().filter(|r| r.status == status).count();
    let reported = count(MisuseStatus::Reported);
    let confirmed = count(MisuseStatus::Confirmed);
    let resolved = count(MisuseStatus::Resolved);
    MisuseStats {
        total: reports.len(),
        reported,
        confirmed,
        resolved,
        pending: reported + confirmed,
        resolution_rate: percentage(resolved, reports.len()),
    }
}

struct OwnerTally<'a> {
    owner_name: &'a str,
    violations: usize,
    first_violation: DateTime<Utc>,
}

/// Owners ranked by violation count; ties go to the earliest first violation,
/// then to the lower national ID.
fn rank_violators<'a, F>(
    violations: &'a [Violation],
    sticker_for: F,
    limit: usize,
) -> Vec<TopViolator>
where
    F: Fn(&'a Violation) -> Option<&'a Sticker>,
{
    let mut owners: HashMap<&'a str, OwnerTally<'a>> = HashMap::new();
    for violation in violations {
        let Some(sticker) = sticker_for(violation) else {
            continue;
        };
        owners
            .entry(sticker.national_id.as_str())
            .and_modify(|tally| {
                tally.violations += 1;
                tally.first_violation = tally.first_violation.min(violation.timestamp);
            })
            .or_insert(OwnerTally {
                owner_name: &sticker.owner_name,
                violations: 1,
                first_violation: violation.timestamp,
            });
    }

    let mut ranked: Vec<(&str, OwnerTally<'_>)> = owners.into_iter().collect();
    ranked.sort_by(|(left_id, left), (right_id, right)| {
        right
            .violations
            .cmp(&left.violations)
            .then(left.first_violation.cmp(&right.first_violation))
            .then(left_id.cmp(right_id))
    });

    ranked
        .into_iter()
        .take(limit)
        .map(|(national_id, tally)| TopViolator {
            national_id: national_id.to_string(),
            owner_name: tally.owner_name.to_string(),
            violations: tally.violations,
            first_violation: tally.first_violation,
        })
        .collect()
}

fn data_link_stats(snapshot: &Snapshot<'_>) -> DataLinkStats {
    let violations_linked = snapshot
        .violations
        .iter()
        .filter(|violation| {
            violation
                .linked
                .as_ref()
                .is_some_and(|link| link.has_sticker)
        })
        .count();
    DataLinkStats {
        stickers_linked_to_vehicles: snapshot
            .stickers
            .iter()
            .filter(|sticker| sticker.linked.as_ref().is_some_and(|link| link.has_vehicle))
            .count(),
        violations_linked_to_stickers: violations_linked,
        data_integrity: percentage(violations_linked, snapshot.violations.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ViolationLink;
    use crate::tests::common::{sticker, vehicle, violation_for};
    use chrono::{Duration, TimeZone};

    fn empty<'a>() -> Snapshot<'a> {
        Snapshot {
            stickers: &[],
            vehicles: &[],
            violations: &[],
            deliveries: &[],
            misuse_reports: &[],
        }
    }

    #[test]
    fn empty_collections_produce_zero_percentages() {
        let stats = aggregate(&empty(), DEFAULT_TOP_VIOLATORS);
        assert_eq!(stats.stickers.active_percentage, 0.0);
        assert_eq!(stats.vehicles.sticker_coverage, 0.0);
        assert_eq!(stats.violations.collection_rate, 0.0);
        assert_eq!(stats.delivery_tracking.activation_rate, 0.0);
        assert_eq!(stats.misuse_tracking.resolution_rate, 0.0);
        assert_eq!(stats.data_links.data_integrity, 0.0);
        assert!(stats.top_violators.is_empty());
    }

    #[test]
    fn violation_totals_and_collection_rate() {
        let mut violations: Vec<_> = (0..3).map(|_| violation_for("ABC-1")).collect();
        violations[0].status = ViolationStatus::Paid;
        violations[2].status = ViolationStatus::Cancelled;
        let snapshot = Snapshot {
            violations: &violations,
            ..empty()
        };

        let stats = aggregate(&snapshot, DEFAULT_TOP_VIOLATORS).violations;
        assert_eq!(stats.total, 3);
        assert_eq!(stats.paid, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.total_fines, 1500);
        assert_eq!(stats.paid_fines, 500);
        assert_eq!(stats.collection_rate, 33.33);
        assert_eq!(stats.by_type[0].violation_type, "speeding");
        assert_eq!(stats.by_type[0].count, 3);
    }

    #[test]
    fn sticker_coverage_uses_the_plate_join() {
        let stickers = vec![sticker("100", "ABC-1")];
        let mut linked = violation_for("abc-1");
        linked.linked = Some(ViolationLink {
            has_sticker: true,
            ..ViolationLink::default()
        });
        let violations = vec![linked, violation_for("XYZ-9")];
        let mut carded = vehicle("ABC-1");
        carded.sticker_number = "100".to_string();
        let vehicles = vec![carded, vehicle("XYZ-9")];
        let snapshot = Snapshot {
            stickers: &stickers,
            vehicles: &vehicles,
            violations: &violations,
            ..empty()
        };

        let stats = aggregate(&snapshot, DEFAULT_TOP_VIOLATORS);
        assert_eq!(stats.violations.with_stickers, 1);
        assert_eq!(stats.violations.sticker_coverage, 50.0);
        assert_eq!(stats.vehicles.with_stickers, 1);
        assert_eq!(stats.stickers.active_percentage, 100.0);
        assert_eq!(stats.data_links.violations_linked_to_stickers, 1);
        assert_eq!(stats.data_links.data_integrity, 50.0);
    }

    #[test]
    fn vehicle_status_breakdown_lists_every_status() {
        let mut suspended = vehicle("SUS-1");
        suspended.status = VehicleStatus::Suspended;
        let mut expired = vehicle("EXP-1");
        expired.status = VehicleStatus::Expired;
        let vehicles = vec![vehicle("ACT-1"), suspended, expired];
        let snapshot = Snapshot {
            vehicles: &vehicles,
            ..empty()
        };

        let by_status = aggregate(&snapshot, DEFAULT_TOP_VIOLATORS).vehicles.by_status;
        let labels: Vec<_> = by_status.iter().map(|entry| entry.label).collect();
        assert_eq!(
            labels,
            vec!["active", "warning", "danger", "suspended", "expired"]
        );
        let counts: Vec<_> = by_status.iter().map(|entry| entry.count).collect();
        assert_eq!(counts, vec![1, 0, 0, 1, 1]);
    }

    #[test]
    fn top_violators_break_ties_by_earliest_violation_then_id() {
        let stickers = vec![
            sticker("300", "CCC-3"),
            sticker("200", "BBB-2"),
            sticker("100", "AAA-1"),
        ];
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).single().expect("valid");
        let at = |plate: &str, minutes: i64| {
            let mut violation = violation_for(plate);
            violation.timestamp = base + Duration::minutes(minutes);
            violation
        };
        let violations = vec![
            // CCC-3 leads on count
            at("CCC-3", 50),
            at("CCC-3", 60),
            at("CCC-3", 70),
            // BBB-2 and AAA-1 tie on count and first violation
            at("BBB-2", 10),
            at("BBB-2", 40),
            at("AAA-1", 10),
            at("AAA-1", 20),
            // unmatched plates never rank
            at("ZZZ-0", 0),
        ];
        let snapshot = Snapshot {
            stickers: &stickers,
            violations: &violations,
            ..empty()
        };

        let ranked = aggregate(&snapshot, 2).top_violators;
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].national_id, "300");
        assert_eq!(ranked[0].violations, 3);
        assert_eq!(ranked[1].national_id, "100");
    }

    #[test]
    fn earlier_first_violation_wins_a_count_tie() {
        let stickers = vec![sticker("100", "AAA-1"), sticker("200", "BBB-2")];
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).single().expect("valid");
        let mut late = violation_for("AAA-1");
        late.timestamp = base + Duration::hours(2);
        let mut early = violation_for("BBB-2");
        early.timestamp = base;
        let violations = vec![late, early];
        let snapshot = Snapshot {
            stickers: &stickers,
            violations: &violations,
            ..empty()
        };

        let ranked = aggregate(&snapshot, DEFAULT_TOP_VIOLATORS).top_violators;
        assert_eq!(ranked[0].national_id, "200");
        assert_eq!(ranked[1].national_id, "100");
    }
}
