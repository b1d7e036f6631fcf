use serde::{Deserialize, Serialize};

use super::domain::Violation;
use crate::store::{load_typed, save_typed, Collection, DocumentStore, StoreError};

/// Persisted monotonic counter keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Counter {
    pub(crate) key: String,
    pub(crate) value: u64,
}

fn counter_key(year: i32) -> String {
    format!("violationNumber:{year}")
}

fn number_prefix(year: i32) -> String {
    format!("V-{year}-")
}

/// Highest sequence already issued for `year` among stored violations.
fn highest_issued(violations: &[Violation], year: i32) -> u64 {
    let prefix = number_prefix(year);
    violations
        .iter()
        .filter_map(|violation| violation.violation_number.strip_prefix(prefix.as_str()))
        .filter_map(|sequence| sequence.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}

/// Reserve the next `V-{year}-{seq:06}` number and persist the counter.
///
/// The counter never moves backwards: deleting violations leaves gaps, and a
/// missing or stale counter is lifted to the highest number already on file.
pub(crate) fn next_violation_number<S>(
    store: &S,
    year: i32,
    violations: &[Violation],
) -> Result<String, StoreError>
where
    S: DocumentStore + ?Sized,
{
    let mut counters: Vec<Counter> = load_typed(store, Collection::Counters)?;
    let key = counter_key(year);
    let floor = highest_issued(violations, year);

    let next = match counters.iter_mut().find(|counter| counter.key == key) {
        Some(counter) => {
            counter.value = counter.value.max(floor) + 1;
            counter.value
        }
        None => {
            counters.push(Counter {
                key,
                value: floor + 1,
            });
            floor + 1
        }
    };

    save_typed(store, Collection::Counters, &counters)?;
    Ok(format!("{}{next:06}", number_prefix(year)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::tests::common::violation_for;

    #[test]
    fn numbers_increase_per_year() {
        let store = MemoryStore::new();
        assert_eq!(
            next_violation_number(&store, 2026, &[]).expect("store ok"),
            "V-2026-000001"
        );
        assert_eq!(
            next_violation_number(&store, 2026, &[]).expect("store ok"),
            "V-2026-000002"
        );
        assert_eq!(
            next_violation_number(&store, 2027, &[]).expect("store ok"),
            "V-2027-000001"
        );
    }

    #[test]
    fn missing_counter_is_seeded_from_existing_numbers() {
        let store = MemoryStore::new();
        let mut existing = violation_for("ABC-1");
        existing.violation_number = "V-2026-000041".to_string();
        let mut older = violation_for("ABC-1");
        older.violation_number = "V-2025-000900".to_string();

        let number =
            next_violation_number(&store, 2026, &[existing, older]).expect("store ok");
        assert_eq!(number, "V-2026-000042");
    }

    #[test]
    fn counter_does_not_reuse_numbers_after_deletes() {
        let store = MemoryStore::new();
        let first = next_violation_number(&store, 2026, &[]).expect("store ok");
        assert_eq!(first, "V-2026-000001");

        // the violation holding the first number has since been deleted
        let second = next_violation_number(&store, 2026, &[]).expect("store ok");
        assert_eq!(second, "V-2026-000002");
    }
}
