//! Natural keys and record identifiers shared by every collection.

use uuid::Uuid;

/// Identity recorded when no authenticated actor is supplied.
pub const SYSTEM_ACTOR: &str = "system";

/// Collision-resistant record id with a readable collection prefix.
pub fn record_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// Canonical form used for every plate join: whitespace dropped, upper-cased.
pub fn normalize_plate(plate: &str) -> String {
    plate
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Treat blank strings as absent so `Some("")` never satisfies a required field.
pub(crate) fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// `count/total*100` rounded to two decimals; zero when nothing is counted.
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = count as f64 / total as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plate_normalization_ignores_spacing_and_case() {
        assert_eq!(normalize_plate(" abc 1 "), "ABC1");
        assert_eq!(normalize_plate("ABC 123"), normalize_plate("abc123"));
        assert_ne!(normalize_plate("ABC-1"), normalize_plate("ABC1"));
    }

    #[test]
    fn record_ids_are_prefixed_and_unique() {
        let first = record_id("VEH");
        let second = record_id("VEH");
        assert!(first.starts_with("VEH-"));
        assert_ne!(first, second);
    }

    #[test]
    fn percentage_rounds_and_guards_zero() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(5, 5), 100.0);
    }

    #[test]
    fn blank_values_are_not_present() {
        assert_eq!(present(Some("  ")), None);
        assert_eq!(present(Some(" A ")), Some("A"));
        assert_eq!(present(None), None);
    }
}
