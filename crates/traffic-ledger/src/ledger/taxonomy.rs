use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const fn ordered() -> [Self; 4] {
        [Self::Low, Self::Medium, Self::High, Self::Critical]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// One row of the fixed violation taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationKind {
    pub key: &'static str,
    pub name: &'static str,
    pub name_en: &'static str,
    pub fine: u32,
    pub points: u8,
    pub severity: Severity,
}

pub const FALLBACK_KIND: &str = "other";

const TAXONOMY: [ViolationKind; 12] = [
    ViolationKind {
        key: "speeding",
        name: "تجاوز السرعة المحددة",
        name_en: "Speeding",
        fine: 500,
        points: 2,
        severity: Severity::Medium,
    },
    ViolationKind {
        key: "wrong_parking",
        name: "الوقوف في مكان غير مصرح",
        name_en: "Wrong Parking",
        fine: 150,
        points: 1,
        severity: Severity::Low,
    },
    ViolationKind {
        key: "no_sticker",
        name: "عدم وجود ملصق",
        name_en: "No Sticker",
        fine: 300,
        points: 2,
        severity: Severity::Medium,
    },
    ViolationKind {
        key: "expired_sticker",
        name: "ملصق منتهي الصلاحية",
        name_en: "Expired Sticker",
        fine: 200,
        points: 1,
        severity: Severity::Low,
    },
    ViolationKind {
        key: "restricted_area",
        name: "دخول منطقة محظورة",
        name_en: "Restricted Area Entry",
        fine: 400,
        points: 3,
        severity: Severity::High,
    },
    ViolationKind {
        key: "reckless_driving",
        name: "قيادة متهورة",
        name_en: "Reckless Driving",
        fine: 1000,
        points: 4,
        severity: Severity::High,
    },
    ViolationKind {
        key: "wrong_direction",
        name: "السير عكس الاتجاه",
        name_en: "Wrong Direction",
        fine: 600,
        points: 3,
        severity: Severity::High,
    },
    ViolationKind {
        key: "blocking_traffic",
        name: "إعاقة حركة المرور",
        name_en: "Blocking Traffic",
        fine: 300,
        points: 2,
        severity: Severity::Medium,
    },
    ViolationKind {
        key: "pedestrian_area",
        name: "دخول منطقة مشاة",
        name_en: "Pedestrian Area Entry",
        fine: 250,
        points: 2,
        severity: Severity::Medium,
    },
    ViolationKind {
        key: "no_license",
        name: "عدم وجود رخصة قيادة",
        name_en: "No License",
        fine: 1500,
        points: 6,
        severity: Severity::Critical,
    },
    ViolationKind {
        key: "unauthorized_vehicle",
        name: "مركبة غير مصرح لها",
        name_en: "Unauthorized Vehicle",
        fine: 500,
        points: 3,
        severity: Severity::High,
    },
    ViolationKind {
        key: FALLBACK_KIND,
        name: "مخالفة أخرى",
        name_en: "Other Violation",
        fine: 200,
        points: 1,
        severity: Severity::Low,
    },
];

pub fn all() -> &'static [ViolationKind] {
    &TAXONOMY
}

/// Exact lookup; `None` for keys outside the taxonomy.
pub fn find(key: &str) -> Option<&'static ViolationKind> {
    TAXONOMY.iter().find(|kind| kind.key == key)
}

/// Lookup that falls back to the generic `other` entry.
pub fn resolve(key: &str) -> &'static ViolationKind {
    find(key.trim()).unwrap_or(&TAXONOMY[TAXONOMY.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_types_resolve_to_their_entry() {
        let speeding = resolve("speeding");
        assert_eq!(speeding.fine, 500);
        assert_eq!(speeding.points, 2);
        assert_eq!(speeding.severity, Severity::Medium);

        let no_license = resolve("no_license");
        assert_eq!(no_license.severity, Severity::Critical);
    }

    #[test]
    fn unknown_types_fall_back_to_other() {
        let fallback = resolve("double_parking_on_lawn");
        assert_eq!(fallback.key, FALLBACK_KIND);
        assert_eq!(fallback.fine, 200);
        assert_eq!(fallback.points, 1);
        assert_eq!(fallback.severity, Severity::Low);
        assert!(find("double_parking_on_lawn").is_none());
    }

    #[test]
    fn keys_are_unique() {
        let mut keys: Vec<_> = all().iter().map(|kind| kind.key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), all().len());
    }
}
