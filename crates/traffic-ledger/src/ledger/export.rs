use std::io::Write;

use serde::Serialize;

use super::domain::Violation;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ViolationCsvRow<'a> {
    violation_number: &'a str,
    plate_number: &'a str,
    violation_type: &'a str,
    violation_name: &'a str,
    description: &'a str,
    fine: u32,
    points: u8,
    severity: &'static str,
    location: &'a str,
    date: String,
    time: String,
    status: &'static str,
    is_paid: bool,
    is_appealed: bool,
    recorded_by: &'a str,
}

impl<'a> From<&'a Violation> for ViolationCsvRow<'a> {
    fn from(violation: &'a Violation) -> Self {
        Self {
            violation_number: &violation.violation_number,
            plate_number: &violation.plate_number,
            violation_type: &violation.violation_type,
            violation_name: &violation.violation_name,
            description: &violation.description,
            fine: violation.fine,
            points: violation.points,
            severity: violation.severity.label(),
            location: &violation.location,
            date: violation.timestamp.format("%Y-%m-%d").to_string(),
            time: violation.timestamp.format("%H:%M:%S").to_string(),
            status: violation.status.label(),
            is_paid: violation.is_paid,
            is_appealed: violation.is_appealed,
            recorded_by: &violation.recorded_by,
        }
    }
}

const HEADERS: [&str; 15] = [
    "violationNumber",
    "plateNumber",
    "violationType",
    "violationName",
    "description",
    "fine",
    "points",
    "severity",
    "location",
    "date",
    "time",
    "status",
    "isPaid",
    "isAppealed",
    "recordedBy",
];

/// Write one header row plus one row per violation, timestamps in UTC.
pub(crate) fn write_violation_rows<W: Write>(
    writer: W,
    violations: &[Violation],
) -> Result<usize, csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if violations.is_empty() {
        csv_writer.write_record(HEADERS)?;
    }
    for violation in violations {
        csv_writer.serialize(ViolationCsvRow::from(violation))?;
    }
    csv_writer.flush()?;
    Ok(violations.len())
}
