use std::io::Write;

use serde::Serialize;

use super::domain::Vehicle;

/// Flat CSV shape of a vehicle; headers match what `import_csv` reads back.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VehicleCsvRow<'a> {
    id: &'a str,
    plate_number: &'a str,
    make: &'a str,
    model: &'a str,
    year: Option<u16>,
    color: &'a str,
    vehicle_type: &'a str,
    owner_name: &'a str,
    owner_type: &'static str,
    national_id: &'a str,
    mobile: &'a str,
    email: &'a str,
    department: &'a str,
    college: &'a str,
    sticker_number: &'a str,
    status: &'static str,
    violations_count: u32,
    entries_count: u32,
    notes: &'a str,
    created_at: String,
}

impl<'a> From<&'a Vehicle> for VehicleCsvRow<'a> {
    fn from(vehicle: &'a Vehicle) -> Self {
        Self {
            id: &vehicle.id,
            plate_number: &vehicle.plate_number,
            make: &vehicle.make,
            model: &vehicle.model,
            year: vehicle.year,
            color: &vehicle.color,
            vehicle_type: &vehicle.vehicle_type,
            owner_name: &vehicle.owner_name,
            owner_type: vehicle.owner_category.label(),
            national_id: &vehicle.national_id,
            mobile: &vehicle.mobile,
            email: &vehicle.email,
            department: &vehicle.department,
            college: &vehicle.college,
            sticker_number: &vehicle.sticker_number,
            status: vehicle.status.label(),
            violations_count: vehicle.violations_count,
            entries_count: vehicle.entries_count,
            notes: &vehicle.notes,
            created_at: vehicle.created_at.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Write one header row plus one row per vehicle.
pub(crate) fn write_vehicle_rows<W: Write>(
    writer: W,
    vehicles: &[Vehicle],
) -> Result<usize, csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if vehicles.is_empty() {
        csv_writer.write_record(HEADERS)?;
    }
    for vehicle in vehicles {
        csv_writer.serialize(VehicleCsvRow::from(vehicle))?;
    }
    csv_writer.flush()?;
    Ok(vehicles.len())
}

const HEADERS: [&str; 20] = [
    "id",
    "plateNumber",
    "make",
    "model",
    "year",
    "color",
    "vehicleType",
    "ownerName",
    "ownerType",
    "nationalId",
    "mobile",
    "email",
    "department",
    "college",
    "stickerNumber",
    "status",
    "violationsCount",
    "entriesCount",
    "notes",
    "createdAt",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::import::parse_vehicle_rows;
    use crate::tests::common::vehicle;

    #[test]
    fn exported_rows_read_back_through_the_importer() {
        let mut suspended = vehicle("XYZ 9");
        suspended.owner_name = "Omar, Jr.".to_string();
        suspended.status = crate::registry::VehicleStatus::Suspended;
        let vehicles = vec![vehicle("ABC-1"), suspended];

        let mut buffer = Vec::new();
        let written = write_vehicle_rows(&mut buffer, &vehicles).expect("csv written");
        assert_eq!(written, 2);

        let text = String::from_utf8(buffer.clone()).expect("utf-8");
        assert!(text.starts_with(&HEADERS.join(",")));
        assert!(text.contains("\"Omar, Jr.\""));
        assert!(text.contains(",suspended,"));

        let rows = parse_vehicle_rows(buffer.as_slice()).expect("header parses");
        let plates: Vec<_> = rows
            .iter()
            .map(|row| row.vehicle.as_ref().expect("row parses").plate_number.clone())
            .collect();
        assert_eq!(plates, vec![Some("ABC-1".to_string()), Some("XYZ 9".to_string())]);
    }

    #[test]
    fn empty_registry_still_writes_the_header() {
        let mut buffer = Vec::new();
        assert_eq!(write_vehicle_rows(&mut buffer, &[]).expect("csv written"), 0);
        let text = String::from_utf8(buffer).expect("utf-8");
        assert_eq!(text.trim_end(), HEADERS.join(","));
    }
}
