use std::io::Read;

use serde::{Deserialize, Deserializer};

use super::domain::{NewVehicle, OwnerCategory, VehicleSource};

/// Failures that reject a CSV file as a whole rather than a single row.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("unreadable CSV header: {0}")]
    Header(#[source] csv::Error),
    #[error("CSV header has no plate number column")]
    MissingPlateColumn,
}

/// One data row of a vehicle CSV, numbered from 1 after the header.
#[derive(Debug)]
pub(crate) struct ParsedRow {
    pub(crate) line: usize,
    pub(crate) vehicle: Result<NewVehicle, String>,
}

const PLATE_HEADERS: [&str; 4] = ["plateNumber", "plate_number", "رقم اللوحة", "رقم لوحة السيارة"];

/// Read vehicle rows from a CSV export, English or Arabic headers.
///
/// Row-level problems are kept on the row so the caller can report them
/// without aborting the batch.
pub(crate) fn parse_vehicle_rows<R: Read>(reader: R) -> Result<Vec<ParsedRow>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers().map_err(ImportError::Header)?;
    if !headers
        .iter()
        .any(|header| PLATE_HEADERS.contains(&header.trim_start_matches('\u{feff}')))
    {
        return Err(ImportError::MissingPlateColumn);
    }

    let rows = csv_reader
        .deserialize::<VehicleRow>()
        .enumerate()
        .map(|(index, row)| ParsedRow {
            line: index + 1,
            vehicle: row
                .map_err(|error| error.to_string())
                .and_then(VehicleRow::into_new_vehicle),
        })
        .collect();

    Ok(rows)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct VehicleRow {
    #[serde(
        alias = "plate_number",
        alias = "رقم اللوحة",
        alias = "رقم لوحة السيارة",
        alias = "\u{feff}plateNumber",
        alias = "\u{feff}رقم اللوحة",
        deserialize_with = "empty_string_as_none"
    )]
    plate_number: Option<String>,
    #[serde(alias = "الماركة", deserialize_with = "empty_string_as_none")]
    make: Option<String>,
    #[serde(alias = "الموديل", deserialize_with = "empty_string_as_none")]
    model: Option<String>,
    #[serde(alias = "السنة", deserialize_with = "empty_string_as_none")]
    year: Option<String>,
    #[serde(alias = "اللون", deserialize_with = "empty_string_as_none")]
    color: Option<String>,
    #[serde(alias = "نوع المركبة", deserialize_with = "empty_string_as_none")]
    vehicle_type: Option<String>,
    #[serde(alias = "اسم المالك", alias = "اسم الساكن", deserialize_with = "empty_string_as_none")]
    owner_name: Option<String>,
    #[serde(alias = "نوع المالك", deserialize_with = "empty_string_as_none")]
    owner_type: Option<String>,
    #[serde(alias = "رقم الهوية", deserialize_with = "empty_string_as_none")]
    national_id: Option<String>,
    #[serde(alias = "الجوال", deserialize_with = "empty_string_as_none")]
    mobile: Option<String>,
    #[serde(alias = "البريد الإلكتروني", deserialize_with = "empty_string_as_none")]
    email: Option<String>,
    #[serde(alias = "القسم", deserialize_with = "empty_string_as_none")]
    department: Option<String>,
    #[serde(alias = "الكلية", deserialize_with = "empty_string_as_none")]
    college: Option<String>,
    #[serde(alias = "رقم الملصق", deserialize_with = "empty_string_as_none")]
    sticker_number: Option<String>,
    #[serde(alias = "ملاحظات", deserialize_with = "empty_string_as_none")]
    notes: Option<String>,
}

impl VehicleRow {
    fn into_new_vehicle(self) -> Result<NewVehicle, String> {
        let year = match self.year.as_deref() {
            Some(raw) => Some(
                raw.parse::<u16>()
                    .map_err(|_| format!("invalid year '{raw}'"))?,
            ),
            None => None,
        };
        let owner_category = match self.owner_type.as_deref() {
            Some(raw) => {
                OwnerCategory::parse(raw).ok_or_else(|| format!("unknown owner type '{raw}'"))?
            }
            None => OwnerCategory::default(),
        };

        Ok(NewVehicle {
            plate_number: self.plate_number,
            make: self.make.unwrap_or_default(),
            model: self.model.unwrap_or_default(),
            year,
            color: self.color.unwrap_or_default(),
            vehicle_type: self.vehicle_type.unwrap_or_default(),
            owner_name: self.owner_name.unwrap_or_default(),
            owner_category,
            national_id: self.national_id.unwrap_or_default(),
            mobile: self.mobile.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            department: self.department.unwrap_or_default(),
            college: self.college.unwrap_or_default(),
            sticker_number: self.sticker_number.unwrap_or_default(),
            notes: self.notes.unwrap_or_default(),
            source: VehicleSource::Import,
            ..NewVehicle::default()
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_headers_map_onto_new_vehicles() {
        let csv = "plateNumber,make,model,year,ownerName,ownerType\n\
                   ABC-1,Toyota,Camry,2021,Sara,staff\n";
        let rows = parse_vehicle_rows(csv.as_bytes()).expect("header parses");
        assert_eq!(rows.len(), 1);
        let vehicle = rows[0].vehicle.as_ref().expect("row parses");
        assert_eq!(vehicle.plate_number.as_deref(), Some("ABC-1"));
        assert_eq!(vehicle.year, Some(2021));
        assert_eq!(vehicle.owner_category, OwnerCategory::Staff);
        assert_eq!(vehicle.source, VehicleSource::Import);
    }

    #[test]
    fn arabic_export_headers_are_accepted() {
        let csv = "\u{feff}ID,رقم اللوحة,الماركة,اسم المالك,نوع المالك,رقم الهوية\n\
                   VEH-1,XYZ 9,Nissan,Omar,زائر,1010\n";
        let rows = parse_vehicle_rows(csv.as_bytes()).expect("header parses");
        let vehicle = rows[0].vehicle.as_ref().expect("row parses");
        assert_eq!(vehicle.plate_number.as_deref(), Some("XYZ 9"));
        assert_eq!(vehicle.make, "Nissan");
        assert_eq!(vehicle.owner_category, OwnerCategory::Visitor);
        assert_eq!(vehicle.national_id, "1010");
    }

    #[test]
    fn bad_rows_are_isolated() {
        let csv = "plateNumber,year\nAAA-1,20x1\nBBB-2,2020\n,2019\n";
        let rows = parse_vehicle_rows(csv.as_bytes()).expect("header parses");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].line, 1);
        assert!(rows[0]
            .vehicle
            .as_ref()
            .is_err_and(|error| error.contains("invalid year")));
        assert!(rows[1].vehicle.is_ok());
        let blank = rows[2].vehicle.as_ref().expect("blank plate still parses");
        assert!(blank.plate_number.is_none());
    }

    #[test]
    fn header_without_plate_column_is_rejected() {
        let csv = "make,model\nToyota,Camry\n";
        assert!(matches!(
            parse_vehicle_rows(csv.as_bytes()),
            Err(ImportError::MissingPlateColumn)
        ));
    }
}
