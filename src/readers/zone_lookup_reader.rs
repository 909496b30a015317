use crate::error::{PipelineError, Result};
use crate::models::ZoneAttributes;
use crate::utils::constants::LOCATION_ID_COLUMN;
use csv::StringRecord;
use std::path::Path;

/// Normalize a column or property name: trimmed, spaces to `_`, lower-cased,
/// with `locationid` renamed to `location_id`.
pub fn normalize_column_name(name: &str) -> String {
    let normalized = name.trim().replace(' ', "_").to_lowercase();
    if normalized == "locationid" {
        LOCATION_ID_COLUMN.to_string()
    } else {
        normalized
    }
}

/// Reads the TLC zone lookup table (`taxi_zone_lookup.csv`).
pub struct ZoneLookupReader {
    delimiter: u8,
}

struct ColumnIndices {
    location_id: usize,
    borough: Option<usize>,
    zone: Option<usize>,
    service_zone: Option<usize>,
}

impl ZoneLookupReader {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    /// Read every zone row, in file order
    pub fn read_zones(&self, path: &Path) -> Result<Vec<ZoneAttributes>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .from_path(path)?;

        let columns = Self::locate_columns(reader.headers()?)?;
        let mut zones = Vec::new();

        for (row_number, record_result) in reader.records().enumerate() {
            let record = record_result?;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            zones.push(Self::parse_record(&record, &columns, row_number + 2)?);
        }

        Ok(zones)
    }

    fn locate_columns(headers: &StringRecord) -> Result<ColumnIndices> {
        let names: Vec<String> = headers.iter().map(normalize_column_name).collect();
        let find = |wanted: &str| names.iter().position(|name| name == wanted);

        let location_id = find(LOCATION_ID_COLUMN).ok_or_else(|| {
            PipelineError::InvalidFormat(format!(
                "Zone lookup has no '{}' column (found: {})",
                LOCATION_ID_COLUMN,
                names.join(", ")
            ))
        })?;

        Ok(ColumnIndices {
            location_id,
            borough: find("borough"),
            zone: find("zone"),
            service_zone: find("service_zone"),
        })
    }

    fn parse_record(record: &StringRecord, columns: &ColumnIndices, line: usize) -> Result<ZoneAttributes> {
        let raw_id = record.get(columns.location_id).unwrap_or("").trim();
        let location_id = raw_id.parse::<i64>().map_err(|_| {
            PipelineError::InvalidFormat(format!(
                "Invalid location id '{}' on line {}",
                raw_id, line
            ))
        })?;

        let text = |index: Option<usize>| {
            index
                .and_then(|i| record.get(i))
                .map(|value| value.trim().to_string())
                .unwrap_or_default()
        };

        Ok(ZoneAttributes {
            location_id,
            borough: text(columns.borough),
            zone: text(columns.zone),
            service_zone: text(columns.service_zone),
        })
    }
}

impl Default for ZoneLookupReader {
    fn default() -> Self {
        Self::new()
    }
}
