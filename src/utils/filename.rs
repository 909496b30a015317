use crate::error::{PipelineError, Result};
use crate::utils::constants::TRIP_FILE_PREFIX;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Calendar month of a TLC monthly trip file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TripMonth {
    pub year: i32,
    pub month: u32,
}

impl TripMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(PipelineError::InvalidFormat(format!(
                "Invalid month {} in {}-{:02}",
                month, year, month
            )));
        }
        Ok(Self { year, month })
    }

    pub fn from_pair((year, month): (i32, u32)) -> Result<Self> {
        Self::new(year, month)
    }

    /// `yellow_tripdata_YYYY-MM.parquet`
    pub fn trip_file_name(&self) -> String {
        format!("{}{}.parquet", TRIP_FILE_PREFIX, self)
    }
}

impl fmt::Display for TripMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for TripMonth {
    type Err = PipelineError;

    /// Parses `YYYY-MM`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || PipelineError::InvalidFormat(format!("Expected YYYY-MM, got '{}'", s));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

/// Month of a `yellow_tripdata_YYYY-MM.{parquet,csv}` file name
pub fn parse_trip_file_name(name: &str) -> Option<TripMonth> {
    let rest = name.strip_prefix(TRIP_FILE_PREFIX)?;
    let (month, extension) = rest.rsplit_once('.')?;
    match extension.to_lowercase().as_str() {
        "parquet" | "csv" => month.parse().ok(),
        _ => None,
    }
}

/// Trip files in `dir` whose month lies in `first..=last`, oldest first
pub fn discover_trip_files(dir: &Path, first: TripMonth, last: TripMonth) -> Result<Vec<(TripMonth, PathBuf)>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }

        let month = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(parse_trip_file_name);

        if let Some(month) = month {
            if (first..=last).contains(&month) {
                files.push((month, path));
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Default export path for an enriched batch: `output/{input stem}-enriched.parquet`
pub fn default_enriched_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trips".to_string());

    PathBuf::from("output").join(format!("{}-enriched.parquet", stem))
}
