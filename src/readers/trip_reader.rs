use crate::error::{PipelineError, Result};
use crate::models::RawTrip;
use crate::utils::constants::{
    COL_DROPOFF_DATETIME, COL_DROPOFF_LOCATION, COL_PASSENGER_COUNT, COL_PAYMENT_TYPE,
    COL_PICKUP_DATETIME, COL_PICKUP_LOCATION, COL_RATE_CODE, COL_TOTAL_AMOUNT,
    COL_TRIP_DISTANCE, DEFAULT_READ_BATCH_SIZE,
};
use arrow::array::{
    Array, ArrayRef, AsArray, Float64Array, Int64Array, TimestampMicrosecondArray,
};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, TimeUnit, TimestampMicrosecondType};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ProjectionMask;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use tracing::debug;

const TRIP_COLUMNS: [&str; 9] = [
    COL_PICKUP_DATETIME,
    COL_DROPOFF_DATETIME,
    COL_PASSENGER_COUNT,
    COL_TRIP_DISTANCE,
    COL_RATE_CODE,
    COL_PICKUP_LOCATION,
    COL_DROPOFF_LOCATION,
    COL_PAYMENT_TYPE,
    COL_TOTAL_AMOUNT,
];

/// Datetime layouts seen in TLC CSV releases
const CSV_DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
];

/// Reads yellow-taxi trip records from Parquet or CSV files.
pub struct TripReader {
    batch_size: usize,
}

impl TripReader {
    pub fn new() -> Self {
        Self {
            batch_size: DEFAULT_READ_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Read every trip in the file, dispatching on the file extension
    pub fn read_trips(&self, path: &Path) -> Result<Vec<RawTrip>> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let trips = match extension.as_str() {
            "parquet" => self.read_parquet(path)?,
            "csv" => self.read_csv(path)?,
            _ => {
                return Err(PipelineError::InvalidFormat(format!(
                    "Unsupported trip file type: {}",
                    path.display()
                )))
            }
        };

        debug!(path = %path.display(), trips = trips.len(), "Read trip file");
        Ok(trips)
    }

    /// Read trips from a TLC Parquet file. Column types differ between
    /// release years (doubles vs. integers, micro vs. nanosecond timestamps),
    /// so every column is cast to one canonical type.
    pub fn read_parquet(&self, path: &Path) -> Result<Vec<RawTrip>> {
        let file = File::open(path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

        let mut indices = Vec::with_capacity(TRIP_COLUMNS.len());
        for name in TRIP_COLUMNS {
            let index = builder.schema().index_of(name).map_err(|_| {
                PipelineError::InvalidFormat(format!(
                    "Trip file {} has no '{}' column",
                    path.display(),
                    name
                ))
            })?;
            indices.push(index);
        }

        let mask = ProjectionMask::roots(builder.parquet_schema(), indices);
        let reader = builder
            .with_projection(mask)
            .with_batch_size(self.batch_size)
            .build()?;

        let mut trips = Vec::new();
        for batch_result in reader {
            let batch = batch_result?;
            trips.extend(Self::batch_to_trips(&batch)?);
        }

        Ok(trips)
    }

    /// Convert one Arrow batch to raw trips, keeping nulls as `None`
    pub fn batch_to_trips(batch: &RecordBatch) -> Result<Vec<RawTrip>> {
        let pickup = timestamp_column(batch, COL_PICKUP_DATETIME)?;
        let dropoff = timestamp_column(batch, COL_DROPOFF_DATETIME)?;
        let passengers = int_column(batch, COL_PASSENGER_COUNT)?;
        let distance = float_column(batch, COL_TRIP_DISTANCE)?;
        let rate_code = int_column(batch, COL_RATE_CODE)?;
        let pickup_location = int_column(batch, COL_PICKUP_LOCATION)?;
        let dropoff_location = int_column(batch, COL_DROPOFF_LOCATION)?;
        let payment_type = int_column(batch, COL_PAYMENT_TYPE)?;
        let total_amount = float_column(batch, COL_TOTAL_AMOUNT)?;

        let trips = (0..batch.num_rows())
            .map(|i| RawTrip {
                pickup_datetime: timestamp_at(&pickup, i),
                dropoff_datetime: timestamp_at(&dropoff, i),
                passenger_count: int_at(&passengers, i),
                trip_distance: float_at(&distance, i),
                pickup_location_id: int_at(&pickup_location, i),
                dropoff_location_id: int_at(&dropoff_location, i),
                rate_code_id: int_at(&rate_code, i),
                payment_type: int_at(&payment_type, i),
                total_amount: float_at(&total_amount, i),
            })
            .collect();

        Ok(trips)
    }

    /// Read trips from a TLC CSV export
    pub fn read_csv(&self, path: &Path) -> Result<Vec<RawTrip>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut trips = Vec::new();
        for row in reader.deserialize::<CsvTripRow>() {
            trips.push(row?.into_raw_trip());
        }

        Ok(trips)
    }
}

impl Default for TripReader {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct CsvTripRow {
    #[serde(rename = "tpep_pickup_datetime", default)]
    pickup_datetime: Option<String>,
    #[serde(rename = "tpep_dropoff_datetime", default)]
    dropoff_datetime: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    passenger_count: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    trip_distance: Option<f64>,
    #[serde(rename = "RatecodeID", default, deserialize_with = "csv::invalid_option")]
    rate_code_id: Option<f64>,
    #[serde(rename = "PULocationID", default, deserialize_with = "csv::invalid_option")]
    pickup_location_id: Option<f64>,
    #[serde(rename = "DOLocationID", default, deserialize_with = "csv::invalid_option")]
    dropoff_location_id: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    payment_type: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    total_amount: Option<f64>,
}

impl CsvTripRow {
    fn into_raw_trip(self) -> RawTrip {
        RawTrip {
            pickup_datetime: self.pickup_datetime.as_deref().and_then(parse_trip_datetime),
            dropoff_datetime: self.dropoff_datetime.as_deref().and_then(parse_trip_datetime),
            passenger_count: self.passenger_count.and_then(whole_number),
            trip_distance: self.trip_distance.filter(|d| d.is_finite()),
            pickup_location_id: self.pickup_location_id.and_then(whole_number),
            dropoff_location_id: self.dropoff_location_id.and_then(whole_number),
            rate_code_id: self.rate_code_id.and_then(whole_number),
            payment_type: self.payment_type.and_then(whole_number),
            total_amount: self.total_amount.filter(|a| a.is_finite()),
        }
    }
}

/// Parse a trip timestamp in any of the known CSV layouts
pub fn parse_trip_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    CSV_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Codes arrive as doubles in some releases (`1.0`); anything fractional is not a code
fn whole_number(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0).then_some(value as i64)
}

fn column_cast(batch: &RecordBatch, name: &str, data_type: &DataType) -> Result<ArrayRef> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| PipelineError::MissingData(format!("column '{}'", name)))?;
    Ok(cast(column, data_type)?)
}

fn float_column(batch: &RecordBatch, name: &str) -> Result<Float64Array> {
    let array = column_cast(batch, name, &DataType::Float64)?;
    Ok(array.as_primitive::<Float64Type>().clone())
}

fn int_column(batch: &RecordBatch, name: &str) -> Result<Int64Array> {
    // Go through Float64 so fractional values become nulls instead of truncating
    let floats = float_column(batch, name)?;
    Ok(floats.iter().map(|v| v.and_then(whole_number)).collect())
}

fn timestamp_column(batch: &RecordBatch, name: &str) -> Result<TimestampMicrosecondArray> {
    let array = column_cast(batch, name, &DataType::Timestamp(TimeUnit::Microsecond, None))?;
    Ok(array.as_primitive::<TimestampMicrosecondType>().clone())
}

fn float_at(array: &Float64Array, i: usize) -> Option<f64> {
    (!array.is_null(i)).then(|| array.value(i)).filter(|v| v.is_finite())
}

fn int_at(array: &Int64Array, i: usize) -> Option<i64> {
    (!array.is_null(i)).then(|| array.value(i))
}

fn timestamp_at(array: &TimestampMicrosecondArray, i: usize) -> Option<NaiveDateTime> {
    if array.is_null(i) {
        None
    } else {
        array.value_as_datetime(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int32Array, TimestampMicrosecondArray};
    use arrow::datatypes::{Field, Schema};
    use chrono::NaiveDate;
    use parquet::arrow::ArrowWriter;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2019, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn write_parquet(path: &Path) {
        // Mirrors the 2019 release: doubles for codes, int32 zone ids
        let micros = |t: NaiveDateTime| t.and_utc().timestamp_micros();
        let schema = Arc::new(Schema::new(vec![
            Field::new("VendorID", DataType::Int64, true),
            Field::new(COL_PICKUP_DATETIME, DataType::Timestamp(TimeUnit::Microsecond, None), true),
            Field::new(COL_DROPOFF_DATETIME, DataType::Timestamp(TimeUnit::Microsecond, None), true),
            Field::new(COL_PASSENGER_COUNT, DataType::Float64, true),
            Field::new(COL_TRIP_DISTANCE, DataType::Float64, true),
            Field::new(COL_RATE_CODE, DataType::Float64, true),
            Field::new(COL_PICKUP_LOCATION, DataType::Int32, true),
            Field::new(COL_DROPOFF_LOCATION, DataType::Int32, true),
            Field::new(COL_PAYMENT_TYPE, DataType::Int64, true),
            Field::new(COL_TOTAL_AMOUNT, DataType::Float64, true),
        ]));

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![Some(1), Some(2)])),
                Arc::new(TimestampMicrosecondArray::from(vec![
                    Some(micros(ts(0, 46, 40))),
                    Some(micros(ts(0, 59, 47))),
                ])),
                Arc::new(TimestampMicrosecondArray::from(vec![
                    Some(micros(ts(0, 53, 20))),
                    None,
                ])),
                Arc::new(Float64Array::from(vec![Some(1.0), None])),
                Arc::new(Float64Array::from(vec![Some(1.5), Some(2.6)])),
                Arc::new(Float64Array::from(vec![Some(1.0), Some(99.0)])),
                Arc::new(Int32Array::from(vec![Some(151), Some(239)])),
                Arc::new(Int32Array::from(vec![Some(239), Some(246)])),
                Arc::new(Int64Array::from(vec![Some(1), Some(2)])),
                Arc::new(Float64Array::from(vec![Some(9.95), Some(16.3)])),
            ],
        )
        .unwrap();

        let file = File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn test_read_parquet_casts_columns() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("yellow_tripdata_2019-01.parquet");
        write_parquet(&path);

        let trips = TripReader::new().read_trips(&path)?;

        assert_eq!(trips.len(), 2);
        assert_eq!(trips[0].pickup_datetime, Some(ts(0, 46, 40)));
        assert_eq!(trips[0].dropoff_datetime, Some(ts(0, 53, 20)));
        assert_eq!(trips[0].passenger_count, Some(1));
        assert_eq!(trips[0].rate_code_id, Some(1));
        assert_eq!(trips[0].pickup_location_id, Some(151));
        assert_eq!(trips[0].total_amount, Some(9.95));

        assert_eq!(trips[1].dropoff_datetime, None);
        assert_eq!(trips[1].passenger_count, None);
        assert_eq!(trips[1].rate_code_id, Some(99));

        Ok(())
    }

    #[test]
    fn test_read_csv() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("yellow_tripdata_2019-01.csv");
        let mut file = File::create(&path)?;
        writeln!(
            file,
            "VendorID,tpep_pickup_datetime,tpep_dropoff_datetime,passenger_count,trip_distance,RatecodeID,store_and_fwd_flag,PULocationID,DOLocationID,payment_type,fare_amount,total_amount"
        )?;
        writeln!(file, "1,2019-01-01 00:46:40,2019-01-01 00:53:20,1,1.50,1,N,151,239,1,7,9.95")?;
        writeln!(file, "2,01/01/2019 12:59:47 AM,01/01/2019 01:18:59 AM,,2.6,1.0,N,239,246,2,14,16.3")?;
        writeln!(file, "2,garbage,2019-01-01 01:00:00,1,n/a,1,N,1,2,1,5,5")?;

        let trips = TripReader::new().read_trips(&path)?;

        assert_eq!(trips.len(), 3);
        assert_eq!(trips[0].pickup_datetime, Some(ts(0, 46, 40)));
        assert_eq!(trips[0].trip_distance, Some(1.5));
        assert_eq!(trips[1].pickup_datetime, Some(ts(0, 59, 47)));
        assert_eq!(trips[1].passenger_count, None);
        assert_eq!(trips[1].rate_code_id, Some(1));
        assert_eq!(trips[2].pickup_datetime, None);
        assert_eq!(trips[2].trip_distance, None);

        Ok(())
    }

    #[test]
    fn test_unsupported_extension() {
        let result = TripReader::new().read_trips(Path::new("trips.xlsx"));
        assert!(matches!(result, Err(PipelineError::InvalidFormat(_))));
    }

    #[test]
    fn test_whole_number() {
        assert_eq!(whole_number(2.0), Some(2));
        assert_eq!(whole_number(2.5), None);
        assert_eq!(whole_number(f64::NAN), None);
    }
}
