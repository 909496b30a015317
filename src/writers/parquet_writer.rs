use crate::error::{PipelineError, Result};
use crate::models::{EnrichedTrip, OutputField};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_READ_BATCH_SIZE, DEFAULT_ROW_GROUP_SIZE,
};
use crate::writers::mapping::FieldType;
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Writes and reads enriched trips as Parquet, one column per output field.
pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(PipelineError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Arrow schema of the enriched output. Column names and order follow
    /// `OutputField::ALL`, so the file matches the store mapping.
    pub fn schema() -> Arc<Schema> {
        let fields: Vec<Field> = OutputField::ALL
            .iter()
            .map(|field| {
                let data_type = match field.field_type() {
                    FieldType::Date => DataType::Timestamp(TimeUnit::Microsecond, None),
                    FieldType::Integer => DataType::Int64,
                    FieldType::Float => DataType::Float64,
                    FieldType::Keyword => DataType::Utf8,
                };
                Field::new(field.name(), data_type, false)
            })
            .collect();

        Arc::new(Schema::new(fields))
    }

    /// Write enriched trips to a Parquet file
    pub fn write_trips(&self, trips: &[EnrichedTrip], path: &Path) -> Result<()> {
        self.write_trips_batched(trips, path, self.row_group_size.max(1))
    }

    /// Write trips in batches for memory efficiency
    pub fn write_trips_batched(&self, trips: &[EnrichedTrip], path: &Path, batch_size: usize) -> Result<()> {
        if trips.is_empty() {
            return Ok(());
        }

        let schema = Self::schema();
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
        for chunk in trips.chunks(batch_size.max(1)) {
            let batch = Self::trips_to_batch(chunk, schema.clone())?;
            writer.write(&batch)?;
        }

        writer.close()?;
        Ok(())
    }

    fn trips_to_batch(trips: &[EnrichedTrip], schema: Arc<Schema>) -> Result<RecordBatch> {
        let micros = |t: &chrono::NaiveDateTime| t.and_utc().timestamp_micros();

        let columns: Vec<ArrayRef> = vec![
            Arc::new(TimestampMicrosecondArray::from_iter_values(
                trips.iter().map(|t| micros(&t.pickup_datetime)),
            )),
            Arc::new(TimestampMicrosecondArray::from_iter_values(
                trips.iter().map(|t| micros(&t.dropoff_datetime)),
            )),
            Arc::new(Int64Array::from_iter_values(trips.iter().map(|t| t.passenger_count))),
            Arc::new(Float64Array::from_iter_values(trips.iter().map(|t| t.trip_distance))),
            Arc::new(Int64Array::from_iter_values(trips.iter().map(|t| t.rate_code_id))),
            Arc::new(StringArray::from_iter_values(trips.iter().map(|t| t.rate_code_name.as_str()))),
            Arc::new(Int64Array::from_iter_values(trips.iter().map(|t| t.payment_type))),
            Arc::new(StringArray::from_iter_values(
                trips.iter().map(|t| t.payment_type_name.as_str()),
            )),
            Arc::new(Int64Array::from_iter_values(trips.iter().map(|t| t.pickup_location_id))),
            Arc::new(Int64Array::from_iter_values(trips.iter().map(|t| t.dropoff_location_id))),
            Arc::new(Float64Array::from_iter_values(trips.iter().map(|t| t.pickup_centroid_lat))),
            Arc::new(Float64Array::from_iter_values(trips.iter().map(|t| t.pickup_centroid_long))),
            Arc::new(Float64Array::from_iter_values(trips.iter().map(|t| t.dropoff_centroid_lat))),
            Arc::new(Float64Array::from_iter_values(trips.iter().map(|t| t.dropoff_centroid_long))),
            Arc::new(Float64Array::from_iter_values(trips.iter().map(|t| t.total_amount))),
        ];

        Ok(RecordBatch::try_new(schema, columns)?)
    }

    pub fn read_all_trips(&self, path: &Path) -> Result<Vec<EnrichedTrip>> {
        self.read_sample_trips(path, usize::MAX)
    }

    /// Read up to `limit` trips from an enriched Parquet file
    pub fn read_sample_trips(&self, path: &Path, limit: usize) -> Result<Vec<EnrichedTrip>> {
        let file = File::open(path)?;
        let parquet_reader = ParquetRecordBatchReaderBuilder::try_new(file)?
            .with_batch_size(limit.clamp(1, DEFAULT_READ_BATCH_SIZE))
            .build()?;

        let mut trips = Vec::new();

        for batch_result in parquet_reader {
            let batch = batch_result?;
            let remaining = limit - trips.len();
            let rows = batch.num_rows().min(remaining);

            trips.extend(Self::batch_to_trips(&batch, rows)?);

            if trips.len() >= limit {
                break;
            }
        }

        Ok(trips)
    }

    fn batch_to_trips(batch: &RecordBatch, rows: usize) -> Result<Vec<EnrichedTrip>> {
        let pickup = typed_column::<TimestampMicrosecondArray>(batch, OutputField::PickupDatetime)?;
        let dropoff = typed_column::<TimestampMicrosecondArray>(batch, OutputField::DropoffDatetime)?;
        let passengers = typed_column::<Int64Array>(batch, OutputField::PassengerCount)?;
        let distance = typed_column::<Float64Array>(batch, OutputField::TripDistance)?;
        let rate_code = typed_column::<Int64Array>(batch, OutputField::RateCodeId)?;
        let rate_name = typed_column::<StringArray>(batch, OutputField::RateCodeName)?;
        let payment = typed_column::<Int64Array>(batch, OutputField::PaymentType)?;
        let payment_name = typed_column::<StringArray>(batch, OutputField::PaymentTypeName)?;
        let pickup_id = typed_column::<Int64Array>(batch, OutputField::PickupLocationId)?;
        let dropoff_id = typed_column::<Int64Array>(batch, OutputField::DropoffLocationId)?;
        let pickup_lat = typed_column::<Float64Array>(batch, OutputField::PickupCentroidLat)?;
        let pickup_long = typed_column::<Float64Array>(batch, OutputField::PickupCentroidLong)?;
        let dropoff_lat = typed_column::<Float64Array>(batch, OutputField::DropoffCentroidLat)?;
        let dropoff_long = typed_column::<Float64Array>(batch, OutputField::DropoffCentroidLong)?;
        let amount = typed_column::<Float64Array>(batch, OutputField::TotalAmount)?;

        let timestamp = |array: &TimestampMicrosecondArray, i: usize| {
            array.value_as_datetime(i).ok_or_else(|| {
                PipelineError::InvalidFormat(format!("Invalid timestamp in row {}", i))
            })
        };

        let mut trips = Vec::with_capacity(rows);
        for i in 0..rows {
            trips.push(EnrichedTrip {
                pickup_datetime: timestamp(pickup, i)?,
                dropoff_datetime: timestamp(dropoff, i)?,
                passenger_count: passengers.value(i),
                trip_distance: distance.value(i),
                rate_code_id: rate_code.value(i),
                rate_code_name: rate_name.value(i).to_string(),
                payment_type: payment.value(i),
                payment_type_name: payment_name.value(i).to_string(),
                pickup_location_id: pickup_id.value(i),
                dropoff_location_id: dropoff_id.value(i),
                pickup_centroid_lat: pickup_lat.value(i),
                pickup_centroid_long: pickup_long.value(i),
                dropoff_centroid_lat: dropoff_lat.value(i),
                dropoff_centroid_long: dropoff_long.value(i),
                total_amount: amount.value(i),
            });
        }

        Ok(trips)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let row_groups = metadata.num_row_groups();
        let total_rows = metadata.file_metadata().num_rows();
        let file_size = std::fs::metadata(path)?.len();

        let row_group_sizes = (0..row_groups)
            .map(|i| metadata.row_group(i).num_rows())
            .collect();

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size,
            compression: self.compression,
        })
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn typed_column<T: 'static>(batch: &RecordBatch, field: OutputField) -> Result<&T> {
    batch
        .column_by_name(field.name())
        .and_then(|column| column.as_any().downcast_ref::<T>())
        .ok_or_else(|| {
            PipelineError::InvalidFormat(format!(
                "Missing or mistyped column '{}' in enriched Parquet file",
                field
            ))
        })
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        let avg_rows = if self.row_groups > 0 {
            self.total_rows as f64 / self.row_groups as f64
        } else {
            0.0
        };

        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}\n\
            - Avg rows per group: {:.0}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.compression,
            avg_rows
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    fn trip(minute: u32, amount: f64) -> EnrichedTrip {
        let day = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        EnrichedTrip {
            pickup_datetime: day.and_hms_micro_opt(0, minute, 40, 250_000).unwrap(),
            dropoff_datetime: day.and_hms_opt(1, minute, 20).unwrap(),
            passenger_count: 2,
            trip_distance: 3.2,
            rate_code_id: 2,
            rate_code_name: "JFK".to_string(),
            payment_type: 2,
            payment_type_name: "Cash".to_string(),
            pickup_location_id: 132,
            dropoff_location_id: 230,
            pickup_centroid_lat: 40.646,
            pickup_centroid_long: -73.786,
            dropoff_centroid_lat: 40.759,
            dropoff_centroid_long: -73.984,
            total_amount: amount,
        }
    }

    #[test]
    fn test_write_empty_trips() {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new().unwrap();

        assert!(writer.write_trips(&[], temp_file.path()).is_ok());
    }

    #[test]
    fn test_schema_matches_output_fields() {
        let schema = ParquetWriter::schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        let expected: Vec<&str> = OutputField::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_read_back_across_row_groups() -> Result<()> {
        let writer = ParquetWriter::new().with_row_group_size(2);
        let temp_file = NamedTempFile::new()?;
        let trips: Vec<EnrichedTrip> = (0..5).map(|i| trip(i, 50.0 + i as f64)).collect();

        writer.write_trips(&trips, temp_file.path())?;

        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 5);
        assert_eq!(info.row_groups, 3);

        assert_eq!(writer.read_all_trips(temp_file.path())?, trips);
        assert_eq!(writer.read_sample_trips(temp_file.path(), 3)?, trips[..3].to_vec());
        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        for compression in ["snappy", "gzip", "lz4", "zstd", "none"] {
            let writer = ParquetWriter::new().with_compression(compression)?;
            let temp_file = NamedTempFile::new()?;

            let result = writer.write_trips(&[trip(5, 12.0)], temp_file.path());
            assert!(result.is_ok(), "Failed with compression: {}", compression);
        }

        assert!(ParquetWriter::new().with_compression("brotli-9").is_err());
        Ok(())
    }
}
