pub mod bulk_loader;
pub mod mapping;
pub mod parquet_writer;

pub use bulk_loader::{encode_bulk_body, BulkLoadOutcome, BulkLoader};
pub use mapping::{FieldType, IndexMapping};
pub use parquet_writer::{ParquetFileInfo, ParquetWriter};
