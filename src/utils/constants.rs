/// Store defaults
pub const DEFAULT_STORE_URL: &str = "http://localhost:9200";
pub const DEFAULT_TRIPS_INDEX: &str = "nyc_yellow_taxi_trips";
pub const DEFAULT_ANALYTICS_INDEX: &str = "nyc_taxi_analytics";
pub const DEFAULT_BULK_CHUNK_SIZE: usize = 500;

/// Enrichment filter defaults
pub const DEFAULT_MAX_TRIP_DISTANCE: f64 = 100.0;
/// 264 = "Unknown", 265 = "Outside of NYC" in the TLC zone lookup
pub const DEFAULT_EXCLUDED_ZONE_IDS: [i64; 2] = [264, 265];

/// Zone sources
pub const DEFAULT_SOURCE_CRS: &str = "EPSG:2263";
pub const ZONE_LOOKUP_FILE: &str = "taxi_zone_lookup.csv";
pub const ZONE_GEOMETRY_FILE: &str = "taxi_zones.geojson";
pub const LOCATION_ID_COLUMN: &str = "location_id";

/// TLC trip file columns
pub const COL_PICKUP_DATETIME: &str = "tpep_pickup_datetime";
pub const COL_DROPOFF_DATETIME: &str = "tpep_dropoff_datetime";
pub const COL_PASSENGER_COUNT: &str = "passenger_count";
pub const COL_TRIP_DISTANCE: &str = "trip_distance";
pub const COL_PICKUP_LOCATION: &str = "PULocationID";
pub const COL_DROPOFF_LOCATION: &str = "DOLocationID";
pub const COL_RATE_CODE: &str = "RatecodeID";
pub const COL_PAYMENT_TYPE: &str = "payment_type";
pub const COL_TOTAL_AMOUNT: &str = "total_amount";

/// Trip file discovery (first and last month published in the source archive)
pub const TRIP_FILE_PREFIX: &str = "yellow_tripdata_";
pub const DEFAULT_FIRST_MONTH: (i32, u32) = (2019, 1);
pub const DEFAULT_LAST_MONTH: (i32, u32) = (2024, 6);

/// Processing defaults
pub const DEFAULT_READ_BATCH_SIZE: usize = 8192;
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
