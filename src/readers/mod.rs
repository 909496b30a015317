pub mod trip_reader;
pub mod zone_geometry_reader;
pub mod zone_lookup_reader;

pub use trip_reader::TripReader;
pub use zone_geometry_reader::{ZoneGeometry, ZoneGeometryReader, ZoneLayer};
pub use zone_lookup_reader::{normalize_column_name, ZoneLookupReader};
