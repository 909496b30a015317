pub mod constants;
pub mod filename;
pub mod progress;
pub mod projection;

pub use constants::*;
pub use filename::{default_enriched_output, discover_trip_files, parse_trip_file_name, TripMonth};
pub use progress::ProgressReporter;
pub use projection::{LambertConformalConic, LccParameters, Projection};
