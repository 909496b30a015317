pub mod trip_analyzer;

pub use trip_analyzer::{TripAnalyzer, TripStatistics};
