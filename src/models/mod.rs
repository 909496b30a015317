pub mod enriched;
pub mod statistic;
pub mod trip;
pub mod zone;

pub use enriched::{EnrichedTrip, OutputField};
pub use statistic::{StatCategory, StatisticDocument};
pub use trip::{RawTrip, RawTripBuilder};
pub use zone::{Zone, ZoneAttributes, ZoneTable};
