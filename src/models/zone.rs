use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// One row of the zone lookup table (`taxi_zone_lookup.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneAttributes {
    pub location_id: i64,
    pub borough: String,
    pub zone: String,
    pub service_zone: String,
}

/// A taxi zone with its centroid in WGS84 degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Zone {
    pub location_id: i64,
    pub borough: String,
    pub zone: String,
    pub service_zone: String,

    #[validate(range(min = -90.0, max = 90.0))]
    pub centroid_lat: f64,

    #[validate(range(min = -180.0, max = 180.0))]
    pub centroid_long: f64,
}

impl Zone {
    pub fn from_attributes(attributes: ZoneAttributes, centroid_lat: f64, centroid_long: f64) -> Self {
        Self {
            location_id: attributes.location_id,
            borough: attributes.borough,
            zone: attributes.zone,
            service_zone: attributes.service_zone,
            centroid_lat,
            centroid_long,
        }
    }

    pub fn centroid(&self) -> (f64, f64) {
        (self.centroid_lat, self.centroid_long)
    }
}

/// Zone dimension keyed by location id. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct ZoneTable {
    zones: HashMap<i64, Zone>,
}

impl ZoneTable {
    pub fn new(zones: impl IntoIterator<Item = Zone>) -> Self {
        Self {
            zones: zones.into_iter().map(|z| (z.location_id, z)).collect(),
        }
    }

    pub fn get(&self, location_id: i64) -> Option<&Zone> {
        self.zones.get(&location_id)
    }

    pub fn centroid(&self, location_id: i64) -> Option<(f64, f64)> {
        self.get(location_id).map(Zone::centroid)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Zones ordered by location id.
    pub fn sorted(&self) -> Vec<&Zone> {
        let mut zones: Vec<&Zone> = self.zones.values().collect();
        zones.sort_by_key(|z| z.location_id);
        zones
    }
}
