use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use validator::Validate;

use crate::error::Result;
use crate::utils::projection::LccParameters;
use crate::utils::constants::{
    DEFAULT_ANALYTICS_INDEX, DEFAULT_BULK_CHUNK_SIZE, DEFAULT_EXCLUDED_ZONE_IDS,
    DEFAULT_MAX_TRIP_DISTANCE, DEFAULT_SOURCE_CRS, DEFAULT_STORE_URL, DEFAULT_TRIPS_INDEX,
};

/// Pipeline settings: an optional TOML file overlaid by `TAXI_*` environment
/// variables (`TAXI_STORE__URL`, `TAXI_ENRICHMENT__MAX_TRIP_DISTANCE`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PipelineConfig {
    #[serde(default)]
    #[validate(nested)]
    pub store: StoreConfig,

    #[serde(default)]
    #[validate(nested)]
    pub enrichment: EnrichmentConfig,

    #[serde(default)]
    pub zones: ZoneConfig,

    #[serde(default)]
    #[validate(nested)]
    pub loader: LoaderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StoreConfig {
    #[serde(default = "default_store_url")]
    #[validate(url)]
    pub url: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_trips_index")]
    #[validate(length(min = 1))]
    pub trips_index: String,

    #[serde(default = "default_analytics_index")]
    #[validate(length(min = 1))]
    pub analytics_index: String,

    #[serde(default = "default_timeout_secs")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EnrichmentConfig {
    #[serde(default = "default_max_trip_distance")]
    #[validate(range(min = 0.0))]
    pub max_trip_distance: f64,

    #[serde(default = "default_excluded_zone_ids")]
    pub excluded_zone_ids: Vec<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneJoin {
    /// Match geometry features to lookup rows by location id.
    #[default]
    ByKey,
    /// Align the two sources row by row. Requires equal row counts.
    ByPosition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    #[serde(default)]
    pub lookup_path: Option<PathBuf>,

    #[serde(default)]
    pub geometry_path: Option<PathBuf>,

    /// Used when the geometry file does not declare its own CRS.
    #[serde(default = "default_source_crs")]
    pub source_crs: String,

    /// Explicit Lambert Conformal Conic parameters; override `source_crs`
    /// for layers in a state plane system without an EPSG entry here.
    #[serde(default)]
    pub lcc: Option<LccParameters>,

    #[serde(default)]
    pub join: ZoneJoin,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoaderConfig {
    #[serde(default = "default_chunk_size")]
    #[validate(range(min = 1))]
    pub chunk_size: usize,

    #[serde(default = "default_max_reported_failures")]
    pub max_reported_failures: usize,
}

fn default_store_url() -> String {
    DEFAULT_STORE_URL.to_string()
}

fn default_trips_index() -> String {
    DEFAULT_TRIPS_INDEX.to_string()
}

fn default_analytics_index() -> String {
    DEFAULT_ANALYTICS_INDEX.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_trip_distance() -> f64 {
    DEFAULT_MAX_TRIP_DISTANCE
}

fn default_excluded_zone_ids() -> Vec<i64> {
    DEFAULT_EXCLUDED_ZONE_IDS.to_vec()
}

fn default_source_crs() -> String {
    DEFAULT_SOURCE_CRS.to_string()
}

fn default_chunk_size() -> usize {
    DEFAULT_BULK_CHUNK_SIZE
}

fn default_max_reported_failures() -> usize {
    10
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            username: None,
            password: None,
            trips_index: default_trips_index(),
            analytics_index: default_analytics_index(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_trip_distance: default_max_trip_distance(),
            excluded_zone_ids: default_excluded_zone_ids(),
        }
    }
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            lookup_path: None,
            geometry_path: None,
            source_crs: default_source_crs(),
            lcc: None,
            join: ZoneJoin::default(),
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_reported_failures: default_max_reported_failures(),
        }
    }
}

impl PipelineConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("TAXI")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("enrichment.excluded_zone_ids")
                .try_parsing(true),
        );

        let settings: PipelineConfig = builder.build()?.try_deserialize()?;
        settings.validate()?;

        debug!(
            store = %settings.store.url,
            trips_index = %settings.store.trips_index,
            max_trip_distance = settings.enrichment.max_trip_distance,
            "Loaded pipeline configuration"
        );

        Ok(settings)
    }
}
