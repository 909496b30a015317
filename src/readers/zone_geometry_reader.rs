use crate::error::{PipelineError, Result};
use crate::readers::zone_lookup_reader::normalize_column_name;
use crate::utils::constants::LOCATION_ID_COLUMN;
use geo::{Geometry, MultiPolygon};
use geojson::{Feature, GeoJson, JsonObject, JsonValue};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// One zone polygon as found in the geometry layer, still in its native CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneGeometry {
    /// `None` when the feature carries no usable id property.
    pub location_id: Option<i64>,
    pub geometry: MultiPolygon<f64>,
}

/// Contents of a zone geometry file.
#[derive(Debug, Clone, Default)]
pub struct ZoneLayer {
    /// CRS name declared by the legacy GeoJSON `crs` member, if any.
    pub declared_crs: Option<String>,
    pub features: Vec<ZoneGeometry>,
}

/// Reads the TLC zone polygons from a GeoJSON file.
pub struct ZoneGeometryReader;

impl ZoneGeometryReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_layer(&self, path: &Path) -> Result<ZoneLayer> {
        let content = fs::read_to_string(path)?;
        let layer = self.parse_layer(&content)?;
        debug!(
            path = %path.display(),
            features = layer.features.len(),
            crs = layer.declared_crs.as_deref().unwrap_or("undeclared"),
            "Read zone geometry"
        );
        Ok(layer)
    }

    pub fn parse_layer(&self, content: &str) -> Result<ZoneLayer> {
        let geojson: GeoJson = content.parse()?;

        let (features, foreign_members) = match geojson {
            GeoJson::FeatureCollection(collection) => {
                (collection.features, collection.foreign_members)
            }
            GeoJson::Feature(feature) => (vec![feature], None),
            GeoJson::Geometry(_) => {
                return Err(PipelineError::InvalidFormat(
                    "Zone geometry must be a Feature or FeatureCollection".to_string(),
                ))
            }
        };

        let declared_crs = foreign_members.as_ref().and_then(declared_crs_name);

        let mut zones = Vec::with_capacity(features.len());
        for (position, feature) in features.into_iter().enumerate() {
            match Self::convert_feature(feature)? {
                Some(zone) => zones.push(zone),
                None => warn!(position, "Skipping zone feature without polygon geometry"),
            }
        }

        Ok(ZoneLayer {
            declared_crs,
            features: zones,
        })
    }

    fn convert_feature(feature: Feature) -> Result<Option<ZoneGeometry>> {
        let location_id = feature.properties.as_ref().and_then(location_id_property);

        let Some(geometry) = feature.geometry else {
            return Ok(None);
        };

        let geometry: Geometry<f64> = geometry.try_into()?;
        let multi_polygon = match geometry {
            Geometry::MultiPolygon(mp) => mp,
            Geometry::Polygon(p) => MultiPolygon(vec![p]),
            _ => return Ok(None),
        };

        Ok(Some(ZoneGeometry {
            location_id,
            geometry: multi_polygon,
        }))
    }
}

impl Default for ZoneGeometryReader {
    fn default() -> Self {
        Self::new()
    }
}

/// `{"crs": {"type": "name", "properties": {"name": "EPSG:2263"}}}`
fn declared_crs_name(members: &JsonObject) -> Option<String> {
    members
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

fn location_id_property(properties: &JsonObject) -> Option<i64> {
    let value = properties
        .iter()
        .find(|(key, _)| normalize_column_name(key) == LOCATION_ID_COLUMN)
        .map(|(_, value)| value)?;

    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
