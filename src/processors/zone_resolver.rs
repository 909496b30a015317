use crate::config::{ZoneConfig, ZoneJoin};
use crate::error::{PipelineError, Result};
use crate::models::{Zone, ZoneAttributes, ZoneTable};
use crate::readers::{ZoneGeometry, ZoneGeometryReader, ZoneLayer, ZoneLookupReader};
use crate::utils::projection::{LambertConformalConic, Projection};
use geo::{Centroid, MultiPolygon};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};
use validator::Validate;

/// Builds the zone dimension: attribute rows joined to their polygons,
/// reprojected to WGS84, reduced to an area-weighted centroid.
pub struct ZoneResolver {
    join: ZoneJoin,
    fallback: Projection,
}

impl ZoneResolver {
    pub fn new(fallback: Projection) -> Self {
        Self {
            join: ZoneJoin::ByKey,
            fallback,
        }
    }

    /// Resolver for a zone configuration. Explicit LCC parameters win over
    /// the named source CRS.
    pub fn from_config(config: &ZoneConfig) -> Result<Self> {
        let fallback = match config.lcc {
            Some(params) => Projection::LambertConformalConic(LambertConformalConic::new(params)),
            None => Projection::from_crs_name(&config.source_crs)?,
        };
        Ok(Self::new(fallback).with_join(config.join))
    }

    pub fn with_join(mut self, join: ZoneJoin) -> Self {
        self.join = join;
        self
    }

    /// Read both zone sources from disk and resolve them
    pub fn resolve_files(&self, lookup_path: &Path, geometry_path: &Path) -> Result<ZoneTable> {
        let attributes = ZoneLookupReader::new().read_zones(lookup_path)?;
        let layer = ZoneGeometryReader::new().read_layer(geometry_path)?;
        self.resolve(attributes, layer)
    }

    pub fn resolve(&self, attributes: Vec<ZoneAttributes>, layer: ZoneLayer) -> Result<ZoneTable> {
        let projection = match layer.declared_crs.as_deref() {
            Some(name) => Projection::from_crs_name(name)?,
            None => self.fallback.clone(),
        };

        let pairs = match self.join {
            ZoneJoin::ByKey => join_by_key(attributes, layer.features),
            ZoneJoin::ByPosition => join_by_position(attributes, layer.features)?,
        };

        let mut zones = Vec::with_capacity(pairs.len());
        for (attrs, geometry) in pairs {
            let location_id = attrs.location_id;
            let wgs84 = projection.reproject(&geometry);

            let Some(centroid) = wgs84.centroid() else {
                warn!(location_id, "Zone geometry is empty, no centroid");
                continue;
            };

            let zone = Zone::from_attributes(attrs, centroid.y(), centroid.x());
            zone.validate().map_err(|e| {
                PipelineError::Projection(format!(
                    "Zone {} centroid ({}, {}) is not a WGS84 coordinate: {}",
                    location_id, zone.centroid_lat, zone.centroid_long, e
                ))
            })?;
            zones.push(zone);
        }

        let table = ZoneTable::new(zones);
        info!(zones = table.len(), "Resolved zone centroids");
        Ok(table)
    }
}

impl Default for ZoneResolver {
    fn default() -> Self {
        Self::new(Projection::new_york_long_island())
    }
}

/// Features sharing an id are merged into one multipolygon. Lookup rows
/// without geometry are left out, so trips referencing them null-drop.
fn join_by_key(
    attributes: Vec<ZoneAttributes>,
    features: Vec<ZoneGeometry>,
) -> Vec<(ZoneAttributes, MultiPolygon<f64>)> {
    let mut by_id: BTreeMap<i64, MultiPolygon<f64>> = BTreeMap::new();
    let mut unkeyed = 0usize;

    for feature in features {
        match feature.location_id {
            Some(id) => by_id
                .entry(id)
                .or_insert_with(|| MultiPolygon(Vec::new()))
                .0
                .extend(feature.geometry.0),
            None => unkeyed += 1,
        }
    }

    if unkeyed > 0 {
        warn!(unkeyed, "Zone features without a location id were ignored");
    }

    let mut pairs = Vec::with_capacity(attributes.len());
    for attrs in attributes {
        match by_id.remove(&attrs.location_id) {
            Some(geometry) => pairs.push((attrs, geometry)),
            None => warn!(location_id = attrs.location_id, zone = %attrs.zone, "No geometry for zone"),
        }
    }

    if !by_id.is_empty() {
        warn!(
            orphans = by_id.len(),
            "Zone geometries without a lookup row were ignored"
        );
    }

    pairs
}

fn join_by_position(
    attributes: Vec<ZoneAttributes>,
    features: Vec<ZoneGeometry>,
) -> Result<Vec<(ZoneAttributes, MultiPolygon<f64>)>> {
    if attributes.len() != features.len() {
        return Err(PipelineError::ZoneJoin(format!(
            "Positional join needs equal row counts: {} lookup rows, {} geometry features",
            attributes.len(),
            features.len()
        )));
    }

    Ok(attributes
        .into_iter()
        .zip(features.into_iter().map(|f| f.geometry))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Coord, LineString, Polygon};

    fn attrs(id: i64, zone: &str) -> ZoneAttributes {
        ZoneAttributes {
            location_id: id,
            borough: "Manhattan".to_string(),
            zone: zone.to_string(),
            service_zone: "Yellow Zone".to_string(),
        }
    }

    fn square(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: min_x, y: min_y),
            (x: max_x, y: min_y),
            (x: max_x, y: max_y),
            (x: min_x, y: max_y),
            (x: min_x, y: min_y),
        ]])
    }

    fn feature(id: Option<i64>, geometry: MultiPolygon<f64>) -> ZoneGeometry {
        ZoneGeometry {
            location_id: id,
            geometry,
        }
    }

    fn geographic_layer(features: Vec<ZoneGeometry>) -> ZoneLayer {
        ZoneLayer {
            declared_crs: Some("EPSG:4326".to_string()),
            features,
        }
    }

    #[test]
    fn test_square_centroid_in_degrees() -> Result<()> {
        let layer = geographic_layer(vec![feature(Some(1), square(-74.0, 40.5, -73.0, 41.0))]);
        let table = ZoneResolver::default().resolve(vec![attrs(1, "Square")], layer)?;

        let (lat, long) = table.centroid(1).unwrap();
        assert!((lat - 40.75).abs() < 1e-9);
        assert!((long - -73.5).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_state_plane_square_yields_degrees() -> Result<()> {
        // A small lon/lat square densified and projected to EPSG:2263 feet
        let lcc = match Projection::new_york_long_island() {
            Projection::LambertConformalConic(lcc) => lcc,
            Projection::Geographic => unreachable!(),
        };
        let (west, south, east, north) = (-73.99, 40.74, -73.98, 40.75);
        let steps = 50;
        let mut ring = Vec::new();
        for i in 0..steps {
            let t = i as f64 / steps as f64;
            ring.push((west + t * (east - west), south));
        }
        for i in 0..steps {
            let t = i as f64 / steps as f64;
            ring.push((east, south + t * (north - south)));
        }
        for i in 0..steps {
            let t = i as f64 / steps as f64;
            ring.push((east - t * (east - west), north));
        }
        for i in 0..steps {
            let t = i as f64 / steps as f64;
            ring.push((west, north - t * (north - south)));
        }
        let projected: Vec<Coord<f64>> = ring
            .iter()
            .map(|&(lon, lat)| {
                let (x, y) = lcc.forward(lon, lat);
                Coord { x, y }
            })
            .collect();
        let geometry = MultiPolygon(vec![Polygon::new(LineString::from(projected), vec![])]);

        // Undeclared CRS falls back to the configured projection
        let layer = ZoneLayer {
            declared_crs: None,
            features: vec![feature(Some(7), geometry)],
        };
        let table = ZoneResolver::default().resolve(vec![attrs(7, "Midtown")], layer)?;

        let (lat, long) = table.centroid(7).unwrap();
        assert!((lat - 40.745).abs() < 1e-5, "lat {}", lat);
        assert!((long - -73.985).abs() < 1e-5, "long {}", long);
        Ok(())
    }

    #[test]
    fn test_key_join_ignores_order_and_merges_parts() -> Result<()> {
        let layer = geographic_layer(vec![
            feature(Some(2), square(-73.0, 40.0, -72.0, 41.0)),
            feature(Some(1), square(-74.0, 40.0, -73.5, 40.5)),
            feature(Some(1), square(-73.5, 40.5, -73.0, 41.0)),
            feature(None, square(0.0, 0.0, 1.0, 1.0)),
        ]);
        let table = ZoneResolver::default()
            .resolve(vec![attrs(1, "Split"), attrs(2, "Whole"), attrs(3, "Missing")], layer)?;

        assert_eq!(table.len(), 2);
        let (lat, long) = table.centroid(1).unwrap();
        assert!((lat - 40.5).abs() < 1e-9);
        assert!((long - -73.5).abs() < 1e-9);
        assert_eq!(table.get(2).unwrap().zone, "Whole");
        assert!(table.get(3).is_none());
        Ok(())
    }

    #[test]
    fn test_positional_join() -> Result<()> {
        let layer = geographic_layer(vec![
            feature(None, square(-74.0, 40.0, -73.0, 41.0)),
            feature(None, square(-73.0, 40.0, -72.0, 41.0)),
        ]);
        let table = ZoneResolver::default()
            .with_join(ZoneJoin::ByPosition)
            .resolve(vec![attrs(10, "First"), attrs(20, "Second")], layer)?;

        assert!((table.centroid(10).unwrap().1 - -73.5).abs() < 1e-9);
        assert!((table.centroid(20).unwrap().1 - -72.5).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_positional_join_count_mismatch() {
        let layer = geographic_layer(vec![feature(None, square(-74.0, 40.0, -73.0, 41.0))]);
        let result = ZoneResolver::default()
            .with_join(ZoneJoin::ByPosition)
            .resolve(vec![attrs(1, "A"), attrs(2, "B")], layer);

        assert!(matches!(result, Err(PipelineError::ZoneJoin(_))));
    }

    #[test]
    fn test_unprojected_feet_fail_validation() {
        // Feet read as degrees cannot be a WGS84 centroid
        let layer = geographic_layer(vec![feature(
            Some(1),
            square(980_000.0, 190_000.0, 990_000.0, 200_000.0),
        )]);
        let result = ZoneResolver::default().resolve(vec![attrs(1, "Feet")], layer);

        assert!(matches!(result, Err(PipelineError::Projection(_))));
    }

    #[test]
    fn test_from_config() -> Result<()> {
        let config = ZoneConfig {
            source_crs: "EPSG:4326".to_string(),
            join: ZoneJoin::ByPosition,
            ..ZoneConfig::default()
        };
        let resolver = ZoneResolver::from_config(&config)?;
        assert_eq!(resolver.fallback, Projection::Geographic);
        assert_eq!(resolver.join, ZoneJoin::ByPosition);

        let bad = ZoneConfig {
            source_crs: "EPSG:3857".to_string(),
            ..ZoneConfig::default()
        };
        assert!(ZoneResolver::from_config(&bad).is_err());
        Ok(())
    }
}
