//! Coordinate reference handling for zone geometry.
//!
//! Only what the TLC zone layer needs: geographic WGS84 passthrough and the
//! ellipsoidal Lambert Conformal Conic (2SP) used by the New York state plane
//! systems. The NAD83 → WGS84 datum shift is below a metre and is ignored.

use geo::{Coord, MapCoords, MultiPolygon};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use std::f64::consts::FRAC_PI_4;

use crate::error::{PipelineError, Result};

/// GRS80 ellipsoid (NAD83)
pub const GRS80_SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
pub const GRS80_INVERSE_FLATTENING: f64 = 298.257_222_101;

/// US survey foot in metres
pub const US_SURVEY_FOOT: f64 = 1200.0 / 3937.0;

const MAX_LATITUDE_ITERATIONS: usize = 15;
const LATITUDE_TOLERANCE: f64 = 1e-12;

/// Source projection of a geometry layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Already longitude/latitude degrees.
    Geographic,
    LambertConformalConic(LambertConformalConic),
}

impl Projection {
    /// NAD83 / New York Long Island (ftUS), the native CRS of the TLC zone layer.
    pub fn new_york_long_island() -> Self {
        Projection::LambertConformalConic(LambertConformalConic::new(LccParameters {
            semi_major_axis: GRS80_SEMI_MAJOR_AXIS,
            inverse_flattening: GRS80_INVERSE_FLATTENING,
            standard_parallel_1: 41.0 + 2.0 / 60.0,
            standard_parallel_2: 40.0 + 40.0 / 60.0,
            latitude_of_origin: 40.0 + 10.0 / 60.0,
            central_meridian: -74.0,
            false_easting: 300_000.0,
            false_northing: 0.0,
            unit_to_metre: US_SURVEY_FOOT,
        }))
    }

    /// Resolves a CRS name such as `EPSG:2263`, `urn:ogc:def:crs:EPSG::4326`
    /// or `urn:ogc:def:crs:OGC:1.3:CRS84`.
    pub fn from_crs_name(name: &str) -> Result<Self> {
        let trimmed = name.trim();
        if trimmed.to_uppercase().ends_with("CRS84") {
            return Ok(Projection::Geographic);
        }

        let code = trimmed
            .rsplit(':')
            .next()
            .and_then(|code| code.parse::<u32>().ok())
            .ok_or_else(|| PipelineError::Projection(format!("Unrecognised CRS: '{}'", name)))?;

        match code {
            4326 | 4269 => Ok(Projection::Geographic),
            2263 => Ok(Projection::new_york_long_island()),
            other => Err(PipelineError::Projection(format!(
                "Unsupported CRS EPSG:{} (supported: EPSG:4326, EPSG:4269, EPSG:2263)",
                other
            ))),
        }
    }

    /// Converts one projected coordinate to (longitude, latitude) degrees.
    pub fn to_geographic(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Projection::Geographic => (x, y),
            Projection::LambertConformalConic(lcc) => lcc.inverse(x, y),
        }
    }

    pub fn reproject(&self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        match self {
            Projection::Geographic => geometry.clone(),
            Projection::LambertConformalConic(_) => geometry.map_coords(|c| {
                let (lon, lat) = self.to_geographic(c.x, c.y);
                Coord { x: lon, y: lat }
            }),
        }
    }
}

/// Defining parameters of a Lambert Conformal Conic (2SP) projection.
/// Angles in degrees, false easting/northing in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LccParameters {
    pub semi_major_axis: f64,
    pub inverse_flattening: f64,
    pub standard_parallel_1: f64,
    pub standard_parallel_2: f64,
    pub latitude_of_origin: f64,
    pub central_meridian: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    pub unit_to_metre: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LambertConformalConic {
    params: LccParameters,
    e: f64,
    n: f64,
    big_f: f64,
    rho0: f64,
}

impl LambertConformalConic {
    pub fn new(params: LccParameters) -> Self {
        let f = 1.0 / params.inverse_flattening;
        let e = (2.0 * f - f * f).sqrt();

        let phi1 = params.standard_parallel_1.to_radians();
        let phi2 = params.standard_parallel_2.to_radians();
        let phi0 = params.latitude_of_origin.to_radians();

        let m1 = Self::m(e, phi1);
        let m2 = Self::m(e, phi2);
        let t1 = Self::t(e, phi1);
        let t2 = Self::t(e, phi2);

        let n = if (phi1 - phi2).abs() < 1e-12 {
            phi1.sin()
        } else {
            (m1.ln() - m2.ln()) / (t1.ln() - t2.ln())
        };
        let big_f = m1 / (n * t1.powf(n));
        let rho0 = params.semi_major_axis * big_f * Self::t(e, phi0).powf(n);

        Self {
            params,
            e,
            n,
            big_f,
            rho0,
        }
    }

    fn m(e: f64, phi: f64) -> f64 {
        phi.cos() / (1.0 - (e * phi.sin()).powi(2)).sqrt()
    }

    fn t(e: f64, phi: f64) -> f64 {
        let es = e * phi.sin();
        (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
    }

    /// (longitude, latitude) degrees → projected (x, y) in layer units.
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let p = &self.params;
        let rho = p.semi_major_axis * self.big_f * Self::t(self.e, lat.to_radians()).powf(self.n);
        let theta = self.n * (lon - p.central_meridian).to_radians();

        let x = p.false_easting + rho * theta.sin();
        let y = p.false_northing + self.rho0 - rho * theta.cos();
        (x / p.unit_to_metre, y / p.unit_to_metre)
    }

    /// Projected (x, y) in layer units → (longitude, latitude) degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let p = &self.params;
        let dx = x * p.unit_to_metre - p.false_easting;
        let dy = self.rho0 - (y * p.unit_to_metre - p.false_northing);

        let rho = self.n.signum() * dx.hypot(dy);
        let theta = if self.n > 0.0 {
            dx.atan2(dy)
        } else {
            (-dx).atan2(-dy)
        };
        let t = (rho / (p.semi_major_axis * self.big_f)).powf(1.0 / self.n);

        let mut phi = FRAC_PI_2 - 2.0 * t.atan();
        for _ in 0..MAX_LATITUDE_ITERATIONS {
            let es = self.e * phi.sin();
            let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - es) / (1.0 + es)).powf(self.e / 2.0)).atan();
            let converged = (next - phi).abs() < LATITUDE_TOLERANCE;
            phi = next;
            if converged {
                break;
            }
        }

        let lon = (theta / self.n).to_degrees() + p.central_meridian;
        (lon, phi.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_island() -> LambertConformalConic {
        match Projection::new_york_long_island() {
            Projection::LambertConformalConic(lcc) => lcc,
            Projection::Geographic => unreachable!(),
        }
    }

    #[test]
    fn test_origin_maps_to_false_origin() {
        let lcc = long_island();
        let (x, y) = lcc.forward(-74.0, 40.0 + 10.0 / 60.0);
        assert!((x - 984_250.0).abs() < 1e-6);
        assert!(y.abs() < 1e-6);
    }

    #[test]
    fn test_known_point_empire_state_building() {
        // Published NY Long Island ftUS coordinates are about (988212, 211939)
        let lcc = long_island();
        let (lon, lat) = lcc.inverse(988_212.24, 211_939.28);
        assert!((lon - -73.9857).abs() < 1e-6);
        assert!((lat - 40.7484).abs() < 1e-6);
    }

    #[test]
    fn test_inverse_undoes_forward() {
        let lcc = long_island();
        for (lon, lat) in [(-74.25, 40.5), (-73.7, 40.9), (-73.9857, 40.7484)] {
            let (x, y) = lcc.forward(lon, lat);
            let (back_lon, back_lat) = lcc.inverse(x, y);
            assert!((back_lon - lon).abs() < 1e-9);
            assert!((back_lat - lat).abs() < 1e-9);
        }
    }

    #[test]
    fn test_crs_names() {
        assert_eq!(Projection::from_crs_name("EPSG:4326").unwrap(), Projection::Geographic);
        assert_eq!(
            Projection::from_crs_name("urn:ogc:def:crs:OGC:1.3:CRS84").unwrap(),
            Projection::Geographic
        );
        assert_eq!(
            Projection::from_crs_name("urn:ogc:def:crs:EPSG::2263").unwrap(),
            Projection::new_york_long_island()
        );
        assert!(Projection::from_crs_name("EPSG:3857").is_err());
        assert!(Projection::from_crs_name("state plane").is_err());
    }
}
