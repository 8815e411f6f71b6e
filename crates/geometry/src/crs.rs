//! Spatial reference identifiers and the 4326/3857 projection.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Sphere radius used by Web Mercator.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Half the Web Mercator world width in metres.
pub const MAX_EXTENT: f64 = 20_037_508.342_789_244;

/// Web Mercator clamps latitude to this value.
const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

/// Spatial references GeoContext can transform between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Srid {
    /// WGS84 geographic (lon/lat degrees)
    Wgs84,
    /// Web Mercator (metres)
    WebMercator,
}

impl Srid {
    pub fn from_code(code: i32) -> Result<Self, TransformError> {
        match code {
            4326 => Ok(Srid::Wgs84),
            3857 => Ok(Srid::WebMercator),
            other => Err(TransformError::UnsupportedSrid(other)),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Srid::Wgs84 => 4326,
            Srid::WebMercator => 3857,
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Srid::Wgs84)
    }
}

impl fmt::Display for Srid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.code())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TransformError {
    #[error("Unsupported SRID: {0}")]
    UnsupportedSrid(i32),

    #[error("Could not transform geometry: ({x}, {y}) is not a finite coordinate")]
    NonFinite { x: f64, y: f64 },
}

/// Lon/lat degrees to Web Mercator metres.
pub fn lonlat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Web Mercator metres to lon/lat degrees.
pub fn mercator_to_lonlat(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    (lon, lat)
}

/// Transform a coordinate pair between two supported SRIDs.
pub fn transform_xy(x: f64, y: f64, from: i32, to: i32) -> Result<(f64, f64), TransformError> {
    if !x.is_finite() || !y.is_finite() {
        return Err(TransformError::NonFinite { x, y });
    }
    let from = Srid::from_code(from)?;
    let to = Srid::from_code(to)?;

    Ok(match (from, to) {
        (Srid::Wgs84, Srid::WebMercator) => lonlat_to_mercator(x, y),
        (Srid::WebMercator, Srid::Wgs84) => mercator_to_lonlat(x, y),
        (Srid::Wgs84, Srid::Wgs84) | (Srid::WebMercator, Srid::WebMercator) => (x, y),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srid_codes() {
        assert_eq!(Srid::from_code(4326).unwrap(), Srid::Wgs84);
        assert_eq!(Srid::from_code(3857).unwrap(), Srid::WebMercator);
        assert_eq!(
            Srid::from_code(900913),
            Err(TransformError::UnsupportedSrid(900913))
        );
        assert_eq!(
            Srid::from_code(32735),
            Err(TransformError::UnsupportedSrid(32735))
        );
        assert_eq!(Srid::WebMercator.to_string(), "EPSG:3857");
    }

    #[test]
    fn test_mercator_origin_and_extent() {
        let (x, y) = lonlat_to_mercator(0.0, 0.0);
        assert!(x.abs() < 1e-9);
        assert!(y.abs() < 1e-9);

        let (x, _) = lonlat_to_mercator(180.0, 0.0);
        assert!((x - MAX_EXTENT).abs() < 1e-6);
    }

    #[test]
    fn test_mercator_roundtrip() {
        let (x, y) = transform_xy(23.55, -30.55, 4326, 3857).unwrap();
        let (lon, lat) = transform_xy(x, y, 3857, 4326).unwrap();
        assert!((lon - 23.55).abs() < 1e-9);
        assert!((lat + 30.55).abs() < 1e-9);
    }

    #[test]
    fn test_known_mercator_value() {
        // Cape Town, roughly
        let (x, y) = lonlat_to_mercator(18.4241, -33.9249);
        assert!((x - 2_050_961.43).abs() < 0.1);
        assert!((y - (-4_018_722.38)).abs() < 0.1);
    }

    #[test]
    fn test_transform_rejects_nan() {
        assert!(matches!(
            transform_xy(f64::NAN, 1.0, 4326, 3857),
            Err(TransformError::NonFinite { .. })
        ));
    }
}
