use serde::{Deserialize, Serialize};

use crate::crs::{transform_xy, TransformError};

/// A 2-D point tagged with its SRID.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub srid: i32,
}

impl Point {
    pub fn new(x: f64, y: f64, srid: i32) -> Self {
        Self { x, y, srid }
    }

    /// Lon/lat point.
    pub fn wgs84(lon: f64, lat: f64) -> Self {
        Self::new(lon, lat, 4326)
    }

    /// Reproject into `srid`. Identity when already there.
    pub fn transform(&self, srid: i32) -> Result<Point, TransformError> {
        if self.srid == srid {
            return Ok(*self);
        }
        let (x, y) = transform_xy(self.x, self.y, self.srid, srid)?;
        Ok(Point::new(x, y, srid))
    }

    /// Planar distance in this point's units.
    pub fn planar_distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// GeoJSON point geometry.
    pub fn to_geojson(&self) -> serde_json::Value {
        serde_json::json!({"type": "Point", "coordinates": [self.x, self.y]})
    }
}
