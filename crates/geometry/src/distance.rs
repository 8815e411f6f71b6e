use crate::crs::TransformError;
use crate::point::Point;

/// Mean Earth radius for great-circle distances.
pub const MEAN_EARTH_RADIUS: f64 = 6_371_008.8;

/// Great-circle distance in metres between two points of any supported SRID.
pub fn haversine_distance(a: &Point, b: &Point) -> Result<f64, TransformError> {
    let a = a.transform(4326)?;
    let b = b.transform(4326)?;

    let lat1 = a.y.to_radians();
    let lat2 = b.y.to_radians();
    let dlat = (b.y - a.y).to_radians();
    let dlon = (b.x - a.x).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    Ok(2.0 * MEAN_EARTH_RADIUS * h.sqrt().min(1.0).asin())
}
