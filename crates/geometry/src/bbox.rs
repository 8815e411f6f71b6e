//! Bounding boxes and geodesic tolerance boxes around a query point.

use serde::{Deserialize, Serialize};

use crate::crs::TransformError;
use crate::point::Point;

/// WGS84 semi-major axis.
const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// An axis-aligned box in the units of its SRID.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Degenerate box around a single coordinate.
    pub fn from_xy(x: f64, y: f64) -> Self {
        Self::new(x, y, x, y)
    }

    /// Grow to include a coordinate.
    pub fn include(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Format as a BBOX parameter: "llx,lly,urx,ury", or "lly,llx,ury,urx"
    /// when `flip` is set for CRSes with latitude-first axis order.
    pub fn to_param_string(&self, flip: bool) -> String {
        let values = if flip {
            [self.min_y, self.min_x, self.max_y, self.max_x]
        } else {
            [self.min_x, self.min_y, self.max_x, self.max_y]
        };
        values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Box whose edges lie `distance` metres north, east, south and west of
/// `point`, expressed in the point's SRID.
///
/// Corners end up further than `distance`; the cardinal distances match it.
pub fn tolerance_bbox(point: &Point, distance: f64) -> Result<BoundingBox, TransformError> {
    let origin = point.transform(4326)?;

    let (north_lat, _) = destination(origin.y, origin.x, 0.0, distance);
    let (_, east_lon) = destination(origin.y, origin.x, 90.0, distance);
    let (south_lat, _) = destination(origin.y, origin.x, 180.0, distance);
    let (_, west_lon) = destination(origin.y, origin.x, 270.0, distance);

    let lower_left = Point::wgs84(west_lon, south_lat).transform(point.srid)?;
    let upper_right = Point::wgs84(east_lon, north_lat).transform(point.srid)?;

    Ok(BoundingBox::new(
        lower_left.x,
        lower_left.y,
        upper_right.x,
        upper_right.y,
    ))
}

/// Vincenty direct solution on the WGS84 ellipsoid.
///
/// Returns `(lat, lon)` in degrees reached from `(lat, lon)` after
/// travelling `distance` metres along `bearing` degrees.
pub fn destination(lat: f64, lon: f64, bearing: f64, distance: f64) -> (f64, f64) {
    let a = WGS84_A;
    let f = WGS84_F;
    let b = (1.0 - f) * a;

    let alpha1 = bearing.to_radians();
    let (sin_alpha1, cos_alpha1) = alpha1.sin_cos();

    let tan_u1 = (1.0 - f) * lat.to_radians().tan();
    let cos_u1 = 1.0 / (1.0 + tan_u1 * tan_u1).sqrt();
    let sin_u1 = tan_u1 * cos_u1;

    let sigma1 = tan_u1.atan2(cos_alpha1);
    let sin_alpha = cos_u1 * sin_alpha1;
    let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
    let u_sq = cos_sq_alpha * (a * a - b * b) / (b * b);
    let big_a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
    let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));

    let mut sigma = distance / (b * big_a);
    let mut cos_2sigma_m;
    let mut iterations = 0;
    loop {
        cos_2sigma_m = (2.0 * sigma1 + sigma).cos();
        let (sin_sigma, cos_sigma) = sigma.sin_cos();
        let delta_sigma = big_b
            * sin_sigma
            * (cos_2sigma_m
                + big_b / 4.0
                    * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                        - big_b / 6.0
                            * cos_2sigma_m
                            * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                            * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));
        let next = distance / (b * big_a) + delta_sigma;
        iterations += 1;
        if (next - sigma).abs() < 1e-12 || iterations >= 200 {
            sigma = next;
            break;
        }
        sigma = next;
    }

    let (sin_sigma, cos_sigma) = sigma.sin_cos();
    let tmp = sin_u1 * sin_sigma - cos_u1 * cos_sigma * cos_alpha1;
    let lat2 = (sin_u1 * cos_sigma + cos_u1 * sin_sigma * cos_alpha1)
        .atan2((1.0 - f) * (sin_alpha * sin_alpha + tmp * tmp).sqrt());
    let lambda =
        (sin_sigma * sin_alpha1).atan2(cos_u1 * cos_sigma - sin_u1 * sin_sigma * cos_alpha1);
    let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));
    let l = lambda
        - (1.0 - c)
            * f
            * sin_alpha
            * (sigma
                + c * sin_sigma
                    * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

    (lat2.to_degrees(), lon + l.to_degrees())
}
