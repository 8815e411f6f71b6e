//! Geometry support for GeoContext queries.
//!
//! Only two spatial references are needed: WGS84 lon/lat (EPSG:4326), in
//! which queries arrive, and Web Mercator (EPSG:3857), in which cached
//! geometries are stored. Projection math is implemented directly.

pub mod bbox;
pub mod coord;
pub mod crs;
pub mod distance;
pub mod point;
pub mod shape;

pub use bbox::{tolerance_bbox, BoundingBox};
pub use coord::{parse_coord, CoordError};
pub use crs::{Srid, TransformError};
pub use distance::haversine_distance;
pub use point::Point;
pub use shape::{Geometry, GeometryParseError};
