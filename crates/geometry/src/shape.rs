//! Feature geometries returned by upstream services.
//!
//! Geometries are parsed from GeoJSON or from the ArcGIS JSON geometry
//! format, flattened to 2-D, and measured against the query point to pick
//! the nearest feature.

use serde_json::{json, Value};
use thiserror::Error;

use crate::bbox::BoundingBox;
use crate::crs::{transform_xy, TransformError};

pub type Coord = [f64; 2];

#[derive(Debug, Error, PartialEq)]
pub enum GeometryParseError {
    #[error("Geometry is not a JSON object")]
    NotAnObject,

    #[error("Unsupported geometry type: {0}")]
    UnsupportedType(String),

    #[error("Invalid coordinates for {0}")]
    InvalidCoordinates(&'static str),

    #[error("Empty geometry")]
    Empty,
}

/// A 2-D geometry. Coordinates carry no SRID of their own.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord),
    MultiPoint(Vec<Coord>),
    LineString(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    /// Exterior ring followed by holes.
    Polygon(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Vec<Vec<Coord>>>),
}

fn coord(value: &Value, kind: &'static str) -> Result<Coord, GeometryParseError> {
    let arr = value
        .as_array()
        .ok_or(GeometryParseError::InvalidCoordinates(kind))?;
    // Any Z or M ordinate is dropped
    match (
        arr.first().and_then(Value::as_f64),
        arr.get(1).and_then(Value::as_f64),
    ) {
        (Some(x), Some(y)) => Ok([x, y]),
        _ => Err(GeometryParseError::InvalidCoordinates(kind)),
    }
}

fn coord_list(value: &Value, kind: &'static str) -> Result<Vec<Coord>, GeometryParseError> {
    value
        .as_array()
        .ok_or(GeometryParseError::InvalidCoordinates(kind))?
        .iter()
        .map(|c| coord(c, kind))
        .collect()
}

fn coord_lists(value: &Value, kind: &'static str) -> Result<Vec<Vec<Coord>>, GeometryParseError> {
    value
        .as_array()
        .ok_or(GeometryParseError::InvalidCoordinates(kind))?
        .iter()
        .map(|c| coord_list(c, kind))
        .collect()
}

impl Geometry {
    /// Parse a GeoJSON geometry object.
    pub fn from_geojson(value: &Value) -> Result<Self, GeometryParseError> {
        let obj = value.as_object().ok_or(GeometryParseError::NotAnObject)?;
        let kind = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| GeometryParseError::UnsupportedType("<missing>".to_string()))?;
        let coords = obj
            .get("coordinates")
            .ok_or(GeometryParseError::Empty)?;

        let geometry = match kind {
            "Point" => Geometry::Point(coord(coords, "Point")?),
            "MultiPoint" => Geometry::MultiPoint(coord_list(coords, "MultiPoint")?),
            "LineString" => Geometry::LineString(coord_list(coords, "LineString")?),
            "MultiLineString" => {
                Geometry::MultiLineString(coord_lists(coords, "MultiLineString")?)
            }
            "Polygon" => Geometry::Polygon(coord_lists(coords, "Polygon")?),
            "MultiPolygon" => Geometry::MultiPolygon(
                coords
                    .as_array()
                    .ok_or(GeometryParseError::InvalidCoordinates("MultiPolygon"))?
                    .iter()
                    .map(|p| coord_lists(p, "MultiPolygon"))
                    .collect::<Result<_, _>>()?,
            ),
            other => return Err(GeometryParseError::UnsupportedType(other.to_string())),
        };

        if geometry.is_empty() {
            return Err(GeometryParseError::Empty);
        }
        Ok(geometry)
    }

    /// Parse an ArcGIS JSON geometry (`{x,y}`, `{points}`, `{paths}` or `{rings}`).
    pub fn from_arcgis(value: &Value) -> Result<Self, GeometryParseError> {
        let obj = value.as_object().ok_or(GeometryParseError::NotAnObject)?;

        let geometry = if let (Some(x), Some(y)) = (
            obj.get("x").and_then(Value::as_f64),
            obj.get("y").and_then(Value::as_f64),
        ) {
            Geometry::Point([x, y])
        } else if let Some(points) = obj.get("points") {
            let mut points = coord_list(points, "MultiPoint")?;
            if points.len() == 1 {
                Geometry::Point(points.remove(0))
            } else {
                Geometry::MultiPoint(points)
            }
        } else if let Some(paths) = obj.get("paths") {
            let mut paths = coord_lists(paths, "LineString")?;
            if paths.len() == 1 {
                Geometry::LineString(paths.remove(0))
            } else {
                Geometry::MultiLineString(paths)
            }
        } else if let Some(rings) = obj.get("rings") {
            rings_to_polygons(coord_lists(rings, "Polygon")?)
        } else {
            return Err(GeometryParseError::UnsupportedType("ArcGIS".to_string()));
        };

        if geometry.is_empty() {
            return Err(GeometryParseError::Empty);
        }
        Ok(geometry)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Point(_) => false,
            Geometry::MultiPoint(c) | Geometry::LineString(c) => c.is_empty(),
            Geometry::MultiLineString(l) | Geometry::Polygon(l) => {
                l.iter().all(|c| c.is_empty())
            }
            Geometry::MultiPolygon(p) => p.iter().flatten().all(|c| c.is_empty()),
        }
    }

    fn coords(&self) -> Box<dyn Iterator<Item = &Coord> + '_> {
        match self {
            Geometry::Point(c) => Box::new(std::iter::once(c)),
            Geometry::MultiPoint(c) | Geometry::LineString(c) => Box::new(c.iter()),
            Geometry::MultiLineString(l) | Geometry::Polygon(l) => Box::new(l.iter().flatten()),
            Geometry::MultiPolygon(p) => Box::new(p.iter().flatten().flatten()),
        }
    }

    /// Bounding box of all coordinates.
    pub fn bounds(&self) -> Option<BoundingBox> {
        let mut coords = self.coords();
        let first = coords.next()?;
        let mut bbox = BoundingBox::from_xy(first[0], first[1]);
        for c in coords {
            bbox.include(c[0], c[1]);
        }
        Some(bbox)
    }

    /// Reproject every coordinate from `from` to `to`.
    pub fn transform(&self, from: i32, to: i32) -> Result<Geometry, TransformError> {
        if from == to {
            return Ok(self.clone());
        }
        let map = |c: &Coord| transform_xy(c[0], c[1], from, to).map(|(x, y)| [x, y]);
        let map_list = |l: &Vec<Coord>| l.iter().map(map).collect::<Result<Vec<_>, _>>();
        let map_lists = |ls: &Vec<Vec<Coord>>| ls.iter().map(map_list).collect::<Result<Vec<_>, _>>();

        Ok(match self {
            Geometry::Point(c) => Geometry::Point(map(c)?),
            Geometry::MultiPoint(c) => Geometry::MultiPoint(map_list(c)?),
            Geometry::LineString(c) => Geometry::LineString(map_list(c)?),
            Geometry::MultiLineString(l) => Geometry::MultiLineString(map_lists(l)?),
            Geometry::Polygon(l) => Geometry::Polygon(map_lists(l)?),
            Geometry::MultiPolygon(p) => {
                Geometry::MultiPolygon(p.iter().map(map_lists).collect::<Result<_, _>>()?)
            }
        })
    }

    /// Planar distance from `(x, y)`; zero inside a polygon.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        let p = [x, y];
        match self {
            Geometry::Point(c) => point_distance(p, *c),
            Geometry::MultiPoint(c) => c
                .iter()
                .map(|c| point_distance(p, *c))
                .fold(f64::INFINITY, f64::min),
            Geometry::LineString(c) => line_distance(p, c),
            Geometry::MultiLineString(l) => l
                .iter()
                .map(|c| line_distance(p, c))
                .fold(f64::INFINITY, f64::min),
            Geometry::Polygon(rings) => polygon_distance(p, rings),
            Geometry::MultiPolygon(polys) => polys
                .iter()
                .map(|rings| polygon_distance(p, rings))
                .fold(f64::INFINITY, f64::min),
        }
    }

    pub fn geometry_type(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    pub fn to_geojson(&self) -> Value {
        let coordinates = match self {
            Geometry::Point(c) => json!(c),
            Geometry::MultiPoint(c) | Geometry::LineString(c) => json!(c),
            Geometry::MultiLineString(l) | Geometry::Polygon(l) => json!(l),
            Geometry::MultiPolygon(p) => json!(p),
        };
        json!({"type": self.geometry_type(), "coordinates": coordinates})
    }
}

fn point_distance(a: Coord, b: Coord) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

fn segment_distance(p: Coord, a: Coord, b: Coord) -> f64 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return point_distance(p, a);
    }
    let t = (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / len_sq).clamp(0.0, 1.0);
    point_distance(p, [a[0] + t * dx, a[1] + t * dy])
}

fn line_distance(p: Coord, line: &[Coord]) -> f64 {
    match line {
        [] => f64::INFINITY,
        [only] => point_distance(p, *only),
        _ => line
            .windows(2)
            .map(|w| segment_distance(p, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Even-odd ray casting.
fn ring_contains(p: Coord, ring: &[Coord]) -> bool {
    let mut inside = false;
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (ring[i][0], ring[i][1]);
        let (xj, yj) = (ring[j][0], ring[j][1]);
        if (yi > p[1]) != (yj > p[1]) && p[0] < (xj - xi) * (p[1] - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn polygon_distance(p: Coord, rings: &[Vec<Coord>]) -> f64 {
    let Some(exterior) = rings.first() else {
        return f64::INFINITY;
    };
    if ring_contains(p, exterior) && !rings[1..].iter().any(|hole| ring_contains(p, hole)) {
        return 0.0;
    }
    rings
        .iter()
        .map(|ring| line_distance(p, ring))
        .fold(f64::INFINITY, f64::min)
}

/// Shoelace sum; negative for clockwise rings.
fn signed_area(ring: &[Coord]) -> f64 {
    ring.windows(2)
        .map(|w| w[0][0] * w[1][1] - w[1][0] * w[0][1])
        .sum::<f64>()
        / 2.0
}

/// ArcGIS stores exterior rings clockwise and holes counter-clockwise.
fn rings_to_polygons(rings: Vec<Vec<Coord>>) -> Geometry {
    let mut polygons: Vec<Vec<Vec<Coord>>> = Vec::new();
    let mut holes = Vec::new();

    for ring in rings.into_iter().filter(|r| !r.is_empty()) {
        if signed_area(&ring) <= 0.0 {
            polygons.push(vec![ring]);
        } else {
            holes.push(ring);
        }
    }

    for hole in holes {
        let owner = polygons
            .iter_mut()
            .find(|poly| ring_contains(hole[0], &poly[0]));
        match owner {
            Some(poly) => poly.push(hole),
            // Orphan counter-clockwise rings are treated as exteriors
            None => polygons.push(vec![hole]),
        }
    }

    if polygons.len() == 1 {
        Geometry::Polygon(polygons.remove(0))
    } else {
        Geometry::MultiPolygon(polygons)
    }
}
