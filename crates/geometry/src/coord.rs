//! Parsing of user-entered coordinates.
//!
//! Accepts decimal degrees (`-30.55`), degrees and decimal minutes
//! (`30°33'S`) and degrees, minutes, decimal seconds (`30°33'0.5"S`).
//! A trailing or leading cardinal letter is allowed; S and W negate.

use thiserror::Error;

use crate::point::Point;

#[derive(Debug, Error, PartialEq)]
pub enum CoordError {
    #[error("Coord '{0}' parse failed. Only DD, DM, DMS sep=(°,',\")")]
    InvalidCoordinate(String),

    #[error("SRID: '{0}' not valid")]
    InvalidSrid(String),
}

const CARDINALS: [char; 8] = ['N', 'n', 'E', 'e', 'S', 's', 'W', 'w'];

/// Parse `x` (longitude) and `y` (latitude) strings into a point in `srid`.
pub fn parse_coord(x: &str, y: &str, srid: &str) -> Result<Point, CoordError> {
    let srid: i32 = srid
        .trim()
        .parse()
        .map_err(|_| CoordError::InvalidSrid(srid.to_string()))?;

    let x = parse_component(x)?;
    let y = parse_component(y)?;
    Ok(Point::new(x, y, srid))
}

/// Parse one DD/DM/DMS value.
pub fn parse_component(raw: &str) -> Result<f64, CoordError> {
    let invalid = || CoordError::InvalidCoordinate(raw.to_string());

    let upper = raw.to_uppercase();
    let mut sign = if upper.contains('S') || upper.contains('W') {
        -1.0
    } else {
        1.0
    };

    let stripped: String = raw.chars().filter(|c| !CARDINALS.contains(c)).collect();
    let parts: Vec<&str> = stripped
        .split(['°', '\'', '"'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let (degrees, minutes, seconds) = match parts.as_slice() {
        [d] => (d.parse::<f64>().map_err(|_| invalid())?, 0.0, 0.0),
        [d, m] => (
            d.parse::<i64>().map_err(|_| invalid())? as f64,
            m.parse::<f64>().map_err(|_| invalid())?,
            0.0,
        ),
        [d, m, s] => (
            d.parse::<i64>().map_err(|_| invalid())? as f64,
            m.parse::<i64>().map_err(|_| invalid())? as f64,
            s.parse::<f64>().map_err(|_| invalid())?,
        ),
        _ => return Err(invalid()),
    };

    // A signed degree carries the sign for its minutes and seconds too
    if degrees < 0.0 || (degrees == 0.0 && parts[0].starts_with('-')) {
        sign = -sign;
    }
    let value = sign * (degrees.abs() + minutes / 60.0 + seconds / 3600.0);

    if !value.is_finite() {
        return Err(invalid());
    }
    Ok(value)
}
