//! Picking a value out of upstream features.
//!
//! A response may carry several features. Each one contributes a value
//! when it has the service's attribute; the feature whose geometry lies
//! nearest the query point wins, and the first feature is used when no
//! geometry can be parsed.

use geometry::{Geometry, Point};
use serde_json::Value;
use tracing::debug;

/// Geometry encoding used by an upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryFormat {
    GeoJson,
    ArcGis,
}

/// One candidate value with its raw geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureValue {
    pub value: String,
    pub geometry: Option<Value>,
}

/// Render an attribute as a context value.
///
/// Trailing spaces are stripped. Null, empty and structured attributes
/// yield nothing.
pub fn attribute_value(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => {
            let trimmed = s.trim_end_matches(' ');
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lookup<'a>(feature: &'a Value, layer_name: &str) -> Option<&'a Value> {
    ["properties", "attributes"]
        .iter()
        .find_map(|container| feature.get(container).and_then(|c| c.get(layer_name)))
        .or_else(|| feature.get(layer_name))
}

/// Values of `layer_name` in `features`, skipping features without one.
pub fn extract_values(features: &[Value], layer_name: &str) -> Vec<FeatureValue> {
    features
        .iter()
        .filter_map(|feature| {
            let Some(value) = lookup(feature, layer_name).and_then(attribute_value) else {
                debug!(layer = layer_name, "No value found for feature");
                return None;
            };
            Some(FeatureValue {
                value,
                geometry: feature.get("geometry").filter(|g| !g.is_null()).cloned(),
            })
        })
        .collect()
}

/// The value nearest `point`, with its parsed geometry.
///
/// Returns `None` only when `candidates` is empty.
pub fn nearest(
    candidates: Vec<FeatureValue>,
    point: &Point,
    format: GeometryFormat,
) -> Option<(String, Option<Geometry>)> {
    let mut candidates = candidates.into_iter();
    let first = candidates.next()?;

    let mut best: Option<(f64, String, Geometry)> = None;
    let mut consider = |candidate: FeatureValue| {
        let Some(raw) = candidate.geometry.as_ref() else {
            return;
        };
        let parsed = match format {
            GeometryFormat::GeoJson => Geometry::from_geojson(raw),
            GeometryFormat::ArcGis => Geometry::from_arcgis(raw),
        };
        match parsed {
            Ok(geometry) => {
                let distance = geometry.distance_to(point.x, point.y);
                if best.as_ref().map_or(true, |(d, _, _)| distance < *d) {
                    best = Some((distance, candidate.value, geometry));
                }
            }
            Err(e) => debug!(error = %e, "Skipping unparseable feature geometry"),
        }
    };

    let fallback = first.value.clone();
    consider(first);
    candidates.for_each(&mut consider);

    match best {
        Some((_, value, geometry)) => Some((value, Some(geometry))),
        None => Some((fallback, None)),
    }
}
