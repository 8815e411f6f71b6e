//! Service registry model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{DEFAULT_CACHE_DURATION_SECS, DEFAULT_SRID, DEFAULT_TOLERANCE};

/// Upstream protocol of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryType {
    #[serde(rename = "WFS")]
    Wfs,
    #[serde(rename = "WCS")]
    Wcs,
    #[serde(rename = "WMS")]
    Wms,
    #[serde(rename = "REST")]
    Rest,
    #[serde(rename = "ArcREST")]
    ArcRest,
    #[serde(rename = "Wikipedia")]
    Wikipedia,
    #[serde(rename = "PlaceName")]
    PlaceName,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Wfs => "WFS",
            QueryType::Wcs => "WCS",
            QueryType::Wms => "WMS",
            QueryType::Rest => "REST",
            QueryType::ArcRest => "ArcREST",
            QueryType::Wikipedia => "Wikipedia",
            QueryType::PlaceName => "PlaceName",
        }
    }

    /// Whether the upstream fetcher exists for this query type.
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            QueryType::Wfs | QueryType::Wms | QueryType::ArcRest | QueryType::PlaceName
        )
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WFS" => Ok(QueryType::Wfs),
            "WCS" => Ok(QueryType::Wcs),
            "WMS" => Ok(QueryType::Wms),
            "REST" => Ok(QueryType::Rest),
            "ArcREST" => Ok(QueryType::ArcRest),
            "Wikipedia" => Ok(QueryType::Wikipedia),
            "PlaceName" => Ok(QueryType::PlaceName),
            other => Err(format!("Unknown query type: {}", other)),
        }
    }
}

fn default_cache_duration() -> i64 {
    DEFAULT_CACHE_DURATION_SECS
}

fn default_srid() -> i32 {
    DEFAULT_SRID
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

/// A single upstream layer that yields one value per point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,

    /// Base URL of the upstream endpoint.
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,

    pub query_type: QueryType,

    /// Attribute holding the value in returned features.
    pub layer_name: String,
    #[serde(default)]
    pub layer_namespace: Option<String>,
    #[serde(default)]
    pub layer_typename: Option<String>,
    #[serde(default)]
    pub layer_workspace: Option<String>,

    /// Seconds a fetched value stays valid.
    #[serde(default = "default_cache_duration")]
    pub cache_duration: i64,
    #[serde(default = "default_srid")]
    pub srid: i32,
    /// Metres around the query point a cached value still answers for.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default)]
    pub service_version: String,

    #[serde(default)]
    pub provenance: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub licensing: Option<String>,

    #[serde(default)]
    pub test_x: Option<f64>,
    #[serde(default)]
    pub test_y: Option<f64>,
    #[serde(default)]
    pub test_value: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Service {
    /// Minimal service with defaults for everything optional.
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        query_type: QueryType,
        layer_name: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: None,
            url: url.into(),
            username: None,
            password: None,
            api_key: None,
            query_type,
            layer_name: layer_name.into(),
            layer_namespace: None,
            layer_typename: None,
            layer_workspace: None,
            cache_duration: DEFAULT_CACHE_DURATION_SECS,
            srid: DEFAULT_SRID,
            tolerance: DEFAULT_TOLERANCE,
            service_version: String::new(),
            provenance: None,
            notes: None,
            licensing: None,
            test_x: None,
            test_y: None,
            test_value: None,
            status: None,
        }
    }

    /// Typename sent as LAYERS/TYPENAME, falling back to the layer name.
    pub fn typename(&self) -> &str {
        self.layer_typename
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.layer_name)
    }

    /// Test coordinates, when both are configured.
    pub fn test_point(&self) -> Option<(f64, f64)> {
        match (self.test_x, self.test_y) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_type_serde_names() {
        let json = serde_json::to_string(&QueryType::ArcRest).unwrap();
        assert_eq!(json, "\"ArcREST\"");

        let parsed: QueryType = serde_json::from_str("\"PlaceName\"").unwrap();
        assert_eq!(parsed, QueryType::PlaceName);
        assert_eq!("WMS".parse::<QueryType>().unwrap(), QueryType::Wms);
        assert!("wms".parse::<QueryType>().is_err());
    }

    #[test]
    fn test_supported_query_types() {
        assert!(QueryType::Wms.is_supported());
        assert!(QueryType::Wfs.is_supported());
        assert!(!QueryType::Wcs.is_supported());
        assert!(!QueryType::Wikipedia.is_supported());
    }

    #[test]
    fn test_service_defaults_from_json() {
        let service: Service = serde_json::from_value(serde_json::json!({
            "key": "altitude",
            "name": "Altitude",
            "url": "http://maps.example.org/wms",
            "query_type": "WMS",
            "layer_name": "GRAY_INDEX",
            "service_version": "1.3.0"
        }))
        .unwrap();

        assert_eq!(service.cache_duration, 604_800);
        assert_eq!(service.srid, 4326);
        assert_eq!(service.tolerance, 10.0);
        assert!(service.description.is_none());
        assert_eq!(service.typename(), "GRAY_INDEX");
        assert!(service.test_point().is_none());
    }

    #[test]
    fn test_typename_prefers_layer_typename() {
        let mut service = Service::new("a", "A", "http://x", QueryType::Wfs, "name");
        service.layer_typename = Some("ns:layer".to_string());
        assert_eq!(service.typename(), "ns:layer");
        service.layer_typename = Some(String::new());
        assert_eq!(service.typename(), "name");
    }
}
