//! Context values returned by a query, nested per registry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GeoContextError;
use crate::group::{Group, GroupType};
use crate::service::{QueryType, Service};
use crate::collection::Collection;

/// Value of one service at the query point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceValue {
    pub key: String,
    pub value: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub query_type: QueryType,
}

impl ServiceValue {
    pub fn from_service(service: &Service, value: Option<String>) -> Self {
        Self {
            key: service.key.clone(),
            value,
            name: service.name.clone(),
            description: service.description.clone(),
            query_type: service.query_type,
        }
    }
}

/// A group and its service values, in group order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupValues {
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub group_type: GroupType,
    pub graphable: bool,
    pub services: Vec<ServiceValue>,
}

impl GroupValues {
    pub fn from_group(group: &Group, services: Vec<ServiceValue>) -> Self {
        Self {
            key: group.key.clone(),
            name: group.name.clone(),
            description: group.description.clone(),
            group_type: group.group_type,
            graphable: group.graphable,
            services,
        }
    }
}

/// A collection and its groups, in collection order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionValues {
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub groups: Vec<GroupValues>,
}

impl CollectionValues {
    pub fn from_collection(collection: &Collection, groups: Vec<GroupValues>) -> Self {
        Self {
            key: collection.key.clone(),
            name: collection.name.clone(),
            description: collection.description.clone(),
            groups,
        }
    }
}

/// Result of one query, shaped by the registry that was asked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryResult {
    Collection(CollectionValues),
    Group(GroupValues),
    Service(ServiceValue),
}

impl QueryResult {
    /// Wrap as a GeoJSON point feature at `(x, y)`.
    pub fn into_feature(self, x: f64, y: f64) -> QueryFeature {
        QueryFeature {
            type_: "Feature".to_string(),
            properties: self,
            geometry: PointGeometry {
                type_: "Point".to_string(),
                coordinates: [x, y],
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub type_: String,
    pub coordinates: [f64; 2],
}

/// GeoJSON wrapper used by `outformat=geojson`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFeature {
    #[serde(rename = "type")]
    pub type_: String,
    pub properties: QueryResult,
    pub geometry: PointGeometry,
}

/// Requested output encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    #[default]
    GeoJson,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::GeoJson => "geojson",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = GeoContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "geojson" => Ok(OutputFormat::GeoJson),
            _ => Err(GeoContextError::InvalidOutputFormat(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn altitude() -> ServiceValue {
        ServiceValue {
            key: "altitude".to_string(),
            value: Some("1225.5".to_string()),
            name: "Altitude".to_string(),
            description: None,
            query_type: QueryType::Wms,
        }
    }

    #[test]
    fn test_untagged_roundtrip_picks_shape() {
        let group = QueryResult::Group(GroupValues {
            key: "terrain".to_string(),
            name: "Terrain".to_string(),
            description: None,
            group_type: GroupType::Text,
            graphable: false,
            services: vec![altitude()],
        });
        let json = serde_json::to_string(&group).unwrap();
        let back: QueryResult = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, QueryResult::Group(_)));

        let service = QueryResult::Service(altitude());
        let json = serde_json::to_string(&service).unwrap();
        let back: QueryResult = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, QueryResult::Service(_)));
    }

    #[test]
    fn test_service_value_serializes_null_value() {
        let mut value = altitude();
        value.value = None;
        let json = serde_json::to_value(&value).unwrap();
        assert!(json["value"].is_null());
        assert_eq!(json["query_type"], "WMS");
    }

    #[test]
    fn test_into_feature() {
        let feature = QueryResult::Service(altitude()).into_feature(23.55, -30.55);
        let json = serde_json::to_value(&feature).unwrap();
        assert_eq!(json["type"], "Feature");
        assert_eq!(json["geometry"]["type"], "Point");
        assert_eq!(json["geometry"]["coordinates"][0], 23.55);
        assert_eq!(json["properties"]["key"], "altitude");
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "GeoJSON".parse::<OutputFormat>().unwrap(),
            OutputFormat::GeoJson
        );
        let err = "xml".parse::<OutputFormat>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Output format should be either json or geojson"
        );
        assert_eq!(OutputFormat::default(), OutputFormat::GeoJson);
    }
}
