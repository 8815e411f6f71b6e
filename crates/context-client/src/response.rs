//! Query response as the client sees it.
//!
//! The API answers with one of three shapes: a flat object of scalars, an
//! object carrying `services: [{name, key, value}]`, or one carrying
//! `groups: [{name, key, group_type, services}]`. Scalars other than
//! `services` and `groups` are kept in response order as details.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ClientError, ClientResult};

pub const GRAPH_GROUP_TYPE: &str = "graph";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRow {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

fn default_group_type() -> String {
    "text".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRow {
    pub key: String,
    pub name: String,
    #[serde(default = "default_group_type")]
    pub group_type: String,
    #[serde(default)]
    pub services: Vec<ServiceRow>,
}

impl GroupRow {
    pub fn is_graph(&self) -> bool {
        self.group_type == GRAPH_GROUP_TYPE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Only scalar fields.
    Details,
    Services(Vec<ServiceRow>),
    Groups(Vec<GroupRow>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    /// Every field except `services` and `groups`, in response order.
    pub details: Vec<(String, Value)>,
    pub body: ResponseBody,
}

fn invalid(message: &str) -> ClientError {
    ClientError::Json(<serde_json::Error as serde::de::Error>::custom(message))
}

impl QueryResponse {
    pub fn from_json(text: &str) -> ClientResult<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    pub fn from_value(value: Value) -> ClientResult<Self> {
        let Value::Object(mut object) = value else {
            return Err(invalid("query response is not a JSON object"));
        };

        let body = if let Some(groups) = object.remove("groups") {
            object.remove("services");
            ResponseBody::Groups(serde_json::from_value(groups)?)
        } else if let Some(services) = object.remove("services") {
            ResponseBody::Services(serde_json::from_value(services)?)
        } else {
            ResponseBody::Details
        };

        Ok(Self {
            details: object.into_iter().collect(),
            body,
        })
    }

    /// Scalar field by name.
    pub fn detail(&self, name: &str) -> Option<&Value> {
        self.details.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn detail_str(&self, name: &str) -> Option<&str> {
        self.detail(name).and_then(Value::as_str)
    }

    /// Back to a JSON object, details first.
    pub fn to_value(&self) -> Value {
        let mut object: Map<String, Value> = self.details.iter().cloned().collect();
        match &self.body {
            ResponseBody::Details => {}
            ResponseBody::Services(services) => {
                object.insert("services".to_string(), serde_json::json!(services));
            }
            ResponseBody::Groups(groups) => {
                object.insert("groups".to_string(), serde_json::json!(groups));
            }
        }
        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_service_shape() {
        let response = QueryResponse::from_value(json!({
            "key": "altitude",
            "value": "1225.5",
            "name": "Altitude",
            "query_type": "WMS"
        }))
        .unwrap();
        assert_eq!(response.body, ResponseBody::Details);
        let keys: Vec<_> = response.details.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["key", "value", "name", "query_type"]);
        assert_eq!(response.detail_str("value"), Some("1225.5"));
    }

    #[test]
    fn test_group_shape() {
        let response = QueryResponse::from_value(json!({
            "key": "rainfall",
            "name": "Rainfall",
            "group_type": "graph",
            "services": [{"key": "rainfall_january", "name": "Rainfall January", "value": "61.2"}]
        }))
        .unwrap();
        match &response.body {
            ResponseBody::Services(services) => assert_eq!(services[0].value, json!("61.2")),
            other => panic!("unexpected body {:?}", other),
        }
        assert_eq!(response.detail_str("group_type"), Some("graph"));
    }

    #[test]
    fn test_collection_shape() {
        let response = QueryResponse::from_value(json!({
            "key": "sample_collection",
            "name": "Sample Collection",
            "groups": [{
                "key": "terrain",
                "name": "Terrain",
                "services": [{"key": "altitude", "name": "Altitude", "value": null}]
            }]
        }))
        .unwrap();
        match &response.body {
            ResponseBody::Groups(groups) => {
                assert_eq!(groups[0].group_type, "text");
                assert!(!groups[0].is_graph());
                assert_eq!(groups[0].services[0].value, Value::Null);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_not_an_object() {
        assert!(QueryResponse::from_json("[1, 2]").is_err());
        assert!(QueryResponse::from_json("not json").is_err());
    }

    #[test]
    fn test_to_value_keeps_shape() {
        let original = json!({
            "key": "rainfall",
            "name": "Rainfall",
            "services": [{"key": "rainfall_january", "name": "Rainfall January", "value": "61.2"}]
        });
        let response = QueryResponse::from_value(original.clone()).unwrap();
        assert_eq!(response.to_value(), original);
    }
}
