//! Common test fixtures for GeoContext tests.
//!
//! The sample registry has four services, two groups and one collection:
//!
//! - `altitude` (WMS 1.3.0) in group `terrain` (text)
//! - `rainfall_january`, `rainfall_february`, `rainfall_march` (WFS 2.0.0)
//!   in group `rainfall` (graph)
//! - collection `sample_collection` = `terrain`, `rainfall`

use context_common::{Collection, Group, GroupType, QueryType, Service};
use serde_json::{json, Value};

use crate::mock_upstream::MockRoute;

/// Query point used across tests (lon, lat).
pub const TEST_LON: f64 = 23.55;
pub const TEST_LAT: f64 = -30.55;

/// Placeholder upstream for tests that never fetch.
pub const UNUSED_UPSTREAM: &str = "http://127.0.0.1:9";

pub const MONTHS: [&str; 3] = ["january", "february", "march"];

/// Rainfall values served by the mock upstream, by month.
pub const RAINFALL_VALUES: [&str; 3] = ["61.2", "55.75", "48"];

pub const ALTITUDE_VALUE: &str = "1225.5";

fn title(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn wms_service(key: &str, url: &str) -> Service {
    let mut service = Service::new(key, title(key), url, QueryType::Wms, key);
    service.layer_typename = Some(format!("sa:{}", key));
    service.service_version = "1.3.0".to_string();
    service
}

pub fn wfs_service(key: &str, url: &str, layer_name: &str) -> Service {
    let mut service = Service::new(key, title(key), url, QueryType::Wfs, layer_name);
    service.layer_typename = Some(format!("sa:{}", key));
    service.service_version = "2.0.0".to_string();
    service
}

pub fn arcrest_service(key: &str, url: &str, layer_name: &str) -> Service {
    let mut service = Service::new(key, title(key), url, QueryType::ArcRest, layer_name);
    service.layer_typename = Some("0".to_string());
    service.service_version = "10.81".to_string();
    service
}

pub fn placename_service(key: &str, url: &str) -> Service {
    let mut service = Service::new(key, title(key), url, QueryType::PlaceName, "toponymName");
    service.username = Some("geocontext".to_string());
    service
}

/// The four sample services, fetching from `base_url`.
pub fn sample_services_at(base_url: &str) -> Vec<Service> {
    let mut altitude = wms_service("altitude", &format!("{}/wms", base_url));
    altitude.description = Some("Height above sea level in metres".to_string());
    altitude.test_x = Some(TEST_LON);
    altitude.test_y = Some(TEST_LAT);
    altitude.test_value = Some(ALTITUDE_VALUE.to_string());

    let mut services = vec![altitude];
    for month in MONTHS {
        services.push(wfs_service(
            &format!("rainfall_{}", month),
            &format!("{}/wfs", base_url),
            "rainfall",
        ));
    }
    services
}

pub fn sample_services() -> Vec<Service> {
    sample_services_at(UNUSED_UPSTREAM)
}

pub fn sample_groups() -> Vec<Group> {
    let terrain = Group::new("terrain", "Terrain").with_services(["altitude"]);

    let mut rainfall = Group::new("rainfall", "Rainfall")
        .with_services(MONTHS.iter().map(|m| format!("rainfall_{}", m)));
    rainfall.group_type = GroupType::Graph;
    rainfall.graphable = true;
    rainfall.description = Some("Mean monthly rainfall (mm)".to_string());

    vec![terrain, rainfall]
}

pub fn sample_collection() -> Collection {
    Collection::new("sample_collection", "Sample Collection").with_groups(["terrain", "rainfall"])
}

/// The sample registry as an import document, fetching from `base_url`.
pub fn sample_registry_json_at(base_url: &str) -> Value {
    json!({
        "services": sample_services_at(base_url),
        "groups": sample_groups(),
        "collections": [sample_collection()],
    })
}

pub fn sample_registry_json() -> Value {
    sample_registry_json_at(UNUSED_UPSTREAM)
}

/// GeoJSON feature collection with one point feature carrying `value` under `layer_name`.
pub fn feature_collection(layer_name: &str, value: Value, lon: f64, lat: f64) -> Value {
    json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "id": format!("{}.1", layer_name),
            "properties": { layer_name: value },
            "geometry": {"type": "Point", "coordinates": [lon, lat]}
        }]
    })
}

pub fn empty_feature_collection() -> Value {
    json!({"type": "FeatureCollection", "features": []})
}

/// Mock routes answering every sample service at the test point.
pub fn sample_routes() -> Vec<MockRoute> {
    let mut routes = vec![MockRoute::json(
        "/wms",
        feature_collection("altitude", json!(ALTITUDE_VALUE), TEST_LON, TEST_LAT),
    )];
    for (month, value) in MONTHS.iter().zip(RAINFALL_VALUES) {
        routes.push(
            MockRoute::json(
                "/wfs",
                feature_collection("rainfall", json!(value), TEST_LON, TEST_LAT),
            )
            .with_param("TYPENAME", &format!("sa:rainfall_{}", month)),
        );
    }
    routes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title("rainfall_january"), "Rainfall January");
        assert_eq!(title("altitude"), "Altitude");
    }

    #[test]
    fn test_sample_registry_is_consistent() {
        let services = sample_services();
        let groups = sample_groups();
        for group in &groups {
            for key in &group.service_keys {
                assert!(services.iter().any(|s| &s.key == key), "missing {}", key);
            }
        }
        for key in &sample_collection().group_keys {
            assert!(groups.iter().any(|g| &g.key == key));
        }
    }

    #[test]
    fn test_registry_json_shape() {
        let json = sample_registry_json_at("http://upstream");
        assert_eq!(json["services"].as_array().unwrap().len(), 4);
        assert_eq!(json["services"][0]["url"], "http://upstream/wms");
        assert_eq!(json["groups"][1]["group_type"], "graph");
        assert_eq!(json["collections"][0]["group_keys"][1], "rainfall");
    }
}
