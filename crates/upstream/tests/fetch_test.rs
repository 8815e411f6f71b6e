//! Fetching against an in-process mock upstream.

use std::time::Duration;

use context_common::{QueryType, Service};
use geometry::{Geometry, Point};
use serde_json::json;
use test_utils::fixtures::{self, TEST_LAT, TEST_LON};
use test_utils::{MockRoute, MockUpstream};
use upstream::{ServiceQuery, UpstreamClient, UpstreamConfig};

fn client() -> UpstreamClient {
    UpstreamClient::new(UpstreamConfig::default()).unwrap()
}

fn query(service: Service) -> ServiceQuery {
    ServiceQuery::new(service, &Point::wgs84(TEST_LON, TEST_LAT), 10.0).unwrap()
}

#[tokio::test]
async fn test_fetch_all_sample_services() {
    let mock = MockUpstream::start(fixtures::sample_routes()).await;
    let queries: Vec<_> = fixtures::sample_services_at(mock.base_url())
        .into_iter()
        .map(query)
        .collect();

    let results = client().fetch_all(&queries).await;

    let keys: Vec<_> = results.iter().map(|r| r.service_key.as_str()).collect();
    assert_eq!(
        keys,
        vec!["altitude", "rainfall_january", "rainfall_february", "rainfall_march"]
    );
    assert_eq!(results[0].value.as_deref(), Some(fixtures::ALTITUDE_VALUE));
    for (result, expected) in results[1..].iter().zip(fixtures::RAINFALL_VALUES) {
        assert_eq!(result.value.as_deref(), Some(expected));
    }
    assert_eq!(results[0].geometry, Some(Geometry::Point([TEST_LON, TEST_LAT])));
    assert!(results[0]
        .source_uri
        .as_deref()
        .unwrap()
        .starts_with(&mock.url("/wms?")));
    assert_eq!(mock.hits("/wms"), 1);
    assert_eq!(mock.hits("/wfs"), 3);
}

#[tokio::test]
async fn test_wms_request_parameters() {
    let mock = MockUpstream::start(fixtures::sample_routes()).await;
    let service = fixtures::wms_service("altitude", &mock.url("/wms"));
    client().fetch(&query(service)).await;

    let request = &mock.requests()[0];
    assert_eq!(request.param("REQUEST"), Some("GetFeatureInfo"));
    assert_eq!(request.param("QUERY_LAYERS"), Some("sa:altitude"));
    assert_eq!(request.param("INFO_FORMAT"), Some("application/json"));
    assert_eq!(request.param("I"), Some("50"));
}

#[tokio::test]
async fn test_wfs_retries_with_bbox() {
    let mock = MockUpstream::start(vec![
        MockRoute::json(
            "/wfs",
            fixtures::feature_collection("rainfall", json!("12.5 "), TEST_LON, TEST_LAT),
        )
        .with_param("SRSNAME", "EPSG:4326"),
        MockRoute::json("/wfs", fixtures::empty_feature_collection()),
    ])
    .await;
    let service = fixtures::wfs_service("rainfall_january", &mock.url("/wfs"), "rainfall");

    let result = client().fetch(&query(service)).await;

    assert_eq!(result.value.as_deref(), Some("12.5"));
    let requests = mock.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].param("FILTER").is_some());
    assert!(requests[1].param("FILTER").is_none());
    assert!(requests[1].param("BBOX").is_some());
    assert!(result.source_uri.unwrap().contains("SRSNAME=EPSG%3A4326"));
}

#[tokio::test]
async fn test_no_features_yields_no_value() {
    let mock = MockUpstream::start(vec![MockRoute::json(
        "/wfs",
        fixtures::empty_feature_collection(),
    )])
    .await;
    let service = fixtures::wfs_service("rainfall_january", &mock.url("/wfs"), "rainfall");

    let result = client().fetch(&query(service)).await;
    assert!(result.value.is_none());
    assert!(result.geometry.is_none());
    assert_eq!(mock.hits("/wfs"), 2);
}

#[tokio::test]
async fn test_error_status_yields_no_value() {
    let mock = MockUpstream::start(vec![MockRoute::text(
        "/wms",
        "text/plain",
        "boom",
    )
    .with_status(500)])
    .await;
    let service = fixtures::wms_service("altitude", &mock.url("/wms"));

    let result = client().fetch(&query(service)).await;
    assert_eq!(result.service_key, "altitude");
    assert!(result.value.is_none());
}

#[tokio::test]
async fn test_json_parsed_whatever_content_type() {
    let body = fixtures::feature_collection("altitude", json!(880), TEST_LON, TEST_LAT);
    let mock = MockUpstream::start(vec![MockRoute::text(
        "/wms",
        "text/html",
        &body.to_string(),
    )])
    .await;
    let service = fixtures::wms_service("altitude", &mock.url("/wms"));

    let result = client().fetch(&query(service)).await;
    assert_eq!(result.value.as_deref(), Some("880"));
}

#[tokio::test]
async fn test_invalid_json_yields_no_value() {
    let mock = MockUpstream::start(vec![MockRoute::text(
        "/wms",
        "application/json",
        "<ServiceExceptionReport/>",
    )])
    .await;
    let service = fixtures::wms_service("altitude", &mock.url("/wms"));

    assert!(client().fetch(&query(service)).await.value.is_none());
}

#[tokio::test]
async fn test_timeout_yields_no_value() {
    let mock = MockUpstream::start(vec![MockRoute::json(
        "/wms",
        fixtures::feature_collection("altitude", json!("1"), TEST_LON, TEST_LAT),
    )
    .with_delay(Duration::from_secs(2))])
    .await;
    let client = UpstreamClient::new(UpstreamConfig {
        timeout: Duration::from_millis(200),
        ..UpstreamConfig::default()
    })
    .unwrap();
    let service = fixtures::wms_service("altitude", &mock.url("/wms"));

    assert!(client.fetch(&query(service)).await.value.is_none());
}

#[tokio::test]
async fn test_one_failure_does_not_fail_others() {
    let mut routes = fixtures::sample_routes();
    routes[0] = MockRoute::text("/wms", "text/plain", "down").with_status(503);
    let mock = MockUpstream::start(routes).await;
    let queries: Vec<_> = fixtures::sample_services_at(mock.base_url())
        .into_iter()
        .map(query)
        .collect();

    let results = client().fetch_all(&queries).await;
    assert!(results[0].value.is_none());
    assert!(results[1..].iter().all(|r| r.value.is_some()));
}

#[tokio::test]
async fn test_unimplemented_query_type_sends_nothing() {
    let mock = MockUpstream::start(fixtures::sample_routes()).await;
    let mut service = fixtures::wms_service("altitude", &mock.url("/wms"));
    service.query_type = QueryType::Wcs;

    let result = client().fetch(&query(service)).await;
    assert!(result.value.is_none());
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_nearest_feature_wins() {
    let body = json!({
        "type": "FeatureCollection",
        "features": [
            {"properties": {"altitude": "far"}, "geometry": {"type": "Point", "coordinates": [TEST_LON + 0.01, TEST_LAT]}},
            {"properties": {"altitude": "near"}, "geometry": {"type": "Point", "coordinates": [TEST_LON + 0.0001, TEST_LAT]}},
        ]
    });
    let mock = MockUpstream::start(vec![MockRoute::json("/wms", body)]).await;
    let service = fixtures::wms_service("altitude", &mock.url("/wms"));

    let result = client().fetch(&query(service)).await;
    assert_eq!(result.value.as_deref(), Some("near"));
}

#[tokio::test]
async fn test_arcrest_identify() {
    let body = json!({
        "results": [{
            "layerId": 0,
            "attributes": {"PIXEL": "Grassland"},
            "geometry": {"x": TEST_LON, "y": TEST_LAT, "spatialReference": {"wkid": 4326}}
        }]
    });
    let mock = MockUpstream::start(vec![MockRoute::json("/arcgis/MapServer/identify", body)]).await;
    let service = fixtures::arcrest_service("land_cover", &mock.url("/arcgis/MapServer/"), "PIXEL");

    let result = client().fetch(&query(service)).await;
    assert_eq!(result.value.as_deref(), Some("Grassland"));
    assert_eq!(result.geometry, Some(Geometry::Point([TEST_LON, TEST_LAT])));
    let request = &mock.requests()[0];
    assert_eq!(request.param("geometryType"), Some("esriGeometryPoint"));
}

#[tokio::test]
async fn test_placename() {
    let body = json!({
        "geonames": [{
            "toponymName": "Richmond",
            "lat": "-31.41",
            "lng": "23.94",
            "distance": "5.2"
        }]
    });
    let mock = MockUpstream::start(vec![MockRoute::json("/findNearbyPlaceNameJSON", body)]).await;
    let service = fixtures::placename_service("place_name", &mock.url("/findNearbyPlaceNameJSON"));

    let result = client().fetch(&query(service)).await;
    assert_eq!(result.value.as_deref(), Some("Richmond"));
    assert_eq!(mock.requests()[0].param("username"), Some("geocontext"));
}

#[tokio::test]
async fn test_layer_extent_from_capabilities() {
    let xml = r#"<WMS_Capabilities version="1.3.0"><Capability><Layer>
        <Layer><Name>sa:altitude</Name>
        <BoundingBox CRS="EPSG:4326" minx="16.4" miny="-34.8" maxx="32.9" maxy="-22.1"/>
        </Layer></Layer></Capability></WMS_Capabilities>"#;
    let mock = MockUpstream::start(vec![
        MockRoute::text("/wms", "text/xml", xml).with_param("REQUEST", "GetCapabilities"),
    ])
    .await;
    let service = fixtures::wms_service("altitude", &mock.url("/wms"));

    let extent = client().layer_extent(&service).await.unwrap().unwrap();
    assert_eq!(extent.crs.as_deref(), Some("EPSG:4326"));
    assert_eq!(extent.bbox, "16.4,-34.8,32.9,-22.1");
}
