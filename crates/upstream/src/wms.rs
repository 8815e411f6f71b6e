//! WMS GetFeatureInfo.

use async_trait::async_trait;
use context_common::QueryType;
use reqwest::Url;

use crate::error::{FetchError, FetchResult};
use crate::query::ServiceQuery;
use crate::source::ValueSource;
use crate::url::{build_source_uri, Params};

/// Pixel size of the GetFeatureInfo map; the query point is its centre.
const MAP_SIZE: u32 = 101;
const CENTRE_PIXEL: u32 = 50;

pub struct WmsSource;

/// GetFeatureInfo parameters for the tolerance box centred on the point.
pub fn wms_params(query: &ServiceQuery) -> FetchResult<Params> {
    let service = &query.service;
    let typename = service.typename().to_string();
    let bbox = query.bbox()?;
    let crs = format!("EPSG:{}", query.point.srid);

    let mut params: Params = vec![
        ("SERVICE", QueryType::Wms.to_string()),
        ("VERSION", service.service_version.clone()),
        ("INFO_FORMAT", "application/json".to_string()),
        ("LAYERS", typename.clone()),
        ("QUERY_LAYERS", typename),
        ("FEATURE_COUNT", query.max_features.to_string()),
        ("BBOX", bbox.to_param_string(false)),
        ("WIDTH", MAP_SIZE.to_string()),
        ("HEIGHT", MAP_SIZE.to_string()),
    ];

    match service.service_version.as_str() {
        "1.0.0" | "1.1.0" | "1.1.1" => params.extend([
            ("REQUEST", "feature_info".to_string()),
            ("SRS", crs),
            ("X", CENTRE_PIXEL.to_string()),
            ("Y", CENTRE_PIXEL.to_string()),
        ]),
        "1.3.0" => params.extend([
            ("REQUEST", "GetFeatureInfo".to_string()),
            ("CRS", crs),
            ("I", CENTRE_PIXEL.to_string()),
            ("J", CENTRE_PIXEL.to_string()),
        ]),
        other => {
            return Err(FetchError::UnsupportedVersion {
                query_type: QueryType::Wms,
                version: other.to_string(),
            })
        }
    }
    Ok(params)
}

#[async_trait]
impl ValueSource for WmsSource {
    fn query_type(&self) -> QueryType {
        QueryType::Wms
    }

    fn request(&self, query: &ServiceQuery) -> FetchResult<Url> {
        build_source_uri(&query.service.url, &wms_params(query)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geometry::Point;
    use test_utils::fixtures;

    fn query(version: &str) -> ServiceQuery {
        let mut service = fixtures::wms_service("altitude", "http://example.com/wms");
        service.service_version = version.to_string();
        ServiceQuery::new(service, &Point::wgs84(23.55, -30.55), 10.0).unwrap()
    }

    fn param<'a>(params: &'a Params, name: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| *k == name).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_wms_130_params() {
        let params = wms_params(&query("1.3.0")).unwrap();
        assert_eq!(param(&params, "REQUEST"), Some("GetFeatureInfo"));
        assert_eq!(param(&params, "I"), Some("50"));
        assert_eq!(param(&params, "J"), Some("50"));
        assert_eq!(param(&params, "CRS"), Some("EPSG:4326"));
        assert_eq!(param(&params, "QUERY_LAYERS"), Some("sa:altitude"));
        assert_eq!(param(&params, "FEATURE_COUNT"), Some("10"));
        assert_eq!(param(&params, "WIDTH"), Some("101"));
        assert!(param(&params, "X").is_none());
    }

    #[test]
    fn test_wms_111_params() {
        let params = wms_params(&query("1.1.1")).unwrap();
        assert_eq!(param(&params, "REQUEST"), Some("feature_info"));
        assert_eq!(param(&params, "X"), Some("50"));
        assert_eq!(param(&params, "SRS"), Some("EPSG:4326"));
    }

    #[test]
    fn test_bbox_surrounds_point() {
        let params = wms_params(&query("1.3.0")).unwrap();
        let bbox: Vec<f64> = param(&params, "BBOX")
            .unwrap()
            .split(',')
            .map(|v| v.parse().unwrap())
            .collect();
        assert!(bbox[0] < 23.55 && bbox[2] > 23.55);
        assert!(bbox[1] < -30.55 && bbox[3] > -30.55);
    }

    #[test]
    fn test_unsupported_version() {
        let err = wms_params(&query("2.0.0")).unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedVersion { .. }));
        assert_eq!(err.to_string(), "WMS version 2.0.0 is not supported");
    }

    #[test]
    fn test_request_url() {
        let url = WmsSource.request(&query("1.3.0")).unwrap();
        assert!(url.as_str().starts_with("http://example.com/wms?SERVICE=WMS&VERSION=1.3.0"));
        assert!(url.as_str().contains("LAYERS=sa%3Aaltitude"));
    }
}
