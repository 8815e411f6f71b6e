//! WFS GetFeature with a point intersect filter and a bounding-box retry.

use async_trait::async_trait;
use context_common::QueryType;
use reqwest::Url;
use tracing::info;

use crate::client::UpstreamClient;
use crate::error::{FetchError, FetchResult};
use crate::features::GeometryFormat;
use crate::query::{ServiceQuery, ServiceResult};
use crate::source::{resolve, ValueSource};
use crate::url::{build_source_uri, Params};

pub struct WfsSource;

/// OGC filter selecting features that intersect the query point.
pub fn intersects_filter(query: &ServiceQuery) -> String {
    format!(
        "<Filter xmlns=\"http://www.opengis.net/ogc\" xmlns:gml=\"http://www.opengis.net/gml\"> \
         <Intersects><PropertyName>geom</PropertyName>\
         <gml:Point srsName=\"EPSG:{}\"><gml:coordinates>{},{}</gml:coordinates></gml:Point>\
         </Intersects></Filter>",
        query.point.srid, query.point.x, query.point.y
    )
}

/// Parameters shared by both attempts, without the spatial constraint.
fn base_params(query: &ServiceQuery) -> FetchResult<Params> {
    let service = &query.service;
    let limit = match service.service_version.as_str() {
        "1.0.0" | "1.1.0" | "1.3.0" => "count",
        "2.0.0" => "maxFeatures",
        other => {
            return Err(FetchError::UnsupportedVersion {
                query_type: QueryType::Wfs,
                version: other.to_string(),
            })
        }
    };

    Ok(vec![
        ("SERVICE", QueryType::Wfs.to_string()),
        ("REQUEST", "GetFeature".to_string()),
        ("OUTPUTFORMAT", "application/json".to_string()),
        ("VERSION", service.service_version.clone()),
        ("TYPENAME", service.typename().to_string()),
        ("PROPERTYNAME", format!("({})", service.layer_name)),
        (limit, query.max_features.to_string()),
    ])
}

/// First attempt: features intersecting the point.
pub fn intersect_params(query: &ServiceQuery) -> FetchResult<Params> {
    let mut params = base_params(query)?;
    params.push(("FILTER", intersects_filter(query)));
    Ok(params)
}

/// Retry: features within the tolerance box.
pub fn bbox_params(query: &ServiceQuery) -> FetchResult<Params> {
    let mut params = base_params(query)?;
    params.push(("BBOX", query.bbox()?.to_param_string(false)));
    params.push(("SRSNAME", format!("EPSG:{}", query.point.srid)));
    Ok(params)
}

#[async_trait]
impl ValueSource for WfsSource {
    fn query_type(&self) -> QueryType {
        QueryType::Wfs
    }

    fn request(&self, query: &ServiceQuery) -> FetchResult<Url> {
        build_source_uri(&query.service.url, &intersect_params(query)?)
    }

    async fn fetch(&self, client: &UpstreamClient, query: &ServiceQuery) -> FetchResult<ServiceResult> {
        let url = self.request(query)?;
        let body = client.get_json(&url).await?;
        let features = self.features(&body);
        if !features.is_empty() {
            return Ok(resolve(query, &url, features, GeometryFormat::GeoJson));
        }

        info!(service = %query.key(), "WFS intersect filter found nothing, retrying with bbox");
        let url = build_source_uri(&query.service.url, &bbox_params(query)?)?;
        let body = client.get_json(&url).await?;
        Ok(resolve(query, &url, self.features(&body), GeometryFormat::GeoJson))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geometry::Point;
    use test_utils::fixtures;

    fn query(version: &str) -> ServiceQuery {
        let mut service = fixtures::wfs_service("rainfall_january", "http://example.com/wfs", "rainfall");
        service.service_version = version.to_string();
        ServiceQuery::new(service, &Point::wgs84(23.55, -30.55), 10.0).unwrap()
    }

    fn has(params: &Params, name: &str) -> bool {
        params.iter().any(|(k, _)| *k == name)
    }

    #[test]
    fn test_filter_names_point() {
        let filter = intersects_filter(&query("2.0.0"));
        assert!(filter.contains("<gml:Point srsName=\"EPSG:4326\">"));
        assert!(filter.contains("<gml:coordinates>23.55,-30.55</gml:coordinates>"));
        assert!(filter.starts_with("<Filter"));
        assert!(filter.ends_with("</Filter>"));
    }

    #[test]
    fn test_limit_parameter_by_version() {
        let params = intersect_params(&query("2.0.0")).unwrap();
        assert!(has(&params, "maxFeatures"));
        assert!(!has(&params, "count"));

        let params = intersect_params(&query("1.1.0")).unwrap();
        assert!(has(&params, "count"));
    }

    #[test]
    fn test_property_name() {
        let params = intersect_params(&query("2.0.0")).unwrap();
        assert!(params.contains(&("PROPERTYNAME", "(rainfall)".to_string())));
        assert!(params.contains(&("TYPENAME", "sa:rainfall_january".to_string())));
    }

    #[test]
    fn test_bbox_retry_drops_filter() {
        let params = bbox_params(&query("2.0.0")).unwrap();
        assert!(!has(&params, "FILTER"));
        assert!(has(&params, "BBOX"));
        assert!(params.contains(&("SRSNAME", "EPSG:4326".to_string())));
    }

    #[test]
    fn test_unsupported_version() {
        assert!(matches!(
            intersect_params(&query("1.5.0")),
            Err(FetchError::UnsupportedVersion { .. })
        ));
    }
}
