//! Per-protocol value sources.

use async_trait::async_trait;
use context_common::QueryType;
use reqwest::Url;
use serde_json::Value;

use crate::arcrest::ArcRestSource;
use crate::client::UpstreamClient;
use crate::error::FetchResult;
use crate::features::{extract_values, nearest, GeometryFormat};
use crate::placename::PlaceNameSource;
use crate::query::{ServiceQuery, ServiceResult};
use crate::wfs::WfsSource;
use crate::wms::WmsSource;

/// Fetches a service value from one kind of upstream.
///
/// Implementations describe the request and where features live in the
/// response; the default `fetch` performs a single GET and picks the
/// nearest feature value.
#[async_trait]
pub trait ValueSource: Send + Sync {
    fn query_type(&self) -> QueryType;

    /// Source URI for `query`.
    fn request(&self, query: &ServiceQuery) -> FetchResult<Url>;

    /// Features array in a response body.
    fn features<'a>(&self, body: &'a Value) -> &'a [Value] {
        features_under(body, "features")
    }

    fn geometry_format(&self) -> GeometryFormat {
        GeometryFormat::GeoJson
    }

    async fn fetch(&self, client: &UpstreamClient, query: &ServiceQuery) -> FetchResult<ServiceResult> {
        let url = self.request(query)?;
        let body = client.get_json(&url).await?;
        Ok(resolve(query, &url, self.features(&body), self.geometry_format()))
    }
}

/// Array stored under `key`, empty when absent.
pub fn features_under<'a>(body: &'a Value, key: &str) -> &'a [Value] {
    body.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Build a result from the features one request returned.
pub fn resolve(
    query: &ServiceQuery,
    url: &Url,
    features: &[Value],
    format: GeometryFormat,
) -> ServiceResult {
    let mut result = query.empty_result();
    result.source_uri = Some(url.to_string());

    let candidates = extract_values(features, &query.service.layer_name);
    if let Some((value, geometry)) = nearest(candidates, &query.point, format) {
        result.value = Some(value);
        result.geometry = geometry;
    }
    result
}

static WMS: WmsSource = WmsSource;
static WFS: WfsSource = WfsSource;
static ARCREST: ArcRestSource = ArcRestSource;
static PLACENAME: PlaceNameSource = PlaceNameSource;

/// Source handling `query_type`, if one is implemented.
pub fn source_for(query_type: QueryType) -> Option<&'static dyn ValueSource> {
    match query_type {
        QueryType::Wms => Some(&WMS),
        QueryType::Wfs => Some(&WFS),
        QueryType::ArcRest => Some(&ARCREST),
        QueryType::PlaceName => Some(&PLACENAME),
        QueryType::Wcs | QueryType::Rest | QueryType::Wikipedia => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_for_matches_supported_types() {
        for query_type in [
            QueryType::Wfs,
            QueryType::Wcs,
            QueryType::Wms,
            QueryType::Rest,
            QueryType::ArcRest,
            QueryType::Wikipedia,
            QueryType::PlaceName,
        ] {
            let source = source_for(query_type);
            assert_eq!(source.is_some(), query_type.is_supported(), "{}", query_type);
            if let Some(source) = source {
                assert_eq!(source.query_type(), query_type);
            }
        }
    }

    #[test]
    fn test_features_under() {
        let body = json!({"features": [{"a": 1}], "results": "oops"});
        assert_eq!(features_under(&body, "features").len(), 1);
        assert!(features_under(&body, "results").is_empty());
        assert!(features_under(&body, "geonames").is_empty());
    }
}
