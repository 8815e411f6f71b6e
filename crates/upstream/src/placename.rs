//! GeoNames nearby place name lookup.

use async_trait::async_trait;
use context_common::QueryType;
use reqwest::Url;
use serde_json::Value;

use crate::error::FetchResult;
use crate::query::ServiceQuery;
use crate::source::{features_under, ValueSource};
use crate::url::{build_source_uri, Params};

pub struct PlaceNameSource;

pub fn placename_params(query: &ServiceQuery) -> Params {
    vec![
        ("lat", query.point.y.to_string()),
        ("lng", query.point.x.to_string()),
        ("username", query.service.username.clone().unwrap_or_default()),
    ]
}

#[async_trait]
impl ValueSource for PlaceNameSource {
    fn query_type(&self) -> QueryType {
        QueryType::PlaceName
    }

    fn request(&self, query: &ServiceQuery) -> FetchResult<Url> {
        build_source_uri(&query.service.url, &placename_params(query))
    }

    fn features<'a>(&self, body: &'a Value) -> &'a [Value] {
        features_under(body, "geonames")
    }
}
