//! ArcGIS REST `identify`.

use async_trait::async_trait;
use context_common::QueryType;
use reqwest::Url;
use serde_json::Value;

use crate::error::FetchResult;
use crate::features::GeometryFormat;
use crate::query::ServiceQuery;
use crate::source::{features_under, ValueSource};
use crate::url::{build_source_uri, join_path, Params};

pub struct ArcRestSource;

pub fn identify_params(query: &ServiceQuery) -> FetchResult<Params> {
    let bbox = query.bbox()?;
    Ok(vec![
        ("f", "json".to_string()),
        ("geometryType", "esriGeometryPoint".to_string()),
        (
            "geometry",
            format!("{{x: {}, y: {}}}", query.point.x, query.point.y),
        ),
        ("layers", query.service.layer_name.clone()),
        ("imageDisplay", "100,100,96".to_string()),
        ("tolerance", "1".to_string()),
        ("mapExtent", bbox.to_param_string(false)),
        ("returnGeometry", "true".to_string()),
        ("maxRecordCount", query.max_features.to_string()),
    ])
}

#[async_trait]
impl ValueSource for ArcRestSource {
    fn query_type(&self) -> QueryType {
        QueryType::ArcRest
    }

    fn request(&self, query: &ServiceQuery) -> FetchResult<Url> {
        let base = join_path(&query.service.url, "identify");
        build_source_uri(&base, &identify_params(query)?)
    }

    fn features<'a>(&self, body: &'a Value) -> &'a [Value] {
        features_under(body, "results")
    }

    fn geometry_format(&self) -> GeometryFormat {
        GeometryFormat::ArcGis
    }
}
