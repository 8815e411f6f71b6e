//! `GET /api/v2/query` handler.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Extension, Query},
    response::{IntoResponse, Response},
    Json,
};
use context_common::{GeoContextError, OutputFormat, Registry, DEFAULT_SRID};
use metrics::{counter, histogram};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::auth::authorize;
use crate::error::ApiError;
use crate::state::AppState;
use crate::worker::{query_point, QueryOutput};

/// Query parameters; everything is optional so that missing values are
/// reported with the API's own messages.
#[derive(Debug, Default, Deserialize)]
pub struct QueryParams {
    pub registry: Option<String>,
    pub key: Option<String>,
    pub x: Option<String>,
    pub y: Option<String>,
    pub srid: Option<String>,
    pub tolerance: Option<String>,
    pub outformat: Option<String>,
    pub token: Option<String>,
}

/// Validated query.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextQuery {
    pub registry: Registry,
    pub key: String,
    pub x: String,
    pub y: String,
    pub srid: String,
    pub tolerance: f64,
    pub outformat: OutputFormat,
}

impl QueryParams {
    /// Validate in the order errors are reported: required arguments,
    /// tolerance, registry, then output format.
    pub fn validate(self, default_tolerance: f64) -> Result<ContextQuery, GeoContextError> {
        let (Some(key), Some(x), Some(y)) = (self.key, self.x, self.y) else {
            return Err(GeoContextError::MissingArgument);
        };

        let tolerance = match self.tolerance {
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .map_err(|_| GeoContextError::InvalidTolerance(raw.clone()))?,
            None => default_tolerance,
        };

        let registry: Registry = self.registry.as_deref().unwrap_or_default().parse()?;

        let outformat = match self.outformat {
            Some(raw) => raw.parse()?,
            None => OutputFormat::default(),
        };

        Ok(ContextQuery {
            registry,
            key,
            x,
            y,
            srid: self.srid.unwrap_or_else(|| DEFAULT_SRID.to_string()),
            tolerance,
            outformat,
        })
    }
}

/// GET /api/v2/query
pub async fn query_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Response {
    let start = Instant::now();
    let result = run_query(&state, params).await;

    let status = match &result {
        Ok(_) => 200,
        Err(e) => e.error.status_code(),
    };
    counter!("geocontext_queries_total", "status" => status.to_string()).increment(1);
    histogram!("geocontext_query_duration_seconds").record(start.elapsed().as_secs_f64());

    match result {
        Ok(output) => Json(output).into_response(),
        Err(e) => e.into_response(),
    }
}

#[instrument(skip(state, params), fields(registry = ?params.registry, key = ?params.key))]
async fn run_query(state: &AppState, params: QueryParams) -> Result<QueryOutput, ApiError> {
    authorize(
        &state.store,
        state.config.enable_api_token,
        params.token.as_deref(),
    )
    .await?;

    let query = params.validate(state.config.default_tolerance)?;
    let point = query_point(&query.x, &query.y, &query.srid)?;
    info!(
        registry = %query.registry,
        key = %query.key,
        x = point.x,
        y = point.y,
        srid = point.srid,
        "Context query"
    );

    Ok(state
        .worker
        .retrieve_all(
            query.registry,
            &query.key,
            &point,
            query.tolerance,
            query.outformat,
        )
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> QueryParams {
        QueryParams {
            registry: Some("group".to_string()),
            key: Some("rainfall".to_string()),
            x: Some("23.55".to_string()),
            y: Some("-30.55".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let query = params().validate(10.0).unwrap();
        assert_eq!(query.registry, Registry::Group);
        assert_eq!(query.srid, "4326");
        assert_eq!(query.tolerance, 10.0);
        assert_eq!(query.outformat, OutputFormat::GeoJson);
    }

    #[test]
    fn test_missing_argument_checked_first() {
        let mut params = params();
        params.y = None;
        params.registry = Some("layer".to_string());
        let err = params.validate(10.0).unwrap_err();
        assert!(matches!(err, GeoContextError::MissingArgument));
    }

    #[test]
    fn test_tolerance_must_be_float() {
        let mut params = params();
        params.tolerance = Some("ten".to_string());
        let err = params.validate(10.0).unwrap_err();
        assert_eq!(err.to_string(), "Tolerance should be a float");

        let mut params = self::params();
        params.tolerance = Some("250".to_string());
        assert_eq!(params.validate(10.0).unwrap().tolerance, 250.0);
    }

    #[test]
    fn test_registry_and_outformat() {
        let mut missing_registry = params();
        missing_registry.registry = None;
        assert!(matches!(
            missing_registry.validate(10.0),
            Err(GeoContextError::InvalidRegistry(_))
        ));

        let mut params = params();
        params.outformat = Some("JSON".to_string());
        assert_eq!(params.validate(10.0).unwrap().outformat, OutputFormat::Json);

        let mut params = self::params();
        params.outformat = Some("csv".to_string());
        assert_eq!(
            params.validate(10.0).unwrap_err().to_string(),
            "Output format should be either json or geojson"
        );
    }
}
