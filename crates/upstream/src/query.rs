//! Per-service query state and fetch results.

use chrono::{DateTime, Duration, Utc};
use context_common::{Service, DEFAULT_TOLERANCE};
use geometry::{tolerance_bbox, BoundingBox, Geometry, Point};

use crate::error::{FetchError, FetchResult};

/// Features requested from upstreams that support a limit.
pub const MAX_FEATURES: u32 = 10;

/// SRID fetched geometries are cached in.
pub const CACHE_SRID: i32 = 3857;

/// Everything needed to fetch one service's value at one point.
#[derive(Debug, Clone)]
pub struct ServiceQuery {
    pub service: Service,
    /// Query point in the service SRID.
    pub point: Point,
    /// Metres around the point used for bounding boxes.
    pub tolerance: f64,
    pub max_features: u32,
    pub expire: DateTime<Utc>,
}

impl ServiceQuery {
    /// A request tolerance other than the default overrides the service's own.
    pub fn new(service: Service, point: &Point, request_tolerance: f64) -> FetchResult<Self> {
        let tolerance = if request_tolerance != DEFAULT_TOLERANCE {
            request_tolerance
        } else {
            service.tolerance
        };
        let point = point.transform(service.srid)?;
        let expire = Duration::try_seconds(service.cache_duration)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| FetchError::CacheDuration {
                key: service.key.clone(),
                seconds: service.cache_duration,
            })?;

        Ok(Self {
            service,
            point,
            tolerance,
            max_features: MAX_FEATURES,
            expire,
        })
    }

    pub fn key(&self) -> &str {
        &self.service.key
    }

    /// Tolerance box around the point, in the service SRID.
    pub fn bbox(&self) -> FetchResult<BoundingBox> {
        Ok(tolerance_bbox(&self.point, self.tolerance)?)
    }

    /// Result carrying no value, used when the fetch fails.
    pub fn empty_result(&self) -> ServiceResult {
        ServiceResult {
            service_key: self.service.key.clone(),
            value: None,
            geometry: None,
            source_uri: None,
            point: self.point,
            expire: self.expire,
        }
    }
}

/// Outcome of fetching one service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResult {
    pub service_key: String,
    pub value: Option<String>,
    /// Geometry of the winning feature, in the service SRID.
    pub geometry: Option<Geometry>,
    pub source_uri: Option<String>,
    /// Query point in the service SRID.
    pub point: Point,
    pub expire: DateTime<Utc>,
}

impl ServiceResult {
    /// Geometry to cache in EPSG:3857; the query point when the upstream returned none.
    pub fn cache_geometry(&self) -> FetchResult<Geometry> {
        match &self.geometry {
            Some(geometry) => Ok(geometry.transform(self.point.srid, CACHE_SRID)?),
            None => {
                let point = self.point.transform(CACHE_SRID)?;
                Ok(Geometry::Point([point.x, point.y]))
            }
        }
    }
}
