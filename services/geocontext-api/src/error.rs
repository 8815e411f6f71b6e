//! Conversion of query errors into HTTP responses.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use context_common::{ExceptionResponse, GeoContextError};
use geometry::CoordError;
use storage::StoreError;
use tracing::error;

/// An error returned from a handler.
#[derive(Debug)]
pub struct ApiError {
    pub error: GeoContextError,
    /// Seconds until a throttled token may retry.
    pub retry_after: Option<i64>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<GeoContextError> for ApiError {
    fn from(error: GeoContextError) -> Self {
        Self {
            error,
            retry_after: None,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        GeoContextError::from(err).into()
    }
}

impl From<CoordError> for ApiError {
    fn from(err: CoordError) -> Self {
        GeoContextError::Coordinate(err.to_string()).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.error, "Request failed");
        }

        let mut response = error_response(status, self.error.to_exception());
        if let Some(secs) = self.retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// JSON body with the given status.
pub fn error_response(status: StatusCode, exc: ExceptionResponse) -> Response {
    let json = serde_json::to_string(&exc).unwrap_or_default();
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        json,
    )
        .into_response()
}
