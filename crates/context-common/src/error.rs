//! Error types for GeoContext operations.

use thiserror::Error;

use crate::responses::ExceptionResponse;

/// Result type alias using GeoContextError.
pub type GeoContextResult<T> = Result<T, GeoContextError>;

/// Errors surfaced by the query API.
#[derive(Debug, Error)]
pub enum GeoContextError {
    // === Request errors ===
    #[error("Required request argument (registry, key, x, y) missing.")]
    MissingArgument,

    #[error("Registry should be \"collection\", \"service\" or \"group\".")]
    InvalidRegistry(String),

    #[error("Output format should be either json or geojson")]
    InvalidOutputFormat(String),

    #[error("Tolerance should be a float")]
    InvalidTolerance(String),

    #[error("{0}")]
    Coordinate(String),

    #[error("{0}")]
    InvalidParameter(String),

    // === Lookup errors ===
    #[error("{registry} not found: {key}")]
    NotFound { registry: String, key: String },

    // === Access errors ===
    #[error("{0}")]
    Unauthorized(String),

    #[error("Request was throttled. {0}")]
    Throttled(String),

    // === Infrastructure errors ===
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GeoContextError {
    /// Build a not-found error for a registry key.
    pub fn not_found(registry: impl Into<String>, key: impl Into<String>) -> Self {
        GeoContextError::NotFound {
            registry: registry.into(),
            key: key.into(),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GeoContextError::MissingArgument
            | GeoContextError::InvalidRegistry(_)
            | GeoContextError::InvalidOutputFormat(_)
            | GeoContextError::InvalidTolerance(_)
            | GeoContextError::Coordinate(_)
            | GeoContextError::InvalidParameter(_) => 400,

            GeoContextError::Unauthorized(_) => 401,
            GeoContextError::NotFound { .. } => 404,
            GeoContextError::Throttled(_) => 429,

            GeoContextError::Storage(_) | GeoContextError::Internal(_) => 500,
        }
    }

    /// Convert to an ExceptionResponse.
    pub fn to_exception(&self) -> ExceptionResponse {
        let detail = self.to_string();
        match self.status_code() {
            400 => ExceptionResponse::bad_request(detail),
            401 => ExceptionResponse::unauthorized(detail),
            404 => ExceptionResponse::not_found(detail),
            429 => ExceptionResponse::too_many_requests(detail),
            _ => ExceptionResponse::internal_error(detail),
        }
    }
}

impl From<serde_json::Error> for GeoContextError {
    fn from(err: serde_json::Error) -> Self {
        GeoContextError::Internal(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(GeoContextError::MissingArgument.status_code(), 400);
        assert_eq!(
            GeoContextError::InvalidRegistry("layer".to_string()).status_code(),
            400
        );
        assert_eq!(GeoContextError::not_found("Group", "nope").status_code(), 404);
        assert_eq!(
            GeoContextError::Unauthorized("no token".to_string()).status_code(),
            401
        );
        assert_eq!(
            GeoContextError::Throttled("1/day".to_string()).status_code(),
            429
        );
        assert_eq!(
            GeoContextError::Storage("locked".to_string()).status_code(),
            500
        );
    }

    #[test]
    fn test_missing_argument_message() {
        assert_eq!(
            GeoContextError::MissingArgument.to_string(),
            "Required request argument (registry, key, x, y) missing."
        );
    }

    #[test]
    fn test_error_to_exception() {
        let err = GeoContextError::not_found("Collection", "missing_collection");
        let exc = err.to_exception();

        assert_eq!(exc.status, Some(404));
        assert!(exc.detail.unwrap().contains("missing_collection"));
    }

    #[test]
    fn test_throttled_exception_type() {
        let exc = GeoContextError::Throttled("Expected available in 60 seconds.".to_string())
            .to_exception();
        assert_eq!(exc.status, Some(429));
        assert!(exc.type_.contains("throttled"));
    }
}
