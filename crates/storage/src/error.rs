use context_common::{GeoContextError, KeyError};
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    InvalidKey(#[from] KeyError),

    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("{kind} '{key}' references unknown {target} '{reference}'")]
    MissingReference {
        kind: &'static str,
        key: String,
        target: &'static str,
        reference: String,
    },

    #[error("Service '{key}' cache_duration {seconds} is outside 0..={max} seconds")]
    InvalidCacheDuration { key: String, seconds: i64, max: i64 },

    #[error("Invalid stored value: {0}")]
    Corrupt(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            key: key.into(),
        }
    }
}

impl From<StoreError> for GeoContextError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, key } => GeoContextError::not_found(kind, key),
            other => GeoContextError::Storage(other.to_string()),
        }
    }
}
