//! Upstream fetch errors.

use context_common::QueryType;
use geometry::TransformError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Invalid JSON from upstream: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL '{url}': {reason}")]
    Url { url: String, reason: String },

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("{query_type} version {version} is not supported")]
    UnsupportedVersion {
        query_type: QueryType,
        version: String,
    },

    #[error("{0} query is not implemented")]
    NotImplemented(QueryType),

    #[error("Capabilities parse error: {0}")]
    Capabilities(String),

    #[error("Service '{key}' cache duration of {seconds} seconds has no valid expiry")]
    CacheDuration { key: String, seconds: i64 },
}

pub type FetchResult<T> = Result<T, FetchError>;

impl FetchError {
    /// Label used for the upstream error counter.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Http(e) if e.is_timeout() => "timeout",
            FetchError::Http(_) => "http",
            FetchError::Status { .. } => "status",
            FetchError::Json(_) => "json",
            FetchError::Url { .. } => "url",
            FetchError::Transform(_) => "transform",
            FetchError::UnsupportedVersion { .. } => "unsupported_version",
            FetchError::NotImplemented(_) => "not_implemented",
            FetchError::Capabilities(_) => "capabilities",
            FetchError::CacheDuration { .. } => "cache_duration",
        }
    }
}
