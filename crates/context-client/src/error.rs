//! Client errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request failed.  Returned status of {status}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid base URL '{url}': {reason}")]
    Url { url: String, reason: String },

    #[error("Data cannot be used for a chart.")]
    NotChartable,
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// HTTP status of a failed request.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
