//! Exception body returned by every failing API call.

use serde::{Deserialize, Serialize};

/// Exception response for errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExceptionResponse {
    /// Exception type identifier.
    #[serde(rename = "type")]
    pub type_: String,

    /// Human-readable title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// HTTP status code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Detailed error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ExceptionResponse {
    /// Create a new exception response.
    pub fn new(type_: impl Into<String>, status: u16, detail: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            title: None,
            status: Some(status),
            detail: Some(detail.into()),
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new("geocontext/invalid-request", 400, detail).with_title("Bad Request")
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new("geocontext/not-authenticated", 401, detail).with_title("Unauthorized")
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new("geocontext/not-found", 404, detail).with_title("Not Found")
    }

    pub fn too_many_requests(detail: impl Into<String>) -> Self {
        Self::new("geocontext/throttled", 429, detail).with_title("Too Many Requests")
    }

    pub fn internal_error(detail: impl Into<String>) -> Self {
        Self::new("geocontext/server-error", 500, detail).with_title("Internal Server Error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_serialization() {
        let exc = ExceptionResponse::bad_request("Tolerance should be a float");
        let json = serde_json::to_value(&exc).unwrap();

        assert_eq!(json["type"], "geocontext/invalid-request");
        assert_eq!(json["status"], 400);
        assert_eq!(json["title"], "Bad Request");
        assert_eq!(json["detail"], "Tolerance should be a float");
    }
}
