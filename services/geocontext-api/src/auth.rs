//! Query token authentication and tier throttling.
//!
//! Tokens travel in the `token` query parameter. When token checks are
//! disabled every request passes.

use context_common::GeoContextError;
use storage::{GeoContextStore, StoreError, TokenCheck};
use thiserror::Error;
use tracing::debug;

use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Invalid token header. No credentials provided.")]
    MissingToken,

    #[error("Invalid token.")]
    UnknownToken,

    #[error("Expected available in {0} seconds.")]
    Throttled(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Throttled(secs) => ApiError {
                error: GeoContextError::Throttled(err.to_string()),
                retry_after: Some(secs),
            },
            AccessError::Store(e) => e.into(),
            other => GeoContextError::Unauthorized(other.to_string()).into(),
        }
    }
}

/// Check `token` and record the request against its tier.
pub async fn authorize(
    store: &GeoContextStore,
    enabled: bool,
    token: Option<&str>,
) -> Result<(), AccessError> {
    if !enabled {
        return Ok(());
    }
    let token = token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AccessError::MissingToken)?;

    match store.check_token(token).await? {
        TokenCheck::Allowed => Ok(()),
        TokenCheck::UnknownToken => Err(AccessError::UnknownToken),
        TokenCheck::Throttled { retry_after_secs } => {
            debug!(retry_after_secs, "Token throttled");
            Err(AccessError::Throttled(retry_after_secs))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_disabled_allows_anything() {
        let store = GeoContextStore::open_memory().await.unwrap();
        authorize(&store, false, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_and_unknown_token() {
        let store = GeoContextStore::open_memory().await.unwrap();
        let err = authorize(&store, true, Some("  ")).await.unwrap_err();
        assert!(matches!(err, AccessError::MissingToken));

        let err = authorize(&store, true, Some("nope")).await.unwrap_err();
        let api: ApiError = err.into();
        assert_eq!(api.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(api.error.to_string(), "Invalid token.");
    }

    #[tokio::test]
    async fn test_tier_limit() {
        let store = GeoContextStore::open_memory().await.unwrap();
        store.upsert_tier("trial", "2/day").await.unwrap();
        let token = store.issue_token("tester", "trial").await.unwrap().token;

        authorize(&store, true, Some(&token)).await.unwrap();
        authorize(&store, true, Some(&token)).await.unwrap();
        let err = authorize(&store, true, Some(&token)).await.unwrap_err();
        let api: ApiError = err.into();
        assert_eq!(api.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(api.retry_after.unwrap() > 0);
        assert!(api
            .error
            .to_string()
            .starts_with("Request was throttled. Expected available in"));
    }

    #[tokio::test]
    async fn test_unlimited_tier() {
        let store = GeoContextStore::open_memory().await.unwrap();
        store.upsert_tier("partner", "-").await.unwrap();
        let token = store.issue_token("partner", "partner").await.unwrap().token;
        for _ in 0..5 {
            authorize(&store, true, Some(&token)).await.unwrap();
        }
    }
}
