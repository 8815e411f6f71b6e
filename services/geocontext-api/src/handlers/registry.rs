//! Registry listing and definition handlers.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::{IntoResponse, Response},
    Json,
};
use context_common::{Registry, RegistryEntry, RegistryIndex};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/v2/registry - `{key, name}` of every registry
pub async fn registry_index_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<RegistryIndex>, ApiError> {
    Ok(Json(state.store.registry_index().await?))
}

/// GET /api/v2/registry/:registry - `{key, name}` of one registry
pub async fn registry_entries_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(registry): Path<String>,
) -> Result<Json<Vec<RegistryEntry>>, ApiError> {
    let registry: Registry = registry.parse()?;
    Ok(Json(state.store.list_entries(registry).await?))
}

/// GET /api/v2/registry/:registry/:key - full definition
pub async fn registry_detail_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((registry, key)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let registry: Registry = registry.parse()?;
    let response = match registry {
        Registry::Service => {
            let mut service = state.store.get_service(&key).await?;
            // Upstream credentials stay server-side
            service.password = None;
            service.api_key = None;
            Json(service).into_response()
        }
        Registry::Group => Json(state.store.get_group(&key).await?).into_response(),
        Registry::Collection => Json(state.store.get_collection(&key).await?).into_response(),
    };
    Ok(response)
}
