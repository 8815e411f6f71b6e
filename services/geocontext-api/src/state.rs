//! Application state for the GeoContext API.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use storage::GeoContextStore;
use upstream::UpstreamClient;

use crate::config::ServerConfig;
use crate::worker::Worker;

/// Shared application state.
pub struct AppState {
    /// Registries, caches, query log and tokens.
    pub store: GeoContextStore,

    pub worker: Worker,

    pub config: ServerConfig,

    /// Renders `/metrics`; absent when no recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Open the database named in `config` and build the upstream client.
    pub async fn new(config: ServerConfig) -> Result<Self> {
        let store = GeoContextStore::connect(&config.database_url)
            .await
            .with_context(|| format!("Failed to open database {}", config.database_url))?;
        Self::with_store(store, config)
    }

    pub fn with_store(store: GeoContextStore, config: ServerConfig) -> Result<Self> {
        let upstream = UpstreamClient::new(config.upstream.to_config())
            .context("Failed to build upstream HTTP client")?;

        Ok(Self {
            worker: Worker::new(store.clone(), upstream),
            store,
            config,
            prometheus: None,
        })
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}
