//! HTTP access to the GeoContext API.

use std::time::{Duration, Instant};

use context_common::RegistryIndex;
use reqwest::{Client, Url};
use tracing::{debug, instrument};

use crate::error::{ClientError, ClientResult};
use crate::query::QueryRequest;
use crate::response::QueryResponse;

/// A completed query.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub url: Url,
    pub response: QueryResponse,
    pub elapsed_ms: u128,
}

#[derive(Debug, Clone)]
pub struct ContextClient {
    client: Client,
    base_url: String,
}

impl ContextClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_text(&self, url: &Url) -> ClientResult<String> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if status.as_u16() != 200 {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    /// Run one query; anything but 200 is an error carrying the status.
    #[instrument(skip(self), fields(registry = %request.registry, key = %request.key))]
    pub async fn query(&self, request: &QueryRequest) -> ClientResult<QueryOutcome> {
        let url = request.url(&self.base_url)?;
        let start = Instant::now();
        let body = self.get_text(&url).await?;
        let elapsed_ms = start.elapsed().as_millis();
        debug!(elapsed_ms = elapsed_ms as u64, "Query answered");

        Ok(QueryOutcome {
            url,
            response: QueryResponse::from_json(&body)?,
            elapsed_ms,
        })
    }

    /// `{key, name}` listings of every registry.
    pub async fn registries(&self) -> ClientResult<RegistryIndex> {
        let base = self.base_url.trim_end_matches('/');
        let url = Url::parse(&format!("{}/api/v2/registry", base)).map_err(|e| ClientError::Url {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        Ok(serde_json::from_str(&self.get_text(&url).await?)?)
    }
}
