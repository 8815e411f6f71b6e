//! Shared HTTP client and concurrent fetching.

use std::time::{Duration, Instant};

use context_common::Service;
use futures::stream::{self, StreamExt};
use metrics::{counter, histogram};
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::capabilities::{layer_extent, LayerExtent};
use crate::error::{FetchError, FetchResult};
use crate::query::{ServiceQuery, ServiceResult};
use crate::source::source_for;
use crate::url::build_source_uri;

/// Configuration for the upstream client.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Total time allowed for one upstream request
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Maximum upstream requests in flight for one query
    pub concurrency: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            connect_timeout: Duration::from_secs(2),
            concurrency: 100,
        }
    }
}

/// Fetches service values; cheap to clone.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    config: UpstreamConfig,
}

impl UpstreamClient {
    pub fn new(config: UpstreamConfig) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("geocontext/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    async fn get(&self, url: &Url) -> FetchResult<reqwest::Response> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    /// GET `url` and parse the body as JSON whatever its content type.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_json(&self, url: &Url) -> FetchResult<Value> {
        let bytes = self.get(url).await?.bytes().await?;
        debug!(bytes = bytes.len(), "Upstream response received");
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_text(&self, url: &Url) -> FetchResult<String> {
        Ok(self.get(url).await?.text().await?)
    }

    /// Fetch one service value.
    ///
    /// Never fails: any error is logged and counted, and yields a result
    /// without a value.
    #[instrument(skip(self, query), fields(service = %query.key()))]
    pub async fn fetch(&self, query: &ServiceQuery) -> ServiceResult {
        let query_type = query.service.query_type;
        let Some(source) = source_for(query_type) else {
            warn!(query_type = %query_type, "Query type not implemented");
            counter!("geocontext_upstream_errors_total", "kind" => "not_implemented").increment(1);
            return query.empty_result();
        };

        let start = Instant::now();
        let result = source.fetch(self, query).await;
        histogram!("geocontext_upstream_duration_seconds", "query_type" => query_type.as_str())
            .record(start.elapsed().as_secs_f64());

        match result {
            Ok(result) => {
                if result.value.is_none() {
                    debug!(source_uri = ?result.source_uri, "No features found");
                }
                result
            }
            Err(e) => {
                error!(error = %e, query_type = %query_type, "Upstream fetch failed");
                counter!("geocontext_upstream_errors_total", "kind" => e.kind()).increment(1);
                query.empty_result()
            }
        }
    }

    /// Fetch every query concurrently, results in query order.
    pub async fn fetch_all(&self, queries: &[ServiceQuery]) -> Vec<ServiceResult> {
        let fetches: Vec<_> = queries
            .iter()
            .map(|query| Box::pin(self.fetch(query)))
            .collect();
        stream::iter(fetches)
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await
    }

    /// Advertised extent of the service's layer from its GetCapabilities document.
    pub async fn layer_extent(&self, service: &Service) -> FetchResult<Option<LayerExtent>> {
        let params = [
            ("SERVICE", service.query_type.to_string()),
            ("REQUEST", "GetCapabilities".to_string()),
            ("VERSION", service.service_version.clone()),
        ];
        let url = build_source_uri(&service.url, &params)?;
        let xml = self.get_text(&url).await?;
        layer_extent(&xml, service.typename())
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;

    use super::*;

    fn require_send<F: Future + Send>(future: F) -> F {
        future
    }

    #[test]
    fn test_fetch_futures_are_send() {
        let client = UpstreamClient::new(UpstreamConfig::default()).unwrap();
        let queries: Vec<ServiceQuery> = Vec::new();
        let single = client.clone();

        drop(require_send(async move { client.fetch_all(&queries).await }));
        drop(require_send(async move {
            let queries: Vec<ServiceQuery> = Vec::new();
            for query in &queries {
                single.fetch(query).await;
            }
        }));
    }

    #[tokio::test]
    async fn test_fetch_all_empty() {
        let client = UpstreamClient::new(UpstreamConfig::default()).unwrap();
        assert!(client.fetch_all(&[]).await.is_empty());
    }
}
