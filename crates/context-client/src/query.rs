//! Query requests against the GeoContext API.

use context_common::Registry;
use reqwest::Url;

use crate::error::{ClientError, ClientResult};

pub const QUERY_PATH: &str = "/api/v2/query";

/// One registry lookup at a point.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub registry: Registry,
    pub key: String,
    pub lat: f64,
    pub lon: f64,
    pub token: Option<String>,
}

impl QueryRequest {
    pub fn new(registry: Registry, key: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            registry,
            key: key.into(),
            lat,
            lon,
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into()).filter(|t: &String| !t.is_empty());
        self
    }

    /// `<base>/api/v2/query?registry=..&key=..&x=<lon>&y=<lat>&outformat=json[&token=..]`
    pub fn url(&self, base_url: &str) -> ClientResult<Url> {
        let base = base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{}{}", base, QUERY_PATH)).map_err(|e| ClientError::Url {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("registry", self.registry.as_str())
                .append_pair("key", &self.key)
                .append_pair("x", &self.lon.to_string())
                .append_pair("y", &self.lat.to_string())
                .append_pair("outformat", "json");
            if let Some(token) = &self.token {
                pairs.append_pair("token", token);
            }
        }
        Ok(url)
    }
}
