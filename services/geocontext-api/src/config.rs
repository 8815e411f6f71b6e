//! Server configuration loading and types.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use context_common::DEFAULT_TOLERANCE;
use serde::{Deserialize, Serialize};
use upstream::UpstreamConfig;

/// Server settings, read from an optional YAML file and overridden by
/// command-line arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub listen: String,

    pub database_url: String,

    /// Public URL of this server, used for the query URLs shown on the map page.
    pub base_url: String,

    /// Require `token=` on every query.
    pub enable_api_token: bool,

    /// Tolerance in metres when a query does not give one.
    pub default_tolerance: f64,

    pub upstream: UpstreamSettings,

    pub map: MapSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8000".to_string(),
            database_url: "sqlite://geocontext.db".to_string(),
            base_url: "http://localhost:8000".to_string(),
            enable_api_token: false,
            default_tolerance: DEFAULT_TOLERANCE,
            upstream: UpstreamSettings::default(),
            map: MapSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSettings {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Upstream requests in flight for one query
    pub concurrency: usize,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        let defaults = UpstreamConfig::default();
        Self {
            timeout_secs: defaults.timeout.as_secs(),
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            concurrency: defaults.concurrency,
        }
    }
}

impl UpstreamSettings {
    pub fn to_config(&self) -> UpstreamConfig {
        UpstreamConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            concurrency: self.concurrency,
        }
    }
}

/// Initial view of the map page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    pub center_lon: f64,
    pub center_lat: f64,
    pub zoom: u8,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            center_lon: 23.55,
            center_lat: -30.55,
            zoom: 6,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse config: {:?}", path))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.default_tolerance.is_finite() && self.default_tolerance >= 0.0) {
            anyhow::bail!("default_tolerance must be a non-negative number");
        }
        if self.upstream.timeout_secs == 0 {
            anyhow::bail!("upstream.timeout_secs must be greater than zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = ServerConfig::from_yaml("{}").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.upstream.timeout_secs, 20);
        assert_eq!(config.upstream.connect_timeout_secs, 2);
        assert_eq!(config.map.center_lat, -30.55);
    }

    #[test]
    fn test_partial_yaml() {
        let config = ServerConfig::from_yaml(
            r#"
listen: "127.0.0.1:9000"
enable_api_token: true
upstream:
  concurrency: 8
"#,
        )
        .unwrap();
        assert_eq!(config.listen, "127.0.0.1:9000");
        assert!(config.enable_api_token);
        assert_eq!(config.upstream.concurrency, 8);
        assert_eq!(config.upstream.timeout_secs, 20);

        let upstream = config.upstream.to_config();
        assert_eq!(upstream.timeout, Duration::from_secs(20));
        assert_eq!(upstream.concurrency, 8);
    }

    #[test]
    fn test_invalid_tolerance_rejected() {
        assert!(ServerConfig::from_yaml("default_tolerance: -1").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = test_utils::temp_test_dir();
        let path = dir.path().join("geocontext.yaml");
        std::fs::write(&path, "base_url: http://geocontext.test\n").unwrap();
        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.base_url, "http://geocontext.test");

        let err = ServerConfig::load(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
