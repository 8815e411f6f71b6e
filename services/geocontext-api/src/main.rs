//! GeoContext API Server
//!
//! Point queries against the service, group and collection registries.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use geocontext_api::config::ServerConfig;
use geocontext_api::state::AppState;

/// GeoContext API Server
#[derive(Parser, Debug)]
#[command(name = "geocontext-api")]
#[command(about = "GeoContext point query API and map page")]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "GEOCONTEXT_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address
    #[arg(short, long, env = "GEOCONTEXT_LISTEN_ADDR")]
    listen: Option<String>,

    /// Database URL (sqlite://path or sqlite::memory:)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Public base URL shown in query links
    #[arg(long, env = "GEOCONTEXT_BASE_URL")]
    base_url: Option<String>,

    /// Require an API token on queries
    #[arg(long, env = "ENABLE_API_TOKEN")]
    enable_api_token: Option<bool>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of worker threads
    #[arg(long, env = "GEOCONTEXT_WORKER_THREADS")]
    worker_threads: Option<usize>,
}

impl Args {
    fn server_config(&self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };

        if let Some(listen) = &self.listen {
            config.listen = listen.clone();
        }
        if let Some(database_url) = &self.database_url {
            config.database_url = database_url.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(enabled) = self.enable_api_token {
            config.enable_api_token = enabled;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Build runtime with configured threads
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(run_server(args))
}

async fn run_server(args: Args) -> Result<()> {
    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    info!("Starting GeoContext API server");

    let config = args.server_config()?;
    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.listen))?;

    let mut state = AppState::new(config).await?;
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => state = state.with_prometheus(handle),
        Err(e) => warn!(error = %e, "Prometheus recorder not installed"),
    }
    if state.config.enable_api_token {
        info!("API token authentication enabled");
    }

    let app = geocontext_api::router(Arc::new(state));

    info!("GeoContext API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server failed")?;
    Ok(())
}
