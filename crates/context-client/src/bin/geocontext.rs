//! GeoContext command line client.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use context_client::{render_report, render_text, ContextClient, QueryRequest};
use context_common::Registry;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "geocontext")]
#[command(about = "Query a GeoContext API for context values at a point")]
struct Cli {
    /// Base URL of the GeoContext API
    #[arg(long, default_value = "http://localhost:8000", env = "GEOCONTEXT_URL", global = true)]
    url: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "60", global = true)]
    timeout: u64,

    /// Log level
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Query one registry key at a point
    Query {
        /// service, group or collection
        #[arg(short, long)]
        registry: Registry,

        /// Registry key
        #[arg(short, long)]
        key: String,

        /// Latitude (WGS84)
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude (WGS84)
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// API token
        #[arg(long, env = "GEOCONTEXT_TOKEN")]
        token: Option<String>,

        /// Write an HTML report with table and chart to this file
        #[arg(long)]
        html: Option<PathBuf>,

        /// Print the raw JSON response instead of tables
        #[arg(long)]
        json: bool,
    },

    /// List the keys of every registry
    Registries,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let client = ContextClient::new(&cli.url, Duration::from_secs(cli.timeout))
        .context("Failed to create HTTP client")?;

    match cli.command {
        Commands::Query {
            registry,
            key,
            lat,
            lon,
            token,
            html,
            json,
        } => {
            let mut request = QueryRequest::new(registry, key, lat, lon);
            if let Some(token) = token {
                request = request.with_token(token);
            }
            let outcome = client.query(&request).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.response.to_value())?);
            } else {
                println!("{}", outcome.url);
                println!("Request time:  {}ms", outcome.elapsed_ms);
                println!("{}", render_text(registry, &outcome.response));
            }

            if let Some(path) = html {
                std::fs::write(&path, render_report(registry, &outcome))
                    .with_context(|| format!("Failed to write report to {}", path.display()))?;
                eprintln!("Report written to {}", path.display());
            }
        }
        Commands::Registries => {
            let index = client.registries().await?;
            for registry in Registry::ALL {
                println!("{}s:", registry.label());
                for entry in index.entries(registry) {
                    println!("  {} - {}", entry.key, entry.name);
                }
                println!();
            }
        }
    }

    Ok(())
}
