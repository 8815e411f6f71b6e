//! GeoContext administration tool.
//!
//! Registry import/export, cache housekeeping, service self-tests and API
//! token management against the server's database.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use geocontext_api::config::ServerConfig;
use geocontext_api::maintenance::{purge_caches, test_services};
use storage::{GeoContextStore, RegistryDocument};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use upstream::UpstreamClient;

#[derive(Parser)]
#[command(name = "geocontext-admin")]
#[command(about = "Administration tool for the GeoContext database", long_about = None)]
struct Cli {
    /// Database URL
    #[arg(long, default_value = "sqlite://geocontext.db", env = "DATABASE_URL", global = true)]
    database_url: String,

    /// YAML configuration file (upstream timeouts)
    #[arg(short, long, env = "GEOCONTEXT_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import services, groups and collections from a JSON document
    Import {
        /// Path to the registry JSON file
        file: PathBuf,
    },

    /// Export every registry definition as JSON
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete every service, group and collection
    DeleteData,

    /// Delete every cached value
    DeleteCache,

    /// Delete cached values whose expiry has passed, and stale token requests
    DeleteExpiredCache,

    /// Fetch each service at its test point and record its status
    TestServices,

    /// Create or update a user tier (e.g. 100/day, 10/minute, - for unlimited)
    AddTier { name: String, limit: String },

    /// Issue an API token for a user on a tier
    IssueToken { username: String, tier: String },

    /// Show the advertised extent of a service's layer
    Capabilities { key: String },

    /// Show the most recent queries
    Queries {
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
}

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header);
    table
}

fn upstream_client(cli_config: &Option<PathBuf>) -> Result<UpstreamClient> {
    let config = match cli_config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    UpstreamClient::new(config.upstream.to_config()).context("Failed to build upstream HTTP client")
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

    let store = GeoContextStore::connect(&cli.database_url)
        .await
        .with_context(|| format!("Failed to open database {}", cli.database_url))?;

    match cli.command {
        Commands::Import { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let document = RegistryDocument::from_json(&text)
                .with_context(|| format!("Failed to parse {}", file.display()))?;
            let summary = store.import_document(&document).await?;
            println!(
                "Imported {} services, {} groups, {} collections",
                summary.services, summary.groups, summary.collections
            );
        }
        Commands::Export { output } => {
            let json = store.export_document().await?.to_json()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), "Exported registries");
                }
                None => println!("{}", json),
            }
        }
        Commands::DeleteData => {
            store.delete_all_registries().await?;
            println!("Deleted all registry data");
        }
        Commands::DeleteCache => {
            let summary = purge_caches(&store, false).await?;
            println!("{} cache deleted", summary.deleted);
            println!("Current number of caches: {}", summary.remaining);
        }
        Commands::DeleteExpiredCache => {
            let summary = purge_caches(&store, true).await?;
            println!("{} expired cache deleted", summary.deleted);
            println!("Current number of caches: {}", summary.remaining);
            let pruned = store.prune_token_requests().await?;
            println!("{} stale token requests deleted", pruned);
        }
        Commands::TestServices => {
            let upstream = upstream_client(&cli.config)?;
            let checks = test_services(&store, &upstream).await?;

            let mut output = table(vec!["Service", "Expected", "Actual", "Status"]);
            for check in &checks {
                output.add_row(vec![
                    check.name.clone(),
                    check.expected.clone().unwrap_or_default(),
                    check.actual.clone().unwrap_or_else(|| "-".to_string()),
                    if check.online { "online" } else { "offline" }.to_string(),
                ]);
            }
            println!("{}", output);
        }
        Commands::AddTier { name, limit } => {
            let tier = store.upsert_tier(&name, &limit).await?;
            println!("Tier {}: {}", tier.name, tier.rate);
        }
        Commands::IssueToken { username, tier } => {
            let token = store.issue_token(&username, &tier).await?;
            println!("{}", token.token);
        }
        Commands::Capabilities { key } => {
            let service = store.get_service(&key).await?;
            let upstream = upstream_client(&cli.config)?;
            match upstream.layer_extent(&service).await? {
                Some(extent) => println!("{}", serde_json::to_string_pretty(&extent)?),
                None => println!("Layer {} not advertised by {}", service.typename(), service.url),
            }
        }
        Commands::Queries { limit } => {
            let mut output = table(vec!["Time", "Registry", "Key", "X", "Y", "Format"]);
            for entry in store.recent_queries(limit).await? {
                output.add_row(vec![
                    entry.created_time.to_rfc3339(),
                    entry.registry,
                    entry.key,
                    entry.x.to_string(),
                    entry.y.to_string(),
                    entry.output_format,
                ]);
            }
            println!("{}", output);
        }
    }

    Ok(())
}
