//! SQLite-backed persistence for GeoContext.
//!
//! One [`GeoContextStore`] owns the connection pool; the registry, cache,
//! query log, token and import/export operations are implemented on it in
//! their own modules.

pub mod cache;
pub mod error;
pub mod log;
pub mod registry;
pub mod schema;
pub mod tokens;
pub mod transfer;

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

pub use cache::{CachedValue, NewCache};
pub use error::{StoreError, StoreResult};
pub use log::QueryLogEntry;
pub use registry::ResolvedRegistry;
pub use tokens::{ApiToken, RequestRate, TokenCheck, UserTier};
pub use transfer::{ImportSummary, RegistryDocument};

use schema::SCHEMA_SQL;

/// Handle to the GeoContext database.
#[derive(Clone)]
pub struct GeoContextStore {
    pool: SqlitePool,
}

impl GeoContextStore {
    /// Connect using a URL such as `sqlite://geocontext.db` or `sqlite::memory:`.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let store = if database_url.contains(":memory:") {
            Self::with_single_connection(options).await?
        } else {
            let pool = SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?;
            Self { pool }
        };

        store.migrate().await?;
        info!(database_url = %database_url, "Opened GeoContext database");
        Ok(store)
    }

    /// Open or create a database file.
    pub async fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Database(sqlx::Error::Io(e)))?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        info!(path = %path.display(), "Opened GeoContext database");
        Ok(store)
    }

    /// Open an in-memory database (for testing).
    pub async fn open_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .foreign_keys(true);
        let store = Self::with_single_connection(options).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// An in-memory database lives as long as its only connection.
    async fn with_single_connection(options: SqliteConnectOptions) -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Create tables and indexes that do not exist yet.
    pub async fn migrate(&self) -> StoreResult<()> {
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed).execute(&self.pool).await?;
            }
        }
        Ok(())
    }

    /// Round-trip to the database, for readiness checks.
    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Timestamps are stored as fixed-width RFC 3339 UTC text so they sort lexically.
pub(crate) fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_time(value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_and_ping() {
        let store = GeoContextStore::open_memory().await.unwrap();
        store.ping().await.unwrap();
        // Migrations are idempotent
        store.migrate().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("geocontext.db");
        let store = GeoContextStore::open(&path).await.unwrap();
        store.ping().await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_connect_memory_url() {
        let store = GeoContextStore::connect("sqlite::memory:").await.unwrap();
        assert!(store.list_services().await.unwrap().is_empty());
    }

    #[test]
    fn test_time_format_roundtrip() {
        let now = Utc::now();
        let text = format_time(now);
        assert!(text.ends_with('Z'));
        let parsed = parse_time(&text).unwrap();
        assert!((parsed - now).num_microseconds().unwrap().abs() <= 1);
    }
}
