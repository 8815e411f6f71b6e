//! Query log.

use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::{format_time, parse_time, GeoContextStore};

/// One logged API query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryLogEntry {
    pub registry: String,
    pub key: String,
    pub x: f64,
    pub y: f64,
    pub srid: i32,
    pub tolerance: f64,
    pub output_format: String,
    pub created_time: DateTime<Utc>,
}

impl GeoContextStore {
    pub async fn log_query(&self, entry: &QueryLogEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO query_logs (registry, key, x, y, srid, tolerance, output_format, created_time)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.registry)
        .bind(&entry.key)
        .bind(entry.x)
        .bind(entry.y)
        .bind(entry.srid)
        .bind(entry.tolerance)
        .bind(&entry.output_format)
        .bind(format_time(entry.created_time))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent queries first.
    pub async fn recent_queries(&self, limit: i64) -> StoreResult<Vec<QueryLogEntry>> {
        let rows: Vec<(String, String, f64, f64, i32, f64, String, String)> = sqlx::query_as(
            r#"
            SELECT registry, key, x, y, srid, tolerance, output_format, created_time
            FROM query_logs ORDER BY id DESC LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(
                |(registry, key, x, y, srid, tolerance, output_format, created_time)| {
                    Ok(QueryLogEntry {
                        registry,
                        key,
                        x,
                        y,
                        srid,
                        tolerance,
                        output_format,
                        created_time: parse_time(&created_time)?,
                    })
                },
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_and_read_back() {
        let store = GeoContextStore::open_memory().await.unwrap();
        for key in ["first", "second"] {
            store
                .log_query(&QueryLogEntry {
                    registry: "group".to_string(),
                    key: key.to_string(),
                    x: 23.55,
                    y: -30.55,
                    srid: 4326,
                    tolerance: 10.0,
                    output_format: "json".to_string(),
                    created_time: Utc::now(),
                })
                .await
                .unwrap();
        }

        let recent = store.recent_queries(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].key, "second");
        assert_eq!(recent[1].registry, "group");
    }
}
