//! Distance-aware value cache.
//!
//! Geometries are stored as GeoJSON in EPSG:3857 together with their
//! bounding box, which lets SQLite narrow candidates before the exact
//! distance is measured in Rust.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use geometry::{haversine_distance, Geometry, Point};
use sqlx::FromRow;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::{format_time, parse_time, GeoContextStore};

/// SRID cached geometries are stored in.
pub const CACHE_SRID: i32 = 3857;

/// A value to be cached, geometry already in EPSG:3857.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCache {
    pub service_key: String,
    pub value: Option<String>,
    pub source_uri: Option<String>,
    pub geometry: Geometry,
    pub expired_time: DateTime<Utc>,
}

/// A cached value read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue {
    pub id: i64,
    pub service_key: String,
    pub name: String,
    pub value: Option<String>,
    pub source_uri: Option<String>,
    pub geometry: Geometry,
    pub created_time: DateTime<Utc>,
    pub expired_time: DateTime<Utc>,
    /// Ground distance from the query point in metres.
    pub distance: f64,
}

#[derive(FromRow)]
struct CacheRow {
    id: i64,
    service_key: String,
    name: String,
    value: Option<String>,
    source_uri: Option<String>,
    geometry: String,
    created_time: String,
    expired_time: String,
}

/// Ground metres between a mercator point and a cached geometry.
fn ground_distance(point: &Point, lat: f64, geometry: &Geometry) -> StoreResult<f64> {
    if let Geometry::Point([x, y]) = geometry {
        let other = Point::new(*x, *y, CACHE_SRID);
        return haversine_distance(point, &other).map_err(|e| StoreError::Corrupt(e.to_string()));
    }
    // Mercator distances are stretched by 1/cos(lat)
    Ok(geometry.distance_to(point.x, point.y) * lat.to_radians().cos())
}

impl GeoContextStore {
    /// Store freshly fetched values.
    pub async fn insert_caches(&self, caches: &[NewCache]) -> StoreResult<usize> {
        if caches.is_empty() {
            return Ok(0);
        }
        let now = format_time(Utc::now());
        let mut tx = self.pool.begin().await?;

        for cache in caches {
            let bounds = cache
                .geometry
                .bounds()
                .ok_or_else(|| StoreError::Corrupt("empty cache geometry".to_string()))?;
            let geometry = serde_json::to_string(&cache.geometry.to_geojson())?;

            sqlx::query(
                r#"
                INSERT INTO caches (
                    service_key, name, value, source_uri, geometry,
                    min_x, min_y, max_x, max_y, created_time, expired_time
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&cache.service_key)
            .bind(&cache.service_key)
            .bind(&cache.value)
            .bind(&cache.source_uri)
            .bind(&geometry)
            .bind(bounds.min_x)
            .bind(bounds.min_y)
            .bind(bounds.max_x)
            .bind(bounds.max_y)
            .bind(&now)
            .bind(format_time(cache.expired_time))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(count = caches.len(), "Inserted cache values");
        Ok(caches.len())
    }

    /// Valid cache entries within `tolerance` metres of `point`, nearest per service.
    pub async fn find_valid_caches(
        &self,
        service_keys: &[&str],
        point: &Point,
        tolerance: f64,
    ) -> StoreResult<HashMap<String, CachedValue>> {
        let mut found = HashMap::new();
        if service_keys.is_empty() {
            return Ok(found);
        }

        let lonlat = point
            .transform(4326)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let projected = point
            .transform(CACHE_SRID)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        // Search window in mercator units
        let scale = lonlat.y.to_radians().cos().max(1e-6);
        let window = tolerance / scale;
        let now = format_time(Utc::now());

        let placeholders = vec!["?"; service_keys.len()].join(", ");
        let sql = format!(
            "SELECT id, service_key, name, value, source_uri, geometry, created_time, expired_time \
             FROM caches \
             WHERE service_key IN ({}) AND expired_time > ? \
             AND max_x >= ? AND min_x <= ? AND max_y >= ? AND min_y <= ?",
            placeholders
        );

        let mut query = sqlx::query_as::<_, CacheRow>(&sql);
        for key in service_keys {
            query = query.bind(*key);
        }
        let rows = query
            .bind(&now)
            .bind(projected.x - window)
            .bind(projected.x + window)
            .bind(projected.y - window)
            .bind(projected.y + window)
            .fetch_all(&self.pool)
            .await?;

        for row in rows {
            let json: serde_json::Value = serde_json::from_str(&row.geometry)?;
            let geometry =
                Geometry::from_geojson(&json).map_err(|e| StoreError::Corrupt(e.to_string()))?;
            let distance = ground_distance(&projected, lonlat.y, &geometry)?;
            if distance > tolerance {
                continue;
            }

            let is_nearer = found
                .get(&row.service_key)
                .map_or(true, |existing: &CachedValue| distance < existing.distance);
            if is_nearer {
                let cached = CachedValue {
                    id: row.id,
                    service_key: row.service_key.clone(),
                    name: row.name,
                    value: row.value,
                    source_uri: row.source_uri,
                    geometry,
                    created_time: parse_time(&row.created_time)?,
                    expired_time: parse_time(&row.expired_time)?,
                    distance,
                };
                found.insert(row.service_key, cached);
            }
        }

        debug!(
            requested = service_keys.len(),
            hits = found.len(),
            "Looked up cached values"
        );
        Ok(found)
    }

    /// Delete every cached value.
    pub async fn purge_caches(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM caches").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Delete cached values whose expiry has passed.
    pub async fn purge_expired_caches(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM caches WHERE expired_time <= ?")
            .bind(format_time(Utc::now()))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_caches(&self) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM caches")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use test_utils::fixtures;

    async fn store_with_altitude() -> GeoContextStore {
        let store = GeoContextStore::open_memory().await.unwrap();
        store
            .upsert_service(&fixtures::wms_service("altitude", "http://localhost/wms"))
            .await
            .unwrap();
        store
    }

    fn cache_at(lon: f64, lat: f64, value: &str, expires_in: Duration) -> NewCache {
        let p = Point::wgs84(lon, lat).transform(CACHE_SRID).unwrap();
        NewCache {
            service_key: "altitude".to_string(),
            value: Some(value.to_string()),
            source_uri: Some("http://localhost/wms?REQUEST=GetFeatureInfo".to_string()),
            geometry: Geometry::Point([p.x, p.y]),
            expired_time: Utc::now() + expires_in,
        }
    }

    #[tokio::test]
    async fn test_cache_hit_within_tolerance() {
        let store = store_with_altitude().await;
        store
            .insert_caches(&[cache_at(23.55, -30.55, "1225", Duration::days(7))])
            .await
            .unwrap();

        // ~5 m east of the cached point
        let query = Point::wgs84(23.55005, -30.55);
        let hits = store
            .find_valid_caches(&["altitude"], &query, 10.0)
            .await
            .unwrap();
        let hit = hits.get("altitude").unwrap();
        assert_eq!(hit.value.as_deref(), Some("1225"));
        assert!(hit.distance < 10.0);
    }

    #[tokio::test]
    async fn test_cache_miss_outside_tolerance() {
        let store = store_with_altitude().await;
        store
            .insert_caches(&[cache_at(23.55, -30.55, "1225", Duration::days(7))])
            .await
            .unwrap();

        // ~96 m east
        let query = Point::wgs84(23.551, -30.55);
        let hits = store
            .find_valid_caches(&["altitude"], &query, 10.0)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_expired_cache_ignored_and_purged() {
        let store = store_with_altitude().await;
        store
            .insert_caches(&[
                cache_at(23.55, -30.55, "old", -Duration::seconds(1)),
                cache_at(10.0, 10.0, "fresh", Duration::days(1)),
            ])
            .await
            .unwrap();

        let hits = store
            .find_valid_caches(&["altitude"], &Point::wgs84(23.55, -30.55), 10.0)
            .await
            .unwrap();
        assert!(hits.is_empty());

        assert_eq!(store.purge_expired_caches().await.unwrap(), 1);
        assert_eq!(store.count_caches().await.unwrap(), 1);
        assert_eq!(store.purge_caches().await.unwrap(), 1);
        assert_eq!(store.count_caches().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_nearest_cache_wins() {
        let store = store_with_altitude().await;
        store
            .insert_caches(&[
                cache_at(23.55008, -30.55, "far", Duration::days(1)),
                cache_at(23.55001, -30.55, "near", Duration::days(1)),
            ])
            .await
            .unwrap();

        let hits = store
            .find_valid_caches(&["altitude"], &Point::wgs84(23.55, -30.55), 10.0)
            .await
            .unwrap();
        assert_eq!(hits["altitude"].value.as_deref(), Some("near"));
    }

    #[tokio::test]
    async fn test_polygon_cache_contains_point() {
        let store = store_with_altitude().await;
        let corner = |lon: f64, lat: f64| {
            let p = Point::wgs84(lon, lat).transform(CACHE_SRID).unwrap();
            [p.x, p.y]
        };
        let polygon = Geometry::Polygon(vec![vec![
            corner(23.0, -31.0),
            corner(24.0, -31.0),
            corner(24.0, -30.0),
            corner(23.0, -30.0),
            corner(23.0, -31.0),
        ]]);
        store
            .insert_caches(&[NewCache {
                service_key: "altitude".to_string(),
                value: Some("inside".to_string()),
                source_uri: None,
                geometry: polygon,
                expired_time: Utc::now() + Duration::days(1),
            }])
            .await
            .unwrap();

        let hits = store
            .find_valid_caches(&["altitude"], &Point::wgs84(23.55, -30.55), 10.0)
            .await
            .unwrap();
        assert_eq!(hits["altitude"].distance, 0.0);
    }

    #[tokio::test]
    async fn test_empty_inputs() {
        let store = store_with_altitude().await;
        assert_eq!(store.insert_caches(&[]).await.unwrap(), 0);
        assert!(store
            .find_valid_caches(&[], &Point::wgs84(0.0, 0.0), 10.0)
            .await
            .unwrap()
            .is_empty());
    }
}
