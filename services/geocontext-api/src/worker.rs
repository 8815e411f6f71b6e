//! Query worker: cache lookup, upstream fetch and nesting of values.

use std::collections::HashMap;

use chrono::Utc;
use context_common::{
    CollectionValues, GeoContextError, GeoContextResult, GroupValues, OutputFormat, QueryFeature,
    QueryResult, Registry, Service, ServiceValue,
};
use geometry::Point;
use metrics::counter;
use serde::Serialize;
use storage::{GeoContextStore, NewCache, QueryLogEntry, ResolvedRegistry};
use tracing::{debug, instrument, warn};
use upstream::{ServiceQuery, UpstreamClient};

/// Body of a successful query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutput {
    Json(QueryResult),
    GeoJson(QueryFeature),
}

impl QueryOutput {
    pub fn result(&self) -> &QueryResult {
        match self {
            QueryOutput::Json(result) => result,
            QueryOutput::GeoJson(feature) => &feature.properties,
        }
    }
}

/// Retrieves service values from the cache, or from upstream when missing.
#[derive(Clone)]
pub struct Worker {
    store: GeoContextStore,
    upstream: UpstreamClient,
}

impl Worker {
    pub fn new(store: GeoContextStore, upstream: UpstreamClient) -> Self {
        Self { store, upstream }
    }

    pub fn upstream(&self) -> &UpstreamClient {
        &self.upstream
    }

    /// Values of every service under `registry`/`key` at `point`.
    #[instrument(skip(self, point), fields(x = point.x, y = point.y))]
    pub async fn retrieve_all(
        &self,
        registry: Registry,
        key: &str,
        point: &Point,
        tolerance: f64,
        outformat: OutputFormat,
    ) -> GeoContextResult<QueryOutput> {
        self.log_request(registry, key, point, tolerance, outformat)
            .await?;

        let resolved = self.store.resolve(registry, key).await?;
        let values = self.values(&resolved.services(), point, tolerance).await?;
        let result = nest(resolved, &values);

        Ok(match outformat {
            OutputFormat::Json => QueryOutput::Json(result),
            OutputFormat::GeoJson => QueryOutput::GeoJson(result.into_feature(point.x, point.y)),
        })
    }

    async fn log_request(
        &self,
        registry: Registry,
        key: &str,
        point: &Point,
        tolerance: f64,
        outformat: OutputFormat,
    ) -> GeoContextResult<()> {
        let entry = QueryLogEntry {
            registry: registry.to_string(),
            key: key.to_string(),
            x: point.x,
            y: point.y,
            srid: point.srid,
            tolerance,
            output_format: outformat.to_string(),
            created_time: Utc::now(),
        };
        Ok(self.store.log_query(&entry).await?)
    }

    /// Service key to value: valid caches first, the rest fetched and cached.
    async fn values(
        &self,
        services: &[&Service],
        point: &Point,
        tolerance: f64,
    ) -> GeoContextResult<HashMap<String, Option<String>>> {
        let keys: Vec<&str> = services.iter().map(|s| s.key.as_str()).collect();
        let caches = self.store.find_valid_caches(&keys, point, tolerance).await?;

        let mut values: HashMap<String, Option<String>> = caches
            .into_iter()
            .map(|(key, cache)| (key, cache.value))
            .collect();

        let missing: Vec<&Service> = services
            .iter()
            .copied()
            .filter(|s| !values.contains_key(&s.key))
            .collect();

        let mut queries = Vec::new();
        for service in missing {
            match ServiceQuery::new(service.clone(), point, tolerance) {
                Ok(query) => queries.push(query),
                Err(e) => {
                    warn!(service = %service.key, error = %e, "Cannot build service query");
                    values.insert(service.key.clone(), None);
                }
            }
        }

        counter!("geocontext_cache_hits_total").increment((services.len() - queries.len()) as u64);
        counter!("geocontext_cache_misses_total").increment(queries.len() as u64);
        if queries.is_empty() {
            return Ok(values);
        }

        debug!(count = queries.len(), "Fetching uncached services");
        let results = self.upstream.fetch_all(&queries).await;

        let mut new_caches = Vec::with_capacity(results.len());
        for result in results {
            match result.cache_geometry() {
                Ok(geometry) => new_caches.push(NewCache {
                    service_key: result.service_key.clone(),
                    value: result.value.clone(),
                    source_uri: result.source_uri.clone(),
                    geometry,
                    expired_time: result.expire,
                }),
                Err(e) => {
                    warn!(service = %result.service_key, error = %e, "Value not cached")
                }
            }
            values.insert(result.service_key, result.value);
        }
        self.store.insert_caches(&new_caches).await?;

        Ok(values)
    }
}

fn service_values(services: &[Service], values: &HashMap<String, Option<String>>) -> Vec<ServiceValue> {
    services
        .iter()
        .map(|service| {
            let value = values.get(&service.key).cloned().flatten();
            ServiceValue::from_service(service, value)
        })
        .collect()
}

/// Shape values after the registry, in membership order.
fn nest(resolved: ResolvedRegistry, values: &HashMap<String, Option<String>>) -> QueryResult {
    match resolved {
        ResolvedRegistry::Service(service) => {
            let value = values.get(&service.key).cloned().flatten();
            QueryResult::Service(ServiceValue::from_service(&service, value))
        }
        ResolvedRegistry::Group { group, services } => {
            QueryResult::Group(GroupValues::from_group(&group, service_values(&services, values)))
        }
        ResolvedRegistry::Collection { collection, groups } => {
            let groups = groups
                .iter()
                .map(|(group, services)| {
                    GroupValues::from_group(group, service_values(services, values))
                })
                .collect();
            QueryResult::Collection(CollectionValues::from_collection(&collection, groups))
        }
    }
}

/// Parse the query point, rejecting SRIDs that cannot be transformed.
pub fn query_point(x: &str, y: &str, srid: &str) -> GeoContextResult<Point> {
    let point =
        geometry::parse_coord(x, y, srid).map_err(|e| GeoContextError::Coordinate(e.to_string()))?;
    geometry::Srid::from_code(point.srid).map_err(|_| {
        GeoContextError::Coordinate(geometry::CoordError::InvalidSrid(srid.to_string()).to_string())
    })?;
    Ok(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_common::{Collection, Group, GroupType, QueryType};
    use test_utils::assert_approx_eq;

    fn service(key: &str) -> Service {
        Service::new(key, key.to_uppercase(), "http://upstream", QueryType::Wms, key)
    }

    fn values() -> HashMap<String, Option<String>> {
        HashMap::from([
            ("a".to_string(), Some("1".to_string())),
            ("b".to_string(), None),
            ("c".to_string(), Some("3".to_string())),
        ])
    }

    #[test]
    fn test_nest_group_keeps_membership_order() {
        let group = Group::new("g", "G").with_services(["c", "a", "b"]);
        let resolved = ResolvedRegistry::Group {
            group,
            services: vec![service("c"), service("a"), service("b")],
        };
        let QueryResult::Group(group) = nest(resolved, &values()) else {
            panic!("expected group");
        };
        let keys: Vec<&str> = group.services.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
        assert_eq!(group.services[0].value.as_deref(), Some("3"));
        assert_eq!(group.services[2].value, None);
    }

    #[test]
    fn test_nest_collection_per_group_services() {
        let mut graph = Group::new("g2", "G2").with_services(["c"]);
        graph.group_type = GroupType::Graph;
        let resolved = ResolvedRegistry::Collection {
            collection: Collection::new("col", "Col").with_groups(["g1", "g2"]),
            groups: vec![
                (
                    Group::new("g1", "G1").with_services(["a", "b"]),
                    vec![service("a"), service("b")],
                ),
                (graph, vec![service("c")]),
            ],
        };
        let QueryResult::Collection(collection) = nest(resolved, &values()) else {
            panic!("expected collection");
        };
        assert_eq!(collection.groups.len(), 2);
        assert_eq!(collection.groups[0].services.len(), 2);
        assert_eq!(collection.groups[1].group_type, GroupType::Graph);
        assert_eq!(collection.groups[1].services[0].key, "c");
    }

    #[test]
    fn test_nest_service_missing_value() {
        let resolved = ResolvedRegistry::Service(service("z"));
        let QueryResult::Service(value) = nest(resolved, &values()) else {
            panic!("expected service");
        };
        assert_eq!(value.key, "z");
        assert_eq!(value.value, None);
    }

    #[tokio::test]
    async fn test_unbuildable_query_still_fetches_others() {
        use test_utils::{fixtures, MockUpstream};
        use upstream::UpstreamConfig;

        let mock = MockUpstream::start(fixtures::sample_routes()).await;
        let store = GeoContextStore::open_memory().await.unwrap();
        let services = fixtures::sample_services_at(mock.base_url());
        let altitude = services[0].clone();
        let mut lambert = fixtures::wms_service("lambert", &format!("{}/wms", mock.base_url()));
        lambert.srid = 2154;
        store.upsert_service(&altitude).await.unwrap();
        store.upsert_service(&lambert).await.unwrap();

        let worker = Worker::new(store.clone(), UpstreamClient::new(UpstreamConfig::default()).unwrap());
        let point = Point::wgs84(fixtures::TEST_LON, fixtures::TEST_LAT);
        let values = worker
            .values(&[&altitude, &lambert], &point, context_common::DEFAULT_TOLERANCE)
            .await
            .unwrap();

        assert_eq!(values["altitude"].as_deref(), Some(fixtures::ALTITUDE_VALUE));
        assert_eq!(values["lambert"], None);
        assert_eq!(mock.hits("/wms"), 1);
        assert_eq!(store.count_caches().await.unwrap(), 1);
    }

    #[test]
    fn test_query_point() {
        let point = query_point("23.55", "30°33'S", "4326").unwrap();
        assert_approx_eq!(point.x, 23.55, 1e-9);
        assert_approx_eq!(point.y, -30.55, 1e-9);

        let err = query_point("1", "2", "27700").unwrap_err();
        assert_eq!(err.to_string(), "SRID: '27700' not valid");
        assert_eq!(err.status_code(), 400);

        let err = query_point("abc", "2", "4326").unwrap_err();
        assert!(err.to_string().starts_with("Coord 'abc' parse failed"));
    }
}
