//! Service self-tests and cache housekeeping run by the admin tool.

use context_common::{Service, DEFAULT_TOLERANCE};
use geometry::Point;
use storage::{GeoContextStore, StoreResult};
use tracing::{info, warn};
use upstream::{ServiceQuery, UpstreamClient};

pub const STATUS_ONLINE: &str = "online";
pub const STATUS_OFFLINE: &str = "offline";

/// Outcome of testing one service against its recorded test value.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCheck {
    pub key: String,
    pub name: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub online: bool,
}

async fn check_service(upstream: &UpstreamClient, service: &Service) -> ServiceCheck {
    let actual = match service.test_point() {
        Some((x, y)) => {
            let point = Point::new(x, y, service.srid);
            match ServiceQuery::new(service.clone(), &point, DEFAULT_TOLERANCE) {
                Ok(query) => upstream.fetch(&query).await.value,
                Err(e) => {
                    warn!(service = %service.key, error = %e, "Cannot build test query");
                    None
                }
            }
        }
        None => None,
    };

    let online = service.test_value.is_some() && actual == service.test_value;
    ServiceCheck {
        key: service.key.clone(),
        name: service.name.clone(),
        expected: service.test_value.clone(),
        actual,
        online,
    }
}

/// Fetch each service at its test point and record online/offline.
///
/// Services without a test point are left unchanged.
pub async fn test_services(
    store: &GeoContextStore,
    upstream: &UpstreamClient,
) -> StoreResult<Vec<ServiceCheck>> {
    let mut checks = Vec::new();
    for service in store.list_services().await? {
        if service.test_point().is_none() {
            continue;
        }
        let check = check_service(upstream, &service).await;
        let status = if check.online {
            info!(service = %service.name, "Service status online");
            STATUS_ONLINE
        } else {
            warn!(service = %service.name, "Service status offline");
            STATUS_OFFLINE
        };
        store.set_service_status(&service.key, status).await?;
        checks.push(check);
    }
    Ok(checks)
}

/// Cache counts before and after a purge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeSummary {
    pub deleted: u64,
    pub remaining: i64,
}

pub async fn purge_caches(store: &GeoContextStore, expired_only: bool) -> StoreResult<PurgeSummary> {
    let deleted = if expired_only {
        store.purge_expired_caches().await?
    } else {
        store.purge_caches().await?
    };
    let remaining = store.count_caches().await?;
    info!(deleted, remaining, expired_only, "Purged caches");
    Ok(PurgeSummary { deleted, remaining })
}
