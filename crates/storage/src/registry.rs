//! Registry persistence: services, groups, collections and their ordering.

use std::collections::HashSet;

use context_common::{
    validate_key, Collection, Group, GroupType, QueryType, Registry, RegistryEntry, RegistryIndex,
    Service, MAX_CACHE_DURATION_SECS,
};
use sqlx::FromRow;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::GeoContextStore;

#[derive(FromRow)]
struct ServiceRow {
    key: String,
    name: String,
    description: Option<String>,
    url: String,
    username: Option<String>,
    password: Option<String>,
    api_key: Option<String>,
    query_type: String,
    layer_name: String,
    layer_namespace: Option<String>,
    layer_typename: Option<String>,
    layer_workspace: Option<String>,
    cache_duration: i64,
    srid: i32,
    tolerance: f64,
    service_version: String,
    provenance: Option<String>,
    notes: Option<String>,
    licensing: Option<String>,
    test_x: Option<f64>,
    test_y: Option<f64>,
    test_value: Option<String>,
    status: Option<String>,
}

impl TryFrom<ServiceRow> for Service {
    type Error = StoreError;

    fn try_from(row: ServiceRow) -> Result<Self, Self::Error> {
        let query_type: QueryType = row.query_type.parse().map_err(StoreError::Corrupt)?;
        Ok(Service {
            key: row.key,
            name: row.name,
            description: row.description,
            url: row.url,
            username: row.username,
            password: row.password,
            api_key: row.api_key,
            query_type,
            layer_name: row.layer_name,
            layer_namespace: row.layer_namespace,
            layer_typename: row.layer_typename,
            layer_workspace: row.layer_workspace,
            cache_duration: row.cache_duration,
            srid: row.srid,
            tolerance: row.tolerance,
            service_version: row.service_version,
            provenance: row.provenance,
            notes: row.notes,
            licensing: row.licensing,
            test_x: row.test_x,
            test_y: row.test_y,
            test_value: row.test_value,
            status: row.status,
        })
    }
}

const SERVICE_COLUMNS: &str = "s.key, s.name, s.description, s.url, s.username, s.password, \
     s.api_key, s.query_type, s.layer_name, s.layer_namespace, s.layer_typename, \
     s.layer_workspace, s.cache_duration, s.srid, s.tolerance, s.service_version, \
     s.provenance, s.notes, s.licensing, s.test_x, s.test_y, s.test_value, s.status";

#[derive(FromRow)]
struct GroupRow {
    key: String,
    name: String,
    description: Option<String>,
    group_type: String,
    graphable: bool,
}

#[derive(FromRow)]
struct CollectionRow {
    key: String,
    name: String,
    description: Option<String>,
}

/// A registry key resolved to its definitions, in display order.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedRegistry {
    Service(Service),
    Group {
        group: Group,
        services: Vec<Service>,
    },
    Collection {
        collection: Collection,
        groups: Vec<(Group, Vec<Service>)>,
    },
}

impl ResolvedRegistry {
    /// Distinct services, in first-seen order.
    pub fn services(&self) -> Vec<&Service> {
        let mut seen = HashSet::new();
        let all: Vec<&Service> = match self {
            ResolvedRegistry::Service(service) => vec![service],
            ResolvedRegistry::Group { services, .. } => services.iter().collect(),
            ResolvedRegistry::Collection { groups, .. } => {
                groups.iter().flat_map(|(_, s)| s.iter()).collect()
            }
        };
        all.into_iter()
            .filter(|s| seen.insert(s.key.as_str()))
            .collect()
    }
}

/// Key and cache lifetime checks shared by upsert and import.
pub(crate) fn validate_service(service: &Service) -> StoreResult<()> {
    validate_key(&service.key)?;
    if !(0..=MAX_CACHE_DURATION_SECS).contains(&service.cache_duration) {
        return Err(StoreError::InvalidCacheDuration {
            key: service.key.clone(),
            seconds: service.cache_duration,
            max: MAX_CACHE_DURATION_SECS,
        });
    }
    Ok(())
}

impl GeoContextStore {
    /// Insert or replace a service definition.
    pub async fn upsert_service(&self, service: &Service) -> StoreResult<()> {
        validate_service(service)?;

        sqlx::query(
            r#"
            INSERT INTO services (
                key, name, description, url, username, password, api_key,
                query_type, layer_name, layer_namespace, layer_typename, layer_workspace,
                cache_duration, srid, tolerance, service_version,
                provenance, notes, licensing, test_x, test_y, test_value, status
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (key) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                url = excluded.url,
                username = excluded.username,
                password = excluded.password,
                api_key = excluded.api_key,
                query_type = excluded.query_type,
                layer_name = excluded.layer_name,
                layer_namespace = excluded.layer_namespace,
                layer_typename = excluded.layer_typename,
                layer_workspace = excluded.layer_workspace,
                cache_duration = excluded.cache_duration,
                srid = excluded.srid,
                tolerance = excluded.tolerance,
                service_version = excluded.service_version,
                provenance = excluded.provenance,
                notes = excluded.notes,
                licensing = excluded.licensing,
                test_x = excluded.test_x,
                test_y = excluded.test_y,
                test_value = excluded.test_value,
                status = excluded.status
            "#,
        )
        .bind(&service.key)
        .bind(&service.name)
        .bind(&service.description)
        .bind(&service.url)
        .bind(&service.username)
        .bind(&service.password)
        .bind(&service.api_key)
        .bind(service.query_type.as_str())
        .bind(&service.layer_name)
        .bind(&service.layer_namespace)
        .bind(&service.layer_typename)
        .bind(&service.layer_workspace)
        .bind(service.cache_duration)
        .bind(service.srid)
        .bind(service.tolerance)
        .bind(&service.service_version)
        .bind(&service.provenance)
        .bind(&service.notes)
        .bind(&service.licensing)
        .bind(service.test_x)
        .bind(service.test_y)
        .bind(&service.test_value)
        .bind(&service.status)
        .execute(&self.pool)
        .await?;

        debug!(key = %service.key, "Saved service");
        Ok(())
    }

    pub async fn get_service(&self, key: &str) -> StoreResult<Service> {
        let row = sqlx::query_as::<_, ServiceRow>(&format!(
            "SELECT {} FROM services s WHERE s.key = ?",
            SERVICE_COLUMNS
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("Service", key))?;

        row.try_into()
    }

    /// All services, ordered by key.
    pub async fn list_services(&self) -> StoreResult<Vec<Service>> {
        let rows = sqlx::query_as::<_, ServiceRow>(&format!(
            "SELECT {} FROM services s ORDER BY s.key",
            SERVICE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Service::try_from).collect()
    }

    /// Record the outcome of a service self-test.
    pub async fn set_service_status(&self, key: &str, status: &str) -> StoreResult<()> {
        let result = sqlx::query("UPDATE services SET status = ? WHERE key = ?")
            .bind(status)
            .bind(key)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Service", key));
        }
        Ok(())
    }

    /// Insert or replace a group and its ordered service membership.
    pub async fn upsert_group(&self, group: &Group) -> StoreResult<()> {
        validate_key(&group.key)?;

        let mut tx = self.pool.begin().await?;

        for service_key in &group.service_keys {
            let exists: Option<(String,)> = sqlx::query_as("SELECT key FROM services WHERE key = ?")
                .bind(service_key)
                .fetch_optional(&mut *tx)
                .await?;
            if exists.is_none() {
                return Err(StoreError::MissingReference {
                    kind: "Group",
                    key: group.key.clone(),
                    target: "service",
                    reference: service_key.clone(),
                });
            }
        }

        sqlx::query(
            r#"
            INSERT INTO service_groups (key, name, description, group_type, graphable)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (key) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                group_type = excluded.group_type,
                graphable = excluded.graphable
            "#,
        )
        .bind(&group.key)
        .bind(&group.name)
        .bind(&group.description)
        .bind(group.group_type.as_str())
        .bind(group.graphable)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM group_services WHERE group_key = ?")
            .bind(&group.key)
            .execute(&mut *tx)
            .await?;

        for (position, service_key) in group.service_keys.iter().enumerate() {
            sqlx::query(
                "INSERT OR IGNORE INTO group_services (group_key, service_key, position) VALUES (?, ?, ?)",
            )
            .bind(&group.key)
            .bind(service_key)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(key = %group.key, services = group.service_keys.len(), "Saved group");
        Ok(())
    }

    pub async fn get_group(&self, key: &str) -> StoreResult<Group> {
        let row = sqlx::query_as::<_, GroupRow>(
            "SELECT key, name, description, group_type, graphable FROM service_groups WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("Group", key))?;

        self.group_from_row(row).await
    }

    pub async fn list_groups(&self) -> StoreResult<Vec<Group>> {
        let rows = sqlx::query_as::<_, GroupRow>(
            "SELECT key, name, description, group_type, graphable FROM service_groups ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            groups.push(self.group_from_row(row).await?);
        }
        Ok(groups)
    }

    async fn group_from_row(&self, row: GroupRow) -> StoreResult<Group> {
        let group_type: GroupType = row.group_type.parse().map_err(StoreError::Corrupt)?;
        let service_keys: Vec<(String,)> = sqlx::query_as(
            "SELECT service_key FROM group_services WHERE group_key = ? ORDER BY position",
        )
        .bind(&row.key)
        .fetch_all(&self.pool)
        .await?;

        Ok(Group {
            key: row.key,
            name: row.name,
            description: row.description,
            group_type,
            graphable: row.graphable,
            service_keys: service_keys.into_iter().map(|(k,)| k).collect(),
        })
    }

    /// Services of a group, in group order.
    pub async fn group_services(&self, group_key: &str) -> StoreResult<Vec<Service>> {
        let rows = sqlx::query_as::<_, ServiceRow>(&format!(
            "SELECT {} FROM services s \
             JOIN group_services gs ON gs.service_key = s.key \
             WHERE gs.group_key = ? ORDER BY gs.position",
            SERVICE_COLUMNS
        ))
        .bind(group_key)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Service::try_from).collect()
    }

    /// Insert or replace a collection and its ordered group membership.
    pub async fn upsert_collection(&self, collection: &Collection) -> StoreResult<()> {
        validate_key(&collection.key)?;

        let mut tx = self.pool.begin().await?;

        for group_key in &collection.group_keys {
            let exists: Option<(String,)> =
                sqlx::query_as("SELECT key FROM service_groups WHERE key = ?")
                    .bind(group_key)
                    .fetch_optional(&mut *tx)
                    .await?;
            if exists.is_none() {
                return Err(StoreError::MissingReference {
                    kind: "Collection",
                    key: collection.key.clone(),
                    target: "group",
                    reference: group_key.clone(),
                });
            }
        }

        sqlx::query(
            r#"
            INSERT INTO collections (key, name, description) VALUES (?, ?, ?)
            ON CONFLICT (key) DO UPDATE SET
                name = excluded.name,
                description = excluded.description
            "#,
        )
        .bind(&collection.key)
        .bind(&collection.name)
        .bind(&collection.description)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM collection_groups WHERE collection_key = ?")
            .bind(&collection.key)
            .execute(&mut *tx)
            .await?;

        for (position, group_key) in collection.group_keys.iter().enumerate() {
            sqlx::query(
                "INSERT OR IGNORE INTO collection_groups (collection_key, group_key, position) VALUES (?, ?, ?)",
            )
            .bind(&collection.key)
            .bind(group_key)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(key = %collection.key, groups = collection.group_keys.len(), "Saved collection");
        Ok(())
    }

    pub async fn get_collection(&self, key: &str) -> StoreResult<Collection> {
        let row = sqlx::query_as::<_, CollectionRow>(
            "SELECT key, name, description FROM collections WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("Collection", key))?;

        self.collection_from_row(row).await
    }

    pub async fn list_collections(&self) -> StoreResult<Vec<Collection>> {
        let rows = sqlx::query_as::<_, CollectionRow>(
            "SELECT key, name, description FROM collections ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut collections = Vec::with_capacity(rows.len());
        for row in rows {
            collections.push(self.collection_from_row(row).await?);
        }
        Ok(collections)
    }

    async fn collection_from_row(&self, row: CollectionRow) -> StoreResult<Collection> {
        let group_keys: Vec<(String,)> = sqlx::query_as(
            "SELECT group_key FROM collection_groups WHERE collection_key = ? ORDER BY position",
        )
        .bind(&row.key)
        .fetch_all(&self.pool)
        .await?;

        Ok(Collection {
            key: row.key,
            name: row.name,
            description: row.description,
            group_keys: group_keys.into_iter().map(|(k,)| k).collect(),
        })
    }

    /// `{key, name}` listing of one registry, ordered by name.
    pub async fn list_entries(&self, registry: Registry) -> StoreResult<Vec<RegistryEntry>> {
        let table = match registry {
            Registry::Service => "services",
            Registry::Group => "service_groups",
            Registry::Collection => "collections",
        };
        let rows: Vec<(String, String)> = sqlx::query_as(&format!(
            "SELECT key, name FROM {} ORDER BY name, key",
            table
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(key, name)| RegistryEntry { key, name })
            .collect())
    }

    pub async fn registry_index(&self) -> StoreResult<RegistryIndex> {
        Ok(RegistryIndex {
            services: self.list_entries(Registry::Service).await?,
            groups: self.list_entries(Registry::Group).await?,
            collections: self.list_entries(Registry::Collection).await?,
        })
    }

    /// Resolve a registry key into its definitions and ordered services.
    pub async fn resolve(&self, registry: Registry, key: &str) -> StoreResult<ResolvedRegistry> {
        match registry {
            Registry::Service => Ok(ResolvedRegistry::Service(self.get_service(key).await?)),
            Registry::Group => {
                let group = self.get_group(key).await?;
                let services = self.group_services(key).await?;
                Ok(ResolvedRegistry::Group { group, services })
            }
            Registry::Collection => {
                let collection = self.get_collection(key).await?;
                let mut groups = Vec::with_capacity(collection.group_keys.len());
                for group_key in &collection.group_keys {
                    let group = self.get_group(group_key).await?;
                    let services = self.group_services(group_key).await?;
                    groups.push((group, services));
                }
                Ok(ResolvedRegistry::Collection { collection, groups })
            }
        }
    }

    /// Remove every registry definition; cached values go with their services.
    pub async fn delete_all_registries(&self) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for table in [
            "collection_groups",
            "collections",
            "group_services",
            "service_groups",
            "caches",
            "services",
        ] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
