//! JSON import and export of the registries.

use std::collections::HashSet;

use context_common::{validate_key, Collection, Group, Service};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::registry::validate_service;
use crate::GeoContextStore;

/// Portable form of every registry definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub collections: Vec<Collection>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub services: usize,
    pub groups: usize,
    pub collections: usize,
}

impl RegistryDocument {
    pub fn from_json(text: &str) -> StoreResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check keys and that every reference is defined in this document.
    pub fn validate(&self) -> StoreResult<()> {
        let mut service_keys = HashSet::new();
        for service in &self.services {
            validate_service(service)?;
            service_keys.insert(service.key.as_str());
        }

        let mut group_keys = HashSet::new();
        for group in &self.groups {
            validate_key(&group.key)?;
            group_keys.insert(group.key.as_str());
            if let Some(missing) = group
                .service_keys
                .iter()
                .find(|k| !service_keys.contains(k.as_str()))
            {
                return Err(StoreError::MissingReference {
                    kind: "Group",
                    key: group.key.clone(),
                    target: "service",
                    reference: missing.clone(),
                });
            }
        }

        for collection in &self.collections {
            validate_key(&collection.key)?;
            if let Some(missing) = collection
                .group_keys
                .iter()
                .find(|k| !group_keys.contains(k.as_str()))
            {
                return Err(StoreError::MissingReference {
                    kind: "Collection",
                    key: collection.key.clone(),
                    target: "group",
                    reference: missing.clone(),
                });
            }
        }
        Ok(())
    }
}

impl GeoContextStore {
    /// Validate then upsert every definition in `document`.
    pub async fn import_document(&self, document: &RegistryDocument) -> StoreResult<ImportSummary> {
        document.validate()?;

        for service in &document.services {
            self.upsert_service(service).await?;
        }
        for group in &document.groups {
            self.upsert_group(group).await?;
        }
        for collection in &document.collections {
            self.upsert_collection(collection).await?;
        }

        let summary = ImportSummary {
            services: document.services.len(),
            groups: document.groups.len(),
            collections: document.collections.len(),
        };
        info!(
            services = summary.services,
            groups = summary.groups,
            collections = summary.collections,
            "Imported registry document"
        );
        Ok(summary)
    }

    pub async fn export_document(&self) -> StoreResult<RegistryDocument> {
        Ok(RegistryDocument {
            services: self.list_services().await?,
            groups: self.list_groups().await?,
            collections: self.list_collections().await?,
        })
    }
}
