//! Registry kinds and the `{key, name}` listings shown in the UI panels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GeoContextError;

/// One of the three lookup categories values are organised under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Registry {
    Service,
    Group,
    Collection,
}

impl Registry {
    /// All registries in panel order.
    pub const ALL: [Registry; 3] = [Registry::Service, Registry::Group, Registry::Collection];

    /// Lowercase identifier used in URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Registry::Service => "service",
            Registry::Group => "group",
            Registry::Collection => "collection",
        }
    }

    /// Capitalized label ("Service").
    pub fn label(&self) -> &'static str {
        match self {
            Registry::Service => "Service",
            Registry::Group => "Group",
            Registry::Collection => "Collection",
        }
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Registry {
    type Err = GeoContextError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "service" => Ok(Registry::Service),
            "group" => Ok(Registry::Group),
            "collection" => Ok(Registry::Collection),
            _ => Err(GeoContextError::InvalidRegistry(s.to_string())),
        }
    }
}

/// `{key, name}` pair for registry selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub key: String,
    pub name: String,
}

impl RegistryEntry {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
        }
    }
}

/// All registry listings, as injected into the map page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryIndex {
    pub services: Vec<RegistryEntry>,
    pub groups: Vec<RegistryEntry>,
    pub collections: Vec<RegistryEntry>,
}

impl RegistryIndex {
    /// Entries for one registry.
    pub fn entries(&self, registry: Registry) -> &[RegistryEntry] {
        match registry {
            Registry::Service => &self.services,
            Registry::Group => &self.groups,
            Registry::Collection => &self.collections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_registry_case_insensitive() {
        assert_eq!("service".parse::<Registry>().unwrap(), Registry::Service);
        assert_eq!("GROUP".parse::<Registry>().unwrap(), Registry::Group);
        assert_eq!(
            "Collection".parse::<Registry>().unwrap(),
            Registry::Collection
        );
    }

    #[test]
    fn test_parse_registry_invalid() {
        let err = "layer".parse::<Registry>().unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(
            err.to_string(),
            "Registry should be \"collection\", \"service\" or \"group\"."
        );
        assert!("".parse::<Registry>().is_err());
    }

    #[test]
    fn test_registry_labels() {
        assert_eq!(Registry::Group.label(), "Group");
        assert_eq!(Registry::Collection.to_string(), "collection");
    }

    #[test]
    fn test_index_entries() {
        let index = RegistryIndex {
            services: vec![RegistryEntry::new("altitude", "Altitude")],
            groups: vec![],
            collections: vec![RegistryEntry::new("all", "Everything")],
        };
        assert_eq!(index.entries(Registry::Service).len(), 1);
        assert!(index.entries(Registry::Group).is_empty());
        assert_eq!(index.entries(Registry::Collection)[0].key, "all");
    }
}
