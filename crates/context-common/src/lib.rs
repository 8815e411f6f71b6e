//! Common types shared by the GeoContext services.
//!
//! A GeoContext deployment is organised in three registries:
//! - **services**: a single upstream layer (WMS, WFS, ArcREST, GeoNames)
//! - **groups**: an ordered list of services
//! - **collections**: an ordered list of groups
//!
//! # Example
//!
//! ```rust
//! use context_common::{Registry, validate_key};
//!
//! let registry: Registry = "Group".parse().unwrap();
//! assert_eq!(registry, Registry::Group);
//! assert!(validate_key("rainfall_january").is_ok());
//! ```

pub mod collection;
pub mod error;
pub mod group;
pub mod key;
pub mod registry;
pub mod responses;
pub mod service;
pub mod value;

pub use collection::Collection;
pub use error::{GeoContextError, GeoContextResult};
pub use group::{Group, GroupType};
pub use key::{validate_key, KeyError};
pub use registry::{Registry, RegistryEntry, RegistryIndex};
pub use responses::ExceptionResponse;
pub use service::{QueryType, Service};
pub use value::{CollectionValues, GroupValues, OutputFormat, QueryFeature, QueryResult, ServiceValue};

/// Default tolerance around a query point, in metres.
pub const DEFAULT_TOLERANCE: f64 = 10.0;

/// Default cache lifetime of a service value (7 days).
pub const DEFAULT_CACHE_DURATION_SECS: i64 = 604_800;

/// Longest accepted cache lifetime (100 years).
pub const MAX_CACHE_DURATION_SECS: i64 = 3_153_600_000;

/// Default spatial reference of services and queries.
pub const DEFAULT_SRID: i32 = 4326;
