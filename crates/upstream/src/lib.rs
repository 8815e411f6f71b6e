//! Fetching context values from upstream geospatial services.
//!
//! Each service is queried through the [`ValueSource`] for its query type.
//! [`UpstreamClient::fetch_all`] runs one request per service concurrently
//! over a shared HTTP client; a failing service yields no value instead of
//! failing the whole query.

pub mod arcrest;
pub mod capabilities;
pub mod client;
pub mod error;
pub mod features;
pub mod placename;
pub mod query;
pub mod source;
pub mod url;
pub mod wfs;
pub mod wms;

pub use capabilities::LayerExtent;
pub use client::{UpstreamClient, UpstreamConfig};
pub use error::{FetchError, FetchResult};
pub use query::{ServiceQuery, ServiceResult, CACHE_SRID, MAX_FEATURES};
pub use source::{source_for, ValueSource};
