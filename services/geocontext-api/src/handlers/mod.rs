//! HTTP request handlers for the GeoContext API.

pub mod health;
pub mod map;
pub mod query;
pub mod registry;
