// # Route Source Trait
//
// Defines the interface for loading the desired route set.
//
// ## Implementations
//
// - YAML file: [`crate::source::FileRouteSource`]
// - In-memory: [`crate::source::StaticRouteSource`]

use async_trait::async_trait;

use crate::model::RouteEntry;

/// Trait for desired-state sources
///
/// A source must return a snapshot with unique hostnames. Duplicate,
/// missing or malformed input is reported as [`crate::Error::Config`]
/// before the engine ever talks to the remote system.
#[async_trait]
pub trait RouteSource: Send + Sync {
    /// Load the desired routes
    async fn load_routes(&self) -> Result<Vec<RouteEntry>, crate::Error>;

    /// Human-readable description of where routes come from
    fn describe(&self) -> String;
}
