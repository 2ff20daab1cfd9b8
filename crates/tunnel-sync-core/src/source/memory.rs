// # Static Route Source
//
// In-memory implementation of RouteSource.
//
// ## Purpose
//
// Lets embedders (and tests) hand the engine a route list built in code
// instead of a file. The list is normalized and validated with the same
// rules as the file source, so duplicates are still rejected at load time.

use async_trait::async_trait;

use crate::Error;
use crate::model::RouteEntry;
use crate::source::file::{lowercase_hostnames, validate_routes};
use crate::traits::RouteSource;

/// In-memory route source
///
/// # Example
///
/// ```rust
/// use tunnel_sync_core::model::RouteEntry;
/// use tunnel_sync_core::source::StaticRouteSource;
///
/// let source = StaticRouteSource::new(vec![
///     RouteEntry::new("app.example.com", "http://10.0.0.1:8080"),
/// ]);
/// assert_eq!(source.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticRouteSource {
    routes: Vec<RouteEntry>,
}

impl StaticRouteSource {
    /// Create a source returning `routes`
    pub fn new(routes: Vec<RouteEntry>) -> Self {
        Self { routes }
    }

    /// Number of routes held
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the source holds no routes
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[async_trait]
impl RouteSource for StaticRouteSource {
    async fn load_routes(&self) -> Result<Vec<RouteEntry>, Error> {
        let mut routes = self.routes.clone();
        lowercase_hostnames(&mut routes);
        validate_routes(&routes)?;
        Ok(routes)
    }

    fn describe(&self) -> String {
        format!("in-memory ({} routes)", self.routes.len())
    }
}
