// # File Route Source
//
// YAML file implementation of RouteSource.
//
// ## File Format
//
// ```yaml
// - hostname: app.example.com
//   service: http://10.0.0.1:8080
// - hostname: git.example.com
//   service: ssh://10.0.0.2:22
//   originRequest:
//     noTLSVerify: true
// ```
//
// ## Validation
//
// - Top level must be a list (an empty list is valid)
// - Every route needs a non-empty `hostname` and `service`
// - Hostnames must be valid DNS names; a leading `*` label is allowed
// - Hostnames are lowercased, as DNS names compare case-insensitively
// - Duplicate hostnames are rejected instead of silently overwritten

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::Error;
use crate::model::RouteEntry;
use crate::traits::RouteSource;

/// Route source backed by a YAML file
///
/// The file is read fresh on every [`load_routes`](RouteSource::load_routes)
/// call; nothing is cached.
///
/// # Example
///
/// ```rust,no_run
/// use tunnel_sync_core::source::FileRouteSource;
/// use tunnel_sync_core::traits::RouteSource;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let source = FileRouteSource::new("config.yml");
///     let routes = source.load_routes().await?;
///     println!("{} routes", routes.len());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileRouteSource {
    path: PathBuf,
}

impl FileRouteSource {
    /// Create a source for the given file
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the route file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RouteSource for FileRouteSource {
    async fn load_routes(&self) -> Result<Vec<RouteEntry>, Error> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::config(format!(
                    "Configuration file '{}' not found",
                    self.path.display()
                )));
            }
            Err(e) => {
                return Err(Error::config(format!(
                    "Failed to read configuration file '{}': {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let routes = parse_routes(&content).map_err(|e| match e {
            Error::Config(msg) => Error::config(format!("{}: {}", self.path.display(), msg)),
            other => other,
        })?;

        tracing::debug!("Loaded {} route(s) from {}", routes.len(), self.path.display());
        Ok(routes)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Parse and validate a YAML route document
pub fn parse_routes(content: &str) -> Result<Vec<RouteEntry>, Error> {
    let document: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|e| Error::config(format!("Invalid YAML: {}", e)))?;

    let items = match document {
        serde_yaml::Value::Sequence(items) => items,
        _ => return Err(Error::config("Config file must contain a list of routes")),
    };

    let mut routes = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let route: RouteEntry = serde_yaml::from_value(item)
            .map_err(|e| Error::config(format!("Route #{}: {}", index + 1, e)))?;
        routes.push(route);
    }

    lowercase_hostnames(&mut routes);
    validate_routes(&routes)?;
    Ok(routes)
}

/// Lowercase every hostname in place
pub(crate) fn lowercase_hostnames(routes: &mut [RouteEntry]) {
    for route in routes {
        route.hostname.make_ascii_lowercase();
    }
}

/// Validate a desired route snapshot
///
/// Checks required fields, hostname syntax and hostname uniqueness.
/// Uniqueness ignores ASCII case.
pub fn validate_routes(routes: &[RouteEntry]) -> Result<(), Error> {
    let mut seen = HashSet::new();

    for (index, route) in routes.iter().enumerate() {
        if route.service.trim().is_empty() {
            return Err(Error::config(format!(
                "Route #{} ({}): service cannot be empty",
                index + 1,
                route.hostname
            )));
        }

        validate_hostname(&route.hostname)
            .map_err(|msg| Error::config(format!("Route #{}: {}", index + 1, msg)))?;

        if !seen.insert(route.hostname.to_ascii_lowercase()) {
            return Err(Error::config(format!(
                "Duplicate hostname '{}' (route #{})",
                route.hostname,
                index + 1
            )));
        }
    }

    Ok(())
}

/// Validate that a string is a usable route hostname
///
/// Basic DNS name validation per RFC 1035, plus an optional leading `*`
/// wildcard label.
fn validate_hostname(hostname: &str) -> Result<(), String> {
    if hostname.is_empty() {
        return Err("hostname cannot be empty".to_string());
    }

    if hostname.len() > 253 {
        return Err(format!(
            "hostname too long: {} chars (max 253). Got: {}",
            hostname.len(),
            hostname
        ));
    }

    for (position, label) in hostname.split('.').enumerate() {
        if position == 0 && label == "*" {
            continue;
        }

        if label.is_empty() {
            return Err(format!("hostname has empty label: '{}'", hostname));
        }

        if label.len() > 63 {
            return Err(format!(
                "hostname label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            ));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(format!(
                "hostname label contains invalid characters. Label: '{}'",
                label
            ));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(format!(
                "hostname label cannot start or end with hyphen. Label: '{}'",
                label
            ));
        }
    }

    Ok(())
}
