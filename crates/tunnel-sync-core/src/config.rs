//! Configuration types for the tunnel sync system
//!
//! Everything the engine and its collaborators need is passed explicitly
//! through [`SyncConfig`]; nothing is read from ambient globals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Where the desired routes come from
    pub source: SourceConfig,

    /// Remote system configuration
    pub backend: BackendConfig,

    /// Run options
    #[serde(default)]
    pub options: SyncOptions,
}

impl SyncConfig {
    /// Create a configuration with default options
    pub fn new(source: SourceConfig, backend: BackendConfig) -> Self {
        Self {
            source,
            backend,
            options: SyncOptions::default(),
        }
    }

    /// Set run options
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.source.validate()?;
        self.backend.validate(self.options.manage_dns)?;
        self.options.validate()?;
        Ok(())
    }
}

/// Desired-state source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// YAML route file
    File {
        /// Path to the route file
        path: String,
    },
}

impl SourceConfig {
    /// Validate the source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SourceConfig::File { path } => {
                if path.trim().is_empty() {
                    return Err(crate::Error::config("Route file path cannot be empty"));
                }
                Ok(())
            }
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::File {
            path: "config.yml".to_string(),
        }
    }
}

/// Remote backend configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Cloudflare Tunnel + Cloudflare DNS
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// Account owning the tunnel
        account_id: String,
        /// Tunnel whose ingress is managed
        tunnel_id: String,
        /// DNS zone for routed hostnames (required when DNS is managed)
        #[serde(default)]
        zone_id: Option<String>,
        /// API base URL override
        #[serde(default)]
        api_base: Option<String>,
    },
}

impl BackendConfig {
    /// Validate the backend configuration
    ///
    /// Reports every missing setting at once rather than stopping at the
    /// first one.
    pub fn validate(&self, manage_dns: bool) -> Result<(), crate::Error> {
        match self {
            BackendConfig::Cloudflare {
                api_token,
                account_id,
                tunnel_id,
                zone_id,
                ..
            } => {
                let mut missing = Vec::new();
                if api_token.trim().is_empty() {
                    missing.push("api_token");
                }
                if account_id.trim().is_empty() {
                    missing.push("account_id");
                }
                if tunnel_id.trim().is_empty() {
                    missing.push("tunnel_id");
                }
                if manage_dns && zone_id.as_deref().is_none_or(|z| z.trim().is_empty()) {
                    missing.push("zone_id (required for DNS management)");
                }

                if !missing.is_empty() {
                    return Err(crate::Error::config(format!(
                        "Missing Cloudflare settings: {}",
                        missing.join(", ")
                    )));
                }
                Ok(())
            }
        }
    }
}

// Custom Debug implementation that hides the API token
impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendConfig::Cloudflare {
                account_id,
                tunnel_id,
                zone_id,
                api_base,
                ..
            } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<REDACTED>")
                .field("account_id", account_id)
                .field("tunnel_id", tunnel_id)
                .field("zone_id", zone_id)
                .field("api_base", api_base)
                .finish(),
        }
    }
}

/// Run options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Compute and report actions without mutating the remote system
    #[serde(default)]
    pub dry_run: bool,

    /// Whether DNS records are reconciled after routes
    #[serde(default = "default_manage_dns")]
    pub manage_dns: bool,

    /// Maximum number of DNS mutations in flight at once
    ///
    /// Set to 1 for strictly sequential record-by-record application.
    ///
    /// Default: 4
    #[serde(default = "default_dns_apply_concurrency")]
    pub dns_apply_concurrency: usize,
}

impl SyncOptions {
    /// Validate the options
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.dns_apply_concurrency == 0 {
            return Err(crate::Error::config("dns_apply_concurrency must be > 0"));
        }
        Ok(())
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable or disable DNS management
    pub fn with_manage_dns(mut self, manage_dns: bool) -> Self {
        self.manage_dns = manage_dns;
        self
    }

    /// Set DNS apply concurrency
    pub fn with_dns_apply_concurrency(mut self, concurrency: usize) -> Self {
        self.dns_apply_concurrency = concurrency;
        self
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            manage_dns: default_manage_dns(),
            dns_apply_concurrency: default_dns_apply_concurrency(),
        }
    }
}

fn default_manage_dns() -> bool {
    true
}

fn default_dns_apply_concurrency() -> usize {
    4
}
