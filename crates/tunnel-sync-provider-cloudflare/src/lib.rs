// # Cloudflare Backend
//
// This crate provides the Cloudflare implementation of the tunnel-sync
// remote backends: one client that speaks both to the Cloudflare Tunnel
// configuration API and to the Cloudflare DNS API.
//
// ## Implementation Status
//
// - ✅ Tunnel ingress fetch/replace (catch-all rule handled transparently)
// - ✅ Paginated DNS record listing
// - ✅ DNS record create/overwrite/delete by record ID
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Specific error handling for HTTP status codes (401/403, 404, 409, 429, 5xx)
// - ✅ Envelope-level failures (`"success": false`) surfaced as errors
// - ❌ NO retry logic (one request per call; failures are reported)
// - ❌ NO caching (every run fetches fresh snapshots)
// - ❌ NO diffing (owned by the reconcilers in tunnel-sync-core)
//
// ## Trust Level: Untrusted (Remote Backend)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTP/HTTPS API calls to Cloudflare endpoints only
// - ✅ Parse Cloudflare-specific responses into core types
//
// **Forbidden Capabilities**:
// - ❌ Spawn tasks or threads
// - ❌ Decide which changes to make
// - ❌ Cache state beyond a single request
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Construction fails fast if the token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - Tunnel configuration: `/accounts/:account_id/cfd_tunnel/:tunnel_id/configurations`
// - DNS records: `/zones/:zone_id/dns_records`

mod api;
mod dns;
mod tunnel;

use std::time::Duration;

use tunnel_sync_core::config::BackendConfig;
use tunnel_sync_core::{Error, Result};

pub use tunnel::{CATCH_ALL_SERVICE, TUNNEL_DOMAIN_SUFFIX};

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Cloudflare API client implementing both `TunnelBackend` and `DnsBackend`
///
/// # Trust Level: Untrusted
///
/// The client is stateless and single-shot: each trait method issues the
/// request(s) for one operation and reports the outcome. The engine decides
/// what to call and in which order.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareClient {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Account owning the tunnel
    account_id: String,

    /// Tunnel whose ingress is managed
    tunnel_id: String,

    /// Zone holding routed hostnames (DNS calls fail without it)
    zone_id: Option<String>,

    /// API base URL, without trailing slash
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareClient")
            .field("api_token", &"<REDACTED>")
            .field("account_id", &self.account_id)
            .field("tunnel_id", &self.tunnel_id)
            .field("zone_id", &self.zone_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl CloudflareClient {
    /// Create a new Cloudflare client
    ///
    /// # Parameters
    ///
    /// - `api_token`: Token with Cloudflare Tunnel:Edit (and Zone:DNS:Edit
    ///   when DNS is managed) permissions
    /// - `account_id`: Account owning the tunnel
    /// - `tunnel_id`: Tunnel whose ingress is managed
    /// - `zone_id`: Zone for routed hostnames; only needed for DNS calls
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a required identifier is empty and
    /// `Error::Http` if the HTTP client cannot be built.
    pub fn new(
        api_token: impl Into<String>,
        account_id: impl Into<String>,
        tunnel_id: impl Into<String>,
        zone_id: Option<String>,
    ) -> Result<Self> {
        let api_token = api_token.into();
        let account_id = account_id.into();
        let tunnel_id = tunnel_id.into();

        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }
        if account_id.is_empty() || tunnel_id.is_empty() {
            return Err(Error::config(
                "Cloudflare account ID and tunnel ID are required",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            account_id,
            tunnel_id,
            zone_id: zone_id.filter(|z| !z.is_empty()),
            api_base: CLOUDFLARE_API_BASE.to_string(),
            client,
        })
    }

    /// Create a client from backend configuration
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        match config {
            BackendConfig::Cloudflare {
                api_token,
                account_id,
                tunnel_id,
                zone_id,
                api_base,
            } => {
                let client = Self::new(
                    api_token.clone(),
                    account_id.clone(),
                    tunnel_id.clone(),
                    zone_id.clone(),
                )?;
                Ok(match api_base {
                    Some(base) => client.with_api_base(base.clone()),
                    None => client,
                })
            }
        }
    }

    /// Point the client at a different API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// API base URL in use
    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}
