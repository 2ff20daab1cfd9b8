// # Remote Backend Traits
//
// Defines the interfaces the sync engine uses to read and mutate the
// remote system.
//
// ## Implementations
//
// - Cloudflare: `tunnel-sync-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use tunnel_sync_core::{TunnelBackend, DnsBackend};
//
// async fn show(backend: &dyn TunnelBackend) -> tunnel_sync_core::Result<()> {
//     for route in backend.fetch_routes().await? {
//         println!("{}", route);
//     }
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::model::{DnsRecord, DnsTarget, RouteEntry};

/// Trait for the routing side of the remote system
///
/// # Trust Level: Untrusted
///
/// Backends are I/O adapters only:
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Normalize remote payloads into [`RouteEntry`] values
/// - ✅ Return success or failure
///
/// ## Forbidden Capabilities
/// - ❌ Decide which routes need changing (owned by the reconcilers)
/// - ❌ Retry or back off (transport concerns stay per call)
/// - ❌ Cache state between runs
///
/// ## Normalization
///
/// Remote-only artifacts such as a trailing catch-all rule must be removed
/// by [`fetch_routes`](Self::fetch_routes) and re-added by
/// [`apply_route_document`](Self::apply_route_document), so the engine
/// only ever sees hostname-bearing entries.
#[async_trait]
pub trait TunnelBackend: Send + Sync {
    /// Fetch the routes currently configured at the remote system
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<RouteEntry>)`: Current routes (may be empty)
    /// - `Err(Error::NotFound)`: No configuration exists yet; the engine
    ///   treats this as an empty actual state
    /// - `Err(Error)`: Any other failure (fatal for the run)
    async fn fetch_routes(&self) -> Result<Vec<RouteEntry>, crate::Error>;

    /// Replace the whole route document with `routes`
    ///
    /// Configuration updates are whole-document, not incremental: the full
    /// desired list is sent every time.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The remote system accepted the document
    /// - `Err(Error::RemoteApply)`: The remote system rejected it
    async fn apply_route_document(&self, routes: &[RouteEntry]) -> Result<(), crate::Error>;

    /// The address DNS records for routed hostnames must point to
    fn dns_target(&self) -> DnsTarget;

    /// Get the backend name (for logging/reporting)
    fn backend_name(&self) -> &'static str;
}

/// Trait for the DNS side of the remote system
///
/// Same trust level as [`TunnelBackend`]: one API call per method, no diff
/// logic. Record filtering (which records are managed) belongs to the DNS
/// reconciler, so [`fetch_records`](Self::fetch_records) returns every
/// record in the zone.
#[async_trait]
pub trait DnsBackend: Send + Sync {
    /// Fetch all DNS records in the zone
    async fn fetch_records(&self) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Create a record
    ///
    /// `record.record_id` is ignored.
    async fn create_record(&self, record: &DnsRecord) -> Result<(), crate::Error>;

    /// Overwrite the record identified by `record_id`
    async fn update_record(&self, record_id: &str, record: &DnsRecord) -> Result<(), crate::Error>;

    /// Delete the record identified by `record_id`
    async fn delete_record(&self, record_id: &str) -> Result<(), crate::Error>;

    /// Get the backend name (for logging/reporting)
    fn backend_name(&self) -> &'static str;
}
