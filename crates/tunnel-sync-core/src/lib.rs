// # tunnel-sync-core
//
// Core library for declarative tunnel route and DNS synchronization.
//
// ## Architecture Overview
//
// This library provides the reconciliation engine that keeps a remote
// tunnel's routing rules, and the DNS records they depend on, in line with
// a declared desired state:
// - **RouteSource**: Trait for loading the desired routes
// - **TunnelBackend**: Trait for reading/replacing routes at the remote system
// - **DnsBackend**: Trait for reading/mutating DNS records at the remote system
// - **reconcile_routes / reconcile_dns**: Pure create/update/delete diffing
// - **SyncEngine**: Orchestrates load → fetch → reconcile → apply, routes then DNS
//
// ## Design Principles
//
// 1. **Pure Core**: Diffing is side-effect free and deterministic
// 2. **Stateless Runs**: Every run re-derives its actions from fresh snapshots
// 3. **Adapters at the Edge**: Remote payload quirks stay in backend crates
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Idempotency**: A converged remote system yields empty action sets

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod source;
pub mod traits;

// Re-export core types for convenience
pub use config::{BackendConfig, SourceConfig, SyncConfig, SyncOptions};
pub use engine::{SyncEngine, SyncReport};
pub use error::{Error, Result};
pub use model::{DnsRecord, DnsTarget, OptionValue, OriginOptions, RouteEntry};
pub use reconcile::{DnsActionSet, RouteActionSet, reconcile_dns, reconcile_routes};
pub use source::{FileRouteSource, StaticRouteSource};
pub use traits::{DnsBackend, RouteSource, TunnelBackend};
