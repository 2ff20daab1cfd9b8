//! Sync orchestrator
//!
//! The SyncEngine is responsible for:
//! - Loading the desired routes via RouteSource
//! - Reconciling them against the routes at the TunnelBackend
//! - Deriving and reconciling the DNS records at the DnsBackend
//! - Applying both action sets (unless dry-run) and reporting
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │ RouteSource │─── desired routes ───┐
//! └─────────────┘                      │
//!                                      ▼
//!                             ┌──────────────┐
//!                             │  SyncEngine  │──► SyncReport
//!                             └──────────────┘
//!                                      │
//!                  ┌───────────────────┴───────────────────┐
//!                  │                                       │
//!                  ▼                                       ▼
//!         ┌───────────────┐                        ┌─────────────┐
//!         │ TunnelBackend │  (phase 1: routes)     │ DnsBackend  │  (phase 2: DNS)
//!         └───────────────┘                        └─────────────┘
//! ```
//!
//! ## Run Flow
//!
//! 1. Load desired routes (failure is fatal, nothing is mutated)
//! 2. Fetch actual routes (not-found means "empty", other failures are fatal)
//! 3. Reconcile routes, log every action
//! 4. Replace the whole route document if anything changed (unless dry-run)
//! 5. Fetch DNS records (failure degrades to "no managed records")
//! 6. Reconcile DNS, log every action
//! 7. Create, then update, then delete records (unless dry-run)
//!
//! DNS runs regardless of the route phase outcome. Apply failures end up in
//! the [`SyncReport`] rather than as an `Err`, so every independent phase is
//! attempted before the caller decides on an exit status.

pub mod report;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::config::SyncOptions;
use crate::error::{Error, Result};
use crate::model::{DnsRecord, DnsTarget, RouteEntry};
use crate::reconcile::{DnsActionSet, RouteActionSet, reconcile_dns, reconcile_routes};
use crate::traits::{DnsBackend, RouteSource, TunnelBackend};

pub use report::{ActionKind, DnsReport, ItemOutcome, ItemStatus, PhaseStatus, RouteReport, SyncReport};

/// Reason recorded for DNS changes not attempted after a failure
const ABORTED_REASON: &str = "phase aborted after an earlier failure";

/// Core sync engine
///
/// The engine holds no state between runs: each [`run`](Self::run) loads,
/// fetches and reconciles from scratch, so repeated runs against a
/// converged remote system are no-ops.
///
/// ## Lifecycle
///
/// 1. Create with [`SyncEngine::new()`]
/// 2. Call [`SyncEngine::run()`] once per sync
/// 3. Inspect the returned [`SyncReport`]
pub struct SyncEngine {
    /// Desired-state source
    source: Box<dyn RouteSource>,

    /// Routing side of the remote system
    tunnel: Box<dyn TunnelBackend>,

    /// DNS side of the remote system (absent when DNS is not managed)
    dns: Option<Box<dyn DnsBackend>>,

    /// Run options
    options: SyncOptions,
}

/// One DNS mutation waiting to be applied
struct PendingChange {
    action: ActionKind,
    name: String,
    record_id: Option<String>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Parameters
    ///
    /// - `source`: Desired-state source
    /// - `tunnel`: Tunnel backend
    /// - `dns`: DNS backend; required when `options.manage_dns` is set
    /// - `options`: Run options
    pub fn new(
        source: Box<dyn RouteSource>,
        tunnel: Box<dyn TunnelBackend>,
        dns: Option<Box<dyn DnsBackend>>,
        options: SyncOptions,
    ) -> Result<Self> {
        options.validate()?;

        if options.manage_dns && dns.is_none() {
            return Err(Error::config(
                "DNS management is enabled but no DNS backend was provided",
            ));
        }

        Ok(Self {
            source,
            tunnel,
            dns,
            options,
        })
    }

    /// Run options in effect
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Run one sync
    ///
    /// # Returns
    ///
    /// - `Ok(SyncReport)`: All phases were attempted; check
    ///   [`SyncReport::has_failures`] for apply errors
    /// - `Err(Error::Config)`: Desired state could not be loaded
    /// - `Err(Error::RemoteFetch)`: Actual routes could not be read
    pub async fn run(&self) -> Result<SyncReport> {
        let started_at = chrono::Utc::now();
        if self.options.dry_run {
            info!("DRY RUN - no changes will be applied");
        }

        info!("Loading desired routes from {}", self.source.describe());
        let desired = self.source.load_routes().await?;
        info!("Found {} route(s) in desired state", desired.len());

        info!(
            "Fetching current routes from {}",
            self.tunnel.backend_name()
        );
        let actual = self.fetch_actual_routes().await?;
        info!(
            "Found {} route(s) at {}",
            actual.len(),
            self.tunnel.backend_name()
        );

        let route_actions = reconcile_routes(&desired, &actual);
        log_route_plan(&route_actions);
        let route_status = self.apply_routes(&desired, &route_actions).await;

        let dns = match self.dns.as_deref() {
            Some(backend) if self.options.manage_dns => Some(self.sync_dns(backend, &desired).await),
            _ => {
                info!("DNS management disabled, skipping DNS sync");
                None
            }
        };

        Ok(SyncReport {
            dry_run: self.options.dry_run,
            started_at,
            finished_at: chrono::Utc::now(),
            desired_count: desired.len(),
            actual_count: actual.len(),
            routes: RouteReport {
                actions: route_actions,
                status: route_status,
            },
            dns,
        })
    }

    /// Fetch actual routes, treating "no configuration yet" as empty
    async fn fetch_actual_routes(&self) -> Result<Vec<RouteEntry>> {
        match self.tunnel.fetch_routes().await {
            Ok(routes) => Ok(routes),
            Err(e) if e.is_not_found() => {
                warn!("No route configuration found ({}). Will create new configuration.", e);
                Ok(Vec::new())
            }
            Err(e @ Error::RemoteFetch { .. }) => Err(e),
            Err(e) => Err(Error::remote_fetch(self.tunnel.backend_name(), e.to_string())),
        }
    }

    /// Push the full desired document when the route set changed
    async fn apply_routes(&self, desired: &[RouteEntry], actions: &RouteActionSet) -> PhaseStatus {
        if actions.is_empty() {
            info!("Routes are already in sync. No changes needed.");
            return PhaseStatus::InSync;
        }

        if self.options.dry_run {
            info!("[DRY-RUN] Would replace route document with {} route(s)", desired.len());
            return PhaseStatus::Planned;
        }

        info!(
            "Applying {} route change(s) as a full document of {} route(s)",
            actions.len(),
            desired.len()
        );
        match self.tunnel.apply_route_document(desired).await {
            Ok(()) => {
                info!("Route configuration updated successfully");
                PhaseStatus::Applied
            }
            Err(e) => {
                error!("Error updating route configuration: {}", e);
                PhaseStatus::Failed { detail: e.detail() }
            }
        }
    }

    /// Reconcile and apply DNS records for the desired routes
    async fn sync_dns(&self, backend: &dyn DnsBackend, desired: &[RouteEntry]) -> DnsReport {
        info!("Synchronizing DNS records via {}", backend.backend_name());
        let target = self.tunnel.dns_target();

        let (records, fetch_warning) = match backend.fetch_records().await {
            Ok(records) => (records, None),
            Err(e) => {
                warn!(
                    "Failed to fetch DNS records: {}. Continuing with no known managed records.",
                    e
                );
                (Vec::new(), Some(e.to_string()))
            }
        };
        debug!("Fetched {} DNS record(s)", records.len());

        let hostnames: Vec<String> = desired.iter().map(|r| r.hostname.clone()).collect();
        let actions = reconcile_dns(&hostnames, &target, &records);
        log_dns_plan(&actions, &target);

        let (status, items) = if actions.is_empty() {
            info!("DNS records are already in sync");
            (PhaseStatus::InSync, Vec::new())
        } else if self.options.dry_run {
            let items: Vec<ItemOutcome> = pending_changes(&actions)
                .into_iter()
                .flatten()
                .map(|change| change.outcome(ItemStatus::Planned))
                .collect();
            (PhaseStatus::Planned, items)
        } else {
            self.apply_dns(backend, &target, &actions).await
        };

        DnsReport {
            target: target.canonical,
            actions,
            fetch_warning,
            status,
            items,
        }
    }

    /// Apply DNS changes bucket by bucket: create, update, delete
    ///
    /// Each bucket is dispatched in waves of at most
    /// `dns_apply_concurrency` calls. A wave always runs to completion; once
    /// any change has failed, no further wave is started and the remaining
    /// changes are recorded as skipped.
    async fn apply_dns(
        &self,
        backend: &dyn DnsBackend,
        target: &DnsTarget,
        actions: &DnsActionSet,
    ) -> (PhaseStatus, Vec<ItemOutcome>) {
        let mut items = Vec::with_capacity(actions.len());
        let mut first_failure: Option<String> = None;

        for bucket in pending_changes(actions) {
            for wave in bucket.chunks(self.options.dns_apply_concurrency) {
                if first_failure.is_some() {
                    items.extend(wave.iter().map(|change| {
                        change.outcome(ItemStatus::Skipped {
                            reason: ABORTED_REASON.to_string(),
                        })
                    }));
                    continue;
                }

                let results = join_all(
                    wave.iter()
                        .map(|change| self.apply_dns_change(backend, target, change)),
                )
                .await;

                for (change, status) in wave.iter().zip(results) {
                    if let ItemStatus::Failed { detail } = &status {
                        if first_failure.is_none() {
                            first_failure =
                                Some(format!("{} {}: {}", change.action, change.name, detail));
                        }
                    }
                    items.push(change.outcome(status));
                }
            }
        }

        match first_failure {
            Some(detail) => {
                error!("DNS sync aborted: {}", detail);
                (PhaseStatus::Failed { detail }, items)
            }
            None => {
                info!("DNS records synchronized successfully");
                (PhaseStatus::Applied, items)
            }
        }
    }

    async fn apply_dns_change(
        &self,
        backend: &dyn DnsBackend,
        target: &DnsTarget,
        change: &PendingChange,
    ) -> ItemStatus {
        let record = DnsRecord::routed(&change.name, &target.canonical);

        let result = match (change.action, change.record_id.as_deref()) {
            (ActionKind::Create, _) => backend.create_record(&record).await,
            (ActionKind::Update, Some(id)) => backend.update_record(id, &record).await,
            (ActionKind::Delete, Some(id)) => backend.delete_record(id).await,
            (action, None) => {
                warn!(
                    "Cannot {} DNS record for {}: remote record has no id",
                    action, change.name
                );
                return ItemStatus::Skipped {
                    reason: "remote record has no id".to_string(),
                };
            }
        };

        match result {
            Ok(()) => {
                info!("✓ {}d DNS record for {}", change.action, change.name);
                ItemStatus::Applied
            }
            Err(e) => {
                error!("✗ Failed to {} DNS record for {}: {}", change.action, change.name, e);
                ItemStatus::Failed { detail: e.detail() }
            }
        }
    }
}

impl PendingChange {
    fn outcome(&self, status: ItemStatus) -> ItemOutcome {
        ItemOutcome {
            name: self.name.clone(),
            action: self.action,
            status,
        }
    }
}

/// Split a DNS action set into ordered buckets of pending changes
fn pending_changes(actions: &DnsActionSet) -> [Vec<PendingChange>; 3] {
    let creates = actions
        .to_create
        .iter()
        .map(|name| PendingChange {
            action: ActionKind::Create,
            name: name.clone(),
            record_id: None,
        })
        .collect();
    let updates = actions
        .to_update
        .iter()
        .map(|record| PendingChange {
            action: ActionKind::Update,
            name: record.name.clone(),
            record_id: record.record_id.clone(),
        })
        .collect();
    let deletes = actions
        .to_delete
        .iter()
        .map(|record| PendingChange {
            action: ActionKind::Delete,
            name: record.name.clone(),
            record_id: record.record_id.clone(),
        })
        .collect();

    [creates, updates, deletes]
}

fn log_route_plan(actions: &RouteActionSet) {
    if !actions.to_create.is_empty() {
        info!("Routes to CREATE ({}):", actions.to_create.len());
        for route in &actions.to_create {
            info!("  + {}", route);
        }
    }
    if !actions.to_update.is_empty() {
        info!("Routes to UPDATE ({}):", actions.to_update.len());
        for route in &actions.to_update {
            info!("  ~ {}", route);
        }
    }
    if !actions.to_delete.is_empty() {
        info!("Routes to DELETE ({}):", actions.to_delete.len());
        for route in &actions.to_delete {
            info!("  - {}", route);
        }
    }
}

fn log_dns_plan(actions: &DnsActionSet, target: &DnsTarget) {
    if !actions.to_create.is_empty() {
        info!("DNS records to CREATE ({}):", actions.to_create.len());
        for name in &actions.to_create {
            info!("  + {} -> {}", name, target.canonical);
        }
    }
    if !actions.to_update.is_empty() {
        info!("DNS records to UPDATE ({}):", actions.to_update.len());
        for record in &actions.to_update {
            info!("  ~ {} -> {} (was {})", record.name, target.canonical, record.target);
        }
    }
    if !actions.to_delete.is_empty() {
        info!("DNS records to DELETE ({}):", actions.to_delete.len());
        for record in &actions.to_delete {
            info!("  - {}", record.name);
        }
    }
}
