//! Sync run reports
//!
//! A [`SyncReport`] carries the computed action sets and the outcome of each
//! phase. It is produced for dry runs and real runs alike; for identical
//! inputs the action sets are identical, only the statuses differ.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::reconcile::{DnsActionSet, RouteActionSet};

/// Kind of change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Create => write!(f, "create"),
            ActionKind::Update => write!(f, "update"),
            ActionKind::Delete => write!(f, "delete"),
        }
    }
}

/// Outcome of a whole phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PhaseStatus {
    /// Nothing to do
    InSync,
    /// Changes computed but not applied (dry run)
    Planned,
    /// All changes applied
    Applied,
    /// The phase was aborted by a rejected change
    Failed { detail: String },
}

impl PhaseStatus {
    /// Whether the phase ended in failure
    pub fn is_failed(&self) -> bool {
        matches!(self, PhaseStatus::Failed { .. })
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseStatus::InSync => write!(f, "in sync"),
            PhaseStatus::Planned => write!(f, "planned (dry run, nothing applied)"),
            PhaseStatus::Applied => write!(f, "applied"),
            PhaseStatus::Failed { detail } => write!(f, "failed: {}", detail),
        }
    }
}

/// Outcome of a single DNS change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Planned,
    Applied,
    Failed { detail: String },
    Skipped { reason: String },
}

/// A single DNS change and what happened to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    /// Record name
    pub name: String,
    /// Kind of change
    pub action: ActionKind,
    /// What happened
    #[serde(flatten)]
    pub status: ItemStatus,
}

/// Route phase report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteReport {
    /// Computed actions
    pub actions: RouteActionSet,
    /// Phase outcome
    pub status: PhaseStatus,
}

/// DNS phase report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsReport {
    /// Canonical target records were reconciled against
    pub target: String,
    /// Computed actions
    pub actions: DnsActionSet,
    /// Set when the record fetch failed and the phase ran degraded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_warning: Option<String>,
    /// Phase outcome
    pub status: PhaseStatus,
    /// Per-record outcomes, in application order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<ItemOutcome>,
}

impl DnsReport {
    /// Outcomes that failed
    pub fn failed_items(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.items
            .iter()
            .filter(|i| matches!(i.status, ItemStatus::Failed { .. }))
    }
}

/// Report of one sync run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Run start
    pub started_at: DateTime<Utc>,
    /// Run end
    pub finished_at: DateTime<Utc>,
    /// Number of desired routes
    pub desired_count: usize,
    /// Number of routes found at the remote system
    pub actual_count: usize,
    /// Route phase
    pub routes: RouteReport,
    /// DNS phase; `None` when DNS management is disabled
    pub dns: Option<DnsReport>,
}

impl SyncReport {
    /// Whether any apply phase failed
    ///
    /// Callers should exit non-zero when this is true.
    pub fn has_failures(&self) -> bool {
        self.routes.status.is_failed() || self.dns.as_ref().is_some_and(|d| d.status.is_failed())
    }

    /// Whether nothing needed to change
    pub fn is_in_sync(&self) -> bool {
        self.routes.actions.is_empty() && self.dns.as_ref().is_none_or(|d| d.actions.is_empty())
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            writeln!(f, "DRY RUN - no changes applied")?;
        }
        writeln!(
            f,
            "Routes: {} desired, {} at remote",
            self.desired_count, self.actual_count
        )?;

        let routes = &self.routes.actions;
        if routes.is_empty() {
            writeln!(f, "  (no route changes)")?;
        }
        for route in &routes.to_create {
            writeln!(f, "  + {}", route)?;
        }
        for route in &routes.to_update {
            writeln!(f, "  ~ {}", route)?;
        }
        for route in &routes.to_delete {
            writeln!(f, "  - {}", route)?;
        }
        writeln!(f, "  status: {}", self.routes.status)?;

        match &self.dns {
            None => writeln!(f, "DNS: not managed")?,
            Some(dns) => {
                writeln!(f, "DNS records (target {}):", dns.target)?;
                if let Some(warning) = &dns.fetch_warning {
                    writeln!(f, "  warning: {}", warning)?;
                }
                if dns.actions.is_empty() {
                    writeln!(f, "  (no DNS changes)")?;
                }
                for name in &dns.actions.to_create {
                    writeln!(f, "  + {} -> {}", name, dns.target)?;
                }
                for name in dns.actions.update_names() {
                    writeln!(f, "  ~ {} -> {}", name, dns.target)?;
                }
                for name in dns.actions.delete_names() {
                    writeln!(f, "  - {}", name)?;
                }
                for item in dns.failed_items() {
                    if let ItemStatus::Failed { detail } = &item.status {
                        writeln!(f, "  ! {} {}: {}", item.action, item.name, detail)?;
                    }
                }
                writeln!(f, "  status: {}", dns.status)?;
            }
        }

        Ok(())
    }
}
