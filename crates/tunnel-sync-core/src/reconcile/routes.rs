//! Route reconciliation
//!
//! Compares a desired and an actual route snapshot, keyed by hostname, and
//! partitions the difference into create/update/delete buckets.

use crate::model::RouteEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Actions needed to move the actual routes to the desired routes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteActionSet {
    /// Routes only in the desired snapshot (desired value)
    pub to_create: Vec<RouteEntry>,

    /// Routes in both snapshots that differ (desired value)
    pub to_update: Vec<RouteEntry>,

    /// Routes only in the actual snapshot (actual value)
    pub to_delete: Vec<RouteEntry>,
}

impl RouteActionSet {
    /// Whether there is nothing to do
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    /// Total number of actions
    pub fn len(&self) -> usize {
        self.to_create.len() + self.to_update.len() + self.to_delete.len()
    }
}

/// Compute the route actions for one run
///
/// Pure function over its two inputs. `to_create` and `to_update` follow
/// desired input order, `to_delete` follows actual input order, so repeated
/// runs over the same snapshots produce identical action sets.
///
/// Snapshots are expected to have unique hostnames (the loader rejects
/// duplicates). If one does not, the last entry for a hostname wins.
pub fn reconcile_routes(desired: &[RouteEntry], actual: &[RouteEntry]) -> RouteActionSet {
    let desired_by_host = index_by_hostname(desired);
    let actual_by_host = index_by_hostname(actual);

    let mut actions = RouteActionSet::default();

    for hostname in first_seen_order(desired) {
        let wanted = desired_by_host[hostname];
        match actual_by_host.get(hostname) {
            None => actions.to_create.push(wanted.clone()),
            Some(current) if *current != wanted => actions.to_update.push(wanted.clone()),
            Some(_) => {}
        }
    }

    for hostname in first_seen_order(actual) {
        if !desired_by_host.contains_key(hostname) {
            actions.to_delete.push(actual_by_host[hostname].clone());
        }
    }

    actions
}

fn index_by_hostname(routes: &[RouteEntry]) -> HashMap<&str, &RouteEntry> {
    routes.iter().map(|r| (r.hostname.as_str(), r)).collect()
}

fn first_seen_order(routes: &[RouteEntry]) -> Vec<&str> {
    let mut seen = std::collections::HashSet::new();
    routes
        .iter()
        .map(|r| r.hostname.as_str())
        .filter(|h| seen.insert(*h))
        .collect()
}
