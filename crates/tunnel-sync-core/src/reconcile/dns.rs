//! DNS reconciliation
//!
//! Derives the DNS records required by the desired routes and compares them
//! with the managed records currently in the zone. Records not recognized
//! as managed (see [`DnsTarget::is_managed`]) are never touched, created or
//! reported.

use crate::model::{DnsRecord, DnsTarget};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Actions needed to make the zone match the desired hostnames
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsActionSet {
    /// Hostnames that need a new record (content is synthesized)
    pub to_create: Vec<String>,

    /// Existing managed records whose target diverges from the canonical one
    pub to_update: Vec<DnsRecord>,

    /// Existing managed records no longer required
    pub to_delete: Vec<DnsRecord>,
}

impl DnsActionSet {
    /// Whether there is nothing to do
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    /// Total number of actions
    pub fn len(&self) -> usize {
        self.to_create.len() + self.to_update.len() + self.to_delete.len()
    }

    /// Names of records to update
    pub fn update_names(&self) -> Vec<&str> {
        self.to_update.iter().map(|r| r.name.as_str()).collect()
    }

    /// Names of records to delete
    pub fn delete_names(&self) -> Vec<&str> {
        self.to_delete.iter().map(|r| r.name.as_str()).collect()
    }
}

/// Compute the DNS actions for one run
///
/// `to_create` and `to_update` follow the order of `desired_hostnames`;
/// `to_delete` follows the order of `actual`. Names are matched ignoring
/// ASCII case. When the zone holds more than one managed record with the
/// same name, the last one is used.
pub fn reconcile_dns(
    desired_hostnames: &[String],
    target: &DnsTarget,
    actual: &[DnsRecord],
) -> DnsActionSet {
    let mut managed: HashMap<String, &DnsRecord> = HashMap::new();
    let mut managed_order = Vec::new();
    for record in actual.iter().filter(|r| target.is_managed(r)) {
        let key = record.name.to_ascii_lowercase();
        if managed.insert(key.clone(), record).is_none() {
            managed_order.push(key);
        }
    }

    let mut seen = HashSet::new();
    let desired: Vec<&String> = desired_hostnames
        .iter()
        .filter(|h| seen.insert(h.to_ascii_lowercase()))
        .collect();

    let mut actions = DnsActionSet::default();

    for hostname in desired {
        match managed.get(&hostname.to_ascii_lowercase()) {
            None => actions.to_create.push(hostname.clone()),
            Some(existing) if existing.target != target.canonical => {
                actions.to_update.push((*existing).clone())
            }
            Some(_) => {}
        }
    }

    for key in managed_order {
        if !seen.contains(&key) {
            actions.to_delete.push(managed[&key].clone());
        }
    }

    actions
}
