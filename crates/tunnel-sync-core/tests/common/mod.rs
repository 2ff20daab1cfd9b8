//! Test doubles and common utilities for sync contract tests
//!
//! The mocks keep their remote state behind `Arc<Mutex<…>>`, so a clone
//! handed to the engine and the clone kept by the test observe the same
//! state and call counters.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tunnel_sync_core::error::{Error, Result};
use tunnel_sync_core::model::{DnsRecord, DnsTarget, RouteEntry};
use tunnel_sync_core::traits::{DnsBackend, TunnelBackend};
use tunnel_sync_core::{StaticRouteSource, SyncEngine, SyncOptions};

pub const CANONICAL: &str = "t1.cfargotunnel.com";
pub const SUFFIX: &str = ".cfargotunnel.com";

/// How the mock tunnel answers route fetches
#[derive(Debug, Clone)]
pub enum FetchBehavior {
    Ok,
    NotFound,
    Fail(String),
}

/// A mock TunnelBackend holding a route document in memory
#[derive(Clone)]
pub struct MockTunnelBackend {
    routes: Arc<Mutex<Vec<RouteEntry>>>,
    fetch_behavior: Arc<Mutex<FetchBehavior>>,
    apply_error: Arc<Mutex<Option<String>>>,
    fetch_calls: Arc<AtomicUsize>,
    applied_documents: Arc<Mutex<Vec<Vec<RouteEntry>>>>,
}

impl MockTunnelBackend {
    pub fn new(routes: Vec<RouteEntry>) -> Self {
        Self {
            routes: Arc::new(Mutex::new(routes)),
            fetch_behavior: Arc::new(Mutex::new(FetchBehavior::Ok)),
            apply_error: Arc::new(Mutex::new(None)),
            fetch_calls: Arc::new(AtomicUsize::new(0)),
            applied_documents: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_fetch_behavior(self, behavior: FetchBehavior) -> Self {
        *self.fetch_behavior.lock().unwrap() = behavior;
        self
    }

    pub fn failing_apply(self, detail: &str) -> Self {
        *self.apply_error.lock().unwrap() = Some(detail.to_string());
        self
    }

    /// Get the number of times fetch_routes() was called
    pub fn fetch_call_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Get every document passed to apply_route_document()
    pub fn applied_documents(&self) -> Vec<Vec<RouteEntry>> {
        self.applied_documents.lock().unwrap().clone()
    }

    /// Current remote routes
    pub fn routes(&self) -> Vec<RouteEntry> {
        self.routes.lock().unwrap().clone()
    }

    /// Change the remote routes behind the engine's back
    pub fn set_routes(&self, routes: Vec<RouteEntry>) {
        *self.routes.lock().unwrap() = routes;
    }
}

#[async_trait::async_trait]
impl TunnelBackend for MockTunnelBackend {
    async fn fetch_routes(&self) -> Result<Vec<RouteEntry>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        match self.fetch_behavior.lock().unwrap().clone() {
            FetchBehavior::Ok => Ok(self.routes()),
            FetchBehavior::NotFound => Err(Error::not_found("tunnel configuration")),
            FetchBehavior::Fail(detail) => Err(Error::remote_fetch("mock", detail)),
        }
    }

    async fn apply_route_document(&self, routes: &[RouteEntry]) -> Result<()> {
        self.applied_documents.lock().unwrap().push(routes.to_vec());
        if let Some(detail) = self.apply_error.lock().unwrap().clone() {
            return Err(Error::remote_apply("mock", detail));
        }
        self.set_routes(routes.to_vec());
        *self.fetch_behavior.lock().unwrap() = FetchBehavior::Ok;
        Ok(())
    }

    fn dns_target(&self) -> DnsTarget {
        DnsTarget::new(CANONICAL, SUFFIX)
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

/// A mock DnsBackend holding a zone in memory and logging every mutation
#[derive(Clone)]
pub struct MockDnsBackend {
    records: Arc<Mutex<Vec<DnsRecord>>>,
    fetch_error: Arc<Mutex<Option<String>>>,
    failing_names: Arc<Mutex<HashSet<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
    next_id: Arc<AtomicUsize>,
}

impl MockDnsBackend {
    pub fn new(records: Vec<DnsRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            fetch_error: Arc::new(Mutex::new(None)),
            failing_names: Arc::new(Mutex::new(HashSet::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicUsize::new(1)),
        }
    }

    pub fn failing_fetch(self, detail: &str) -> Self {
        *self.fetch_error.lock().unwrap() = Some(detail.to_string());
        self
    }

    /// Reject every mutation touching `name`
    pub fn failing_for(self, name: &str) -> Self {
        self.failing_names.lock().unwrap().insert(name.to_string());
        self
    }

    /// Mutations in the order they were received ("create a.example.com", ...)
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of mutating calls received
    pub fn mutation_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Current zone contents
    pub fn records(&self) -> Vec<DnsRecord> {
        self.records.lock().unwrap().clone()
    }

    fn record_name_for_id(&self, record_id: &str) -> String {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.record_id.as_deref() == Some(record_id))
            .map(|r| r.name.clone())
            .unwrap_or_default()
    }

    fn check_failure(&self, name: &str) -> Result<()> {
        if self.failing_names.lock().unwrap().contains(name) {
            return Err(Error::remote_apply("mock", format!("400 Bad Request - rejected {}", name)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DnsBackend for MockDnsBackend {
    async fn fetch_records(&self) -> Result<Vec<DnsRecord>> {
        if let Some(detail) = self.fetch_error.lock().unwrap().clone() {
            return Err(Error::remote_fetch("mock", detail));
        }
        Ok(self.records())
    }

    async fn create_record(&self, record: &DnsRecord) -> Result<()> {
        self.calls.lock().unwrap().push(format!("create {}", record.name));
        self.check_failure(&record.name)?;
        let id = format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.records.lock().unwrap().push(record.clone().with_id(id));
        Ok(())
    }

    async fn update_record(&self, record_id: &str, record: &DnsRecord) -> Result<()> {
        self.calls.lock().unwrap().push(format!("update {}", record.name));
        self.check_failure(&record.name)?;
        for existing in self.records.lock().unwrap().iter_mut() {
            if existing.record_id.as_deref() == Some(record_id) {
                *existing = record.clone().with_id(record_id);
            }
        }
        Ok(())
    }

    async fn delete_record(&self, record_id: &str) -> Result<()> {
        let name = self.record_name_for_id(record_id);
        self.calls.lock().unwrap().push(format!("delete {}", name));
        self.check_failure(&name)?;
        self.records
            .lock()
            .unwrap()
            .retain(|r| r.record_id.as_deref() != Some(record_id));
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "mock-dns"
    }
}

pub fn route(hostname: &str, service: &str) -> RouteEntry {
    RouteEntry::new(hostname, service)
}

/// A managed record already present in the zone
pub fn managed_record(name: &str, target: &str, id: &str) -> DnsRecord {
    DnsRecord::routed(name, target).with_id(id)
}

/// Options for strictly sequential, live runs
pub fn sequential_options() -> SyncOptions {
    SyncOptions::default().with_dns_apply_concurrency(1)
}

/// Build an engine over the given mocks
pub fn engine(
    desired: Vec<RouteEntry>,
    tunnel: &MockTunnelBackend,
    dns: Option<&MockDnsBackend>,
    options: SyncOptions,
) -> SyncEngine {
    let options = options.with_manage_dns(dns.is_some());
    SyncEngine::new(
        Box::new(StaticRouteSource::new(desired)),
        Box::new(tunnel.clone()),
        dns.map(|d| Box::new(d.clone()) as Box<dyn DnsBackend>),
        options,
    )
    .expect("engine construction succeeds")
}
