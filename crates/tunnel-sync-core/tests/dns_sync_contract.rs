//! Architectural Contract Test: DNS Phase
//!
//! This test verifies how the engine derives and applies DNS records for
//! routed hostnames.
//!
//! Constraints verified:
//! - DNS runs whether or not routes changed, and after route failures
//! - A failed record fetch degrades to "no managed records" with a warning
//! - Records not pointing into the managed suffix are never touched
//! - Changes are applied create → update → delete
//! - The first failed change aborts the rest of the phase
//!
//! If this test fails, DNS records can drift from the routes or be
//! clobbered.

mod common;

use common::*;
use tunnel_sync_core::engine::{ActionKind, ItemStatus, PhaseStatus};
use tunnel_sync_core::model::DnsRecord;
use tunnel_sync_core::{StaticRouteSource, SyncEngine, SyncOptions};

#[tokio::test]
async fn dns_runs_when_routes_are_in_sync() {
    let routes = vec![route("a.example.com", "http://10.0.0.1:8080")];
    let tunnel = MockTunnelBackend::new(routes.clone());
    let dns = MockDnsBackend::new(Vec::new());

    let report = engine(routes, &tunnel, Some(&dns), sequential_options())
        .run()
        .await
        .expect("run succeeds");

    assert_eq!(report.routes.status, PhaseStatus::InSync);
    let dns_report = report.dns.expect("DNS phase ran");
    assert_eq!(dns_report.actions.to_create, vec!["a.example.com"]);
    assert_eq!(dns_report.status, PhaseStatus::Applied);
    assert_eq!(dns.records()[0].target, CANONICAL);
    assert!(dns.records()[0].proxied);
}

#[tokio::test]
async fn dns_runs_after_route_apply_failure() {
    let tunnel = MockTunnelBackend::new(Vec::new()).failing_apply("400 Bad Request");
    let dns = MockDnsBackend::new(Vec::new());

    let report = engine(
        vec![route("a.example.com", "http://10.0.0.1:8080")],
        &tunnel,
        Some(&dns),
        sequential_options(),
    )
    .run()
    .await
    .expect("run completes");

    assert!(report.routes.status.is_failed());
    assert_eq!(report.dns.map(|d| d.status), Some(PhaseStatus::Applied));
    assert_eq!(dns.calls(), vec!["create a.example.com"]);
}

#[tokio::test]
async fn record_fetch_failure_degrades_to_creates_only() {
    let tunnel = MockTunnelBackend::new(Vec::new());
    let dns = MockDnsBackend::new(vec![managed_record("stale.example.com", CANONICAL, "r1")])
        .failing_fetch("403 Forbidden");

    let report = engine(
        vec![route("a.example.com", "http://10.0.0.1:8080")],
        &tunnel,
        Some(&dns),
        sequential_options(),
    )
    .run()
    .await
    .expect("fetch failure is not fatal");

    let dns_report = report.dns.expect("DNS phase ran");
    assert!(dns_report.fetch_warning.is_some());
    assert_eq!(dns_report.actions.to_create, vec!["a.example.com"]);
    assert!(dns_report.actions.to_delete.is_empty(), "nothing known, nothing deleted");
    assert_eq!(dns.calls(), vec!["create a.example.com"]);
}

#[tokio::test]
async fn unmanaged_records_are_never_touched() {
    let tunnel = MockTunnelBackend::new(Vec::new());
    let mail = DnsRecord {
        record_id: Some("mx".to_string()),
        record_type: "MX".to_string(),
        name: "example.com".to_string(),
        target: "mail.example.com".to_string(),
        proxied: false,
        ttl: 300,
    };
    let external = DnsRecord::routed("blog.example.com", "hosting.example.net").with_id("ext");
    let dns = MockDnsBackend::new(vec![mail.clone(), external.clone()]);

    let report = engine(Vec::new(), &tunnel, Some(&dns), sequential_options())
        .run()
        .await
        .expect("run succeeds");

    assert!(report.dns.expect("DNS phase ran").actions.is_empty());
    assert_eq!(dns.mutation_count(), 0);
    assert_eq!(dns.records(), vec![mail, external]);
}

#[tokio::test]
async fn changes_are_applied_create_update_delete() {
    let tunnel = MockTunnelBackend::new(Vec::new());
    let dns = MockDnsBackend::new(vec![
        managed_record("gone.example.com", CANONICAL, "r1"),
        managed_record("moved.example.com", "other-tunnel.cfargotunnel.com", "r2"),
    ]);

    let report = engine(
        vec![
            route("moved.example.com", "http://10.0.0.1:8080"),
            route("new.example.com", "http://10.0.0.2:8080"),
        ],
        &tunnel,
        Some(&dns),
        sequential_options(),
    )
    .run()
    .await
    .expect("run succeeds");

    assert_eq!(
        dns.calls(),
        vec![
            "create new.example.com",
            "update moved.example.com",
            "delete gone.example.com",
        ]
    );
    let actions: Vec<ActionKind> = report
        .dns
        .expect("DNS phase ran")
        .items
        .iter()
        .map(|i| i.action)
        .collect();
    assert_eq!(actions, vec![ActionKind::Create, ActionKind::Update, ActionKind::Delete]);

    let records = dns.records();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.target == CANONICAL));
}

#[tokio::test]
async fn first_failure_aborts_remaining_changes() {
    let tunnel = MockTunnelBackend::new(Vec::new());
    let dns = MockDnsBackend::new(vec![managed_record("gone.example.com", CANONICAL, "r1")])
        .failing_for("b.example.com");

    let report = engine(
        vec![
            route("a.example.com", "http://10.0.0.1:8080"),
            route("b.example.com", "http://10.0.0.2:8080"),
            route("c.example.com", "http://10.0.0.3:8080"),
        ],
        &tunnel,
        Some(&dns),
        sequential_options(),
    )
    .run()
    .await
    .expect("run completes");

    assert!(report.has_failures());
    let dns_report = report.dns.expect("DNS phase ran");
    assert!(dns_report.status.is_failed());
    assert_eq!(dns.calls(), vec!["create a.example.com", "create b.example.com"]);

    let statuses: Vec<(&str, &ItemStatus)> = dns_report
        .items
        .iter()
        .map(|i| (i.name.as_str(), &i.status))
        .collect();
    assert_eq!(statuses[0], ("a.example.com", &ItemStatus::Applied));
    assert!(matches!(statuses[1], ("b.example.com", ItemStatus::Failed { .. })));
    assert!(matches!(statuses[2], ("c.example.com", ItemStatus::Skipped { .. })));
    assert!(matches!(statuses[3], ("gone.example.com", ItemStatus::Skipped { .. })));
    assert_eq!(dns.records().len(), 2, "delete never ran");
}

#[tokio::test]
async fn failure_does_not_cancel_changes_already_in_flight() {
    let tunnel = MockTunnelBackend::new(Vec::new());
    let dns = MockDnsBackend::new(vec![managed_record("gone.example.com", CANONICAL, "r1")])
        .failing_for("a.example.com");

    let report = engine(
        vec![
            route("a.example.com", "http://10.0.0.1:8080"),
            route("b.example.com", "http://10.0.0.2:8080"),
            route("c.example.com", "http://10.0.0.3:8080"),
        ],
        &tunnel,
        Some(&dns),
        SyncOptions::default().with_dns_apply_concurrency(4),
    )
    .run()
    .await
    .expect("run completes");

    let dns_report = report.dns.expect("DNS phase ran");
    let creates = dns
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("create"))
        .count();
    assert_eq!(creates, 3, "the whole wave was dispatched");
    assert!(!dns.calls().iter().any(|c| c.starts_with("delete")));
    assert_eq!(dns_report.failed_items().count(), 1);
    assert!(dns_report.status.is_failed());
}

#[tokio::test]
async fn records_without_id_are_skipped() {
    let tunnel = MockTunnelBackend::new(Vec::new());
    let dns = MockDnsBackend::new(vec![DnsRecord::routed("gone.example.com", CANONICAL)]);

    let report = engine(Vec::new(), &tunnel, Some(&dns), sequential_options())
        .run()
        .await
        .expect("run succeeds");

    let dns_report = report.dns.expect("DNS phase ran");
    assert_eq!(dns_report.actions.to_delete.len(), 1);
    assert!(matches!(dns_report.items[0].status, ItemStatus::Skipped { .. }));
    assert_eq!(dns_report.status, PhaseStatus::Applied);
    assert_eq!(dns.mutation_count(), 0);
}

#[tokio::test]
async fn dns_phase_absent_when_not_managed() {
    let tunnel = MockTunnelBackend::new(Vec::new());

    let report = engine(
        vec![route("a.example.com", "http://10.0.0.1:8080")],
        &tunnel,
        None,
        SyncOptions::default(),
    )
    .run()
    .await
    .expect("run succeeds");

    assert!(report.dns.is_none());
    assert!(report.to_string().contains("DNS: not managed"));
}

#[test]
fn managing_dns_requires_a_dns_backend() {
    let result = SyncEngine::new(
        Box::new(StaticRouteSource::new(Vec::new())),
        Box::new(MockTunnelBackend::new(Vec::new())),
        None,
        SyncOptions::default(),
    );

    assert!(result.is_err());
}
