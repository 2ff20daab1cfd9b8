// # Cloudflare Tunnel Backend
//
// Reads and replaces the ingress rules of a remotely-managed tunnel.
//
// ## API Calls
//
// ```http
// GET /accounts/:account_id/cfd_tunnel/:tunnel_id/configurations
// PUT /accounts/:account_id/cfd_tunnel/:tunnel_id/configurations
// { "config": { "ingress": [ ...routes, { "service": "http_status:404" } ] } }
// ```
//
// Cloudflare requires the last ingress rule to be a hostname-less
// catch-all. It is stripped on fetch and appended on apply, so the engine
// never sees it.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tunnel_sync_core::model::{DnsTarget, OriginOptions, RouteEntry};
use tunnel_sync_core::traits::TunnelBackend;
use tunnel_sync_core::{Error, Result};

use crate::CloudflareClient;
use crate::api::{self, BACKEND_NAME, CallKind};

/// Service of the mandatory trailing catch-all rule
pub const CATCH_ALL_SERVICE: &str = "http_status:404";

/// Suffix of every tunnel's routing domain
pub const TUNNEL_DOMAIN_SUFFIX: &str = ".cfargotunnel.com";

#[derive(Debug, Deserialize)]
struct TunnelConfigResult {
    #[serde(default)]
    config: Option<TunnelConfig>,
}

#[derive(Debug, Deserialize)]
struct TunnelConfig {
    #[serde(default)]
    ingress: Option<Vec<IngressRule>>,
}

#[derive(Debug, Deserialize)]
struct IngressRule {
    #[serde(default)]
    hostname: Option<String>,
    service: String,
    #[serde(rename = "originRequest", default)]
    origin_request: OriginOptions,
}

impl IngressRule {
    /// Hostname-bearing rules become routes; the catch-all does not
    fn into_route(self) -> Option<RouteEntry> {
        match self.hostname {
            Some(hostname) if !hostname.is_empty() => {
                Some(RouteEntry::new(hostname, self.service).with_options(self.origin_request))
            }
            _ => None,
        }
    }
}

/// Build the PUT body for a full route document
pub(crate) fn ingress_document(routes: &[RouteEntry]) -> Result<Value> {
    let mut ingress = Vec::with_capacity(routes.len() + 1);
    for route in routes {
        ingress.push(serde_json::to_value(route)?);
    }
    ingress.push(json!({ "service": CATCH_ALL_SERVICE }));

    Ok(json!({ "config": { "ingress": ingress } }))
}

impl CloudflareClient {
    fn tunnel_config_url(&self) -> String {
        format!(
            "{}/accounts/{}/cfd_tunnel/{}/configurations",
            self.api_base, self.account_id, self.tunnel_id
        )
    }

    /// Routing domain of the managed tunnel (`<tunnel_id>.cfargotunnel.com`)
    pub fn tunnel_domain(&self) -> String {
        format!("{}{}", self.tunnel_id, TUNNEL_DOMAIN_SUFFIX)
    }
}

#[async_trait]
impl TunnelBackend for CloudflareClient {
    async fn fetch_routes(&self) -> Result<Vec<RouteEntry>> {
        tracing::debug!("Fetching tunnel configuration for tunnel {}", self.tunnel_id);

        let request = self.client.get(self.tunnel_config_url()).bearer_auth(&self.api_token);
        let envelope: api::Envelope<TunnelConfigResult> =
            api::send(request, CallKind::Fetch, "Tunnel configuration").await?;

        let rules = envelope
            .result
            .and_then(|r| r.config)
            .and_then(|c| c.ingress)
            .unwrap_or_default();

        let routes: Vec<RouteEntry> = rules.into_iter().filter_map(IngressRule::into_route).collect();
        tracing::debug!("Tunnel configuration has {} hostname route(s)", routes.len());
        Ok(routes)
    }

    async fn apply_route_document(&self, routes: &[RouteEntry]) -> Result<()> {
        let body = ingress_document(routes)
            .map_err(|e| Error::remote_apply(BACKEND_NAME, format!("Failed to encode ingress: {}", e)))?;

        tracing::debug!(
            "Replacing tunnel configuration with {} route(s) plus catch-all",
            routes.len()
        );

        let request = self
            .client
            .put(self.tunnel_config_url())
            .bearer_auth(&self.api_token)
            .json(&body);
        let _: api::Envelope<Value> = api::send(request, CallKind::Apply, "Tunnel configuration").await?;

        Ok(())
    }

    fn dns_target(&self) -> DnsTarget {
        DnsTarget::new(self.tunnel_domain(), TUNNEL_DOMAIN_SUFFIX)
    }

    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }
}
