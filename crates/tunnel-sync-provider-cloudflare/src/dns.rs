// # Cloudflare DNS Backend
//
// Lists and mutates the DNS records of one zone.
//
// ## API Calls
//
// ```http
// GET    /zones/:zone_id/dns_records?page=N&per_page=100
// POST   /zones/:zone_id/dns_records
// PUT    /zones/:zone_id/dns_records/:record_id
// DELETE /zones/:zone_id/dns_records/:record_id
// ```
//
// Listing follows `result_info.total_pages`; every other method is a
// single request.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tunnel_sync_core::model::DnsRecord;
use tunnel_sync_core::traits::DnsBackend;
use tunnel_sync_core::{Error, Result};

use crate::CloudflareClient;
use crate::api::{self, BACKEND_NAME, CallKind};

/// Records requested per list page (Cloudflare maximum for this endpoint)
const DNS_PAGE_SIZE: u32 = 100;

/// A DNS record as returned by the API
#[derive(Debug, Deserialize)]
struct ApiRecord {
    id: String,
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    proxied: bool,
    #[serde(default)]
    ttl: u32,
}

impl From<ApiRecord> for DnsRecord {
    fn from(record: ApiRecord) -> Self {
        DnsRecord {
            record_id: Some(record.id),
            record_type: record.record_type,
            name: record.name,
            target: record.content,
            proxied: record.proxied,
            ttl: record.ttl,
        }
    }
}

/// Body of create and overwrite calls
#[derive(Debug, Serialize)]
struct RecordBody<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: &'a str,
    proxied: bool,
    ttl: u32,
}

impl<'a> From<&'a DnsRecord> for RecordBody<'a> {
    fn from(record: &'a DnsRecord) -> Self {
        RecordBody {
            record_type: &record.record_type,
            name: &record.name,
            content: &record.target,
            proxied: record.proxied,
            ttl: record.ttl,
        }
    }
}

impl CloudflareClient {
    fn dns_records_url(&self) -> Result<String> {
        self.zone_id
            .as_deref()
            .map(|zone_id| format!("{}/zones/{}/dns_records", self.api_base, zone_id))
            .ok_or_else(|| Error::config("Cloudflare zone ID is required for DNS management"))
    }
}

#[async_trait]
impl DnsBackend for CloudflareClient {
    async fn fetch_records(&self) -> Result<Vec<DnsRecord>> {
        let url = self.dns_records_url()?;
        let mut records = Vec::new();
        let mut page: u32 = 1;

        loop {
            let request = self
                .client
                .get(&url)
                .bearer_auth(&self.api_token)
                .query(&[("page", page), ("per_page", DNS_PAGE_SIZE)]);
            let envelope: api::Envelope<Vec<ApiRecord>> =
                api::send(request, CallKind::Fetch, "DNS zone").await?;

            let batch = envelope.result.unwrap_or_default();
            let fetched = batch.len();
            records.extend(batch.into_iter().map(DnsRecord::from));

            let total_pages = envelope.result_info.map(|info| info.total_pages).unwrap_or(1);
            if page >= total_pages || fetched == 0 {
                break;
            }
            page += 1;
        }

        tracing::debug!("Listed {} DNS record(s) in {} page(s)", records.len(), page);
        Ok(records)
    }

    async fn create_record(&self, record: &DnsRecord) -> Result<()> {
        let url = self.dns_records_url()?;
        let request = self
            .client
            .post(url)
            .bearer_auth(&self.api_token)
            .json(&RecordBody::from(record));
        let _: api::Envelope<Value> = api::send(request, CallKind::Apply, "DNS record").await?;
        Ok(())
    }

    async fn update_record(&self, record_id: &str, record: &DnsRecord) -> Result<()> {
        let url = format!("{}/{}", self.dns_records_url()?, record_id);
        let request = self
            .client
            .put(url)
            .bearer_auth(&self.api_token)
            .json(&RecordBody::from(record));
        let _: api::Envelope<Value> = api::send(request, CallKind::Apply, "DNS record").await?;
        Ok(())
    }

    async fn delete_record(&self, record_id: &str) -> Result<()> {
        let url = format!("{}/{}", self.dns_records_url()?, record_id);
        let request = self.client.delete(url).bearer_auth(&self.api_token);
        let _: api::Envelope<Value> = api::send(request, CallKind::Apply, "DNS record").await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }
}
