// # DigitalOcean DNS Provider
//
// DigitalOcean API v2 backend for the DDNS system.
//
// Records are addressed relative to the configured domain: the apex is `@`
// and `home.example.com` under `example.com` is `home`. Lookups filter by
// the fully qualified name. DigitalOcean has no proxy concept, so only
// content and TTL are compared.
//
// ## API Reference
//
// - List records: GET `/v2/domains/:domain/records?type=...&name=<fqdn>`
// - Create record: POST `/v2/domains/:domain/records`
// - Update record: PUT `/v2/domains/:domain/records/:id`

use async_trait::async_trait;
use ddns_core::config::ProviderConfig;
use ddns_core::registry::ProviderRegistry;
use ddns_core::traits::{DnsProvider, DnsProviderFactory, DnsRecord, LiveRecord};
use ddns_core::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

/// DigitalOcean API base URL
pub const DIGITALOCEAN_API_BASE: &str = "https://api.digitalocean.com";

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER: &str = "digitalocean";

#[derive(Debug, Deserialize)]
struct RecordList {
    #[serde(default)]
    domain_records: Vec<DomainRecord>,
}

#[derive(Debug, Deserialize)]
struct DomainRecord {
    id: u64,
    data: String,
    ttl: u32,
}

/// DigitalOcean DNS provider
pub struct DigitalOceanProvider {
    api_token: String,
    domain: String,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for DigitalOceanProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigitalOceanProvider")
            .field("api_token", &"<REDACTED>")
            .field("domain", &self.domain)
            .finish()
    }
}

impl DigitalOceanProvider {
    pub fn new(api_token: impl Into<String>, domain: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            api_token: api_token.into(),
            domain: domain.into().trim_end_matches('.').to_lowercase(),
            base_url: DIGITALOCEAN_API_BASE.to_string(),
            client,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn records_url(&self) -> String {
        format!("{}/v2/domains/{}/records", self.base_url, self.domain)
    }

    /// Record name relative to the domain, `@` for the apex
    pub fn relative_name(&self, name: &str) -> String {
        let name = name.trim_end_matches('.').to_lowercase();
        if name == self.domain || name == "@" {
            return "@".to_string();
        }
        match name.strip_suffix(&format!(".{}", self.domain)) {
            Some(sub) => sub.to_string(),
            None => name,
        }
    }

    /// Fully qualified record name as the list filter expects it
    pub fn fqdn(&self, name: &str) -> String {
        match self.relative_name(name).as_str() {
            "@" => self.domain.clone(),
            sub => format!("{}.{}", sub, self.domain),
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String> {
        let response = request
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::transient(format!("{PROVIDER}: HTTP request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transient(format!("{PROVIDER}: failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Error::from_status(PROVIDER, status.as_u16(), &body));
        }
        Ok(body)
    }
}

#[async_trait]
impl DnsProvider for DigitalOceanProvider {
    async fn fetch_record(&self, record: &DnsRecord) -> Result<Option<LiveRecord>> {
        let fqdn = self.fqdn(&record.name);
        let body = self
            .send(self.client.get(self.records_url()).query(&[
                ("type", record.record_type.as_str()),
                ("name", fqdn.as_str()),
            ]))
            .await?;

        let list: RecordList = serde_json::from_str(&body)?;

        Ok(list.domain_records.into_iter().next().map(|r| LiveRecord {
            id: Some(r.id.to_string()),
            content: r.data,
            ttl: r.ttl,
            proxied: None,
        }))
    }

    async fn write_record(&self, record: &DnsRecord, existing: Option<&LiveRecord>) -> Result<()> {
        let payload = serde_json::json!({
            "type": record.record_type.as_str(),
            "name": self.relative_name(&record.name),
            "data": record.content.to_string(),
            "ttl": record.ttl,
        });

        let request = match existing.and_then(|live| live.id.as_deref()) {
            Some(id) => self.client.put(format!("{}/{}", self.records_url(), id)),
            None => self.client.post(self.records_url()),
        };

        self.send(request.json(&payload)).await?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for creating DigitalOcean providers
pub struct DigitalOceanFactory;

impl DnsProviderFactory for DigitalOceanFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        let api_token = config.required_setting("api_token")?;
        let domain = config.required_setting("domain")?;

        let mut provider = DigitalOceanProvider::new(api_token, domain);
        if let Some(base_url) = config.setting("api_base_url") {
            provider = provider.with_base_url(base_url);
        }

        Ok(Box::new(provider))
    }
}

/// Register the DigitalOcean provider with a registry
pub fn register(registry: &mut ProviderRegistry) {
    registry.register_provider("digitalocean", Box::new(DigitalOceanFactory));
}
