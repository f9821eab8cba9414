// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare API v4 backend for the DDNS system.
//
// ## Behavior
//
// - Reads the live record before any write; the reconciler decides whether
//   to write at all
// - Creates missing records (POST) and rewrites diverging ones (PUT)
// - Compares content, TTL and the proxied flag
// - Resolves the zone id once per process and caches it
// - No retry or backoff: errors go back to the engine, the next cycle retries
//
// ## Authentication
//
// Either a scoped API token (`Authorization: Bearer`) or the legacy account
// email + global API key pair (`X-Auth-Email` / `X-Auth-Key`). Credentials
// never appear in logs, error messages or `Debug` output.
//
// ## API Reference
//
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=...&name=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use ddns_core::config::{ProviderConfig, RecordType};
use ddns_core::registry::ProviderRegistry;
use ddns_core::traits::{DnsProvider, DnsProviderFactory, DnsRecord, LiveRecord};
use ddns_core::{Error, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER: &str = "cloudflare";

/// How requests are authenticated
#[derive(Clone)]
pub enum Credentials {
    /// Scoped API token with Zone:DNS:Edit permission
    ApiToken(String),
    /// Account email and global API key
    GlobalKey { email: String, api_key: String },
}

/// Where the zone id comes from
#[derive(Debug, Clone)]
pub enum ZoneRef {
    /// Zone id configured directly
    Id(String),
    /// Zone name, resolved to an id on first use
    Name(String),
}

/// Cloudflare DNS provider
pub struct CloudflareProvider {
    /// ⚠️ NEVER log this value
    credentials: Credentials,

    zone: ZoneRef,

    /// Zone id resolved from `zone`, cached for the process lifetime
    zone_id: OnceCell<String>,

    base_url: String,

    client: reqwest::Client,
}

impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let auth = match self.credentials {
            Credentials::ApiToken(_) => "api_token <REDACTED>",
            Credentials::GlobalKey { .. } => "global_api_key <REDACTED>",
        };
        f.debug_struct("CloudflareProvider")
            .field("credentials", &auth)
            .field("zone", &self.zone)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Response envelope shared by every Cloudflare v4 endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CfRecord {
    id: String,
    content: String,
    ttl: u32,
    #[serde(default)]
    proxied: bool,
}

impl CloudflareProvider {
    pub fn new(credentials: Credentials, zone: ZoneRef) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            credentials,
            zone,
            zone_id: OnceCell::new(),
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
        }
    }

    /// Point the provider at a different API endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Credentials::ApiToken(token) => request.bearer_auth(token),
            Credentials::GlobalKey { email, api_key } => request
                .header("X-Auth-Email", email)
                .header("X-Auth-Key", api_key),
        }
    }

    /// Send a request and unwrap the v4 envelope
    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = self
            .authorize(request)
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

        let envelope: Envelope<T> = serde_json::from_str(&body)?;

        if !envelope.success {
            let messages: Vec<String> = envelope
                .errors
                .iter()
                .map(|e| format!("{} ({})", e.message, e.code))
                .collect();
            return Err(Error::provider(PROVIDER, messages.join("; ")));
        }

        envelope
            .result
            .ok_or_else(|| Error::provider(PROVIDER, "response has no result"))
    }

    /// Zone id for requests, looked up by name at most once
    async fn zone_id(&self) -> Result<&str> {
        let id = match &self.zone {
            ZoneRef::Id(id) => id.as_str(),
            ZoneRef::Name(name) => self
                .zone_id
                .get_or_try_init(|| self.lookup_zone_id(name))
                .await?
                .as_str(),
        };
        Ok(id)
    }

    async fn lookup_zone_id(&self, zone_name: &str) -> Result<String> {
        tracing::debug!("Looking up Cloudflare zone id for {}", zone_name);

        let zones: Vec<Zone> = self
            .send(
                self.client
                    .get(format!("{}/zones", self.base_url))
                    .query(&[("name", zone_name)]),
            )
            .await?;

        let zone = zones
            .into_iter()
            .next()
            .ok_or_else(|| Error::config(format!("Cloudflare zone not found: {zone_name}")))?;

        tracing::debug!("Found zone id {} for {}", zone.id, zone_name);
        Ok(zone.id)
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn fetch_record(&self, record: &DnsRecord) -> Result<Option<LiveRecord>> {
        let zone_id = self.zone_id().await?;

        let records: Vec<CfRecord> = self
            .send(
                self.client
                    .get(format!("{}/zones/{}/dns_records", self.base_url, zone_id))
                    .query(&[
                        ("type", record.record_type.as_str()),
                        ("name", record.name.as_str()),
                    ]),
            )
            .await?;

        Ok(records.into_iter().next().map(|r| LiveRecord {
            id: Some(r.id),
            content: r.content,
            ttl: r.ttl,
            proxied: Some(r.proxied),
        }))
    }

    async fn write_record(&self, record: &DnsRecord, existing: Option<&LiveRecord>) -> Result<()> {
        let zone_id = self.zone_id().await?;
        let collection = format!("{}/zones/{}/dns_records", self.base_url, zone_id);

        let payload = serde_json::json!({
            "type": record.record_type.as_str(),
            "name": record.name,
            "content": record.content.to_string(),
            "ttl": record.ttl,
            "proxied": record.proxied,
        });

        let request = match existing.and_then(|live| live.id.as_deref()) {
            Some(record_id) => self.client.put(format!("{collection}/{record_id}")),
            None => self.client.post(collection),
        };

        let _: serde_json::Value = self.send(request.json(&payload)).await?;
        Ok(())
    }

    fn supports_record_type(&self, record_type: RecordType) -> bool {
        matches!(record_type, RecordType::A | RecordType::Aaaa)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for creating Cloudflare providers
pub struct CloudflareFactory;

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        let credentials = match (
            config.setting("api_token"),
            config.setting("email"),
            config.setting("global_api_key"),
        ) {
            (Some(token), _, _) => Credentials::ApiToken(token.to_string()),
            (None, Some(email), Some(key)) => Credentials::GlobalKey {
                email: email.to_string(),
                api_key: key.to_string(),
            },
            _ => {
                return Err(Error::config(
                    "Cloudflare provider requires api_token, or email and global_api_key",
                ));
            }
        };

        let zone = match (config.setting("zone_id"), config.setting("zone")) {
            (Some(id), _) => ZoneRef::Id(id.to_string()),
            (None, Some(name)) => ZoneRef::Name(name.to_string()),
            (None, None) => {
                return Err(Error::config("Cloudflare provider requires zone or zone_id"));
            }
        };

        let mut provider = CloudflareProvider::new(credentials, zone);
        if let Some(base_url) = config.setting("api_base_url") {
            provider = provider.with_base_url(base_url);
        }

        Ok(Box::new(provider))
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use ddns_core::ProviderRegistry;
///
/// let mut registry = ProviderRegistry::new();
/// ddns_provider_cloudflare::register(&mut registry);
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &mut ProviderRegistry) {
    registry.register_provider("cloudflare", Box::new(CloudflareFactory));
}
