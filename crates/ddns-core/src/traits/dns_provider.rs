// # DNS Provider Trait
//
// Defines the interface a DNS backend exposes to the reconciler.
//
// ## Implementations
//
// - Cloudflare: `ddns-provider-cloudflare` crate
// - DigitalOcean: `ddns-provider-digitalocean` crate
// - Route 53: `ddns-provider-route53` crate
// - DuckDNS, FreeDNS, No-IP, Dynu: `ddns-provider-dyndns` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::reconcile::reconcile;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//     let record = DnsRecord::new(&record_config, "203.0.113.5".parse()?);
//
//     // Read, compare, write only on divergence
//     let outcome = reconcile(provider.as_ref(), &record).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::fmt;
use std::net::IpAddr;

use crate::config::{ProviderConfig, RecordConfig, RecordType};

/// Desired state of one record for the current cycle
///
/// Combines the configured record with the address resolved for its family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    pub name: String,
    pub record_type: RecordType,
    pub content: IpAddr,
    pub ttl: u32,
    pub proxied: bool,
    pub update_token: Option<String>,
}

impl DnsRecord {
    pub fn new(config: &RecordConfig, content: IpAddr) -> Self {
        Self {
            name: config.name.clone(),
            record_type: config.record_type,
            content,
            ttl: config.ttl,
            proxied: config.proxied,
            update_token: config.update_token.clone(),
        }
    }
}

/// A record as currently reported by a provider's API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveRecord {
    /// Provider-specific record identifier, if the API has one
    pub id: Option<String>,
    /// Record content as text
    pub content: String,
    /// Time-to-live in seconds
    pub ttl: u32,
    /// Proxy flag, `None` when the provider has no such concept
    pub proxied: Option<bool>,
}

impl LiveRecord {
    /// Whether every compared field already matches the desired record
    ///
    /// Content is compared as an address when it parses as one, so that
    /// different textual forms of the same IPv6 address are equal.
    pub fn matches(&self, desired: &DnsRecord) -> bool {
        let content_matches = match self.content.trim().parse::<IpAddr>() {
            Ok(ip) => ip == desired.content,
            Err(_) => false,
        };

        let proxied_matches = self.proxied.is_none_or(|p| p == desired.proxied);

        content_matches && self.ttl == desired.ttl && proxied_matches
    }
}

/// Result of reconciling one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateResult {
    /// Record existed with diverging fields and was rewritten
    Updated {
        /// The content reported by the provider before the write
        previous: String,
    },
    /// Record already matched the desired state (no write)
    Unchanged,
    /// Record did not exist and was created
    Created,
    /// Provider has no read API; the desired state was written unconditionally
    Pushed,
}

impl fmt::Display for UpdateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateResult::Updated { previous } => write!(f, "updated (was {previous})"),
            UpdateResult::Unchanged => f.write_str("already up-to-date"),
            UpdateResult::Created => f.write_str("created"),
            UpdateResult::Pushed => f.write_str("pushed"),
        }
    }
}

/// Trait for DNS provider implementations
///
/// A provider only supplies the transport for the two network steps of the
/// reconciliation protocol: reading the live record and writing the desired
/// one. Comparing, deciding whether to write, and reporting are owned by
/// [`crate::reconcile::reconcile`].
///
/// # Constraints
///
/// - No retry logic or backoff; return an error and the next scheduled
///   cycle retries.
/// - No background tasks.
/// - Credentials never appear in logs or error messages.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Fetch the provider's current record for the record's name and type
    ///
    /// - `Ok(Some(_))`: record exists
    /// - `Ok(None)`: no such record yet
    ///
    /// Never called when [`DnsProvider::write_only`] returns `true`.
    async fn fetch_record(&self, record: &DnsRecord) -> Result<Option<LiveRecord>, crate::Error>;

    /// Write the desired record
    ///
    /// `existing` is the record returned by [`DnsProvider::fetch_record`]
    /// when one exists; `None` selects the create path (or, for write-only
    /// providers, the unconditional update).
    async fn write_record(
        &self,
        record: &DnsRecord,
        existing: Option<&LiveRecord>,
    ) -> Result<(), crate::Error>;

    /// Whether the provider lacks a read API (update-token style)
    fn write_only(&self) -> bool {
        false
    }

    /// Check if this provider can manage records of the given type
    fn supports_record_type(&self, _record_type: RecordType) -> bool {
        true
    }

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    ///
    /// Implementations validate provider-specific settings here, so that
    /// configuration errors surface at startup.
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
