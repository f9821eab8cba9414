//! FreeDNS (afraid.org)
//!
//! Each record carries its own update token:
//! `GET /dynamic/update.php?<token>&address=<ip>`.

use async_trait::async_trait;
use ddns_core::config::ProviderConfig;
use ddns_core::traits::{DnsProvider, DnsProviderFactory, DnsRecord, LiveRecord};
use ddns_core::{Error, Result};
use tracing::warn;

const PROVIDER: &str = "freedns";

pub const FREEDNS_API_BASE: &str = "https://freedns.afraid.org";

#[derive(Debug)]
pub struct FreeDnsProvider {
    base_url: String,
    client: reqwest::Client,
}

impl Default for FreeDnsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FreeDnsProvider {
    pub fn new() -> Self {
        Self {
            base_url: FREEDNS_API_BASE.to_string(),
            client: crate::http_client(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = crate::trim_base_url(base_url);
        self
    }
}

/// Interpret the update response body
///
/// Unrecognized answers are logged and accepted: the service has changed
/// its wording before, and a write that returned 2xx most likely landed.
pub fn interpret_response(body: &str) -> Result<()> {
    if body.contains("Updated") || body.contains("has not changed") {
        Ok(())
    } else if body.contains("ERROR") {
        Err(Error::provider(PROVIDER, body.trim().to_string()))
    } else {
        warn!("Unexpected response from FreeDNS: {}", body.trim());
        Ok(())
    }
}

#[async_trait]
impl DnsProvider for FreeDnsProvider {
    async fn fetch_record(&self, _record: &DnsRecord) -> Result<Option<LiveRecord>> {
        Ok(None)
    }

    async fn write_record(&self, record: &DnsRecord, _existing: Option<&LiveRecord>) -> Result<()> {
        let token = record.update_token.as_deref().ok_or_else(|| {
            Error::config(format!("FreeDNS record {} has no update_token", record.name))
        })?;

        // The token is the bare query key, not a key=value pair
        let url = format!(
            "{}/dynamic/update.php?{}&address={}",
            self.base_url, token, record.content
        );

        let body = crate::send(PROVIDER, self.client.get(url)).await?;
        interpret_response(&body)
    }

    fn write_only(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

pub struct FreeDnsFactory;

impl DnsProviderFactory for FreeDnsFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        if let Some(record) = config
            .records
            .iter()
            .find(|r| r.update_token.as_deref().is_none_or(str::is_empty))
        {
            return Err(Error::config(format!(
                "FreeDNS record {} requires an update_token",
                record.name
            )));
        }

        let mut provider = FreeDnsProvider::new();
        if let Some(base_url) = config.setting("api_base_url") {
            provider = provider.with_base_url(base_url);
        }
        Ok(Box::new(provider))
    }
}
