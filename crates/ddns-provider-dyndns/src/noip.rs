//! No-IP
//!
//! `GET /nic/update?hostname=<name>&myip=<v4>` (or `myipv6=<v6>`) with HTTP
//! Basic authentication. Responses follow the dyndns2 return codes.

use async_trait::async_trait;
use ddns_core::config::{ProviderConfig, RecordType};
use ddns_core::traits::{DnsProvider, DnsProviderFactory, DnsRecord, LiveRecord};
use ddns_core::{Error, Result};

const PROVIDER: &str = "noip";

pub const NOIP_API_BASE: &str = "https://dynupdate.no-ip.com";

pub struct NoIpProvider {
    username: String,
    password: String,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for NoIpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoIpProvider")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

impl NoIpProvider {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            base_url: NOIP_API_BASE.to_string(),
            client: crate::http_client(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = crate::trim_base_url(base_url);
        self
    }
}

/// Interpret a dyndns2-style response body
pub fn interpret_response(body: &str) -> Result<()> {
    let body = body.trim();
    if body.starts_with("good") || body.starts_with("nochg") {
        Ok(())
    } else if body.starts_with("badauth") {
        Err(Error::auth(format!("{PROVIDER}: invalid username or password")))
    } else if body.starts_with("911") {
        Err(Error::transient(format!("{PROVIDER}: server-side error (911)")))
    } else {
        Err(Error::provider(PROVIDER, format!("update rejected: {body}")))
    }
}

#[async_trait]
impl DnsProvider for NoIpProvider {
    async fn fetch_record(&self, _record: &DnsRecord) -> Result<Option<LiveRecord>> {
        Ok(None)
    }

    async fn write_record(&self, record: &DnsRecord, _existing: Option<&LiveRecord>) -> Result<()> {
        let address_param = match record.record_type {
            RecordType::A => "myip",
            RecordType::Aaaa => "myipv6",
        };
        let address = record.content.to_string();

        let request = self
            .client
            .get(format!("{}/nic/update", self.base_url))
            .basic_auth(&self.username, Some(&self.password))
            .query(&[
                ("hostname", record.name.as_str()),
                (address_param, address.as_str()),
            ]);

        let body = crate::send(PROVIDER, request).await?;
        interpret_response(&body)
    }

    fn write_only(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

pub struct NoIpFactory;

impl DnsProviderFactory for NoIpFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        let mut provider = NoIpProvider::new(
            config.required_setting("username")?,
            config.required_setting("password")?,
        );
        if let Some(base_url) = config.setting("api_base_url") {
            provider = provider.with_base_url(base_url);
        }
        Ok(Box::new(provider))
    }
}
