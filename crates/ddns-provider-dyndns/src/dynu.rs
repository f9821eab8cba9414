//! Dynu
//!
//! `GET /nic/update?hostname=<name>&myip=<v4>&username=<user>&password=<md5>`
//! (or `myipv6=<v6>`). The password is sent as its MD5 hex digest.

use async_trait::async_trait;
use ddns_core::config::{ProviderConfig, RecordType};
use ddns_core::traits::{DnsProvider, DnsProviderFactory, DnsRecord, LiveRecord};
use ddns_core::{Error, Result};
use md5::{Digest, Md5};

const PROVIDER: &str = "dynu";

pub const DYNU_API_BASE: &str = "https://api.dynu.com";

pub struct DynuProvider {
    username: String,
    password_md5: String,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for DynuProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynuProvider")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

impl DynuProvider {
    pub fn new(username: impl Into<String>, password: &str) -> Self {
        Self {
            username: username.into(),
            password_md5: md5_hex(password),
            base_url: DYNU_API_BASE.to_string(),
            client: crate::http_client(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = crate::trim_base_url(base_url);
        self
    }
}

pub fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

/// Interpret the update response body
pub fn interpret_response(body: &str) -> Result<()> {
    if body.contains("good") || body.contains("nochg") {
        Ok(())
    } else if body.contains("badauth") {
        Err(Error::auth(format!("{PROVIDER}: invalid username or password")))
    } else {
        Err(Error::provider(PROVIDER, format!("update rejected: {}", body.trim())))
    }
}

#[async_trait]
impl DnsProvider for DynuProvider {
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
            .query(&[
                ("hostname", record.name.as_str()),
                (address_param, address.as_str()),
                ("username", self.username.as_str()),
                ("password", self.password_md5.as_str()),
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

pub struct DynuFactory;

impl DnsProviderFactory for DynuFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        let mut provider = DynuProvider::new(
            config.required_setting("username")?,
            config.required_setting("password")?,
        );
        if let Some(base_url) = config.setting("api_base_url") {
            provider = provider.with_base_url(base_url);
        }
        Ok(Box::new(provider))
    }
}
