//! DuckDNS
//!
//! `GET /update?domains=<sub>&token=<token>&ip=<v4>` (or `ipv6=<v6>`).
//! The body is exactly `OK` on success and `KO` otherwise.

use async_trait::async_trait;
use ddns_core::config::{ProviderConfig, RecordType};
use ddns_core::traits::{DnsProvider, DnsProviderFactory, DnsRecord, LiveRecord};
use ddns_core::{Error, Result};

const PROVIDER: &str = "duckdns";

pub const DUCKDNS_API_BASE: &str = "https://www.duckdns.org";

const DUCKDNS_SUFFIX: &str = ".duckdns.org";

pub struct DuckDnsProvider {
    token: String,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for DuckDnsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDnsProvider")
            .field("token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl DuckDnsProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: DUCKDNS_API_BASE.to_string(),
            client: crate::http_client(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = crate::trim_base_url(base_url);
        self
    }
}

/// `home.duckdns.org` → `home`; bare subdomains pass through
pub fn subdomain(name: &str) -> &str {
    name.strip_suffix(DUCKDNS_SUFFIX).unwrap_or(name)
}

/// Interpret the update response body
pub fn interpret_response(body: &str) -> Result<()> {
    match body.trim() {
        "OK" => Ok(()),
        "KO" => Err(Error::provider(
            PROVIDER,
            "update rejected (KO): check the token and domain",
        )),
        other => Err(Error::provider(PROVIDER, format!("unexpected response: {other}"))),
    }
}

#[async_trait]
impl DnsProvider for DuckDnsProvider {
    async fn fetch_record(&self, _record: &DnsRecord) -> Result<Option<LiveRecord>> {
        Ok(None)
    }

    async fn write_record(&self, record: &DnsRecord, _existing: Option<&LiveRecord>) -> Result<()> {
        let address_param = match record.record_type {
            RecordType::A => "ip",
            RecordType::Aaaa => "ipv6",
        };
        let address = record.content.to_string();

        let request = self
            .client
            .get(format!("{}/update", self.base_url))
            .query(&[
                ("domains", subdomain(&record.name)),
                ("token", self.token.as_str()),
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

pub struct DuckDnsFactory;

impl DnsProviderFactory for DuckDnsFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        let mut provider = DuckDnsProvider::new(config.required_setting("token")?);
        if let Some(base_url) = config.setting("api_base_url") {
            provider = provider.with_base_url(base_url);
        }
        Ok(Box::new(provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddns_core::config::RecordConfig;
    use ddns_core::reconcile::reconcile;
    use ddns_core::traits::UpdateResult;
    use mockito::Matcher;

    #[test]
    fn test_subdomain_strips_suffix() {
        assert_eq!(subdomain("home.duckdns.org"), "home");
        assert_eq!(subdomain("home"), "home");
    }

    #[test]
    fn test_interpret_response() {
        assert!(interpret_response("OK").is_ok());
        assert!(interpret_response("OK\n").is_ok());
        assert!(interpret_response("KO").is_err());
        assert!(interpret_response("").is_err());
    }

    #[test]
    fn test_factory_requires_token() {
        assert!(matches!(
            DuckDnsFactory.create(&ProviderConfig::new("duckdns")),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_push_ipv6() {
        let mut server = mockito::Server::new_async().await;
        let update = server
            .mock("GET", "/update")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("domains".into(), "home".into()),
                Matcher::UrlEncoded("token".into(), "duck-token".into()),
                Matcher::UrlEncoded("ipv6".into(), "2001:db8::5".into()),
            ]))
            .with_body("OK")
            .expect(1)
            .create_async()
            .await;
        let provider = DuckDnsProvider::new("duck-token").with_base_url(&server.url());
        let record = DnsRecord::new(
            &RecordConfig::new("home.duckdns.org", RecordType::Aaaa),
            "2001:db8::5".parse().unwrap(),
        );

        let outcome = reconcile(&provider, &record).await.unwrap();

        assert_eq!(outcome, UpdateResult::Pushed);
        update.assert_async().await;
    }

    #[tokio::test]
    async fn test_ko_body_is_provider_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/update")
            .match_query(Matcher::Any)
            .with_body("KO")
            .create_async()
            .await;
        let provider = DuckDnsProvider::new("duck-token").with_base_url(&server.url());
        let record = DnsRecord::new(
            &RecordConfig::new("home.duckdns.org", RecordType::A),
            "203.0.113.5".parse().unwrap(),
        );

        let err = provider.write_record(&record, None).await.unwrap_err();
        assert!(!err.is_retryable());
        assert!(!err.to_string().contains("duck-token"));
    }
}
