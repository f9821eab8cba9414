// # HTTP Lookup Sources
//
// This crate provides the HTTP-based lookup sources used to discover the
// host's public addresses.
//
// ## Architecture
//
// Each `HttpLookupSource` issues one GET against a "what is my IP" service
// and returns the response body as text. Validation of that text is left to
// `ddns_core::PoolResolver`, which walks a shuffled pool of these sources
// and keeps the first valid answer.
//
// The default pools mix independent operators so a single outage does not
// take address discovery down.

use ddns_core::resolver::PoolResolver;
use ddns_core::traits::LookupSource;
use ddns_core::{Error, Result};

use std::time::Duration;

/// Per-request timeout for lookup services
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Services answering with the caller's IPv4 address as plain text
pub const DEFAULT_IPV4_SERVICES: &[&str] = &[
    "https://api.ipify.org?format=text",
    "https://ifconfig.co",
    "https://checkip.amazonaws.com",
    "https://myexternalip.com/raw",
];

/// Services answering with the caller's IPv6 address as plain text
pub const DEFAULT_IPV6_SERVICES: &[&str] = &[
    "https://v6.ident.me",
    "https://ipv6.icanhazip.com",
    "https://api6.ipify.org",
];

/// One HTTP "what is my IP" service
#[derive(Clone)]
pub struct HttpLookupSource {
    /// URL to fetch the address from
    url: String,

    /// HTTP client (shared between sources of a pool)
    client: reqwest::Client,
}

impl HttpLookupSource {
    /// Create a source with its own client
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, lookup_client())
    }

    /// Create a source reusing an existing client
    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }
}

#[async_trait::async_trait]
impl LookupSource for HttpLookupSource {
    async fn lookup(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::transient(format!("request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::transient(format!(
                "{} answered with status {}",
                self.url, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::transient(format!("failed to read response from {}: {}", self.url, e)))?;

        tracing::trace!("{} answered {:?}", self.url, body.trim());
        Ok(body)
    }

    fn describe(&self) -> &str {
        &self.url
    }
}

/// Client configured for lookup requests
pub fn lookup_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(LOOKUP_TIMEOUT)
        .build()
        .unwrap_or_default()
}

fn sources(urls: &[&str], client: &reqwest::Client) -> Vec<Box<dyn LookupSource>> {
    urls.iter()
        .map(|url| Box::new(HttpLookupSource::with_client(*url, client.clone())) as Box<dyn LookupSource>)
        .collect()
}

/// Default IPv4 lookup pool
pub fn default_ipv4_sources() -> Vec<Box<dyn LookupSource>> {
    sources(DEFAULT_IPV4_SERVICES, &lookup_client())
}

/// Default IPv6 lookup pool
pub fn default_ipv6_sources() -> Vec<Box<dyn LookupSource>> {
    sources(DEFAULT_IPV6_SERVICES, &lookup_client())
}

/// Resolver over the default public pools, sharing one client
pub fn public_resolver() -> PoolResolver {
    let client = lookup_client();
    PoolResolver::new(
        sources(DEFAULT_IPV4_SERVICES, &client),
        sources(DEFAULT_IPV6_SERVICES, &client),
    )
}
