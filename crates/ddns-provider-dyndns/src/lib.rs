// # Dynamic DNS Update Services
//
// Backends for services that expose a single "set my address" endpoint and
// no way to read the current record:
//
// - DuckDNS (`duckdns`)
// - FreeDNS / afraid.org (`freedns`)
// - No-IP (`noip`)
// - Dynu (`dynu`)
//
// All of them are write-only: the reconciler pushes the desired address on
// every pass. The services themselves treat an unchanged address as a no-op
// (`nochg`, `has not changed`), so repeated pushes are harmless.
//
// Credentials travel in query strings for some of these services; request
// errors are stripped of their URL before being reported.

pub mod duckdns;
pub mod dynu;
pub mod freedns;
pub mod noip;

use ddns_core::registry::ProviderRegistry;
use ddns_core::{Error, Result};
use std::time::Duration;

pub use duckdns::{DuckDnsFactory, DuckDnsProvider};
pub use dynu::{DynuFactory, DynuProvider};
pub use freedns::{FreeDnsFactory, FreeDnsProvider};
pub use noip::{NoIpFactory, NoIpProvider};

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent sent to update services (No-IP rejects generic agents)
pub const USER_AGENT: &str = concat!("ddnsd/", env!("CARGO_PKG_VERSION"));

/// Register every write-only backend with a registry
pub fn register(registry: &mut ProviderRegistry) {
    registry.register_provider("duckdns", Box::new(DuckDnsFactory));
    registry.register_provider("freedns", Box::new(FreeDnsFactory));
    registry.register_provider("noip", Box::new(NoIpFactory));
    registry.register_provider("dynu", Box::new(DynuFactory));
}

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(DEFAULT_HTTP_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_default()
}

/// Send an update request and return the response body
pub(crate) async fn send(provider: &str, request: reqwest::RequestBuilder) -> Result<String> {
    let response = request.send().await.map_err(|e| {
        Error::transient(format!("{provider}: HTTP request failed: {}", e.without_url()))
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| {
        Error::transient(format!("{provider}: failed to read response: {}", e.without_url()))
    })?;

    if !status.is_success() {
        return Err(Error::from_status(provider, status.as_u16(), body.trim()));
    }
    Ok(body)
}

pub(crate) fn trim_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
