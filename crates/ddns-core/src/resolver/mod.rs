//! Pool-based address resolver
//!
//! Each call walks a fixed pool of independent lookup sources in a freshly
//! shuffled order. The first source that yields a syntactically valid
//! address of the requested family wins; the remaining sources are not
//! contacted. There are no retries beyond one pass over the pool.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::debug;

use crate::error::{Error, Result};
use crate::traits::{AddressResolver, IpVersion, LookupSource};

/// Resolver that load-balances across redundant lookup sources
pub struct PoolResolver {
    ipv4_sources: Vec<Box<dyn LookupSource>>,
    ipv6_sources: Vec<Box<dyn LookupSource>>,
}

impl PoolResolver {
    pub fn new(
        ipv4_sources: Vec<Box<dyn LookupSource>>,
        ipv6_sources: Vec<Box<dyn LookupSource>>,
    ) -> Self {
        Self {
            ipv4_sources,
            ipv6_sources,
        }
    }

    /// Try the pool for one family in randomized order
    async fn resolve_family(&self, version: IpVersion) -> Result<IpAddr> {
        let pool = match version {
            IpVersion::V4 => &self.ipv4_sources,
            IpVersion::V6 => &self.ipv6_sources,
        };

        let mut order: Vec<&dyn LookupSource> = pool.iter().map(|s| s.as_ref()).collect();
        order.shuffle(&mut rand::thread_rng());

        for source in order {
            let text = match source.lookup().await {
                Ok(text) => text,
                Err(e) => {
                    debug!("{} lookup via {} failed: {}", version, source.describe(), e);
                    continue;
                }
            };

            match parse_for_family(&text, version) {
                Some(ip) => {
                    debug!("{} resolved via {}: {}", version, source.describe(), ip);
                    return Ok(ip);
                }
                None => {
                    debug!(
                        "{} lookup via {} returned an invalid address: {:?}",
                        version,
                        source.describe(),
                        text.trim()
                    );
                }
            }
        }

        Err(Error::resolution_failed(format!(
            "could not fetch a valid external {} address from any of {} sources",
            version,
            pool.len()
        )))
    }
}

#[async_trait]
impl AddressResolver for PoolResolver {
    async fn resolve_ipv4(&self) -> Result<Ipv4Addr> {
        match self.resolve_family(IpVersion::V4).await? {
            IpAddr::V4(ip) => Ok(ip),
            IpAddr::V6(ip) => Err(Error::resolution_failed(format!(
                "expected IPv4, got {ip}"
            ))),
        }
    }

    async fn resolve_ipv6(&self) -> Result<Ipv6Addr> {
        match self.resolve_family(IpVersion::V6).await? {
            IpAddr::V6(ip) => Ok(ip),
            IpAddr::V4(ip) => Err(Error::resolution_failed(format!(
                "expected IPv6, got {ip}"
            ))),
        }
    }
}

/// Parse lookup output, enforcing the requested family strictly
///
/// An IPv4-mapped IPv6 literal counts as IPv4: it is accepted (and
/// unwrapped) for IPv4 requests and rejected for IPv6 requests.
pub fn parse_for_family(text: &str, version: IpVersion) -> Option<IpAddr> {
    let ip: IpAddr = text.trim().parse().ok()?;

    match (version, ip) {
        (IpVersion::V4, IpAddr::V4(_)) => Some(ip),
        (IpVersion::V4, IpAddr::V6(v6)) => v6.to_ipv4_mapped().map(IpAddr::V4),
        (IpVersion::V6, IpAddr::V6(v6)) if v6.to_ipv4_mapped().is_none() => Some(ip),
        (IpVersion::V6, _) => None,
    }
}
