// # Address Source Traits
//
// Defines how the current public address is obtained.
//
// Two layers:
// - `LookupSource`: one external service returning the caller's address as text
// - `AddressResolver`: yields a validated address per family, for example by
//   iterating a pool of lookup sources (see `crate::resolver::PoolResolver`)
//
// ## Implementations
//
// - HTTP lookup sources: `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::AddressResolver;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let resolver = /* AddressResolver implementation */;
//
//     let addresses = resolver.resolve().await;
//     if let Some(v4) = addresses.ipv4 {
//         println!("public IPv4: {}", v4);
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use tracing::warn;

/// IP version (v4 or v6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpVersion {
    V4,
    V6,
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpVersion::V4 => f.write_str("IPv4"),
            IpVersion::V6 => f.write_str("IPv6"),
        }
    }
}

/// Addresses resolved during one cycle
///
/// Each family is `None` when it could not be resolved this cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedAddress {
    pub ipv4: Option<Ipv4Addr>,
    pub ipv6: Option<Ipv6Addr>,
}

impl ResolvedAddress {
    pub fn new(ipv4: Option<Ipv4Addr>, ipv6: Option<Ipv6Addr>) -> Self {
        Self { ipv4, ipv6 }
    }

    /// Whether neither family resolved
    pub fn is_empty(&self) -> bool {
        self.ipv4.is_none() && self.ipv6.is_none()
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v4 = self.ipv4.map(|ip| ip.to_string());
        let v6 = self.ipv6.map(|ip| ip.to_string());
        write!(
            f,
            "ipv4={} ipv6={}",
            v4.as_deref().unwrap_or("-"),
            v6.as_deref().unwrap_or("-")
        )
    }
}

/// A single external service that reports the caller's public address
///
/// A lookup fails on network error or non-success status. The returned
/// text is validated by the resolver, not by the source.
#[async_trait]
pub trait LookupSource: Send + Sync {
    /// Fetch the raw address text
    async fn lookup(&self) -> Result<String, crate::Error>;

    /// Human-readable identity for logging (e.g., the URL)
    fn describe(&self) -> &str;
}

/// Trait for resolving the host's current public addresses
///
/// A failed resolution means "address unknown for this cycle"; callers must
/// not treat it as fatal.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Resolve the current public IPv4 address
    async fn resolve_ipv4(&self) -> Result<Ipv4Addr, crate::Error>;

    /// Resolve the current public IPv6 address
    async fn resolve_ipv6(&self) -> Result<Ipv6Addr, crate::Error>;

    /// Resolve both families, logging and absorbing failures
    async fn resolve(&self) -> ResolvedAddress {
        let ipv4 = match self.resolve_ipv4().await {
            Ok(ip) => Some(ip),
            Err(e) => {
                warn!("Error fetching external IPv4 address: {}", e);
                None
            }
        };

        let ipv6 = match self.resolve_ipv6().await {
            Ok(ip) => Some(ip),
            Err(e) => {
                warn!("Error fetching external IPv6 address: {}", e);
                None
            }
        };

        ResolvedAddress { ipv4, ipv6 }
    }
}
