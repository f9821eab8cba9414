//! Core traits for the DDNS system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`LookupSource`] / [`AddressResolver`]: Obtain the current public addresses
//! - [`ConnectivityProbe`]: Decide whether outbound connectivity exists
//! - [`DnsProvider`]: Read and write records via provider APIs

pub mod address_source;
pub mod connectivity;
pub mod dns_provider;

pub use address_source::{AddressResolver, IpVersion, LookupSource, ResolvedAddress};
pub use connectivity::ConnectivityProbe;
pub use dns_provider::{DnsProvider, DnsProviderFactory, DnsRecord, LiveRecord, UpdateResult};
