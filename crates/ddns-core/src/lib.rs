// # ddns-core
//
// Core library for the multi-provider DDNS update orchestrator.
//
// ## Architecture Overview
//
// This library keeps DNS records at several providers synchronized with the
// host's current public addresses:
// - **AddressResolver**: Obtains the public IPv4/IPv6 address from a pool of sources
// - **ConnectivityProbe**: Decides whether outbound connectivity exists
// - **DnsProvider**: Read/write transport for one provider's API
// - **reconcile**: Read-before-write protocol shared by every provider
// - **DdnsEngine**: Timer-driven state machine that orchestrates the above
// - **ProviderRegistry**: Plugin-based registry for DNS providers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from provider transports
// 2. **Single control loop**: Timers and shutdown are multiplexed on one task
// 3. **Plugin-Based**: Providers are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Diff before write**: Live provider state is read and compared before any write

pub mod config;
pub mod connectivity;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod registry;
pub mod resolver;
pub mod traits;

// Re-export core types for convenience
pub use config::{DdnsConfig, GeneralSettings, ProviderConfig, RecordConfig, RecordType};
pub use connectivity::TcpProbe;
pub use engine::{ConnectivityState, DdnsEngine, EngineEvent, PassReport, PassTrigger, ProviderEntry};
pub use error::{Error, Result};
pub use registry::ProviderRegistry;
pub use resolver::PoolResolver;
pub use traits::{AddressResolver, ConnectivityProbe, DnsProvider, LookupSource};
