//! Plugin-based provider registry
//!
//! The registry allows DNS providers to be registered by type name, so the
//! daemon builds providers from configuration without a hard-coded match
//! over backend types.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ddns_core::registry::ProviderRegistry;
//!
//! let mut registry = ProviderRegistry::new();
//! ddns_provider_cloudflare::register(&mut registry);
//!
//! let entries = registry.build_all(&config.providers)?;
//! ```
//!
//! ## Registration
//!
//! Provider crates expose a `register` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &mut ProviderRegistry) {
//!     registry.register_provider("cloudflare", Box::new(CloudflareFactory));
//! }
//! ```

use crate::config::ProviderConfig;
use crate::engine::ProviderEntry;
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, DnsProviderFactory};
use std::collections::HashMap;
use tracing::debug;

/// Provider registry for plugin-based DNS provider creation
///
/// Maps provider type names to factory objects. Registration happens once
/// during startup, before any provider is built.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered DNS provider factories
    providers: HashMap<String, Box<dyn DnsProviderFactory>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a DNS provider factory
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use ddns_core::registry::ProviderRegistry;
    /// # use ddns_core::traits::DnsProviderFactory;
    /// # struct MyFactory;
    /// # impl DnsProviderFactory for MyFactory {
    /// #     fn create(&self, config: &ddns_core::config::ProviderConfig) -> ddns_core::Result<Box<dyn ddns_core::DnsProvider>> { unimplemented!() }
    /// # }
    /// let mut registry = ProviderRegistry::new();
    /// registry.register_provider("myprovider", Box::new(MyFactory));
    /// ```
    pub fn register_provider(
        &mut self,
        name: impl Into<String>,
        factory: Box<dyn DnsProviderFactory>,
    ) {
        self.providers.insert(name.into(), factory);
    }

    /// Create a DNS provider from configuration
    ///
    /// Fails when the type is not registered, when the factory rejects the
    /// settings, or when a configured record has a type the provider cannot
    /// manage.
    pub fn create_provider(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        let provider_type = config.type_name();

        let factory = self
            .providers
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unsupported provider type: {}", provider_type)))?;

        let provider = factory.create(config)?;

        for record in &config.records {
            if !provider.supports_record_type(record.record_type) {
                return Err(Error::unsupported_record_type(
                    provider.provider_name(),
                    record.record_type,
                ));
            }
        }

        debug!(
            "Created {} provider with {} record(s)",
            provider_type,
            config.records.len()
        );
        Ok(provider)
    }

    /// Build every configured provider, failing on the first invalid one
    pub fn build_all(&self, configs: &[ProviderConfig]) -> Result<Vec<ProviderEntry>> {
        configs
            .iter()
            .map(|config| {
                let provider = self.create_provider(config)?;
                Ok(ProviderEntry::new(provider, config.records.clone()))
            })
            .collect()
    }

    /// List all registered provider types
    pub fn list_providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }
}
