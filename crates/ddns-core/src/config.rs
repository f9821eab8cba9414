//! Configuration types for the DDNS system
//!
//! The configuration is loaded once at startup and treated as read-only
//! input afterwards; it is never hot-reloaded.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 300;
const DEFAULT_CONNECTIVITY_CHECK_INTERVAL_SECS: u64 = 10;
const DEFAULT_CONNECTIVITY_CHECK_IP: &str = "8.8.8.8";
const DEFAULT_CONNECTIVITY_CHECK_PORT: &str = "53";

/// Main DDNS configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Timer and connectivity settings
    #[serde(default)]
    pub general: GeneralSettings,

    /// Configured DNS providers, each with its own records
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl DdnsConfig {
    /// Parse a TOML document and apply defaults
    pub fn from_toml_str(content: &str) -> Result<Self, crate::Error> {
        let mut config: DdnsConfig = toml::from_str(content)
            .map_err(|e| crate::Error::config(format!("invalid configuration file: {e}")))?;
        config.general.apply_defaults();
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::config(format!("cannot read {}: {}", path.display(), e))
        })?;

        let config = Self::from_toml_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the structural parts of the configuration
    ///
    /// Provider-specific settings are validated by each provider factory
    /// when the provider is built.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.providers.is_empty() {
            return Err(crate::Error::config("No providers configured"));
        }

        for provider in &self.providers {
            provider.validate()?;
        }

        if self.general.connectivity_check_interval > self.general.update_interval {
            tracing::warn!(
                "connectivity_check_interval ({}s) is longer than update_interval ({}s)",
                self.general.connectivity_check_interval,
                self.general.update_interval
            );
        }

        Ok(())
    }
}

/// General daemon settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSettings {
    /// Seconds between address-change checks
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,

    /// Seconds between connectivity probes
    #[serde(default = "default_connectivity_check_interval")]
    pub connectivity_check_interval: u64,

    /// Host probed for outbound connectivity
    #[serde(default = "default_connectivity_check_ip")]
    pub connectivity_check_ip: String,

    /// Port probed for outbound connectivity
    #[serde(default = "default_connectivity_check_port")]
    pub connectivity_check_port: String,
}

impl GeneralSettings {
    /// Replace zero or empty values with their defaults
    pub fn apply_defaults(&mut self) {
        if self.update_interval == 0 {
            self.update_interval = DEFAULT_UPDATE_INTERVAL_SECS;
        }
        if self.connectivity_check_interval == 0 {
            self.connectivity_check_interval = DEFAULT_CONNECTIVITY_CHECK_INTERVAL_SECS;
        }
        if self.connectivity_check_ip.trim().is_empty() {
            self.connectivity_check_ip = DEFAULT_CONNECTIVITY_CHECK_IP.to_string();
        }
        if self.connectivity_check_port.trim().is_empty() {
            self.connectivity_check_port = DEFAULT_CONNECTIVITY_CHECK_PORT.to_string();
        }
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval)
    }

    pub fn connectivity_check_interval(&self) -> Duration {
        Duration::from_secs(self.connectivity_check_interval)
    }
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            update_interval: default_update_interval(),
            connectivity_check_interval: default_connectivity_check_interval(),
            connectivity_check_ip: default_connectivity_check_ip(),
            connectivity_check_port: default_connectivity_check_port(),
        }
    }
}

/// One configured provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider type name (e.g., "cloudflare", "route53")
    #[serde(rename = "type")]
    pub provider_type: String,

    /// Provider-specific settings
    #[serde(default)]
    pub settings: HashMap<String, serde_json::Value>,

    /// Records managed through this provider
    #[serde(default)]
    pub records: Vec<RecordConfig>,
}

impl ProviderConfig {
    /// Create a provider configuration without settings or records
    pub fn new(provider_type: impl Into<String>) -> Self {
        Self {
            provider_type: provider_type.into(),
            settings: HashMap::new(),
            records: Vec::new(),
        }
    }

    /// Add a string setting
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings
            .insert(key.into(), serde_json::Value::String(value.into()));
        self
    }

    /// Add a record
    pub fn with_record(mut self, record: RecordConfig) -> Self {
        self.records.push(record);
        self
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        &self.provider_type
    }

    /// Look up a non-empty string setting
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Look up a string setting that must be present
    pub fn required_setting(&self, key: &str) -> Result<&str, crate::Error> {
        self.setting(key).ok_or_else(|| {
            crate::Error::config(format!(
                "{} provider requires setting '{}'",
                self.provider_type, key
            ))
        })
    }

    fn validate(&self) -> Result<(), crate::Error> {
        if self.provider_type.is_empty() {
            return Err(crate::Error::config("Provider type cannot be empty"));
        }

        for record in &self.records {
            if record.name.trim().is_empty() {
                return Err(crate::Error::config(format!(
                    "{} provider has a record with an empty name",
                    self.provider_type
                )));
            }
        }

        Ok(())
    }
}

/// DNS record configuration (the desired state of one record)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordConfig {
    /// DNS record name (e.g., "example.com" or "home.example.com")
    pub name: String,

    /// Address record type
    #[serde(rename = "type")]
    pub record_type: RecordType,

    /// Time-to-live in seconds
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Whether the record is proxied (Cloudflare only)
    #[serde(default)]
    pub proxied: bool,

    /// Per-record update token (FreeDNS)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_token: Option<String>,
}

impl RecordConfig {
    /// Create a new record configuration
    pub fn new(name: impl Into<String>, record_type: RecordType) -> Self {
        Self {
            name: name.into(),
            record_type,
            ttl: default_ttl(),
            proxied: false,
            update_token: None,
        }
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_proxied(mut self, proxied: bool) -> Self {
        self.proxied = proxied;
        self
    }

    pub fn with_update_token(mut self, token: impl Into<String>) -> Self {
        self.update_token = Some(token.into());
        self
    }
}

/// DNS record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    A,
    /// AAAA record (IPv6)
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL_SECS
}

fn default_connectivity_check_interval() -> u64 {
    DEFAULT_CONNECTIVITY_CHECK_INTERVAL_SECS
}

fn default_connectivity_check_ip() -> String {
    DEFAULT_CONNECTIVITY_CHECK_IP.to_string()
}

fn default_connectivity_check_port() -> String {
    DEFAULT_CONNECTIVITY_CHECK_PORT.to_string()
}

fn default_ttl() -> u32 {
    300
}
