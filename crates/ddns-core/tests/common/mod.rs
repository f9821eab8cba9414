//! Test doubles and common utilities for orchestrator contract tests
//!
//! Every fake is cheaply cloneable: clones share counters and state, so a
//! test keeps one clone for assertions and boxes another into the engine.

#![allow(dead_code)]

use ddns_core::config::{GeneralSettings, RecordConfig, RecordType};
use ddns_core::engine::{DdnsEngine, EngineEvent, ProviderEntry};
use ddns_core::error::{Error, Result};
use ddns_core::traits::{
    AddressResolver, ConnectivityProbe, DnsProvider, DnsRecord, LiveRecord,
};
use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Resolver returning whatever addresses the test configured
#[derive(Clone, Default)]
pub struct FakeResolver {
    ipv4: Arc<Mutex<Option<Ipv4Addr>>>,
    ipv6: Arc<Mutex<Option<Ipv6Addr>>>,
    resolve_calls: Arc<AtomicUsize>,
}

impl FakeResolver {
    pub fn new(ipv4: Option<Ipv4Addr>, ipv6: Option<Ipv6Addr>) -> Self {
        let resolver = Self::default();
        resolver.set(ipv4, ipv6);
        resolver
    }

    pub fn set(&self, ipv4: Option<Ipv4Addr>, ipv6: Option<Ipv6Addr>) {
        *self.ipv4.lock().unwrap() = ipv4;
        *self.ipv6.lock().unwrap() = ipv6;
    }

    /// Number of IPv4 resolutions performed (one per cycle)
    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AddressResolver for FakeResolver {
    async fn resolve_ipv4(&self) -> Result<Ipv4Addr> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.ipv4
            .lock()
            .unwrap()
            .ok_or_else(|| Error::resolution_failed("no IPv4 source answered"))
    }

    async fn resolve_ipv6(&self) -> Result<Ipv6Addr> {
        self.ipv6
            .lock()
            .unwrap()
            .ok_or_else(|| Error::resolution_failed("no IPv6 source answered"))
    }
}

/// Probe whose answer the test flips at will
#[derive(Clone, Default)]
pub struct FakeProbe {
    reachable: Arc<AtomicBool>,
    probe_calls: Arc<AtomicUsize>,
}

impl FakeProbe {
    pub fn new(reachable: bool) -> Self {
        let probe = Self::default();
        probe.set_reachable(reachable);
        probe
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ConnectivityProbe for FakeProbe {
    async fn is_reachable(&self) -> bool {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.reachable.load(Ordering::SeqCst)
    }
}

/// Provider keeping its "live" records in memory
#[derive(Clone)]
pub struct MemoryProvider {
    pub name: &'static str,
    live: Arc<Mutex<HashMap<(String, RecordType), LiveRecord>>>,
    fetch_calls: Arc<AtomicUsize>,
    write_calls: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            live: Arc::new(Mutex::new(HashMap::new())),
            fetch_calls: Arc::new(AtomicUsize::new(0)),
            write_calls: Arc::new(AtomicUsize::new(0)),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A provider whose every write fails with a transient error
    pub fn failing(name: &'static str) -> Self {
        let provider = Self::new(name);
        provider.fail_writes.store(true, Ordering::SeqCst);
        provider
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    /// Total API calls (reads and writes)
    pub fn calls(&self) -> usize {
        self.fetch_calls() + self.write_calls()
    }

    pub fn live_content(&self, name: &str, record_type: RecordType) -> Option<String> {
        self.live
            .lock()
            .unwrap()
            .get(&(name.to_string(), record_type))
            .map(|r| r.content.clone())
    }
}

#[async_trait::async_trait]
impl DnsProvider for MemoryProvider {
    async fn fetch_record(&self, record: &DnsRecord) -> Result<Option<LiveRecord>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .live
            .lock()
            .unwrap()
            .get(&(record.name.clone(), record.record_type))
            .cloned())
    }

    async fn write_record(&self, record: &DnsRecord, _existing: Option<&LiveRecord>) -> Result<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::transient(format!("{}: 503 Service Unavailable", self.name)));
        }

        self.live.lock().unwrap().insert(
            (record.name.clone(), record.record_type),
            LiveRecord {
                id: Some(format!("{}-{}", self.name, record.name)),
                content: record.content.to_string(),
                ttl: record.ttl,
                proxied: Some(record.proxied),
            },
        );
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }
}

pub const IPV4: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 5);
pub const IPV4_NEW: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 77);
pub const IPV6: Ipv6Addr = Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0x5);

/// Records for one host name in both families
pub fn dual_stack_records(name: &str) -> Vec<RecordConfig> {
    vec![
        RecordConfig::new(name, RecordType::A),
        RecordConfig::new(name, RecordType::Aaaa),
    ]
}

/// Settings with short timers for virtual-time tests
pub fn settings(update_secs: u64, connectivity_secs: u64) -> GeneralSettings {
    GeneralSettings {
        update_interval: update_secs,
        connectivity_check_interval: connectivity_secs,
        ..GeneralSettings::default()
    }
}

/// Build an engine over the given fakes
pub fn engine(
    resolver: &FakeResolver,
    probe: &FakeProbe,
    providers: Vec<(MemoryProvider, Vec<RecordConfig>)>,
    settings: &GeneralSettings,
) -> (DdnsEngine, mpsc::Receiver<EngineEvent>) {
    let entries = providers
        .into_iter()
        .map(|(provider, records)| ProviderEntry::new(Box::new(provider), records))
        .collect();

    DdnsEngine::new(
        Box::new(resolver.clone()),
        Box::new(probe.clone()),
        entries,
        settings,
    )
    .expect("engine construction succeeds")
}

/// Collect every event currently buffered
pub fn drain_events(rx: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Number of completed reconciliation passes among the events
pub fn passes(events: &[EngineEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, EngineEvent::PassCompleted { .. }))
        .count()
}
