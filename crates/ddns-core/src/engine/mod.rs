//! Update orchestrator
//!
//! The DdnsEngine is responsible for:
//! - Tracking outbound connectivity via a ConnectivityProbe
//! - Resolving the current public addresses via an AddressResolver
//! - Detecting no-op cycles against the last applied addresses
//! - Reconciling every configured (provider, record) pair
//!
//! ## State machine
//!
//! ```text
//!                 probe succeeds: full pass, reset update timer
//!          ┌────────────────────────────────────────────────────┐
//!          │                                                    ▼
//! ┌────────────────┐                                   ┌────────────────┐
//! │  Disconnected  │                                   │   Connected    │
//! └────────────────┘                                   └────────────────┘
//!          ▲                                                    │
//!          └────────────────────────────────────────────────────┘
//!                      probe fails: log only
//! ```
//!
//! ## Event loop
//!
//! One task multiplexes three wakeup sources with `tokio::select!`:
//!
//! 1. Update timer: resolve; reconcile if the addresses changed. The timer
//!    is re-armed to a full interval after every firing.
//! 2. Connectivity timer: re-probe; a Disconnected → Connected edge runs an
//!    unconditional pass and re-arms the update timer.
//! 3. Shutdown signal: exit the loop.
//!
//! A reconciliation pass runs to completion before the loop waits again, so
//! passes never overlap and shutdown takes effect between iterations.

use crate::config::{GeneralSettings, RecordConfig, RecordType};
use crate::error::{Error, Result};
use crate::reconcile::reconcile;
use crate::traits::{
    AddressResolver, ConnectivityProbe, DnsProvider, DnsRecord, ResolvedAddress, UpdateResult,
};
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, error, info, warn};

/// Capacity of the engine event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Outbound connectivity as last observed by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Connected,
    Disconnected,
}

/// What caused a reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTrigger {
    /// First pass after the daemon started with connectivity
    Startup,
    /// Connectivity came back after an outage
    Reconnected,
    /// Update timer observed a different address
    AddressChanged,
    /// Single pass requested by the caller
    RunOnce,
}

/// Events emitted by the DdnsEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started {
        providers_count: usize,
        records_count: usize,
    },

    /// Connectivity state transition
    ConnectivityChanged { connected: bool },

    /// Reconciliation pass started
    PassStarted { trigger: PassTrigger },

    /// One record reconciled successfully
    RecordReconciled {
        provider: String,
        record_name: String,
        outcome: UpdateResult,
    },

    /// Record skipped because its address family did not resolve
    RecordSkipped {
        provider: String,
        record_name: String,
        record_type: RecordType,
    },

    /// Reconciling one record failed
    RecordFailed {
        provider: String,
        record_name: String,
        error: String,
    },

    /// Reconciliation pass finished
    PassCompleted {
        trigger: PassTrigger,
        report: PassReport,
    },

    /// Engine stopped
    Stopped,
}

/// Summary of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Records that reached the desired state (including no-op)
    pub reconciled: usize,
    /// Records for which a write was issued
    pub changed: usize,
    /// Records skipped for lack of an address of their family
    pub skipped: usize,
    /// Records whose reconciliation failed
    pub failed: usize,
}

/// A provider together with the records it manages
pub struct ProviderEntry {
    pub provider: Box<dyn DnsProvider>,
    pub records: Vec<RecordConfig>,
}

impl ProviderEntry {
    pub fn new(provider: Box<dyn DnsProvider>, records: Vec<RecordConfig>) -> Self {
        Self { provider, records }
    }
}

/// Core DDNS engine
///
/// Owns the connectivity state and the last applied addresses; both reset
/// to their conservative defaults (Disconnected, unknown) on construction,
/// so a fresh engine always runs one unconditional pass once connected.
///
/// ## Lifecycle
///
/// 1. Create with [`DdnsEngine::new()`]
/// 2. Either call [`DdnsEngine::run_once()`] for a single pass, or
///    [`DdnsEngine::run_with_shutdown()`] to enter the daemon loop
/// 3. The loop returns when the shutdown future resolves
pub struct DdnsEngine {
    /// Public address resolver
    resolver: Box<dyn AddressResolver>,

    /// Connectivity probe
    probe: Box<dyn ConnectivityProbe>,

    /// Providers and their desired records
    providers: Vec<ProviderEntry>,

    /// Period of the update timer
    update_interval: Duration,

    /// Period of the connectivity timer
    connectivity_check_interval: Duration,

    /// Connectivity as of the last probe
    state: ConnectivityState,

    /// Addresses applied by the most recent pass (`None` = unknown)
    last_applied: Option<ResolvedAddress>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl DdnsEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        resolver: Box<dyn AddressResolver>,
        probe: Box<dyn ConnectivityProbe>,
        providers: Vec<ProviderEntry>,
        settings: &GeneralSettings,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        let update_interval = settings.update_interval();
        let connectivity_check_interval = settings.connectivity_check_interval();

        if update_interval.is_zero() || connectivity_check_interval.is_zero() {
            return Err(Error::config("Timer intervals must be greater than zero"));
        }

        let (tx, rx) = mpsc::channel(DEFAULT_EVENT_CHANNEL_CAPACITY);

        let engine = Self {
            resolver,
            probe,
            providers,
            update_interval,
            connectivity_check_interval,
            state: ConnectivityState::Disconnected,
            last_applied: None,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    pub fn connectivity_state(&self) -> ConnectivityState {
        self.state
    }

    pub fn last_applied(&self) -> Option<ResolvedAddress> {
        self.last_applied
    }

    /// Run the daemon loop until `shutdown` resolves
    ///
    /// Performs the startup probe (and pass, if connected) first, then
    /// multiplexes the two timers and the shutdown signal.
    pub async fn run_with_shutdown<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        self.startup().await;

        let update_timer = tokio::time::sleep(self.update_interval);
        tokio::pin!(update_timer);

        let mut connectivity_timer = tokio::time::interval_at(
            Instant::now() + self.connectivity_check_interval,
            self.connectivity_check_interval,
        );
        connectivity_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut connectivity_ticks = IntervalStream::new(connectivity_timer);

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }

                Some(_) = connectivity_ticks.next() => {
                    if self.handle_connectivity_tick().await {
                        update_timer.as_mut().reset(Instant::now() + self.update_interval);
                    }
                }

                _ = &mut update_timer => {
                    self.handle_update_tick().await;
                    update_timer.as_mut().reset(Instant::now() + self.update_interval);
                }
            }
        }

        self.emit_event(EngineEvent::Stopped);
        info!("Service stopped.");
    }

    /// Probe once and, if reachable, run the unconditional startup pass
    pub async fn startup(&mut self) {
        let records_count = self.providers.iter().map(|p| p.records.len()).sum();
        self.emit_event(EngineEvent::Started {
            providers_count: self.providers.len(),
            records_count,
        });

        if self.probe.is_reachable().await {
            self.state = ConnectivityState::Connected;
            info!("Daemon started and internet connection is available. Updating DNS records.");
            self.full_pass(PassTrigger::Startup).await;
        } else {
            self.state = ConnectivityState::Disconnected;
            warn!("Daemon started but no internet connection is available.");
        }
    }

    /// Handle a connectivity timer firing
    ///
    /// Transitions are edge-triggered. Returns `true` when a reconnect pass
    /// ran and the update timer must be re-armed to a full interval.
    pub async fn handle_connectivity_tick(&mut self) -> bool {
        let reachable = self.probe.is_reachable().await;

        match (self.state, reachable) {
            (ConnectivityState::Disconnected, true) => {
                self.state = ConnectivityState::Connected;
                self.emit_event(EngineEvent::ConnectivityChanged { connected: true });
                info!("Internet connection restored. Updating DNS records.");
                self.full_pass(PassTrigger::Reconnected).await;
                true
            }
            (ConnectivityState::Connected, false) => {
                self.state = ConnectivityState::Disconnected;
                self.emit_event(EngineEvent::ConnectivityChanged { connected: false });
                warn!("Internet connection lost.");
                false
            }
            _ => false,
        }
    }

    /// Handle the update timer firing
    ///
    /// While connected, resolves the current addresses and reconciles only
    /// if they differ from the last applied ones. While disconnected, does
    /// nothing. The caller re-arms the timer in both cases.
    pub async fn handle_update_tick(&mut self) {
        if self.state == ConnectivityState::Disconnected {
            debug!("No connectivity, skipping address check until the next interval");
            return;
        }

        let current = self.resolver.resolve().await;

        if self.last_applied == Some(current) {
            debug!("IP address has not changed. No update necessary.");
            return;
        }

        info!("IP address changed ({}). Updating DNS records.", current);
        self.reconcile_all(&current, PassTrigger::AddressChanged).await;
        self.last_applied = Some(current);
    }

    /// Resolve once and run a single pass regardless of connectivity
    pub async fn run_once(&mut self) -> PassReport {
        self.full_pass(PassTrigger::RunOnce).await
    }

    /// Resolve, reconcile unconditionally, and snapshot the addresses
    async fn full_pass(&mut self, trigger: PassTrigger) -> PassReport {
        let current = self.resolver.resolve().await;
        let report = self.reconcile_all(&current, trigger).await;
        self.last_applied = Some(current);
        report
    }

    /// Reconcile every configured (provider, record) pair
    ///
    /// Records whose address family did not resolve are skipped. Failures
    /// are logged per record and never abort the remaining work.
    pub async fn reconcile_all(
        &self,
        addresses: &ResolvedAddress,
        trigger: PassTrigger,
    ) -> PassReport {
        self.emit_event(EngineEvent::PassStarted { trigger });

        let mut report = PassReport::default();

        for entry in &self.providers {
            let provider_name = entry.provider.provider_name();

            for record_config in &entry.records {
                let content: IpAddr = match (record_config.record_type, addresses) {
                    (RecordType::A, ResolvedAddress { ipv4: Some(ip), .. }) => (*ip).into(),
                    (RecordType::Aaaa, ResolvedAddress { ipv6: Some(ip), .. }) => (*ip).into(),
                    _ => {
                        warn!(
                            "Skipping record {} of type {} due to missing IP",
                            record_config.name, record_config.record_type
                        );
                        report.skipped += 1;
                        self.emit_event(EngineEvent::RecordSkipped {
                            provider: provider_name.to_string(),
                            record_name: record_config.name.clone(),
                            record_type: record_config.record_type,
                        });
                        continue;
                    }
                };

                let record = DnsRecord::new(record_config, content);

                match reconcile(entry.provider.as_ref(), &record).await {
                    Ok(outcome) => {
                        report.reconciled += 1;
                        if outcome != UpdateResult::Unchanged {
                            report.changed += 1;
                        }
                        self.emit_event(EngineEvent::RecordReconciled {
                            provider: provider_name.to_string(),
                            record_name: record.name.clone(),
                            outcome,
                        });
                    }
                    Err(e) => {
                        report.failed += 1;
                        if e.is_retryable() {
                            error!(
                                "[{}] Error updating DNS record for {} (will retry next cycle): {}",
                                provider_name, record.name, e
                            );
                        } else {
                            error!(
                                "[{}] Error updating DNS record for {}: {}",
                                provider_name, record.name, e
                            );
                        }
                        self.emit_event(EngineEvent::RecordFailed {
                            provider: provider_name.to_string(),
                            record_name: record.name.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        info!(
            "Reconciliation pass finished: {} reconciled ({} changed), {} skipped, {} failed",
            report.reconciled, report.changed, report.skipped, report.failed
        );
        self.emit_event(EngineEvent::PassCompleted { trigger, report });

        report
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        // A full channel means nobody is draining events; drop rather than block the loop
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event");
        }
    }
}
