//! Contract Test: No-op Detection and Idempotent Writes
//!
//! Constraints verified:
//! - An update tick with unchanged addresses makes zero provider calls
//! - An update tick with a changed address reconciles every record
//! - A record already matching the desired state is read but never written
//! - Writes converge: a second pass over the same addresses writes nothing

mod common;

use common::*;
use ddns_core::config::{RecordConfig, RecordType};
use ddns_core::engine::{EngineEvent, PassTrigger};
use ddns_core::traits::UpdateResult;
use std::time::Duration;

#[tokio::test]
async fn unchanged_address_makes_no_provider_calls() {
    let resolver = FakeResolver::new(Some(IPV4), Some(IPV6));
    let probe = FakeProbe::new(true);
    let provider = MemoryProvider::new("memory");

    let (mut engine, mut event_rx) = engine(
        &resolver,
        &probe,
        vec![(provider.clone(), dual_stack_records("home.example.com"))],
        &settings(300, 10),
    );

    engine.startup().await;
    drain_events(&mut event_rx);
    let calls_after_startup = provider.calls();

    for _ in 0..5 {
        engine.handle_update_tick().await;
    }

    assert_eq!(resolver.resolve_calls(), 6, "each tick still resolves");
    assert_eq!(provider.calls(), calls_after_startup, "no API traffic");
    assert!(drain_events(&mut event_rx).is_empty());
}

#[tokio::test]
async fn changed_address_reconciles_every_record() {
    let resolver = FakeResolver::new(Some(IPV4), Some(IPV6));
    let probe = FakeProbe::new(true);
    let first = MemoryProvider::new("first");
    let second = MemoryProvider::new("second");

    let (mut engine, mut event_rx) = engine(
        &resolver,
        &probe,
        vec![
            (first.clone(), dual_stack_records("home.example.com")),
            (second.clone(), vec![RecordConfig::new("vpn.example.org", RecordType::A)]),
        ],
        &settings(300, 10),
    );

    engine.startup().await;
    drain_events(&mut event_rx);

    resolver.set(Some(IPV4_NEW), Some(IPV6));
    engine.handle_update_tick().await;

    let events = drain_events(&mut event_rx);
    assert!(events.contains(&EngineEvent::PassStarted {
        trigger: PassTrigger::AddressChanged
    }));
    assert_eq!(passes(&events), 1);

    assert_eq!(
        first.live_content("home.example.com", RecordType::A),
        Some(IPV4_NEW.to_string())
    );
    assert_eq!(
        second.live_content("vpn.example.org", RecordType::A),
        Some(IPV4_NEW.to_string())
    );

    // The AAAA record is read again but already matches
    let outcomes: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::RecordReconciled { outcome, .. } => Some(outcome.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(
        outcomes.iter().filter(|o| **o == UpdateResult::Unchanged).count(),
        1
    );
}

#[tokio::test]
async fn repeated_pass_converges_without_writes() {
    let resolver = FakeResolver::new(Some(IPV4), Some(IPV6));
    let probe = FakeProbe::new(false);
    let provider = MemoryProvider::new("memory");

    let (mut engine, _rx) = engine(
        &resolver,
        &probe,
        vec![(provider.clone(), dual_stack_records("home.example.com"))],
        &settings(300, 10),
    );

    let first = engine.run_once().await;
    let second = engine.run_once().await;

    assert_eq!(first.changed, 2);
    assert_eq!(second.changed, 0);
    assert_eq!(second.reconciled, 2);
    assert_eq!(provider.write_calls(), 2);
    assert_eq!(provider.fetch_calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn address_change_is_picked_up_by_update_timer() {
    // update interval 10s: the change at t=5 is applied at t=10, and the
    // next firing at t=20 sees no further change
    let resolver = FakeResolver::new(Some(IPV4), None);
    let probe = FakeProbe::new(true);
    let provider = MemoryProvider::new("memory");

    let (mut engine, mut event_rx) = engine(
        &resolver,
        &probe,
        vec![(provider.clone(), vec![RecordConfig::new("home.example.com", RecordType::A)])],
        &settings(10, 3),
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let engine_handle = tokio::spawn(async move {
        engine
            .run_with_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    tokio::time::sleep(Duration::from_secs(5)).await;
    resolver.set(Some(IPV4_NEW), None);

    tokio::time::sleep(Duration::from_secs(6)).await; // t=11
    assert_eq!(passes(&drain_events(&mut event_rx)), 2, "startup + address change");
    assert_eq!(
        provider.live_content("home.example.com", RecordType::A),
        Some(IPV4_NEW.to_string())
    );

    tokio::time::sleep(Duration::from_secs(10)).await; // t=21
    assert_eq!(passes(&drain_events(&mut event_rx)), 0);
    assert_eq!(provider.write_calls(), 2);

    shutdown_tx.send(()).unwrap();
    engine_handle.await.unwrap();
}
