//! Contract Test: Idle Behavior
//!
//! Constraints verified:
//! - While disconnected, update ticks resolve nothing and call no provider
//! - While connected with a stable address, the loop only probes and resolves
//! - The connectivity timer keeps firing at its configured period

mod common;

use common::*;
use std::time::Duration;

#[tokio::test]
async fn disconnected_update_tick_is_inert() {
    let resolver = FakeResolver::new(Some(IPV4), Some(IPV6));
    let probe = FakeProbe::new(false);
    let provider = MemoryProvider::new("memory");

    let (mut engine, mut event_rx) = engine(
        &resolver,
        &probe,
        vec![(provider.clone(), dual_stack_records("home.example.com"))],
        &settings(300, 10),
    );

    engine.startup().await;
    drain_events(&mut event_rx);

    for _ in 0..3 {
        engine.handle_update_tick().await;
    }

    assert_eq!(resolver.resolve_calls(), 0);
    assert_eq!(provider.calls(), 0);
    assert!(drain_events(&mut event_rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn stable_connected_loop_makes_no_writes() {
    // connectivity every 10s, update every 30s, over 95s of virtual time
    let resolver = FakeResolver::new(Some(IPV4), Some(IPV6));
    let probe = FakeProbe::new(true);
    let provider = MemoryProvider::new("memory");

    let (mut engine, mut event_rx) = engine(
        &resolver,
        &probe,
        vec![(provider.clone(), dual_stack_records("home.example.com"))],
        &settings(30, 10),
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let engine_handle = tokio::spawn(async move {
        engine
            .run_with_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    tokio::time::sleep(Duration::from_secs(95)).await;

    // startup probe + ticks at 10..=90
    assert_eq!(probe.probe_calls(), 10);
    // startup pass + update ticks at 30, 60, 90
    assert_eq!(resolver.resolve_calls(), 4);
    assert_eq!(provider.write_calls(), 2, "only the startup pass wrote");
    assert_eq!(provider.fetch_calls(), 2);
    assert_eq!(passes(&drain_events(&mut event_rx)), 1);

    shutdown_tx.send(()).unwrap();
    engine_handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn outage_spanning_update_ticks_stays_quiet() {
    let resolver = FakeResolver::new(Some(IPV4), None);
    let probe = FakeProbe::new(true);
    let provider = MemoryProvider::new("memory");

    let (mut engine, mut event_rx) = engine(
        &resolver,
        &probe,
        vec![(provider.clone(), dual_stack_records("home.example.com"))],
        &settings(10, 4),
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let engine_handle = tokio::spawn(async move {
        engine
            .run_with_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    // Lost at t=1, detected at t=4; update ticks at t=10 and t=20 are inert
    tokio::time::sleep(Duration::from_secs(1)).await;
    probe.set_reachable(false);
    resolver.set(Some(IPV4_NEW), None);

    tokio::time::sleep(Duration::from_secs(22)).await; // t=23
    assert_eq!(resolver.resolve_calls(), 1, "only the startup pass resolved");
    assert_eq!(provider.write_calls(), 1);
    assert_eq!(passes(&drain_events(&mut event_rx)), 1);

    shutdown_tx.send(()).unwrap();
    engine_handle.await.unwrap();
}
