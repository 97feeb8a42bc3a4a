//! Scenario: a failed reconcile rolls back and freezes the display.
//!
//! # Invariants under test
//!
//! 1. After a reconcile failure the displayed balance equals the last synced
//!    balance **exactly**, not approximately.
//! 2. Every tick while desynced is a no-op: a prolonged outage pauses the
//!    display instead of inventing money.
//! 3. The next scheduled reconcile is the retry; on success the balance
//!    re-anchors and ticks resume at the surviving rate.
//! 4. A `SyncFailed` event is published for the UI's paused badge.
//!
//! Intervals are 100 ms ticks / 550 ms reconciles so the two task deadlines
//! never coincide; tokio time is paused for determinism.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;

use mogul_accrual::engine::{AccrualEngine, EngineConfig, EngineEvent};
use mogul_economy::{EconomyClient, PlayerStats};
use mogul_economy_paper::PaperEconomy;

#[tokio::test(start_paused = true)]
async fn failed_reconcile_rolls_back_then_recovers_on_next_success() {
    let econ = PaperEconomy::new();
    econ.set_cash(dec!(100));
    econ.set_income_per_hour(dec!(3600));

    let client: Arc<dyn EconomyClient> = Arc::new(econ.clone());
    let engine = AccrualEngine::new(
        client,
        EngineConfig {
            tick_interval: Duration::from_millis(100),
            reconcile_interval: Duration::from_millis(550),
        },
    );
    let mut events = engine.subscribe();

    engine.start(&PlayerStats {
        cash: dec!(100),
        effective_income_hour: dec!(3600),
    })
    .await;

    // Let the first periodic reconcile (t=550) pass cleanly, then arm a
    // failure for the one at t=1100.
    tokio::time::sleep(Duration::from_millis(820)).await;
    econ.fail_next_collects(1);

    // t=1320: the failed reconcile at t=1100 has rolled the balance back.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let snap = engine.snapshot().await;
    assert!(snap.sync_failed, "engine must report the failed sync");
    assert_eq!(
        snap.displayed_cash, snap.last_synced_cash,
        "rollback must be exact"
    );
    assert_eq!(snap.displayed_cash, dec!(100));

    // t=1620: three more tick deadlines have passed; all must be no-ops.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let frozen = engine.snapshot().await;
    assert_eq!(
        frozen.displayed_cash,
        dec!(100),
        "ticks must not move a desynced balance"
    );
    // The rate survives the outage for when syncing resumes.
    assert_eq!(frozen.income_per_second, dec!(1));

    // The service comes back with a credit; the reconcile at t=1650 is the
    // retry (fixed cadence, no backoff).
    econ.accrue(dec!(7.5));
    tokio::time::sleep(Duration::from_millis(560)).await;

    // t=2180: anchored at 107.5 by t=1650, plus ticks at 1700..2100.
    let recovered = engine.snapshot().await;
    assert!(!recovered.sync_failed, "a successful sync clears the failure");
    assert_eq!(recovered.last_synced_cash, dec!(107.5));
    assert_eq!(
        recovered.displayed_cash,
        dec!(108.0),
        "five ticks at 1.0/s resume on top of the fresh anchor"
    );

    let saw_failure = std::iter::from_fn(|| events.try_recv().ok())
        .any(|e| matches!(e, EngineEvent::SyncFailed { .. }));
    assert!(saw_failure, "a SyncFailed event must reach observers");
}

#[tokio::test(start_paused = true)]
async fn outage_divergence_is_bounded_by_one_interval() {
    // Even if every reconcile fails from the start, the display never gets
    // further than one reconcile interval of projected income from truth.
    let econ = PaperEconomy::new();
    econ.set_cash(dec!(100));
    econ.set_income_per_hour(dec!(3600));
    econ.fail_next_collects(100);

    let client: Arc<dyn EconomyClient> = Arc::new(econ.clone());
    let engine = AccrualEngine::new(
        client,
        EngineConfig {
            tick_interval: Duration::from_millis(100),
            reconcile_interval: Duration::from_millis(550),
        },
    );

    engine.start(&PlayerStats {
        cash: dec!(100),
        effective_income_hour: dec!(3600),
    })
    .await;

    // The initial awaited reconcile already failed: ticks never start.
    tokio::time::sleep(Duration::from_secs(10)).await;
    let snap = engine.snapshot().await;
    assert!(snap.sync_failed);
    assert_eq!(snap.displayed_cash, dec!(100));
    assert_eq!(snap.last_synced_cash, dec!(100));
}
