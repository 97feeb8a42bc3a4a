//! Accrual engine: periodic extrapolation and authoritative resync.
//!
//! Two background tasks share one state struct:
//!
//! - a fast **tick** (default 100 ms) that projects the balance forward
//!   locally and never touches the network, and
//! - a slow **reconcile** (default 2 s) that collects running earnings from
//!   the economy service and re-anchors the balance to the response.
//!
//! Decoupling the two gives a smooth display without hammering the backend;
//! freezing ticks on a failed reconcile bounds worst-case divergence to one
//! reconcile interval of projected income.
//!
//! Cancellation is two-layered: [`AccrualEngine::stop`] aborts both task
//! handles, and every state application is guarded by a generation counter so
//! a task or in-flight reconcile from a previous `start` can never write into
//! a restarted engine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use mogul_economy::{EconomyClient, EconomyError, PlayerStats};

use crate::state::{AccrualState, BalanceSnapshot};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Scheduling intervals for the two periodic tasks.
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    /// Local extrapolation step. Each tick credits exactly this much elapsed
    /// time at the last known rate.
    pub tick_interval: Duration,
    /// Authoritative resync cadence. Also the retry cadence after a failed
    /// reconcile: there is no backoff, the next scheduled tick is the retry.
    pub reconcile_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            reconcile_interval: Duration::from_millis(2000),
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Messages broadcast to engine observers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// The displayed balance moved (one event per applied tick).
    Balance { displayed_cash: Decimal },
    /// A reconcile succeeded and the balance re-anchored.
    Synced {
        cash: Decimal,
        income_per_hour: Decimal,
    },
    /// A reconcile failed; the balance rolled back and ticks are frozen
    /// until the next success.
    SyncFailed { error: String },
    /// The engine was stopped.
    Stopped,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

struct EngineCore {
    client: Arc<dyn EconomyClient>,
    state: RwLock<AccrualState>,
    bus: broadcast::Sender<EngineEvent>,
    /// Bumped by every `start` and `stop`. A task or reconcile result whose
    /// generation no longer matches must not touch the state.
    generation: AtomicU64,
    config: EngineConfig,
}

/// Owns the ticking/reconciliation state machine.
///
/// One engine instance exclusively owns its [`AccrualState`]; observers get
/// read-only [`BalanceSnapshot`]s and bus events, never the state itself.
pub struct AccrualEngine {
    core: Arc<EngineCore>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl AccrualEngine {
    pub fn new(client: Arc<dyn EconomyClient>, config: EngineConfig) -> Self {
        let (bus, _rx) = broadcast::channel::<EngineEvent>(1024);
        Self {
            core: Arc::new(EngineCore {
                client,
                state: RwLock::new(AccrualState::from_stats(Decimal::ZERO, Decimal::ZERO)),
                bus,
                generation: AtomicU64::new(0),
                config,
            }),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Start (or restart) the engine from a player-stats snapshot.
    ///
    /// Idempotent: any previously scheduled tasks are cancelled first, so a
    /// re-entrant call can never leave two tick timers running. One reconcile
    /// is awaited before the periodic tasks are spawned — extrapolation must
    /// never run against pre-activation numbers.
    pub async fn start(&self, initial: &PlayerStats) {
        let generation = self.core.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.cancel_tasks();

        {
            let mut st = self.core.state.write().await;
            *st = AccrualState::from_stats(initial.cash, initial.effective_income_hour);
        }
        info!(
            service = self.core.client.service_name(),
            cash = %initial.cash,
            "accrual engine starting"
        );

        reconcile_once(&self.core, generation).await;

        let mut tasks = self.lock_tasks();
        tasks.push(spawn_tick(Arc::clone(&self.core), generation));
        tasks.push(spawn_reconcile(Arc::clone(&self.core), generation));
    }

    /// Stop the engine, cancelling both periodic tasks.
    ///
    /// Safe to call repeatedly and before `start`. After this returns no
    /// scheduled callback can mutate the state: the handles are aborted and
    /// the generation bump invalidates anything already past its last await.
    pub fn stop(&self) {
        self.core.generation.fetch_add(1, Ordering::SeqCst);
        let had_tasks = self.cancel_tasks();
        if had_tasks {
            info!("accrual engine stopped");
            let _ = self.core.bus.send(EngineEvent::Stopped);
        }
    }

    /// Re-anchor the balance from freshly fetched player stats.
    ///
    /// Used after any action that changes cash outside the ticker (offline
    /// capture, purchases, prestige). Unlike a reconcile, the fetch error is
    /// returned to the caller — this runs on behalf of a user action.
    pub async fn re_anchor_from_stats(&self) -> Result<(), EconomyError> {
        let stats = self.core.client.player_stats().await?;
        let mut st = self.core.state.write().await;
        st.apply_sync_success(stats.cash, stats.effective_income_hour);
        let _ = self.core.bus.send(EngineEvent::Synced {
            cash: stats.cash,
            income_per_hour: stats.effective_income_hour,
        });
        Ok(())
    }

    /// Read-only projection of the current balance.
    pub async fn snapshot(&self) -> BalanceSnapshot {
        self.core.state.read().await.snapshot()
    }

    /// Subscribe to engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.core.bus.subscribe()
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cancel_tasks(&self) -> bool {
        let mut tasks = self.lock_tasks();
        let had_tasks = !tasks.is_empty();
        for task in tasks.drain(..) {
            task.abort();
        }
        had_tasks
    }
}

impl Drop for AccrualEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

fn spawn_tick(core: Arc<EngineCore>, generation: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let step_seconds = decimal_seconds(core.config.tick_interval);
        let mut ticker = tokio::time::interval(core.config.tick_interval);
        // An interval's first tick completes immediately; it represents no
        // elapsed time and must not credit anything.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if core.generation.load(Ordering::SeqCst) != generation {
                break;
            }
            let mut st = core.state.write().await;
            if st.apply_tick(step_seconds) {
                let _ = core.bus.send(EngineEvent::Balance {
                    displayed_cash: st.displayed_cash(),
                });
            }
        }
    })
}

fn spawn_reconcile(core: Arc<EngineCore>, generation: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(core.config.reconcile_interval);
        // `start` already reconciled once; skip the interval's immediate tick.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if core.generation.load(Ordering::SeqCst) != generation {
                break;
            }
            reconcile_once(&core, generation).await;
        }
    })
}

/// One authoritative sync round-trip.
///
/// The network call runs outside the state lock; the application of its
/// result is a single write-lock block, so a tick observes either the whole
/// update or none of it.
async fn reconcile_once(core: &EngineCore, generation: u64) {
    {
        let mut st = core.state.write().await;
        st.begin_sync();
    }

    let result = core.client.collect_earnings().await;

    let mut st = core.state.write().await;
    if core.generation.load(Ordering::SeqCst) != generation {
        // The engine was stopped or restarted while this call was in
        // flight; its result no longer describes this state.
        return;
    }
    st.end_sync();
    match result {
        Ok(collection) => {
            st.apply_sync_success(collection.new_cash, collection.income_per_hour);
            let _ = core.bus.send(EngineEvent::Synced {
                cash: collection.new_cash,
                income_per_hour: collection.income_per_hour,
            });
        }
        Err(e) => {
            warn!(error = %e, "reconcile failed; balance rolled back until next sync");
            st.apply_sync_failure();
            let _ = core.bus.send(EngineEvent::SyncFailed {
                error: e.to_string(),
            });
        }
    }
}

fn decimal_seconds(interval: Duration) -> Decimal {
    Decimal::new(interval.as_millis() as i64, 3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_config_matches_shipped_cadence() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.tick_interval, Duration::from_millis(100));
        assert_eq!(cfg.reconcile_interval, Duration::from_millis(2000));
    }

    #[test]
    fn decimal_seconds_is_exact_for_millisecond_intervals() {
        assert_eq!(decimal_seconds(Duration::from_millis(100)), dec!(0.1));
        assert_eq!(decimal_seconds(Duration::from_millis(2000)), dec!(2));
        assert_eq!(decimal_seconds(Duration::from_millis(16)), dec!(0.016));
    }

    #[test]
    fn engine_events_serialize_with_stable_tags() {
        let json = serde_json::to_string(&EngineEvent::SyncFailed {
            error: "transport error: offline".to_string(),
        })
        .unwrap();
        assert!(json.contains(r#""type":"sync_failed""#));
    }
}
