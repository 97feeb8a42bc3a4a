//! Deterministic in-memory "paper" economy adapter.
//!
//! Design decisions (kept intentionally simple/deterministic):
//! - No clock and no randomness: the server-side passage of time is modeled
//!   by explicit [`PaperEconomy::accrue`] calls from the test or demo driver.
//! - Failure injection is counted, not probabilistic: `fail_next_*` arms the
//!   next N calls of one operation to return an application error.
//! - Offline capture drains the pending pot; a second capture collects zero
//!   until `set_offline` arms it again, matching the live service.
//!
//! This crate exists so the accrual engine's scenario tests and the CLI demo
//! run fully in-process with exact, reproducible numbers.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use mogul_economy::{
    EarningsCollection, EconomyClient, EconomyError, OfflineCollection, OfflineStatus, PlayerStats,
};

#[derive(Debug)]
struct Inner {
    cash: Decimal,
    income_per_hour: Decimal,
    /// Earnings accrued server-side since the last collect.
    accrued: Decimal,
    /// Seconds reported as credited by the next collect.
    elapsed_seconds: i64,

    pending_offline: Decimal,
    offline_elapsed_hours: f64,
    offline_capped: bool,
    offline_cap_hours: f64,
    last_collection_at: DateTime<Utc>,

    fail_next_collects: u32,
    fail_next_offline_statuses: u32,
    fail_next_offline_collects: u32,
    fail_next_stats: u32,

    collect_calls: u64,
    stats_calls: u64,
}

/// Deterministic [`EconomyClient`] for tests and local demos.
///
/// Cloning shares the underlying account, so a test can hold one handle for
/// setup/assertions while the engine holds another.
#[derive(Clone, Debug)]
pub struct PaperEconomy {
    inner: Arc<Mutex<Inner>>,
}

impl Default for PaperEconomy {
    fn default() -> Self {
        Self::new()
    }
}

impl PaperEconomy {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                cash: Decimal::ZERO,
                income_per_hour: Decimal::ZERO,
                accrued: Decimal::ZERO,
                elapsed_seconds: 0,
                pending_offline: Decimal::ZERO,
                offline_elapsed_hours: 0.0,
                offline_capped: false,
                offline_cap_hours: 2.0,
                last_collection_at: DateTime::UNIX_EPOCH,
                fail_next_collects: 0,
                fail_next_offline_statuses: 0,
                fail_next_offline_collects: 0,
                fail_next_stats: 0,
                collect_calls: 0,
                stats_calls: 0,
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panicking test; propagating the panic is
        // the correct behavior for a test double.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    // -- setup ------------------------------------------------------------

    pub fn set_cash(&self, cash: Decimal) {
        self.lock().cash = cash;
    }

    pub fn set_income_per_hour(&self, rate: Decimal) {
        self.lock().income_per_hour = rate;
    }

    pub fn set_elapsed_seconds(&self, secs: i64) {
        self.lock().elapsed_seconds = secs;
    }

    /// Model server-side earning: the amount lands in the uncollected pot
    /// and is credited by the next `collect_earnings`.
    pub fn accrue(&self, amount: Decimal) {
        self.lock().accrued += amount;
    }

    /// Arm the offline pot exactly as the live service would report it.
    pub fn set_offline(&self, pending: Decimal, elapsed_hours: f64, capped: bool, cap_hours: f64) {
        let mut inner = self.lock();
        inner.pending_offline = pending;
        inner.offline_elapsed_hours = elapsed_hours;
        inner.offline_capped = capped;
        inner.offline_cap_hours = cap_hours;
    }

    pub fn set_last_collection_at(&self, at: DateTime<Utc>) {
        self.lock().last_collection_at = at;
    }

    // -- failure injection ------------------------------------------------

    pub fn fail_next_collects(&self, n: u32) {
        self.lock().fail_next_collects = n;
    }

    pub fn fail_next_offline_statuses(&self, n: u32) {
        self.lock().fail_next_offline_statuses = n;
    }

    pub fn fail_next_offline_collects(&self, n: u32) {
        self.lock().fail_next_offline_collects = n;
    }

    pub fn fail_next_stats(&self, n: u32) {
        self.lock().fail_next_stats = n;
    }

    // -- observation ------------------------------------------------------

    pub fn cash(&self) -> Decimal {
        self.lock().cash
    }

    /// Number of `collect_earnings` calls served (including injected
    /// failures). Lets tests assert the reconcile cadence.
    pub fn collect_calls(&self) -> u64 {
        self.lock().collect_calls
    }

    pub fn stats_calls(&self) -> u64 {
        self.lock().stats_calls
    }

    fn injected(op: &str) -> EconomyError {
        EconomyError::Api {
            code: None,
            message: format!("injected {op} failure"),
        }
    }
}

#[async_trait::async_trait]
impl EconomyClient for PaperEconomy {
    fn service_name(&self) -> &'static str {
        "paper"
    }

    async fn collect_earnings(&self) -> Result<EarningsCollection, EconomyError> {
        let mut inner = self.lock();
        inner.collect_calls += 1;
        if inner.fail_next_collects > 0 {
            inner.fail_next_collects -= 1;
            return Err(Self::injected("collect"));
        }
        let collected = inner.accrued;
        inner.accrued = Decimal::ZERO;
        inner.cash += collected;
        Ok(EarningsCollection {
            collected,
            new_cash: inner.cash,
            elapsed_seconds: inner.elapsed_seconds,
            income_per_hour: inner.income_per_hour,
        })
    }

    async fn offline_status(&self) -> Result<OfflineStatus, EconomyError> {
        let mut inner = self.lock();
        if inner.fail_next_offline_statuses > 0 {
            inner.fail_next_offline_statuses -= 1;
            return Err(Self::injected("offline status"));
        }
        Ok(OfflineStatus {
            pending_earnings: inner.pending_offline,
            elapsed_hours: inner.offline_elapsed_hours,
            capped: inner.offline_capped,
            cap_hours: inner.offline_cap_hours,
            managed_income_per_hour: inner.income_per_hour,
            last_collection_at: inner.last_collection_at,
        })
    }

    async fn collect_offline(&self) -> Result<OfflineCollection, EconomyError> {
        let mut inner = self.lock();
        if inner.fail_next_offline_collects > 0 {
            inner.fail_next_offline_collects -= 1;
            return Err(Self::injected("offline collect"));
        }
        let collected = inner.pending_offline;
        let hours = inner.offline_elapsed_hours.min(inner.offline_cap_hours);
        let capped = inner.offline_capped;
        inner.cash += collected;
        inner.pending_offline = Decimal::ZERO;
        inner.offline_elapsed_hours = 0.0;
        inner.offline_capped = false;
        Ok(OfflineCollection {
            collected,
            hours,
            capped,
            income_per_hour: inner.income_per_hour,
        })
    }

    async fn player_stats(&self) -> Result<PlayerStats, EconomyError> {
        let mut inner = self.lock();
        inner.stats_calls += 1;
        if inner.fail_next_stats > 0 {
            inner.fail_next_stats -= 1;
            return Err(Self::injected("stats"));
        }
        Ok(PlayerStats {
            cash: inner.cash,
            effective_income_hour: inner.income_per_hour,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn collect_drains_the_accrued_pot_exactly_once() {
        let econ = PaperEconomy::new();
        econ.set_cash(dec!(100));
        econ.accrue(dec!(12.5));

        let first = econ.collect_earnings().await.unwrap();
        assert_eq!(first.collected, dec!(12.5));
        assert_eq!(first.new_cash, dec!(112.5));

        let second = econ.collect_earnings().await.unwrap();
        assert_eq!(second.collected, dec!(0));
        assert_eq!(second.new_cash, dec!(112.5));
    }

    #[tokio::test]
    async fn offline_capture_is_one_shot() {
        let econ = PaperEconomy::new();
        econ.set_cash(dec!(10));
        econ.set_offline(dec!(50), 1.0, true, 8.0);

        let first = econ.collect_offline().await.unwrap();
        assert_eq!(first.collected, dec!(50));
        assert!(first.capped);
        assert_eq!(econ.cash(), dec!(60));

        let second = econ.collect_offline().await.unwrap();
        assert_eq!(second.collected, dec!(0));
        assert!(!second.capped);
    }

    #[tokio::test]
    async fn failure_injection_is_counted_not_sticky() {
        let econ = PaperEconomy::new();
        econ.accrue(dec!(5));
        econ.fail_next_collects(2);

        assert!(econ.collect_earnings().await.is_err());
        assert!(econ.collect_earnings().await.is_err());
        let ok = econ.collect_earnings().await.unwrap();
        assert_eq!(ok.collected, dec!(5));
        assert_eq!(econ.collect_calls(), 3);
    }

    #[tokio::test]
    async fn clones_share_one_account() {
        let econ = PaperEconomy::new();
        let handle = econ.clone();
        handle.set_cash(dec!(77));
        assert_eq!(econ.player_stats().await.unwrap().cash, dec!(77));
    }
}
