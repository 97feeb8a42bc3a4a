//! Accrual state machine.
//!
//! # Purpose
//!
//! Between authoritative syncs the displayed balance is extrapolated locally
//! from the last known income rate. This module owns that state and every
//! legal transition; nothing else in the crate mutates a balance directly.
//!
//! # Invariants
//!
//! - **Rollback**: while the phase is [`AccrualPhase::Desynced`],
//!   `displayed_cash == last_synced_cash` and ticks are no-ops.
//! - **Extrapolation only adds**: otherwise `displayed_cash ≥
//!   last_synced_cash` at all times.
//! - **Re-anchor**: after any successful sync the two values are equal again.
//! - **Never negative**: `displayed_cash` cannot go below zero regardless of
//!   what the service reports.
//! - **Pure, no IO**: all transitions are synchronous and deterministic; the
//!   caller provides every external value.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Seconds per hour, used to derive the per-second rate from the service's
/// hourly figure.
const SECONDS_PER_HOUR: i64 = 3600;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Where the balance stands relative to the authoritative service.
///
/// An explicit machine instead of a `sync_failed` boolean: the "never
/// extrapolate while unsynced" rule is enforced in exactly one place,
/// [`AccrualState::apply_tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccrualPhase {
    /// Freshly anchored to a service-confirmed value; no local projection
    /// has been applied since.
    Synced,
    /// At least one tick of local projection has been applied on top of the
    /// last confirmed value.
    Extrapolating,
    /// The last sync failed; the balance has been rolled back and is frozen
    /// until a sync succeeds.
    Desynced,
}

impl AccrualPhase {
    /// `true` when ticks may move the displayed balance.
    pub fn allows_extrapolation(&self) -> bool {
        !matches!(self, AccrualPhase::Desynced)
    }

    /// `true` when the last sync failed and extrapolation is frozen.
    pub fn is_desynced(&self) -> bool {
        matches!(self, AccrualPhase::Desynced)
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Balance state owned by one engine instance.
///
/// Fields are private: every mutation goes through a transition method so the
/// module invariants hold by construction.
#[derive(Clone, Debug)]
pub struct AccrualState {
    displayed_cash: Decimal,
    last_synced_cash: Decimal,
    income_per_second: Decimal,
    phase: AccrualPhase,
    is_syncing: bool,
}

impl AccrualState {
    /// Seed the state from a player-stats snapshot.
    ///
    /// Both balances anchor to the reported cash; the per-second rate is
    /// derived from the hourly figure. Negative inputs are clamped to zero
    /// rather than trusted.
    pub fn from_stats(cash: Decimal, income_per_hour: Decimal) -> Self {
        let cash = cash.max(Decimal::ZERO);
        Self {
            displayed_cash: cash,
            last_synced_cash: cash,
            income_per_second: per_second(income_per_hour),
            phase: AccrualPhase::Synced,
            is_syncing: false,
        }
    }

    /// One extrapolation step covering `step_seconds` of elapsed time.
    ///
    /// Applies only when the phase allows it and the rate is positive.
    /// Returns `true` if the displayed balance moved.
    pub fn apply_tick(&mut self, step_seconds: Decimal) -> bool {
        if !self.phase.allows_extrapolation() || self.income_per_second <= Decimal::ZERO {
            return false;
        }
        self.displayed_cash += self.income_per_second * step_seconds;
        self.phase = AccrualPhase::Extrapolating;
        true
    }

    /// Re-anchor to a service-confirmed balance and rate.
    ///
    /// One call site per sync: the whole update is a single synchronous
    /// block, so a tick can never observe half of it.
    pub fn apply_sync_success(&mut self, new_cash: Decimal, income_per_hour: Decimal) {
        let new_cash = new_cash.max(Decimal::ZERO);
        self.displayed_cash = new_cash;
        self.last_synced_cash = new_cash;
        self.income_per_second = per_second(income_per_hour);
        self.phase = AccrualPhase::Synced;
    }

    /// Roll back to the last confirmed balance and freeze extrapolation.
    ///
    /// The rate is left untouched: it resumes as-is once a sync succeeds.
    pub fn apply_sync_failure(&mut self) {
        self.displayed_cash = self.last_synced_cash;
        self.phase = AccrualPhase::Desynced;
    }

    /// Mark a sync call as in flight.
    pub fn begin_sync(&mut self) {
        self.is_syncing = true;
    }

    /// Mark the in-flight sync call as settled.
    pub fn end_sync(&mut self) {
        self.is_syncing = false;
    }

    pub fn displayed_cash(&self) -> Decimal {
        self.displayed_cash
    }

    pub fn last_synced_cash(&self) -> Decimal {
        self.last_synced_cash
    }

    pub fn income_per_second(&self) -> Decimal {
        self.income_per_second
    }

    pub fn phase(&self) -> AccrualPhase {
        self.phase
    }

    /// Read-only projection handed to observers.
    pub fn snapshot(&self) -> BalanceSnapshot {
        BalanceSnapshot {
            displayed_cash: self.displayed_cash,
            last_synced_cash: self.last_synced_cash,
            income_per_second: self.income_per_second,
            sync_failed: self.phase.is_desynced(),
            is_syncing: self.is_syncing,
        }
    }
}

fn per_second(income_per_hour: Decimal) -> Decimal {
    income_per_hour.max(Decimal::ZERO) / Decimal::from(SECONDS_PER_HOUR)
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Point-in-time view of the balance for presentation code.
///
/// The phase is projected down to the `sync_failed` flag the UI actually
/// renders (a "paused" badge); observers never see or mutate the state
/// struct itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub displayed_cash: Decimal,
    pub last_synced_cash: Decimal,
    pub income_per_second: Decimal,
    pub sync_failed: bool,
    pub is_syncing: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
