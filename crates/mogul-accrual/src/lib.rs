//! mogul-accrual
//!
//! Real-time earnings accrual and reconciliation for the Mogul client.
//!
//! The displayed balance is extrapolated locally at 10 Hz from the last
//! known income rate and re-anchored every two seconds by an authoritative
//! collect call. A failed sync rolls the balance back to the last confirmed
//! value and freezes extrapolation: the display can pause, but it can never
//! silently invent money during an outage.
//!
//! - [`state`] — the pure balance state machine (no IO).
//! - [`engine`] — the periodic tick/reconcile tasks and event bus.
//! - [`gate`] — the one-time offline earnings capture.
//! - [`controller`] — lifecycle wrapper for presentation code.

pub mod controller;
pub mod engine;
pub mod gate;
pub mod state;

pub use controller::AccrualController;
pub use engine::{AccrualEngine, EngineConfig, EngineEvent};
pub use gate::{OfflineCaptureError, OfflineCaptureGate, MIN_AWAY_HOURS, MIN_CAPTURE_AMOUNT};
pub use state::{AccrualPhase, AccrualState, BalanceSnapshot};
