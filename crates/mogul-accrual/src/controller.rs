//! Controller binding the engine to a UI surface's visible lifetime.
//!
//! The controller is the only piece presentation code talks to: it activates
//! the engine once stats are available, shuts it down unconditionally on
//! teardown, and exposes read-only projections plus the offline capture
//! pass-through. It holds no logic of its own.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::broadcast;

use mogul_economy::{EconomyClient, EconomyError, OfflineStatus};

use crate::engine::{AccrualEngine, EngineConfig, EngineEvent};
use crate::gate::{OfflineCaptureGate, OfflineCaptureError};
use crate::state::BalanceSnapshot;

/// Lifecycle wrapper around one [`AccrualEngine`] and its capture gate.
pub struct AccrualController {
    client: Arc<dyn EconomyClient>,
    engine: Arc<AccrualEngine>,
    gate: OfflineCaptureGate,
}

impl AccrualController {
    pub fn new(client: Arc<dyn EconomyClient>, config: EngineConfig) -> Self {
        let engine = Arc::new(AccrualEngine::new(Arc::clone(&client), config));
        let gate = OfflineCaptureGate::new(Arc::clone(&client), Arc::clone(&engine));
        Self {
            client,
            engine,
            gate,
        }
    }

    /// Bring the engine up for a freshly visible surface.
    ///
    /// Fetches player stats (the one error surfaced here: without stats there
    /// is nothing to display), starts the engine, then loads the offline
    /// snapshot. Returns whether the offline capture prompt should present.
    pub async fn activate(&self) -> Result<bool, EconomyError> {
        let stats = self.client.player_stats().await?;
        self.engine.start(&stats).await;
        Ok(self.gate.load().await)
    }

    /// Tear the engine down. Safe to call repeatedly; also runs on drop so a
    /// discarded controller never leaves timers running.
    pub fn shutdown(&self) {
        self.engine.stop();
    }

    /// Read-only projection of the current balance.
    pub async fn balance(&self) -> BalanceSnapshot {
        self.engine.snapshot().await
    }

    /// Subscribe to engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.engine.subscribe()
    }

    /// The offline snapshot backing the capture prompt, if any.
    pub fn offline_status(&self) -> Option<OfflineStatus> {
        self.gate.status()
    }

    /// Whether the offline capture prompt should present.
    pub fn should_present_offline_capture(&self) -> bool {
        self.gate.should_present()
    }

    /// Capture pending offline earnings (pass-through to the gate).
    pub async fn collect_offline_earnings(&self) -> Result<Decimal, OfflineCaptureError> {
        self.gate.collect().await
    }
}

impl Drop for AccrualController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
