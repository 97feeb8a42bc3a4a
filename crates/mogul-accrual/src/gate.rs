//! Offline capture gate.
//!
//! Decides when the one-time "you earned X while away" capture is worth
//! presenting, and performs the capture. The snapshot it holds is transient:
//! it is fetched once per activation and cleared the moment a capture
//! resolves, so a stale absence can never be presented twice.
//!
//! Capping (free vs. premium cap hours) is computed entirely by the economy
//! service; this component only surfaces the flag.

use std::fmt;
use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;
use tracing::warn;

use mogul_economy::{EconomyClient, EconomyError, OfflineStatus};

use crate::engine::AccrualEngine;

/// Absences shorter than this are not worth a modal.
pub const MIN_AWAY_HOURS: f64 = 0.1;

/// Accruals below this are not worth a modal.
pub const MIN_CAPTURE_AMOUNT: Decimal = Decimal::ONE;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// A failed offline capture.
///
/// Unlike reconcile failures this is surfaced to the caller: the capture is
/// user-initiated and the UI owns the retry affordance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OfflineCaptureError {
    /// No offline snapshot is held — nothing was presented, or the previous
    /// capture already resolved.
    NothingPending,
    /// The collect call failed; the held snapshot is intact so the caller
    /// may retry.
    Service(EconomyError),
}

impl fmt::Display for OfflineCaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OfflineCaptureError::NothingPending => {
                write!(f, "no offline earnings pending capture")
            }
            OfflineCaptureError::Service(e) => write!(f, "offline capture failed: {e}"),
        }
    }
}

impl std::error::Error for OfflineCaptureError {}

impl From<EconomyError> for OfflineCaptureError {
    fn from(e: EconomyError) -> Self {
        OfflineCaptureError::Service(e)
    }
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// Decides on and performs the one-time offline earnings capture.
pub struct OfflineCaptureGate {
    client: Arc<dyn EconomyClient>,
    engine: Arc<AccrualEngine>,
    status: Mutex<Option<OfflineStatus>>,
}

impl OfflineCaptureGate {
    pub fn new(client: Arc<dyn EconomyClient>, engine: Arc<AccrualEngine>) -> Self {
        Self {
            client,
            engine,
            status: Mutex::new(None),
        }
    }

    /// Fetch the offline snapshot for this activation.
    ///
    /// A failed fetch is absorbed: there is simply nothing to present, and
    /// the running earnings reconcile is unaffected. Returns the presentation
    /// decision for the fetched snapshot.
    pub async fn load(&self) -> bool {
        match self.client.offline_status().await {
            Ok(status) => {
                *self.lock_status() = Some(status);
            }
            Err(e) => {
                warn!(error = %e, "offline status fetch failed; skipping capture prompt");
                *self.lock_status() = None;
            }
        }
        self.should_present()
    }

    /// Whether the held snapshot is worth a capture prompt.
    ///
    /// True only for a real absence (≥ [`MIN_AWAY_HOURS`]) with a non-trivial
    /// amount (≥ [`MIN_CAPTURE_AMOUNT`]): sub-minute absences and sub-dollar
    /// accruals never interrupt the player.
    pub fn should_present(&self) -> bool {
        self.lock_status().as_ref().is_some_and(qualifies)
    }

    /// The held snapshot, for rendering the prompt.
    pub fn status(&self) -> Option<OfflineStatus> {
        self.lock_status().clone()
    }

    /// Capture the pending offline earnings.
    ///
    /// On success the held snapshot is cleared (the decision cannot re-fire
    /// for the same absence) and the engine re-anchors from freshly fetched
    /// stats. On failure the snapshot is left intact so the UI may retry.
    pub async fn collect(&self) -> Result<Decimal, OfflineCaptureError> {
        if self.lock_status().is_none() {
            return Err(OfflineCaptureError::NothingPending);
        }

        let collection = self.client.collect_offline().await?;
        *self.lock_status() = None;

        // The capture itself succeeded; if the stats refresh fails the next
        // scheduled reconcile re-anchors within one interval anyway.
        if let Err(e) = self.engine.re_anchor_from_stats().await {
            warn!(error = %e, "stats refresh after offline capture failed");
        }

        Ok(collection.collected)
    }

    fn lock_status(&self) -> std::sync::MutexGuard<'_, Option<OfflineStatus>> {
        self.status.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn qualifies(status: &OfflineStatus) -> bool {
    status.elapsed_hours >= MIN_AWAY_HOURS && status.pending_earnings >= MIN_CAPTURE_AMOUNT
}
