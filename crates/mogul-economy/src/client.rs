//! Client boundary for the economy service.
//!
//! This module defines **only** the error taxonomy and the client trait.
//! No HTTP, no JSON, no retry policy: concrete transports live in sibling
//! modules and downstream crates pick the adapter at construction time.

use std::fmt;

use crate::{EarningsCollection, OfflineCollection, OfflineStatus, PlayerStats};

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Errors an [`EconomyClient`] implementation may return.
///
/// Callers that reconcile periodically treat `Transport` and `Api`
/// identically (absorb, pause extrapolation, retry on the next interval);
/// the distinction exists for logging and for user-initiated operations
/// that surface the failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EconomyError {
    /// The call itself failed: offline, DNS, refused connection, timeout.
    Transport(String),
    /// The call completed but the service reported failure
    /// (`success: false` envelope or a non-2xx status).
    Api { code: Option<i64>, message: String },
    /// A response payload could not be decoded.
    Decode(String),
    /// The adapter is misconfigured (bad base URL, missing session token).
    Config(String),
}

impl fmt::Display for EconomyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EconomyError::Transport(msg) => write!(f, "transport error: {msg}"),
            EconomyError::Api {
                code: Some(c),
                message,
            } => write!(f, "economy service error code={c}: {message}"),
            EconomyError::Api {
                code: None,
                message,
            } => write!(f, "economy service error: {message}"),
            EconomyError::Decode(msg) => write!(f, "decode error: {msg}"),
            EconomyError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for EconomyError {}

// ---------------------------------------------------------------------------
// Client trait
// ---------------------------------------------------------------------------

/// The four economy-service operations the client core consumes.
///
/// Object-safe so callers can hold an `Arc<dyn EconomyClient>` without
/// knowing the concrete transport, and `Send + Sync` so one client can be
/// shared across the tick/reconcile task boundary.
#[async_trait::async_trait]
pub trait EconomyClient: Send + Sync {
    /// Human-readable adapter name (e.g. `"http"`, `"paper"`).
    fn service_name(&self) -> &'static str;

    /// Collect earnings accrued since the service's last recorded
    /// collection. Authoritative; mutates server state.
    async fn collect_earnings(&self) -> Result<EarningsCollection, EconomyError>;

    /// Fetch the offline-earnings snapshot. Read-only.
    async fn offline_status(&self) -> Result<OfflineStatus, EconomyError>;

    /// Capture offline earnings. Mutates server state; drains the pending
    /// pot, so an immediate second call collects zero.
    async fn collect_offline(&self) -> Result<OfflineCollection, EconomyError>;

    /// Fetch player stats. Used to re-anchor a displayed balance after any
    /// action that changes cash outside the ticker.
    async fn player_stats(&self) -> Result<PlayerStats, EconomyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_with_code() {
        let err = EconomyError::Api {
            code: Some(500),
            message: "economy engine unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "economy service error code=500: economy engine unavailable"
        );
    }

    #[test]
    fn api_error_display_without_code() {
        let err = EconomyError::Api {
            code: None,
            message: "invalid session".to_string(),
        };
        assert_eq!(err.to_string(), "economy service error: invalid session");
    }

    #[test]
    fn transport_error_display() {
        let err = EconomyError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "transport error: connection refused");
    }
}
