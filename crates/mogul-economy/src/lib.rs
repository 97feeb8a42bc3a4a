//! mogul-economy
//!
//! Contract surface for the remote economy service.
//!
//! This crate owns the wire DTOs, the uniform response envelope, the
//! [`EconomyClient`] trait and the production HTTP adapter. It computes no
//! income itself: yields, multipliers and offline caps are owned entirely by
//! the service and consumed here as opaque numeric fields.

pub mod client;
pub mod http;

pub use client::{EconomyClient, EconomyError};
pub use http::HttpEconomyClient;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Wire DTOs
// ---------------------------------------------------------------------------

/// Result of the authoritative "collect running earnings" operation.
///
/// The service computes earnings accrued since its last recorded collection
/// timestamp for this account; `new_cash` is the post-collection balance and
/// is the only value the accrual engine ever anchors to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsCollection {
    /// Amount credited by this call.
    pub collected: Decimal,
    /// Authoritative balance after the credit.
    pub new_cash: Decimal,
    /// Seconds of accrual the service credited.
    pub elapsed_seconds: i64,
    /// Current effective income rate, per hour.
    pub income_per_hour: Decimal,
}

/// Read-only snapshot of earnings accrued while the client was not running.
///
/// Fetching this does not mutate server state; only
/// [`EconomyClient::collect_offline`] does.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineStatus {
    /// Earnings waiting to be captured.
    pub pending_earnings: Decimal,
    /// Wall-clock hours since the last collection.
    pub elapsed_hours: f64,
    /// True when `elapsed_hours` exceeded the account's cap and the pending
    /// amount was truncated server-side.
    pub capped: bool,
    /// The cap applied to this account (free vs. premium tier).
    pub cap_hours: f64,
    /// Hourly rate of manager-run businesses while away.
    pub managed_income_per_hour: Decimal,
    /// Timestamp of the last collection the service has on record.
    pub last_collection_at: DateTime<Utc>,
}

/// Result of capturing offline earnings.
///
/// The operation drains the pending pot: an immediate second call returns
/// `collected == 0` until more offline time accrues.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineCollection {
    /// Amount credited by this capture.
    pub collected: Decimal,
    /// Hours of absence the service credited (post-cap).
    pub hours: f64,
    /// Whether the cap truncated the credit.
    pub capped: bool,
    /// Current effective income rate, per hour.
    pub income_per_hour: Decimal,
}

/// Player stats as reported by the service.
///
/// The real payload carries many more fields (properties, managers,
/// prestige...); we deserialize only what the accrual engine anchors on and
/// let serde drop the rest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    /// Authoritative cash balance.
    pub cash: Decimal,
    /// Effective income rate across all sources, per hour.
    pub effective_income_hour: Decimal,
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// Uniform envelope every economy endpoint responds with.
///
/// A payload with `success == false` is treated identically to a transport
/// failure by callers; the envelope exists so the service can report
/// application-level errors (invalid session, internal error) over a 200.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Collapse the envelope into a `Result`.
    ///
    /// - `success == false` becomes [`EconomyError::Api`] carrying the
    ///   service's error string (or a placeholder if it sent none).
    /// - `success == true` without a `data` payload is a malformed response
    ///   and becomes [`EconomyError::Decode`].
    pub fn into_result(self, operation: &'static str) -> Result<T, EconomyError> {
        if !self.success {
            return Err(EconomyError::Api {
                code: None,
                message: self
                    .error
                    .unwrap_or_else(|| format!("{operation}: unspecified service error")),
            });
        }
        self.data.ok_or_else(|| {
            EconomyError::Decode(format!("{operation}: success envelope carried no data"))
        })
    }
}
