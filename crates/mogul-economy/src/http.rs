//! HTTP adapter for the economy service.
//!
//! Thin reqwest wrapper: every endpoint returns the uniform
//! [`ApiEnvelope`], so the four operations share one request helper that
//! maps transport, status and envelope failures into [`EconomyError`].

use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::client::{EconomyClient, EconomyError};
use crate::{ApiEnvelope, EarningsCollection, OfflineCollection, OfflineStatus, PlayerStats};

/// Production [`EconomyClient`] backed by the game backend's REST API.
///
/// The session token is sent as a bearer header on every call; do not log it.
#[derive(Debug, Clone)]
pub struct HttpEconomyClient {
    http: reqwest::Client,
    base_url: String,
    session_token: String,
}

impl HttpEconomyClient {
    /// Create an adapter for the given backend base URL and session token.
    ///
    /// The base URL is validated eagerly so a misconfigured deployment fails
    /// at construction instead of on the first reconcile.
    pub fn new(
        base_url: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Result<Self, EconomyError> {
        let base_url = base_url.into();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(EconomyError::Config(format!(
                "base url must be http(s), got '{base_url}'"
            )));
        }
        let session_token = session_token.into();
        if session_token.trim().is_empty() {
            return Err(EconomyError::Config("session token is empty".to_string()));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            session_token,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn request_enveloped<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        operation: &'static str,
    ) -> Result<T, EconomyError> {
        let resp = self
            .http
            .request(method, self.endpoint(path))
            .bearer_auth(&self.session_token)
            .send()
            .await
            .map_err(|e| EconomyError::Transport(format!("{operation}: {e}")))?;

        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| EconomyError::Transport(format!("{operation}: {e}")))?;

        // The backend reports application errors inside the envelope even on
        // non-2xx statuses; prefer its error string over a bare status code.
        match serde_json::from_slice::<ApiEnvelope<T>>(&body) {
            Ok(envelope) if !status.is_success() => Err(EconomyError::Api {
                code: Some(status.as_u16() as i64),
                message: envelope
                    .error
                    .unwrap_or_else(|| format!("{operation}: http status {status}")),
            }),
            Ok(envelope) => envelope.into_result(operation),
            Err(_) if !status.is_success() => Err(EconomyError::Api {
                code: Some(status.as_u16() as i64),
                message: format!("{operation}: http status {status}"),
            }),
            Err(e) => Err(EconomyError::Decode(format!("{operation}: {e}"))),
        }
    }
}

#[async_trait::async_trait]
impl EconomyClient for HttpEconomyClient {
    fn service_name(&self) -> &'static str {
        "http"
    }

    async fn collect_earnings(&self) -> Result<EarningsCollection, EconomyError> {
        self.request_enveloped(Method::POST, "/v1/earnings/collect", "collect_earnings")
            .await
    }

    async fn offline_status(&self) -> Result<OfflineStatus, EconomyError> {
        self.request_enveloped(Method::GET, "/v1/earnings/offline", "offline_status")
            .await
    }

    async fn collect_offline(&self) -> Result<OfflineCollection, EconomyError> {
        self.request_enveloped(
            Method::POST,
            "/v1/earnings/offline/collect",
            "collect_offline",
        )
        .await
    }

    async fn player_stats(&self) -> Result<PlayerStats, EconomyError> {
        self.request_enveloped(Method::GET, "/v1/player/stats", "player_stats")
            .await
    }
}

// -----------------
// Tests (mocked backend, no live network)
// -----------------

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn client_for(server: &MockServer) -> HttpEconomyClient {
        HttpEconomyClient::new(server.base_url(), "session-token").unwrap()
    }

    #[tokio::test]
    async fn collect_earnings_decodes_success_envelope() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/earnings/collect")
                    .header("authorization", "Bearer session-token");
                then.status(200).json_body(json!({
                    "success": true,
                    "data": {
                        "collected": 12.5,
                        "newCash": 112.5,
                        "elapsedSeconds": 2,
                        "incomePerHour": 3600
                    }
                }));
            })
            .await;

        let out = client_for(&server).collect_earnings().await.unwrap();
        mock.assert_async().await;
        assert_eq!(out.collected, dec!(12.5));
        assert_eq!(out.new_cash, dec!(112.5));
        assert_eq!(out.elapsed_seconds, 2);
        assert_eq!(out.income_per_hour, dec!(3600));
    }

    #[tokio::test]
    async fn success_false_maps_to_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/player/stats");
                then.status(200)
                    .json_body(json!({ "success": false, "error": "invalid session" }));
            })
            .await;

        match client_for(&server).player_stats().await {
            Err(EconomyError::Api { code: None, message }) => {
                assert_eq!(message, "invalid session");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_500_with_envelope_keeps_service_message_and_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/earnings/offline/collect");
                then.status(500)
                    .json_body(json!({ "success": false, "error": "economy engine crashed" }));
            })
            .await;

        match client_for(&server).collect_offline().await {
            Err(EconomyError::Api {
                code: Some(500),
                message,
            }) => assert_eq!(message, "economy engine crashed"),
            other => panic!("expected Api error with code, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_maps_to_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/earnings/offline");
                then.status(200).body("not json at all");
            })
            .await;

        assert!(matches!(
            client_for(&server).offline_status().await,
            Err(EconomyError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_backend_maps_to_transport_error() {
        // Port 9 (discard) is not listening in the test environment.
        let client = HttpEconomyClient::new("http://127.0.0.1:9", "session-token").unwrap();
        assert!(matches!(
            client.player_stats().await,
            Err(EconomyError::Transport(_))
        ));
    }

    #[test]
    fn constructor_rejects_bad_config() {
        assert!(matches!(
            HttpEconomyClient::new("ftp://example", "tok"),
            Err(EconomyError::Config(_))
        ));
        assert!(matches!(
            HttpEconomyClient::new("https://example", "  "),
            Err(EconomyError::Config(_))
        ));
    }
}
