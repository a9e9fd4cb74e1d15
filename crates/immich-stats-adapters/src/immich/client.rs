// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of immich-stats.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use async_trait::async_trait;
use immich_stats_core::{StatisticsError, StatisticsPayload, StatisticsResult, StatisticsSource};
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const STATISTICS_PATH: &str = "/api/server/statistics";
pub const PING_PATH: &str = "/api/server/ping";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const API_KEY_HEADER: &str = "x-api-key";

/// Immich server REST API client.
///
/// Performs exactly one request per call; retry and backoff belong to the
/// coordinator driving it.
#[derive(Clone)]
pub struct ImmichClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl fmt::Debug for ImmichClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImmichClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl ImmichClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> StatisticsResult<Self> {
        Self::with_timeout(base_url, api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> StatisticsResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            StatisticsError::Config(format!("Failed to build HTTP client: {e}"))
        })?;

        let base_url = base_url.into().trim_end_matches('/').to_owned();
        info!("Initializing Immich client: {}", base_url);

        Ok(Self {
            base_url,
            api_key: api_key.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the server-wide statistics object
    pub async fn get_statistics(&self) -> StatisticsResult<StatisticsPayload> {
        let url = format!("{}{}", self.base_url, STATISTICS_PATH);
        debug!("Fetching Immich statistics: {}", url);

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(connectivity_error)?;

        let status = response.status();
        if status.is_success() {
            let body = response.text().await.map_err(connectivity_error)?;
            let value: Value = serde_json::from_str(&body).map_err(|e| {
                error!("Statistics response is not JSON: {}", e);
                StatisticsError::MalformedResponse(format!("invalid JSON: {e}"))
            })?;
            let payload = StatisticsPayload::from_value(value)?;
            debug!(
                "Statistics received with fields: {:?}",
                payload.keys().collect::<Vec<_>>()
            );
            return Ok(payload);
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                error!("Immich rejected the API key (status {})", status);
                Err(StatisticsError::Authentication)
            }
            status => {
                let message = response.text().await.unwrap_or_default();
                error!("Immich API status {}: {}", status, message);
                Err(StatisticsError::Server {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    /// Health check, `false` on any failure
    pub async fn ping(&self) -> StatisticsResult<bool> {
        let url = format!("{}{}", self.base_url, PING_PATH);
        debug!("Performing Immich health check");

        match self.client.get(&url).send().await {
            Ok(response) => {
                let is_ok = response.status().is_success();
                if is_ok {
                    debug!("Health check passed");
                } else {
                    warn!("Health check failed: status {}", response.status());
                }
                Ok(is_ok)
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

fn connectivity_error(e: reqwest::Error) -> StatisticsError {
    if e.is_timeout() {
        StatisticsError::Connectivity(format!("request timed out: {e}"))
    } else {
        StatisticsError::Connectivity(e.to_string())
    }
}

#[async_trait]
impl StatisticsSource for ImmichClient {
    async fn fetch(&self) -> StatisticsResult<StatisticsPayload> {
        self.get_statistics().await
    }

    async fn health_check(&self) -> StatisticsResult<bool> {
        self.ping().await
    }

    fn name(&self) -> &str {
        "immich"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_statistics_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", STATISTICS_PATH)
            .match_header("x-api-key", "test_key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "photos": 120,
                    "videos": 4,
                    "usage": 549755813888_u64,
                    "usagePhotos": 500000000000_u64,
                    "usageVideos": 49755813888_u64,
                    "usageByUser": []
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ImmichClient::new(server.url(), "test_key").unwrap();
        let stats = client.get_statistics().await.unwrap();

        assert_eq!(stats.number("photos"), Some(120.0));
        assert_eq!(stats.number("videos"), Some(4.0));
        assert_eq!(stats.number("usage"), Some(549_755_813_888.0));
        assert!(stats.contains("usageByUser"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", STATISTICS_PATH)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = ImmichClient::new(format!("{}/", server.url()), "test_key").unwrap();
        let stats = client.get_statistics().await.unwrap();

        assert!(stats.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_and_forbidden() {
        for status in [401, 403] {
            let mut server = Server::new_async().await;
            let mock = server
                .mock("GET", STATISTICS_PATH)
                .with_status(status)
                .with_body(r#"{"message":"Invalid API key"}"#)
                .create_async()
                .await;

            let client = ImmichClient::new(server.url(), "bad_key").unwrap();
            let result = client.get_statistics().await;

            assert_eq!(result.unwrap_err(), StatisticsError::Authentication);
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_server_error_carries_status() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", STATISTICS_PATH)
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let client = ImmichClient::new(server.url(), "test_key").unwrap();
        let result = client.get_statistics().await;

        assert_eq!(
            result.unwrap_err(),
            StatisticsError::Server {
                status: 503,
                message: "maintenance".to_owned()
            }
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_object_body_is_malformed() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", STATISTICS_PATH)
            .with_status(200)
            .with_body("[1, 2, 3]")
            .create_async()
            .await;

        let client = ImmichClient::new(server.url(), "test_key").unwrap();
        let result = client.get_statistics().await;

        assert!(matches!(result, Err(StatisticsError::MalformedResponse(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_json_is_malformed() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", STATISTICS_PATH)
            .with_status(200)
            .with_body("<html>login</html>")
            .create_async()
            .await;

        let client = ImmichClient::new(server.url(), "test_key").unwrap();
        let result = client.get_statistics().await;

        assert!(matches!(result, Err(StatisticsError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connectivity_error() {
        let client = ImmichClient::with_timeout(
            "http://127.0.0.1:1",
            "test_key",
            Duration::from_millis(500),
        )
        .unwrap();
        let result = client.get_statistics().await;

        assert!(matches!(result, Err(StatisticsError::Connectivity(_))));
    }

    #[tokio::test]
    async fn test_ping() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", PING_PATH)
            .with_status(200)
            .with_body(r#"{"res":"pong"}"#)
            .create_async()
            .await;

        let client = ImmichClient::new(server.url(), "test_key").unwrap();
        assert!(client.health_check().await.unwrap());
        mock.assert_async().await;

        let down = ImmichClient::new("http://127.0.0.1:1", "test_key").unwrap();
        assert!(!down.ping().await.unwrap());
    }

    #[tokio::test]
    async fn test_debug_redacts_api_key() {
        let client = ImmichClient::new("http://immich.local", "secret").unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("immich.local"));
    }
}
