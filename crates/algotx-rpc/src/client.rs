//! Base REST client for the node API.
//!
//! Provides `get_json()` / `get_msgpack()` for read endpoints and
//! `post_binary()` for raw transaction submission. Supports the
//! `X-Algo-API-Token` header, configurable timeout, and retry with
//! exponential backoff for reads. Submissions are never retried.

use crate::error::RpcError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// Header carrying the node API token (`X-Algo-API-Token`).
pub const API_TOKEN_HEADER: &str = "x-algo-api-token";

/// Error body returned by the node on non-2xx responses.
#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Configuration for an RPC client.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// Base URL (e.g., `http://localhost:4001`).
    pub url: String,
    /// Optional API token.
    pub token: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
    /// Number of retry attempts on transient failure (reads only).
    pub retries: u32,
    /// Initial delay between retries (doubles each attempt).
    pub retry_delay: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:4001".to_string(),
            token: None,
            timeout: Duration::from_secs(30),
            retries: 2,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Async client for the node REST API.
pub struct RpcClient {
    client: reqwest::Client,
    config: RpcConfig,
}

impl RpcClient {
    /// Create a new client with the given URL.
    pub fn new(url: &str) -> Self {
        Self::with_config(RpcConfig {
            url: url.to_string(),
            ..Default::default()
        })
    }

    /// Create a new client with full configuration.
    pub fn with_config(mut config: RpcConfig) -> Self {
        config.url = config.url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(4)
            .build()
            .expect("failed to create HTTP client");

        Self { client, config }
    }

    /// Get the configured base URL.
    pub fn url(&self) -> &str {
        &self.config.url
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(token) = self.config.token.as_deref().filter(|t| !t.is_empty()) {
            if let Ok(value) = HeaderValue::from_str(token) {
                headers.insert(API_TOKEN_HEADER, value);
            }
        }
        headers
    }

    async fn with_retries<T, F, Fut>(&self, endpoint: &str, op: F) -> Result<T, RpcError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, RpcError>>,
    {
        let attempts = self.config.retries + 1;
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(val) => return Ok(val),
                Err(e) if e.is_transient() && attempt + 1 < attempts => {
                    attempt += 1;
                    let delay = self.config.retry_delay * 2u32.saturating_pow(attempt - 1);
                    log::debug!("{} failed ({}), retry {} in {:?}", endpoint, e, attempt, delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Map a response to its body, turning error statuses into [`RpcError`].
    async fn check_response(
        method: &str,
        url: &str,
        resp: reqwest::Response,
    ) -> Result<Vec<u8>, RpcError> {
        let status = resp.status().as_u16();

        if status == 401 {
            return Err(RpcError::AuthFailed {
                url: url.to_string(),
            });
        }

        if status >= 400 {
            let text = resp.text().await.unwrap_or_default();
            let body = serde_json::from_str::<ErrorBody>(&text)
                .map(|e| e.message)
                .unwrap_or(text);
            return Err(RpcError::HttpStatus {
                method: method.to_string(),
                url: url.to_string(),
                status,
                body: body.chars().take(500).collect(),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| RpcError::Http {
            method: method.to_string(),
            url: url.to_string(),
            source: e,
        })?;
        Ok(bytes.to_vec())
    }

    async fn do_get(&self, url: &str, accept: &'static str) -> Result<Vec<u8>, RpcError> {
        log::debug!("GET {}", url);
        let resp = self
            .client
            .get(url)
            .headers(self.build_headers())
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(|e| RpcError::Http {
                method: "GET".to_string(),
                url: url.to_string(),
                source: e,
            })?;
        Self::check_response("GET", url, resp).await
    }

    /// GET a JSON endpoint.
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, RpcError> {
        let url = format!("{}{}", self.config.url, endpoint);
        let body = self
            .with_retries(endpoint, || self.do_get(&url, "application/json"))
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// GET a msgpack endpoint.
    pub async fn get_msgpack<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, RpcError> {
        let url = format!("{}{}", self.config.url, endpoint);
        let body = self
            .with_retries(endpoint, || self.do_get(&url, "application/msgpack"))
            .await?;
        Ok(rmp_serde::from_slice(&body)?)
    }

    /// POST raw bytes and parse the JSON reply. Not retried.
    pub async fn post_binary(&self, endpoint: &str, body: Vec<u8>) -> Result<Value, RpcError> {
        let url = format!("{}{}", self.config.url, endpoint);
        log::debug!("POST {} ({} bytes)", url, body.len());

        let resp = self
            .client
            .post(&url)
            .headers(self.build_headers())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/x-binary"))
            .body(body)
            .send()
            .await
            .map_err(|e| RpcError::Http {
                method: "POST".to_string(),
                url: url.clone(),
                source: e,
            })?;

        let bytes = Self::check_response("POST", &url, resp).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Simple connectivity check (GET /health).
    pub async fn is_connected(&self) -> bool {
        let url = format!("{}/health", self.config.url);
        self.do_get(&url, "application/json").await.is_ok()
    }
}
