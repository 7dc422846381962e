//! RPC Client Module - Multi-Chain JSON-RPC Transport
//!
//! 1. Endpoint list per chain: `<PREFIX>_RPC_URL` override, then public fallbacks
//! 2. Bounded retries with jittered backoff on transient failures
//! 3. Fallback to the next endpoint when one is exhausted
//! 4. User-Agent header and gzip
//! 5. JSON-RPC batch requests (max 50 per batch), results returned in request order
//!
//! Failures are `AppError`s wrapped in `eyre::Report`, so callers can both
//! propagate with `?` and classify (rate limit, timeout) by downcasting.

use alloy_primitives::{Address, Bytes};
use eyre::{eyre, Result};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::config::{rpc_urls_for, RpcSettings};
use crate::models::errors::{AppError, ErrorCode};
use crate::utils::constants::{chain_name, MAX_BATCH_SIZE, USER_AGENT as USER_AGENT_CONST};

// ============================================
// RETRY CONSTANTS
// ============================================

/// Upper bound on a single backoff sleep
pub const MAX_RETRY_DELAY_MS: u64 = 8_000;

/// Jitter percentage for retry delay
pub const RETRY_JITTER_PERCENT: u64 = 20;

/// Standard JSON-RPC rate limit code used by several providers
const RATE_LIMIT_CODE: i64 = -32005;

/// Batch JSON-RPC request item
#[derive(Debug, Clone, Serialize)]
struct BatchRequestItem {
    jsonrpc: &'static str,
    method: String,
    params: serde_json::Value,
    id: u64,
}

/// Batch JSON-RPC response item
#[derive(Debug, Clone, Deserialize)]
struct BatchResponseItem<T> {
    result: Option<T>,
    error: Option<RpcError>,
    id: u64,
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// JSON-RPC error structure
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    /// Check if this is a rate limit error (code -32005 or a rate limit message)
    pub fn is_rate_limit(&self) -> bool {
        self.code == RATE_LIMIT_CODE || crate::models::errors::looks_rate_limited(&self.message)
    }

    fn into_app_error(self) -> AppError {
        if self.is_rate_limit() {
            AppError::new(
                ErrorCode::RpcRateLimited,
                format!("Rate limited: {} (code: {})", self.message, self.code),
            )
        } else {
            AppError::rpc_error(format!("RPC error: {} (code: {})", self.message, self.code))
        }
    }
}

/// RPC Provider with retry logic and endpoint fallback
#[derive(Clone)]
pub struct RpcProvider {
    /// Endpoints in priority order
    urls: Vec<String>,
    /// HTTP client with custom headers (gzip enabled)
    client: reqwest::Client,
    settings: RpcSettings,
    /// Network name for logging
    network_name: String,
}

impl RpcProvider {
    /// Provider for a registry chain, using its configured endpoints
    pub fn new(chain_id: u64, settings: &RpcSettings) -> Result<Self> {
        let urls = rpc_urls_for(chain_id);
        if urls.is_empty() {
            return Err(AppError::unsupported_chain(chain_id).into());
        }
        Self::with_urls(chain_id, urls, settings)
    }

    /// Provider over an explicit endpoint list
    pub fn with_urls(chain_id: u64, urls: Vec<String>, settings: &RpcSettings) -> Result<Self> {
        if urls.is_empty() {
            return Err(AppError::new(
                ErrorCode::RpcNoEndpoints,
                format!("No RPC endpoints for chain {}", chain_id),
            )
            .into());
        }

        let client = Self::build_client(settings.timeout)?;
        let provider = Self {
            urls,
            client,
            settings: settings.clone(),
            network_name: chain_name(chain_id),
        };
        info!(
            "✅ RPC ready for {} ({} endpoint(s), primary {})",
            provider.network_name,
            provider.urls.len(),
            provider.masked_url()
        );
        Ok(provider)
    }

    /// Build HTTP client with custom headers
    fn build_client(timeout: Duration) -> Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))
    }

    /// Execute JSON-RPC call with retry logic and fallback
    pub async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let mut last_error = None;
        for (idx, url) in self.urls.iter().enumerate() {
            if idx > 0 {
                info!("🔄 Trying fallback RPC #{} for {}", idx, self.network_name);
            }
            match self.with_retry(|| self.execute_call::<T>(url, &payload)).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !is_transient(&e) {
                        return Err(e);
                    }
                    warn!("⚠️ RPC endpoint #{} failed on {}: {}", idx, self.network_name, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AppError::new(
                ErrorCode::RpcNoEndpoints,
                format!("All RPC endpoints failed for {}", self.network_name),
            )
            .into()
        }))
    }

    /// Run `op` up to `1 + max_retries` times, backing off between transient failures
    async fn with_retry<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let attempts = self.settings.max_retries + 1;
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.backoff(attempt);
                debug!("⏳ Retry {}/{} after {}ms", attempt + 1, attempts, delay.as_millis());
                tokio::time::sleep(delay).await;
            }

            match op().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !is_transient(&e) {
                        return Err(e);
                    }
                    if crate::models::errors::is_rate_limited(&e) {
                        warn!(
                            "⏳ Rate limited on {}, backing off (attempt {}/{})",
                            self.network_name,
                            attempt + 1,
                            attempts
                        );
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| eyre!("Unknown error after {} attempts", attempts)))
    }

    /// Exponential backoff from the configured base delay, capped, with ±20% jitter
    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.settings.retry_delay.as_millis() as u64;
        let capped = base
            .saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)))
            .min(MAX_RETRY_DELAY_MS);
        let jitter_range = (capped * RETRY_JITTER_PERCENT) / 100;
        let jitter: i64 =
            rand::thread_rng().gen_range(-(jitter_range as i64)..=(jitter_range as i64));
        Duration::from_millis((capped as i64 + jitter).max(0) as u64)
    }

    /// Execute single RPC call
    async fn execute_call<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(AppError::from)?;

        check_status(response.status())?;

        let json: RpcResponse<T> = response.json().await.map_err(|e| {
            AppError::new(
                ErrorCode::RpcInvalidResponse,
                format!("Failed to parse response: {}", e),
            )
        })?;

        if let Some(error) = json.error {
            return Err(error.into_app_error().into());
        }

        json.result.ok_or_else(|| {
            AppError::new(ErrorCode::RpcInvalidResponse, "No result in response").into()
        })
    }

    /// `eth_call` at the latest block
    pub async fn eth_call(&self, to: Address, data: &Bytes) -> Result<Bytes> {
        let params = serde_json::json!([{ "to": to, "data": data }, "latest"]);
        self.call::<Bytes>("eth_call", params).await
    }

    /// Many `eth_call`s in JSON-RPC batches; one result per call, in order
    pub async fn eth_call_batch(&self, calls: &[(Address, Bytes)]) -> Result<Vec<Result<Bytes>>> {
        let requests = calls
            .iter()
            .map(|(to, data)| {
                ("eth_call", serde_json::json!([{ "to": to, "data": data }, "latest"]))
            })
            .collect();
        self.batch_call::<Bytes>(requests).await
    }

    /// Primary URL with any path secret hidden
    pub fn masked_url(&self) -> String {
        self.urls.first().map(|u| mask_url(u)).unwrap_or_default()
    }

    // ============================================
    // BATCH REQUESTS
    // ============================================

    /// Execute batch JSON-RPC calls (max 50 per batch)
    ///
    /// The outer `Result` fails only when a whole batch could not be
    /// delivered; per-item errors come back in the inner results, in the
    /// same order as `requests`.
    pub async fn batch_call<T: for<'de> Deserialize<'de>>(
        &self,
        requests: Vec<(&str, serde_json::Value)>,
    ) -> Result<Vec<Result<T>>> {
        if requests.is_empty() {
            return Ok(vec![]);
        }

        let mut all_results = Vec::with_capacity(requests.len());
        for chunk in requests.chunks(MAX_BATCH_SIZE) {
            let batch_payload: Vec<BatchRequestItem> = chunk
                .iter()
                .enumerate()
                .map(|(idx, (method, params))| BatchRequestItem {
                    jsonrpc: "2.0",
                    method: method.to_string(),
                    params: params.clone(),
                    id: idx as u64 + 1,
                })
                .collect();

            let mut last_error = None;
            let mut delivered = None;
            for url in &self.urls {
                match self
                    .with_retry(|| self.execute_batch::<T>(url, &batch_payload))
                    .await
                {
                    Ok(results) => {
                        delivered = Some(results);
                        break;
                    }
                    Err(e) => {
                        warn!("⚠️ Batch request failed on {}: {}", self.network_name, e);
                        last_error = Some(e);
                    }
                }
            }

            match delivered {
                Some(results) => all_results.extend(results),
                None => {
                    return Err(last_error
                        .unwrap_or_else(|| eyre!("Batch request failed for {}", self.network_name)))
                }
            }
        }

        Ok(all_results)
    }

    /// One batch round-trip; responses are matched back to requests by id
    async fn execute_batch<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        batch_payload: &[BatchRequestItem],
    ) -> Result<Vec<Result<T>>> {
        let response = self
            .client
            .post(url)
            .json(batch_payload)
            .send()
            .await
            .map_err(AppError::from)?;

        check_status(response.status())?;

        let batch_response: Vec<BatchResponseItem<T>> = response.json().await.map_err(|e| {
            AppError::new(
                ErrorCode::RpcInvalidResponse,
                format!("Failed to parse batch response: {}", e),
            )
        })?;

        let mut by_id: HashMap<u64, BatchResponseItem<T>> = batch_response
            .into_iter()
            .map(|item| (item.id, item))
            .collect();

        Ok(batch_payload
            .iter()
            .map(|req| match by_id.remove(&req.id) {
                Some(BatchResponseItem {
                    error: Some(error), ..
                }) => Err(error.into_app_error().into()),
                Some(BatchResponseItem {
                    result: Some(result),
                    ..
                }) => Ok(result),
                _ => Err(AppError::new(
                    ErrorCode::RpcInvalidResponse,
                    format!("No result in response for id {}", req.id),
                )
                .into()),
            })
            .collect())
    }
}

fn check_status(status: reqwest::StatusCode) -> Result<()> {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(AppError::rpc_rate_limited().into());
    }
    if !status.is_success() {
        return Err(AppError::rpc_connection_failed(format!("HTTP error: {}", status)).into());
    }
    Ok(())
}

/// Transport-level failures worth another attempt
fn is_transient(err: &eyre::Report) -> bool {
    match err.downcast_ref::<AppError>() {
        Some(app) => app.code.is_retryable() || app.code == ErrorCode::RpcInvalidResponse,
        None => true,
    }
}

/// Hide API keys embedded in the URL path (`/v2/<key>`, `/v3/<key>`, ...)
pub fn mask_url(url: &str) -> String {
    for marker in ["/v2/", "/v3/", "/rpc/"] {
        if let Some(pos) = url.find(marker) {
            let (head, tail) = url.split_at(pos + marker.len());
            if !tail.is_empty() {
                return format!("{}***HIDDEN***", head);
            }
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_url() {
        assert_eq!(
            mask_url("https://eth-mainnet.g.alchemy.com/v2/secret"),
            "https://eth-mainnet.g.alchemy.com/v2/***HIDDEN***"
        );
        assert_eq!(mask_url("https://cloudflare-eth.com"), "https://cloudflare-eth.com");
    }

    #[test]
    fn test_rpc_error_classification() {
        let rate_limit_error = RpcError {
            code: -32005,
            message: "limit exceeded".to_string(),
        };
        assert!(rate_limit_error.is_rate_limit());

        let revert = RpcError {
            code: 3,
            message: "execution reverted".to_string(),
        };
        assert!(!revert.is_rate_limit());

        let report: eyre::Report = revert.into_app_error().into();
        assert!(!is_transient(&report));
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient(&AppError::rpc_rate_limited().into()));
        assert!(is_transient(&AppError::rpc_timeout("slow").into()));
        assert!(!is_transient(&AppError::rpc_error("bad params").into()));
    }

    #[test]
    fn test_backoff_is_capped() {
        let provider = RpcProvider::with_urls(
            1,
            vec!["http://127.0.0.1:1".to_string()],
            &RpcSettings::default(),
        )
        .unwrap();
        for attempt in 1..10 {
            let delay = provider.backoff(attempt);
            assert!(delay.as_millis() as u64 <= MAX_RETRY_DELAY_MS * 12 / 10);
        }
    }

    #[test]
    fn test_unknown_chain_has_no_endpoints() {
        assert!(RpcProvider::new(999, &RpcSettings::default()).is_err());
        assert!(RpcProvider::with_urls(1, vec![], &RpcSettings::default()).is_err());
    }
}
