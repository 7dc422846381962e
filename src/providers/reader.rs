//! Blockchain read interface
//!
//! `ChainReader` is the only way the scanner touches a chain. The RPC-backed
//! implementation batches reads through the deployed Multicall3 contract and
//! falls back to one `eth_call` per read (sent as a single JSON-RPC batch)
//! when the aggregate call fails.

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use eyre::{eyre, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::ens;
use super::rpc::RpcProvider;
use crate::models::config::{AppConfig, BatchMode, RpcSettings};
use crate::models::errors::{is_rate_limited, AppError};
use crate::utils::cache::ClientCache;
use crate::utils::constants::{chain, MAX_BATCH_SIZE, MULTICALL3};
use crate::utils::decoder::{AllowanceDecoder, CallOutcome, ReadCall};

/// Read-only access to the supported chains
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Execute `calls` on `chain_id` at the latest block
    ///
    /// Returns exactly one outcome per call, in the same order. `Err` means
    /// the whole batch could not be delivered (no outcome is known).
    async fn read_many(&self, chain_id: u64, calls: &[ReadCall]) -> Result<Vec<CallOutcome>>;

    /// Resolve a human-readable name on mainnet; `None` when it has no address
    async fn resolve_name(&self, name: &str) -> Result<Option<Address>> {
        ens::resolve(self, name).await
    }
}

/// Single `allowance(owner, spender)` read
pub async fn read_allowance<R: ChainReader + ?Sized>(
    reader: &R,
    chain_id: u64,
    token: Address,
    owner: Address,
    spender: Address,
) -> Result<U256> {
    let call = ReadCall::new(token, AllowanceDecoder::encode_allowance(owner, spender));
    let mut outcomes = reader.read_many(chain_id, std::slice::from_ref(&call)).await?;
    match outcomes.pop() {
        Some(CallOutcome::Success(data)) => AllowanceDecoder::decode_allowance(&data),
        Some(CallOutcome::Failure(reason)) => Err(eyre!(reason)),
        None => Err(eyre!("no outcome for allowance read")),
    }
}

/// `ChainReader` over JSON-RPC endpoints
pub struct RpcChainReader {
    settings: RpcSettings,
    mode: BatchMode,
    /// Endpoint lists that replace the registry ones for a chain
    endpoints: HashMap<u64, Vec<String>>,
    clients: ClientCache<RpcProvider>,
}

impl RpcChainReader {
    pub fn new(settings: RpcSettings, mode: BatchMode) -> Self {
        Self {
            settings,
            mode,
            endpoints: HashMap::new(),
            clients: ClientCache::new(),
        }
    }

    /// Use `urls` for `chain_id` instead of the configured endpoints
    pub fn with_endpoints(mut self, chain_id: u64, urls: Vec<String>) -> Self {
        self.endpoints.insert(chain_id, urls);
        self
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.rpc.clone(), config.batch_mode)
    }

    /// Client for a chain, built on first use
    pub fn client(&self, chain_id: u64) -> Result<Arc<RpcProvider>> {
        if chain(chain_id).is_none() {
            return Err(AppError::unsupported_chain(chain_id).into());
        }
        self.clients
            .get_or_try_init(chain_id, || match self.endpoints.get(&chain_id) {
                Some(urls) => RpcProvider::with_urls(chain_id, urls.clone(), &self.settings),
                None => RpcProvider::new(chain_id, &self.settings),
            })
    }

    /// One `aggregate3` per chunk of calls
    async fn read_multicall(
        &self,
        client: &RpcProvider,
        calls: &[ReadCall],
    ) -> Result<Vec<CallOutcome>> {
        let mut outcomes = Vec::with_capacity(calls.len());
        for chunk in calls.chunks(MAX_BATCH_SIZE) {
            let data = AllowanceDecoder::encode_aggregate3(chunk);
            let ret = client.eth_call(*MULTICALL3, &data).await?;
            outcomes.extend(AllowanceDecoder::decode_aggregate3(&ret, chunk.len())?);
        }
        Ok(outcomes)
    }

    /// One `eth_call` per read, all in one JSON-RPC batch; failures stay per call
    async fn read_individually(
        &self,
        client: &RpcProvider,
        calls: &[ReadCall],
    ) -> Result<Vec<CallOutcome>> {
        let requests: Vec<(Address, Bytes)> = calls
            .iter()
            .map(|call| (call.target, call.calldata.clone()))
            .collect();
        let results = client.eth_call_batch(&requests).await?;
        Ok(results
            .into_iter()
            .map(|res| match res {
                Ok(data) => CallOutcome::Success(data),
                Err(e) => CallOutcome::Failure(e.to_string()),
            })
            .collect())
    }
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn read_many(&self, chain_id: u64, calls: &[ReadCall]) -> Result<Vec<CallOutcome>> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }
        let client = self.client(chain_id)?;

        if self.mode == BatchMode::Multicall {
            match self.read_multicall(&client, calls).await {
                Ok(outcomes) => {
                    debug!("📦 aggregate3 on chain {}: {} calls", chain_id, calls.len());
                    return Ok(outcomes);
                }
                // A throttled endpoint gets no per-call retry
                Err(e) if is_rate_limited(&e) => {
                    warn!("⏳ aggregate3 rate limited on chain {}: {}", chain_id, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        "⚠️ aggregate3 failed on chain {}, reading {} calls individually: {}",
                        chain_id,
                        calls.len(),
                        e
                    );
                }
            }
        }

        self.read_individually(&client, calls).await
    }
}
