//! Blockchain write interface
//!
//! The revoke flow only needs four things from a wallet: which account is
//! connected, which network it is on, a way to switch networks, and a way to
//! submit `approve(spender, amount)`. Signing and transaction construction are
//! left to alloy.

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use eyre::{eyre, Result};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

use crate::models::config::rpc_urls_for;
use crate::models::errors::{AppError, ErrorCode};
use crate::utils::address::short;
use crate::utils::constants::{chain, chain_name, MAINNET_CHAIN_ID};
use crate::utils::decoder::AllowanceDecoder;

/// Signing wallet as seen by the revoke flow
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Connected account, `None` when nothing is connected
    fn account(&self) -> Option<Address>;

    /// Network the wallet currently signs for
    async fn active_chain(&self) -> Result<u64>;

    /// Ask the wallet to move to `chain_id`; `Err` when refused
    async fn switch_chain(&self, chain_id: u64) -> Result<()>;

    /// Submit `approve(spender, amount)` on `token`; returns once the
    /// transaction is accepted, without waiting for inclusion
    async fn submit_approve(
        &self,
        chain_id: u64,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash>;
}

/// Local private-key wallet broadcasting through the chain's RPC endpoint
pub struct LocalWallet {
    signer: PrivateKeySigner,
    active_chain: AtomicU64,
}

impl LocalWallet {
    /// Build from a hex private key (with or without `0x`)
    pub fn from_key(key: &str) -> Result<Self> {
        let signer = PrivateKeySigner::from_str(key.trim()).map_err(|e| {
            AppError::new(
                ErrorCode::ConfigInvalidValue,
                format!("invalid private key: {}", e),
            )
        })?;
        info!("🔑 Local wallet ready for {}", short(&signer.address()));
        Ok(Self {
            signer,
            active_chain: AtomicU64::new(MAINNET_CHAIN_ID),
        })
    }

    /// Build from `ALLOWANCE_WATCH_PRIVATE_KEY` as loaded into the config
    pub fn from_config(private_key: Option<&str>) -> Result<Self> {
        match private_key {
            Some(key) => Self::from_key(key),
            None => Err(AppError::missing_signer().into()),
        }
    }

    fn endpoint(chain_id: u64) -> Result<Url> {
        let url = rpc_urls_for(chain_id)
            .into_iter()
            .next()
            .ok_or_else(|| AppError::unsupported_chain(chain_id))?;
        Url::parse(&url).map_err(|e| eyre!("invalid RPC URL for chain {}: {}", chain_id, e))
    }
}

#[async_trait]
impl WalletSigner for LocalWallet {
    fn account(&self) -> Option<Address> {
        Some(self.signer.address())
    }

    async fn active_chain(&self) -> Result<u64> {
        Ok(self.active_chain.load(Ordering::Relaxed))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<()> {
        if chain(chain_id).is_none() {
            warn!("⚠️ Refusing to switch to unknown chain {}", chain_id);
            return Err(AppError::unsupported_chain(chain_id).into());
        }
        self.active_chain.store(chain_id, Ordering::Relaxed);
        info!("🔀 Wallet switched to {}", chain_name(chain_id));
        Ok(())
    }

    async fn submit_approve(
        &self,
        chain_id: u64,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash> {
        let wallet = EthereumWallet::from(self.signer.clone());
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(Self::endpoint(chain_id)?);

        let tx = TransactionRequest::default()
            .with_from(self.signer.address())
            .with_to(token)
            .with_chain_id(chain_id)
            .with_input(AllowanceDecoder::encode_approve(spender, amount));

        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|e| eyre!("{}", e))?;
        Ok(*pending.tx_hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known anvil/hardhat account #0
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_local_wallet_account() {
        let wallet = LocalWallet::from_key(TEST_KEY).unwrap();
        assert_eq!(
            wallet.account().unwrap(),
            Address::from_str("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap()
        );
    }

    #[test]
    fn test_bad_key_and_missing_key() {
        assert!(LocalWallet::from_key("not-a-key").is_err());
        assert!(LocalWallet::from_config(None).is_err());
    }

    #[tokio::test]
    async fn test_switch_chain() {
        let wallet = LocalWallet::from_key(TEST_KEY).unwrap();
        assert_eq!(wallet.active_chain().await.unwrap(), MAINNET_CHAIN_ID);
        wallet.switch_chain(8453).await.unwrap();
        assert_eq!(wallet.active_chain().await.unwrap(), 8453);
        assert!(wallet.switch_chain(999).await.is_err());
        assert_eq!(wallet.active_chain().await.unwrap(), 8453);
    }
}
