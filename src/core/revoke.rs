//! Revoke Action
//!
//! Sets one allowance back to zero with `approve(spender, 0)`, signed by the
//! wallet that was scanned. Nothing is submitted unless the connected account
//! is the scanned owner and the wallet is on the finding's chain.

use alloy_primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::models::errors::{AppError, AppResult};
use crate::models::types::Finding;
use crate::providers::wallet::WalletSigner;
use crate::utils::address::short;
use crate::utils::constants::chain;

/// Submitted revoke transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokeReceipt {
    pub chain_id: u64,
    pub chain_name: String,
    pub token: Address,
    pub token_symbol: String,
    pub spender: Address,
    pub spender_label: String,
    pub tx_hash: TxHash,
    /// Block explorer link for the transaction, when the chain has one
    pub explorer_url: Option<String>,
}

/// Revoke the allowance described by `finding`
///
/// Returns as soon as the wallet accepted the transaction; inclusion is not
/// awaited.
pub async fn revoke<S: WalletSigner + ?Sized>(
    signer: &S,
    finding: &Finding,
    scanned_owner: Address,
) -> AppResult<RevokeReceipt> {
    let account = signer.account().ok_or_else(AppError::not_connected)?;

    // Address equality is byte-wise, so checksum casing never matters here.
    if account != scanned_owner {
        warn!(
            "🚫 Revoke refused: connected {} but scanned {}",
            short(&account),
            short(&scanned_owner)
        );
        return Err(AppError::account_mismatch());
    }

    let active = match signer.active_chain().await {
        Ok(id) => Some(id),
        Err(e) => {
            warn!("⚠️ Could not read wallet network: {}", e);
            None
        }
    };
    if active != Some(finding.chain_id) {
        info!("🔀 Switching wallet to {}", finding.chain_name);
        if let Err(e) = signer.switch_chain(finding.chain_id).await {
            warn!("🚫 Network switch rejected: {}", e);
            return Err(AppError::switch_rejected(&finding.chain_name, e.to_string()));
        }
    }

    info!(
        "🧹 Revoking {} allowance for {} on {}",
        finding.token_symbol, finding.spender_label, finding.chain_name
    );

    let tx_hash = signer
        .submit_approve(
            finding.chain_id,
            finding.token_address,
            finding.spender_address,
            U256::ZERO,
        )
        .await
        .map_err(|e| {
            error!("❌ Revoke submission failed: {}", e);
            AppError::submit_failed(e.to_string())
        })?;

    let explorer_url = chain(finding.chain_id).and_then(|c| c.tx_url(&tx_hash.to_string()));
    info!("✅ Revoke submitted: {}", tx_hash);

    Ok(RevokeReceipt {
        chain_id: finding.chain_id,
        chain_name: finding.chain_name.clone(),
        token: finding.token_address,
        token_symbol: finding.token_symbol.clone(),
        spender: finding.spender_address,
        spender_label: finding.spender_label.clone(),
        tx_hash,
        explorer_url,
    })
}
