//! Allowance Watch Library
//!
//! Multi-chain ERC-20 allowance scanner:
//! - Batched `allowance(owner, spender)` reads through Multicall3
//! - Risk labels from the allowance size (unlimited / high / medium / low)
//! - Revoke via `approve(spender, 0)` from the scanned wallet
//! - ENS owner input, local address book and recent list

pub mod api;
pub mod core;
pub mod models;
pub mod providers;
pub mod store;
pub mod utils;

pub use crate::core::{revoke, RevokeReceipt, ScanSession, ScanStatus, Scanner};
pub use models::{
    AppConfig, AppError, AppResult, ErrorCode, Finding, RiskLevel, ScanIssue, ScanReport,
    ScanSummary, ScanTarget,
};
pub use providers::{ChainReader, LocalWallet, RpcChainReader, WalletSigner};
