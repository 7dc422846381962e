//! Revoke flow tests with a scripted wallet

use allowance_watch::core::{revoke, ScanSession};
use allowance_watch::models::{ErrorCode, Finding, RiskLevel, ScanReport};
use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use eyre::{eyre, Result};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

const OWNER: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";
const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
const ROUTER: &str = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D";

type Submission = (u64, Address, Address, U256);

struct MockWallet {
    account: Option<Address>,
    active: AtomicU64,
    reject_switch: bool,
    fail_submit: bool,
    switches: Mutex<Vec<u64>>,
    submissions: Mutex<Vec<Submission>>,
}

impl MockWallet {
    fn connected(account: Address, chain_id: u64) -> Self {
        Self {
            account: Some(account),
            active: AtomicU64::new(chain_id),
            reject_switch: false,
            fail_submit: false,
            switches: Mutex::new(Vec::new()),
            submissions: Mutex::new(Vec::new()),
        }
    }

    fn switches(&self) -> Vec<u64> {
        self.switches.lock().unwrap().clone()
    }

    fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl allowance_watch::providers::WalletSigner for MockWallet {
    fn account(&self) -> Option<Address> {
        self.account
    }

    async fn active_chain(&self) -> Result<u64> {
        Ok(self.active.load(Ordering::SeqCst))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<()> {
        self.switches.lock().unwrap().push(chain_id);
        if self.reject_switch {
            return Err(eyre!("User rejected the request"));
        }
        self.active.store(chain_id, Ordering::SeqCst);
        Ok(())
    }

    async fn submit_approve(
        &self,
        chain_id: u64,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxHash> {
        if self.fail_submit {
            return Err(eyre!("insufficient funds for gas"));
        }
        self.submissions
            .lock()
            .unwrap()
            .push((chain_id, token, spender, amount));
        Ok(TxHash::repeat_byte(0xab))
    }
}

fn owner() -> Address {
    Address::from_str(OWNER).unwrap()
}

fn usdc() -> Address {
    Address::from_str(USDC).unwrap()
}

fn router() -> Address {
    Address::from_str(ROUTER).unwrap()
}

fn finding() -> Finding {
    Finding {
        chain_id: 1,
        chain_name: "Ethereum".to_string(),
        token_symbol: "USDC".to_string(),
        token_address: usdc(),
        spender_label: "Uniswap V2 Router".to_string(),
        spender_address: router(),
        raw_allowance: U256::MAX,
        decimals: 6,
        amount_display: "Unlimited".to_string(),
        risk: RiskLevel::Unlimited,
    }
}

#[tokio::test]
async fn test_revoke_submits_zero_approval() {
    let wallet = MockWallet::connected(owner(), 1);
    let receipt = revoke(&wallet, &finding(), owner()).await.unwrap();

    assert_eq!(wallet.submissions(), vec![(1, usdc(), router(), U256::ZERO)]);
    assert!(wallet.switches().is_empty());
    assert_eq!(receipt.tx_hash, TxHash::repeat_byte(0xab));
    assert!(receipt
        .explorer_url
        .unwrap()
        .starts_with("https://etherscan.io/tx/0xabab"));
}

#[tokio::test]
async fn test_account_mismatch_submits_nothing() {
    let wallet = MockWallet::connected(Address::repeat_byte(0x01), 1);
    let err = revoke(&wallet, &finding(), owner()).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::RevokeAccountMismatch);
    assert!(wallet.submissions().is_empty());
    assert!(wallet.switches().is_empty());
}

#[tokio::test]
async fn test_owner_casing_does_not_matter() {
    // Same account typed in lowercase by the user
    let scanned = Address::from_str(&OWNER.to_lowercase()).unwrap();
    let wallet = MockWallet::connected(owner(), 1);
    assert!(revoke(&wallet, &finding(), scanned).await.is_ok());
}

#[tokio::test]
async fn test_disconnected_wallet_is_refused() {
    let mut wallet = MockWallet::connected(owner(), 1);
    wallet.account = None;
    let err = revoke(&wallet, &finding(), owner()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::RevokeNotConnected);
    assert!(wallet.submissions().is_empty());
}

#[tokio::test]
async fn test_wallet_is_switched_to_the_finding_chain() {
    let wallet = MockWallet::connected(owner(), 8453);
    revoke(&wallet, &finding(), owner()).await.unwrap();

    assert_eq!(wallet.switches(), vec![1]);
    assert_eq!(wallet.submissions().len(), 1);
    assert_eq!(wallet.submissions()[0].0, 1);
}

#[tokio::test]
async fn test_rejected_switch_submits_nothing() {
    let mut wallet = MockWallet::connected(owner(), 8453);
    wallet.reject_switch = true;
    let err = revoke(&wallet, &finding(), owner()).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::RevokeSwitchRejected);
    assert!(err.message.contains("Ethereum"));
    assert!(err.message.contains("User rejected the request"));
    assert!(wallet.submissions().is_empty());
}

#[tokio::test]
async fn test_submit_failure_carries_reason() {
    let mut wallet = MockWallet::connected(owner(), 1);
    wallet.fail_submit = true;
    let err = revoke(&wallet, &finding(), owner()).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::RevokeSubmitFailed);
    assert!(err.message.contains("insufficient funds"));
}

fn report_with(findings: Vec<Finding>) -> ScanReport {
    ScanReport {
        owner: owner(),
        findings,
        issues: Vec::new(),
        chains_scanned: vec![1],
        chains_skipped: Vec::new(),
        duration_ms: 3,
    }
}

#[tokio::test]
async fn test_session_removes_revoked_finding() {
    let mut other = finding();
    other.spender_address = Address::repeat_byte(0x77);
    other.spender_label = "Other".to_string();

    let session = ScanSession::new();
    let ticket = session.begin();
    assert!(session.complete(ticket, report_with(vec![finding(), other.clone()])));

    let wallet = MockWallet::connected(owner(), 1);
    session.revoke(&wallet, 1, &usdc(), &router()).await.unwrap();

    assert_eq!(session.findings(), vec![other]);
}

#[tokio::test]
async fn test_session_keeps_finding_when_revoke_fails() {
    let session = ScanSession::new();
    let ticket = session.begin();
    session.complete(ticket, report_with(vec![finding()]));

    let wallet = MockWallet::connected(Address::repeat_byte(0x01), 1);
    assert!(session.revoke(&wallet, 1, &usdc(), &router()).await.is_err());
    assert_eq!(session.findings().len(), 1);
}

#[tokio::test]
async fn test_session_rejects_unknown_finding() {
    let session = ScanSession::new();
    let wallet = MockWallet::connected(owner(), 1);

    let err = session.revoke(&wallet, 1, &usdc(), &router()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::RevokeFindingNotFound);

    let ticket = session.begin();
    session.complete(ticket, report_with(vec![finding()]));
    let err = session
        .revoke(&wallet, 56, &usdc(), &router())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::RevokeFindingNotFound);
    assert!(wallet.submissions().is_empty());
}
