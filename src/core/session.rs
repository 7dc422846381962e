//! Scan Session
//!
//! Holds the result list shown to the user between a scan and the revokes
//! that follow it. Every scan takes a ticket; results carrying an outdated
//! ticket are dropped, so a slow earlier scan can never overwrite a newer one.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tracing::{debug, info};

use super::revoke::{revoke, RevokeReceipt};
use super::scanner::Scanner;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{Finding, ScanIssue, ScanReport, ScanSummary, ScanTarget};
use crate::providers::reader::ChainReader;
use crate::providers::wallet::WalletSigner;

/// What the session is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Idle,
    Scanning,
    Done,
}

/// Proof of which scan a result belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTicket {
    generation: u64,
}

impl ScanTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Serializable view of the session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status: ScanStatus,
    pub owner: Option<Address>,
    pub findings: Vec<Finding>,
    pub issues: Vec<ScanIssue>,
    pub summary: ScanSummary,
    pub last_error: Option<String>,
}

#[derive(Debug)]
struct SessionState {
    status: ScanStatus,
    owner: Option<Address>,
    findings: Vec<Finding>,
    issues: Vec<ScanIssue>,
    last_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            status: ScanStatus::Idle,
            owner: None,
            findings: Vec::new(),
            issues: Vec::new(),
            last_error: None,
        }
    }
}

/// Current scan results plus the stale-result guard
#[derive(Debug, Default)]
pub struct ScanSession {
    generation: AtomicU64,
    state: RwLock<SessionState>,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ScanStatus {
        self.state
            .read()
            .map(|s| s.status)
            .unwrap_or(ScanStatus::Idle)
    }

    /// Start a new scan: invalidates outstanding tickets and clears results
    pub fn begin(&self) -> ScanTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut state) = self.state.write() {
            *state = SessionState {
                status: ScanStatus::Scanning,
                ..SessionState::default()
            };
        }
        debug!("🎫 Scan ticket #{}", generation);
        ScanTicket { generation }
    }

    fn is_current(&self, ticket: &ScanTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.generation
    }

    /// Store a finished scan; `false` (and no change) if a newer scan started
    pub fn complete(&self, ticket: ScanTicket, report: ScanReport) -> bool {
        if !self.is_current(&ticket) {
            debug!("🗑️ Dropping stale scan #{}", ticket.generation);
            return false;
        }
        match self.state.write() {
            Ok(mut state) => {
                *state = SessionState {
                    status: ScanStatus::Done,
                    owner: Some(report.owner),
                    findings: report.findings,
                    issues: report.issues,
                    last_error: None,
                };
                true
            }
            Err(_) => false,
        }
    }

    /// Record a failed scan; `false` if a newer scan started
    pub fn fail(&self, ticket: ScanTicket, error: &AppError) -> bool {
        if !self.is_current(&ticket) {
            return false;
        }
        match self.state.write() {
            Ok(mut state) => {
                *state = SessionState {
                    status: ScanStatus::Done,
                    last_error: Some(error.to_string()),
                    ..SessionState::default()
                };
                true
            }
            Err(_) => false,
        }
    }

    pub fn owner(&self) -> Option<Address> {
        self.state.read().ok().and_then(|s| s.owner)
    }

    pub fn findings(&self) -> Vec<Finding> {
        self.state
            .read()
            .map(|s| s.findings.clone())
            .unwrap_or_default()
    }

    pub fn issues(&self) -> Vec<ScanIssue> {
        self.state
            .read()
            .map(|s| s.issues.clone())
            .unwrap_or_default()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        match self.state.read() {
            Ok(state) => SessionSnapshot {
                status: state.status,
                owner: state.owner,
                findings: state.findings.clone(),
                issues: state.issues.clone(),
                summary: ScanSummary::of(&state.findings),
                last_error: state.last_error.clone(),
            },
            Err(_) => SessionSnapshot {
                status: ScanStatus::Idle,
                owner: None,
                findings: Vec::new(),
                issues: Vec::new(),
                summary: ScanSummary::of(&[]),
                last_error: None,
            },
        }
    }

    /// Finding for a (chain, token, spender) triple, if still listed
    pub fn find(&self, chain_id: u64, token: &Address, spender: &Address) -> Option<Finding> {
        self.state.read().ok().and_then(|s| {
            s.findings
                .iter()
                .find(|f| f.matches(chain_id, token, spender))
                .cloned()
        })
    }

    /// Drop a finding from the list (optimistic, after a submitted revoke)
    pub fn remove_finding(&self, chain_id: u64, token: &Address, spender: &Address) -> bool {
        match self.state.write() {
            Ok(mut state) => {
                let before = state.findings.len();
                state.findings.retain(|f| !f.matches(chain_id, token, spender));
                state.findings.len() != before
            }
            Err(_) => false,
        }
    }

    /// Scan and store the result unless a newer scan overtook this one
    pub async fn run_scan<R: ChainReader + ?Sized>(
        &self,
        scanner: &Scanner<R>,
        input: &str,
        target: &ScanTarget,
    ) -> AppResult<ScanReport> {
        let ticket = self.begin();
        match scanner.scan(input, target).await {
            Ok(report) => {
                self.complete(ticket, report.clone());
                Ok(report)
            }
            Err(e) => {
                self.fail(ticket, &e);
                Err(e)
            }
        }
    }

    /// Revoke a listed finding on behalf of the scanned owner
    pub async fn revoke<S: WalletSigner + ?Sized>(
        &self,
        signer: &S,
        chain_id: u64,
        token: &Address,
        spender: &Address,
    ) -> AppResult<RevokeReceipt> {
        let owner = self.owner().ok_or_else(AppError::finding_not_found)?;
        let finding = self
            .find(chain_id, token, spender)
            .ok_or_else(AppError::finding_not_found)?;

        let receipt = revoke(signer, &finding, owner).await?;
        if self.remove_finding(chain_id, token, spender) {
            info!(
                "🧹 Removed {} / {} from results",
                finding.token_symbol, finding.spender_label
            );
        }
        Ok(receipt)
    }
}
