//! Type definitions for allowance scanning
//! Findings, issues and the per-scan report

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::utils::constants::{chain, SUPPORTED_CHAIN_IDS, UNLIMITED_THRESHOLD};

/// Coarse risk label for a positive allowance
///
/// Variants are declared in increasing order of severity, so the derived
/// `Ord` matches the risk ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Small, bounded allowance
    Low,
    /// Sizeable allowance
    Medium,
    /// Very large allowance
    High,
    /// Effectively unlimited (>= 2^255)
    Unlimited,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Unlimited => "unlimited/high",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RiskLevel::Low => "🟡",
            RiskLevel::Medium => "🟠",
            RiskLevel::High => "🔴",
            RiskLevel::Unlimited => "💀",
        }
    }
}

/// One positive allowance discovered during a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub chain_id: u64,
    pub chain_name: String,
    pub token_symbol: String,
    pub token_address: Address,
    pub spender_label: String,
    pub spender_address: Address,
    /// Exact on-chain value
    pub raw_allowance: U256,
    /// Precision used for display (static, on-chain, or the 18 fallback)
    pub decimals: u8,
    /// Human-readable amount ("Unlimited" for unlimited approvals)
    pub amount_display: String,
    pub risk: RiskLevel,
}

impl Finding {
    /// Allowance at or above the unlimited threshold
    pub fn is_unlimited(&self) -> bool {
        self.raw_allowance >= *UNLIMITED_THRESHOLD
    }

    /// True when this finding is the (chain, token, spender) triple
    pub fn matches(&self, chain_id: u64, token: &Address, spender: &Address) -> bool {
        self.chain_id == chain_id && &self.token_address == token && &self.spender_address == spender
    }

    pub fn token_explorer_url(&self) -> Option<String> {
        chain(self.chain_id).and_then(|c| c.address_url(&self.token_address))
    }

    pub fn spender_explorer_url(&self) -> Option<String> {
        chain(self.chain_id).and_then(|c| c.address_url(&self.spender_address))
    }

    /// One-line summary for terminal output
    pub fn summary(&self) -> String {
        format!(
            "{} {:<18} {:<6} {:<22} {} {} [{}]",
            self.risk.emoji(),
            self.chain_name,
            self.token_symbol,
            self.spender_label,
            self.amount_display,
            self.token_symbol,
            self.risk.as_str()
        )
    }
}

/// What went wrong for a recoverable scan issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IssueKind {
    /// Allowance read for one (token, spender) pair failed; pair skipped
    ReadFailed { token: Address, spender: Address },
    /// `decimals()` could not be read; 18 assumed
    DecimalsFallback { token: Address },
}

/// A recoverable problem met during a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanIssue {
    pub chain_id: u64,
    pub chain_name: String,
    pub kind: IssueKind,
    pub message: String,
    pub rate_limited: bool,
}

impl ScanIssue {
    pub fn new(
        chain_id: u64,
        chain_name: &str,
        kind: IssueKind,
        message: impl Into<String>,
        rate_limited: bool,
    ) -> Self {
        Self {
            chain_id,
            chain_name: chain_name.to_string(),
            kind,
            message: message.into(),
            rate_limited,
        }
    }

    /// True for issues that count as failed reads (not soft fallbacks)
    pub fn is_read_failure(&self) -> bool {
        matches!(self.kind, IssueKind::ReadFailed { .. })
    }

    /// Guidance shown next to the raw message
    pub fn hint(&self) -> Option<&'static str> {
        if self.rate_limited {
            Some("The RPC endpoint is rate limiting requests. Retry in a minute or set a dedicated <CHAIN>_RPC_URL.")
        } else {
            match self.kind {
                IssueKind::DecimalsFallback { .. } => {
                    Some("Token precision unknown; amounts shown assuming 18 decimals.")
                }
                IssueKind::ReadFailed { .. } => None,
            }
        }
    }
}

/// Which chains a scan covers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanTarget {
    /// Every chain in the registry
    #[default]
    AllConfigured,
    /// A single chain
    Single(u64),
}

impl ScanTarget {
    pub fn chain_ids(&self) -> Vec<u64> {
        match self {
            ScanTarget::AllConfigured => SUPPORTED_CHAIN_IDS.to_vec(),
            ScanTarget::Single(id) => vec![*id],
        }
    }
}

impl From<Option<u64>> for ScanTarget {
    fn from(chain_id: Option<u64>) -> Self {
        chain_id.map(ScanTarget::Single).unwrap_or_default()
    }
}

/// Headline numbers for a set of findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub approvals: usize,
    pub unlimited: usize,
    pub chains: usize,
}

impl ScanSummary {
    pub fn of(findings: &[Finding]) -> Self {
        let mut chains: Vec<u64> = findings.iter().map(|f| f.chain_id).collect();
        chains.sort_unstable();
        chains.dedup();
        Self {
            approvals: findings.len(),
            unlimited: findings.iter().filter(|f| f.is_unlimited()).count(),
            chains: chains.len(),
        }
    }
}

/// Result of one scan pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub owner: Address,
    /// Sorted findings (see `core::scanner::sort_findings`)
    pub findings: Vec<Finding>,
    pub issues: Vec<ScanIssue>,
    pub chains_scanned: Vec<u64>,
    /// Requested chains with no tokens or no spenders configured
    pub chains_skipped: Vec<u64>,
    pub duration_ms: u64,
}

impl ScanReport {
    pub fn summary(&self) -> ScanSummary {
        ScanSummary::of(&self.findings)
    }

    /// Number of (token, spender) reads that failed
    pub fn failure_count(&self) -> usize {
        self.issues.iter().filter(|i| i.is_read_failure()).count()
    }

    /// True when any issue was caused by rate limiting
    pub fn rate_limited(&self) -> bool {
        self.issues.iter().any(|i| i.rate_limited)
    }
}
