//! API Request/Response Types

use serde::{Deserialize, Serialize};

use crate::core::risk::recommendation;
use crate::core::session::ScanStatus;
use crate::models::errors::AppError;
use crate::models::types::{Finding, ScanIssue, ScanReport, ScanSummary};
use crate::utils::address::to_checksum;
use crate::utils::constants::{spenders_for, tokens_for, Chain};

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            code: "RATE_LIMITED".to_string(),
            message: format!("Rate limit exceeded. Retry after {} seconds", retry_after),
            details: Some(format!("retry_after: {}", retry_after)),
        }
    }
}

impl From<&AppError> for ApiError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code_str().to_string(),
            message: err.message.clone(),
            details: err.code.is_retryable().then(|| "retryable".to_string()),
        }
    }
}

// ============================================
// Health
// ============================================

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub scan_status: ScanStatus,
    pub revoke_enabled: bool,
}

// ============================================
// Chains
// ============================================

#[derive(Debug, Serialize)]
pub struct ChainInfo {
    pub chain_id: u64,
    pub name: String,
    pub explorer: Option<String>,
    pub tokens: Vec<String>,
    pub spenders: Vec<String>,
}

impl From<&Chain> for ChainInfo {
    fn from(chain: &Chain) -> Self {
        Self {
            chain_id: chain.id,
            name: chain.name.to_string(),
            explorer: chain.explorer.map(String::from),
            tokens: tokens_for(chain.id)
                .iter()
                .map(|t| t.symbol.to_string())
                .collect(),
            spenders: spenders_for(chain.id)
                .iter()
                .map(|s| s.label.to_string())
                .collect(),
        }
    }
}

// ============================================
// Scan
// ============================================

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    /// Hex address or ENS name
    pub address: String,
    /// Limit the scan to one chain; all chains when absent
    #[serde(default)]
    pub chain_id: Option<u64>,
}

/// Finding plus presentation extras
#[derive(Debug, Serialize)]
pub struct FindingView {
    #[serde(flatten)]
    pub finding: Finding,
    /// Exact raw allowance in base-10
    pub raw_allowance_dec: String,
    pub unlimited: bool,
    pub recommendation: &'static str,
    pub token_explorer_url: Option<String>,
    pub spender_explorer_url: Option<String>,
}

impl From<Finding> for FindingView {
    fn from(finding: Finding) -> Self {
        Self {
            raw_allowance_dec: finding.raw_allowance.to_string(),
            unlimited: finding.is_unlimited(),
            recommendation: recommendation(finding.risk),
            token_explorer_url: finding.token_explorer_url(),
            spender_explorer_url: finding.spender_explorer_url(),
            finding,
        }
    }
}

/// Issue plus guidance text
#[derive(Debug, Serialize)]
pub struct IssueView {
    #[serde(flatten)]
    pub issue: ScanIssue,
    pub hint: Option<&'static str>,
}

impl From<ScanIssue> for IssueView {
    fn from(issue: ScanIssue) -> Self {
        Self {
            hint: issue.hint(),
            issue,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScanData {
    pub owner: String,
    pub summary: ScanSummary,
    pub findings: Vec<FindingView>,
    pub issues: Vec<IssueView>,
    pub failed_reads: usize,
    pub chains_scanned: Vec<u64>,
    pub chains_skipped: Vec<u64>,
    pub duration_ms: u64,
}

impl From<ScanReport> for ScanData {
    fn from(report: ScanReport) -> Self {
        Self {
            owner: to_checksum(&report.owner),
            summary: report.summary(),
            failed_reads: report.failure_count(),
            findings: report.findings.into_iter().map(FindingView::from).collect(),
            issues: report.issues.into_iter().map(IssueView::from).collect(),
            chains_scanned: report.chains_scanned,
            chains_skipped: report.chains_skipped,
            duration_ms: report.duration_ms,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FindingsData {
    pub status: ScanStatus,
    pub owner: Option<String>,
    pub summary: ScanSummary,
    pub findings: Vec<FindingView>,
    pub issues: Vec<IssueView>,
    pub last_error: Option<String>,
}

// ============================================
// Revoke
// ============================================

#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    pub chain_id: u64,
    /// Token contract, 0x-prefixed
    pub token: String,
    /// Spender contract, 0x-prefixed
    pub spender: String,
}
