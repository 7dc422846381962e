//! API Request Handlers

use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::types::*;
use crate::core::revoke::RevokeReceipt;
use crate::core::scanner::Scanner;
use crate::core::session::ScanSession;
use crate::models::config::AppConfig;
use crate::models::errors::AppError;
use crate::models::types::ScanTarget;
use crate::providers::reader::{ChainReader, RpcChainReader};
use crate::providers::wallet::{LocalWallet, WalletSigner};
use crate::utils::address::{parse_hex_address, to_checksum};
use crate::utils::constants::all_chains;

type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<()>>)>;

/// Shared application state
pub struct AppState {
    pub scanner: Scanner<dyn ChainReader>,
    pub session: ScanSession,
    /// `None` when no signing key is configured (revoke disabled)
    pub signer: Option<Arc<dyn WalletSigner>>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(scanner: Scanner<dyn ChainReader>, signer: Option<Arc<dyn WalletSigner>>) -> Self {
        Self {
            scanner,
            session: ScanSession::new(),
            signer,
            start_time: Instant::now(),
        }
    }

    /// RPC-backed state from the environment configuration
    pub fn from_config(config: &AppConfig) -> Self {
        let reader: Arc<dyn ChainReader> = Arc::new(RpcChainReader::from_config(config));
        let scanner = Scanner::new(reader, config.risk);

        let signer: Option<Arc<dyn WalletSigner>> = match config.private_key.as_deref() {
            Some(key) => match LocalWallet::from_key(key) {
                Ok(wallet) => Some(Arc::new(wallet)),
                Err(e) => {
                    warn!("⚠️ Revoke disabled: {}", e);
                    None
                }
            },
            None => {
                info!("ℹ️ No signing key configured, revoke disabled");
                None
            }
        };

        Self::new(scanner, signer)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn fail(err: &AppError, start: Instant) -> (StatusCode, Json<ApiResponse<()>>) {
    let status =
        StatusCode::from_u16(err.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ApiResponse::error(ApiError::from(err), elapsed_ms(start))),
    )
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        scan_status: state.session.status(),
        revoke_enabled: state.signer.is_some(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Chains
// ============================================

pub async fn list_chains() -> Json<ApiResponse<Vec<ChainInfo>>> {
    let start = Instant::now();
    let chains = all_chains().iter().map(ChainInfo::from).collect();
    Json(ApiResponse::success(chains, elapsed_ms(start)))
}

// ============================================
// Scan
// ============================================

pub async fn scan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScanRequest>,
) -> ApiResult<ScanData> {
    let start = Instant::now();
    let target = ScanTarget::from(req.chain_id);

    let report = state
        .session
        .run_scan(&state.scanner, &req.address, &target)
        .await
        .map_err(|e| {
            warn!("⚠️ Scan failed: {}", e);
            fail(&e, start)
        })?;

    Ok(Json(ApiResponse::success(
        ScanData::from(report),
        elapsed_ms(start),
    )))
}

/// Current result list (after optimistic revoke removals)
pub async fn get_findings(State(state): State<Arc<AppState>>) -> Json<ApiResponse<FindingsData>> {
    let start = Instant::now();
    let snapshot = state.session.snapshot();

    let data = FindingsData {
        status: snapshot.status,
        owner: snapshot.owner.as_ref().map(to_checksum),
        summary: snapshot.summary,
        findings: snapshot.findings.into_iter().map(FindingView::from).collect(),
        issues: snapshot.issues.into_iter().map(IssueView::from).collect(),
        last_error: snapshot.last_error,
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Revoke
// ============================================

pub async fn revoke(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RevokeRequest>,
) -> ApiResult<RevokeReceipt> {
    let start = Instant::now();

    let (token, spender) = match (
        parse_hex_address(&req.token),
        parse_hex_address(&req.spender),
    ) {
        (Ok(token), Ok(spender)) => (token, spender),
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(
                    ApiError::bad_request("Invalid token or spender address format"),
                    elapsed_ms(start),
                )),
            ))
        }
    };

    let signer = state
        .signer
        .as_ref()
        .ok_or_else(|| fail(&AppError::not_connected(), start))?;

    let receipt = state
        .session
        .revoke(signer.as_ref(), req.chain_id, &token, &spender)
        .await
        .map_err(|e| {
            warn!("⚠️ Revoke failed: {}", e);
            fail(&e, start)
        })?;

    Ok(Json(ApiResponse::success(receipt, elapsed_ms(start))))
}
