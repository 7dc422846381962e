//! Allowance Watch API Server
//!
//! JSON API over the allowance scanner
//!
//! Usage:
//!   cargo run --bin allowance_api
//!
//! Environment:
//!   ALLOWANCE_WATCH_PORT / PORT - Server port (default: 8080)
//!   ALLOWANCE_WATCH_HOST        - Server host (default: 0.0.0.0)
//!   ALLOWANCE_WATCH_PRIVATE_KEY - Enables POST /v1/revoke
//!   <CHAIN>_RPC_URL             - Per-chain RPC override
//!   RUST_LOG                    - Log level (default: info)

use allowance_watch::api::{create_router, start_cleanup_task, AppState};
use allowance_watch::models::AppConfig;
use allowance_watch::utils::constants::{APP_NAME, APP_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = AppConfig::from_env();
    let state = Arc::new(AppState::from_config(&config));

    start_cleanup_task();
    info!("🧹 Background cleanup task started");

    let app = create_router(state);

    // PORT is what most PaaS hosts inject; ALLOWANCE_WATCH_PORT for local runs
    let host = std::env::var("ALLOWANCE_WATCH_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("ALLOWANCE_WATCH_PORT"))
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    info!("🚀 {} API v{} starting on http://{}", APP_NAME, APP_VERSION, addr);
    info!("");
    info!("Endpoints:");
    info!("  GET  /v1/health    - Health check");
    info!("  GET  /v1/chains    - Supported chains, tokens and spenders");
    info!("  POST /v1/scan      - Scan an address or ENS name");
    info!("  GET  /v1/findings  - Current result list");
    info!("  POST /v1/revoke    - Revoke one allowance (needs signing key)");
    info!("");
    info!("Press Ctrl+C for graceful shutdown");

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("⚠️ Failed to listen for Ctrl+C: {}", e);
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("👋 {} API shutdown complete", APP_NAME);
    Ok(())
}
