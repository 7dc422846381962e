//! Runtime configuration
//!
//! All tunables come from the environment; registry data lives in
//! `utils::constants`.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::utils::constants::{
    chain, DEFAULT_HIGH_UNITS, DEFAULT_MEDIUM_UNITS, DEFAULT_RETRY_DELAY_MS, DEFAULT_RPC_RETRIES,
    DEFAULT_RPC_TIMEOUT_SECS,
};

/// Transport settings shared by every chain client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcSettings {
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries per endpoint after the first attempt
    pub max_retries: u32,
    /// Base delay between retries
    pub retry_delay: Duration,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS),
            max_retries: DEFAULT_RPC_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

/// How allowance reads for one token are issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// One Multicall3 `aggregate3` per token, per-call fallback on failure
    #[default]
    Multicall,
    /// One `eth_call` per (token, spender) pair, sent as one JSON-RPC batch
    Sequential,
}

impl FromStr for BatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "multicall" | "batch" => Ok(Self::Multicall),
            "sequential" | "single" => Ok(Self::Sequential),
            other => Err(format!("unknown batch mode '{}'", other)),
        }
    }
}

/// Whole-token cutoffs for risk labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskThresholds {
    /// At or above this many whole tokens: high
    pub high_units: u64,
    /// At or above this many whole tokens: medium
    pub medium_units: u64,
}

impl RiskThresholds {
    /// Build thresholds, ordering them so `high_units >= medium_units`
    pub fn new(high_units: u64, medium_units: u64) -> Self {
        if high_units < medium_units {
            warn!(
                "⚠️ High cutoff {} below medium cutoff {}, swapping",
                high_units, medium_units
            );
            Self {
                high_units: medium_units,
                medium_units: high_units,
            }
        } else {
            Self {
                high_units,
                medium_units,
            }
        }
    }
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self::new(DEFAULT_HIGH_UNITS, DEFAULT_MEDIUM_UNITS)
    }
}

/// Top-level configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rpc: RpcSettings,
    pub batch_mode: BatchMode,
    pub risk: RiskThresholds,
    /// Directory holding the address book and recent list
    pub data_dir: PathBuf,
    /// Optional hex private key for the local signer
    pub private_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rpc: RpcSettings::default(),
            batch_mode: BatchMode::default(),
            risk: RiskThresholds::default(),
            data_dir: PathBuf::from(".allowance-watch"),
            private_key: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let rpc = RpcSettings {
            timeout: Duration::from_secs(env_parse(
                "ALLOWANCE_WATCH_RPC_TIMEOUT_SECS",
                DEFAULT_RPC_TIMEOUT_SECS,
            )),
            max_retries: env_parse("ALLOWANCE_WATCH_RPC_RETRIES", DEFAULT_RPC_RETRIES),
            retry_delay: Duration::from_millis(env_parse(
                "ALLOWANCE_WATCH_RETRY_DELAY_MS",
                DEFAULT_RETRY_DELAY_MS,
            )),
        };

        let batch_mode = env_parse("ALLOWANCE_WATCH_BATCH_MODE", defaults.batch_mode);

        let risk = RiskThresholds::new(
            env_parse("ALLOWANCE_WATCH_HIGH_UNITS", DEFAULT_HIGH_UNITS),
            env_parse("ALLOWANCE_WATCH_MEDIUM_UNITS", DEFAULT_MEDIUM_UNITS),
        );

        let data_dir = std::env::var("ALLOWANCE_WATCH_DATA_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let private_key = std::env::var("ALLOWANCE_WATCH_PRIVATE_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        if private_key.is_some() {
            info!("🔑 Local signer configured (key hidden)");
        }

        Self {
            rpc,
            batch_mode,
            risk,
            data_dir,
            private_key,
        }
    }
}

/// Endpoints for a chain: `<PREFIX>_RPC_URL` first, then the built-in list
pub fn rpc_urls_for(chain_id: u64) -> Vec<String> {
    let Some(chain) = chain(chain_id) else {
        return Vec::new();
    };

    let mut urls: Vec<String> = Vec::new();
    if let Ok(url) = std::env::var(format!("{}_RPC_URL", chain.env_prefix)) {
        let url = url.trim().to_string();
        if !url.is_empty() {
            urls.push(url);
        }
    }
    for url in chain.rpc_urls.iter().copied() {
        if !urls.iter().any(|u| u.as_str() == url) {
            urls.push(url.to_string());
        }
    }
    urls
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("⚠️ Ignoring invalid {}={}, using default", key, raw);
                default
            }
        },
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::{CHAIN_ID_AVALANCHE, CHAIN_ID_BASE};

    #[test]
    fn test_batch_mode_parsing() {
        assert_eq!("multicall".parse::<BatchMode>().unwrap(), BatchMode::Multicall);
        assert_eq!(" Sequential ".parse::<BatchMode>().unwrap(), BatchMode::Sequential);
        assert!("parallel".parse::<BatchMode>().is_err());
    }

    #[test]
    fn test_thresholds_are_ordered() {
        let t = RiskThresholds::new(10, 1000);
        assert_eq!(t.high_units, 1000);
        assert_eq!(t.medium_units, 10);

        let d = RiskThresholds::default();
        assert!(d.high_units >= d.medium_units);
    }

    #[test]
    fn test_builtin_rpc_urls() {
        let urls = rpc_urls_for(CHAIN_ID_AVALANCHE);
        assert!(urls.len() >= 2);
        assert!(rpc_urls_for(999).is_empty());
    }

    #[test]
    fn test_env_override_goes_first() {
        std::env::set_var("BASE_RPC_URL", "https://base.example.org");
        let urls = rpc_urls_for(CHAIN_ID_BASE);
        std::env::remove_var("BASE_RPC_URL");
        assert_eq!(urls[0], "https://base.example.org");
        assert!(urls.len() >= 3);
    }

    #[test]
    fn test_env_parse_falls_back() {
        std::env::set_var("ALLOWANCE_WATCH_TEST_NUMBER", "not-a-number");
        assert_eq!(env_parse("ALLOWANCE_WATCH_TEST_NUMBER", 7u64), 7);
        std::env::set_var("ALLOWANCE_WATCH_TEST_NUMBER", "42");
        assert_eq!(env_parse("ALLOWANCE_WATCH_TEST_NUMBER", 7u64), 42);
        std::env::remove_var("ALLOWANCE_WATCH_TEST_NUMBER");
    }
}
