//! Constants Module - Chain, Token and Spender Registries
//!
//! Every chain id, endpoint, token and spender address the scanner knows
//! about is declared here and nowhere else. Tables are parsed once on first
//! access and are read-only afterwards.

use alloy_primitives::{Address, U256};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::warn;

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "AllowanceWatch";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for HTTP requests
pub const USER_AGENT: &str = concat!("AllowanceWatch/", env!("CARGO_PKG_VERSION"));

// ============================================
// RPC CONSTANTS
// ============================================

/// Default timeout for RPC requests (seconds)
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 12;

/// Default retry count per endpoint
pub const DEFAULT_RPC_RETRIES: u32 = 2;

/// Default delay between retries (milliseconds)
pub const DEFAULT_RETRY_DELAY_MS: u64 = 600;

/// JSON-RPC batch size cap
pub const MAX_BATCH_SIZE: usize = 50;

// ============================================
// SCAN CONSTANTS
// ============================================

/// Precision assumed when a token's `decimals()` cannot be read
pub const DEFAULT_DECIMALS: u8 = 18;

/// Whole-token cutoff for "high" risk
pub const DEFAULT_HIGH_UNITS: u64 = 1_000_000;

/// Whole-token cutoff for "medium" risk
pub const DEFAULT_MEDIUM_UNITS: u64 = 10_000;

/// Maximum fractional digits shown in formatted amounts
pub const DISPLAY_FRACTION_DIGITS: usize = 6;

/// Maximum entries in the recent-addresses list
pub const MAX_RECENT_ADDRESSES: usize = 8;

lazy_static! {
    /// Allowances at or above 2^255 are treated as unlimited approvals
    pub static ref UNLIMITED_THRESHOLD: U256 = U256::from(1u8) << 255;
}

// ============================================
// CHAIN IDS
// ============================================

/// Ethereum Mainnet
pub const CHAIN_ID_ETHEREUM: u64 = 1;
/// BNB Smart Chain
pub const CHAIN_ID_BSC: u64 = 56;
/// Arbitrum One
pub const CHAIN_ID_ARBITRUM: u64 = 42161;
/// Avalanche C-Chain
pub const CHAIN_ID_AVALANCHE: u64 = 43114;
/// Base
pub const CHAIN_ID_BASE: u64 = 8453;

/// Chain used for ENS resolution
pub const MAINNET_CHAIN_ID: u64 = CHAIN_ID_ETHEREUM;

/// All supported chain IDs, in display order
pub const SUPPORTED_CHAIN_IDS: [u64; 5] = [
    CHAIN_ID_ETHEREUM,
    CHAIN_ID_BASE,
    CHAIN_ID_ARBITRUM,
    CHAIN_ID_BSC,
    CHAIN_ID_AVALANCHE,
];

// ============================================
// WELL-KNOWN CONTRACTS
// ============================================

/// Multicall3, deployed at the same address on every supported chain
pub const MULTICALL3_ADDRESS: &str = "0xcA11bde05977b3631167028862bE2a173976CA11";

/// ENS registry on Ethereum mainnet
pub const ENS_REGISTRY_ADDRESS: &str = "0x00000000000C2E074eC69A0dFb2997BA6C7d2e1e";

// ============================================
// REGISTRY TYPES
// ============================================

/// A supported EVM chain
#[derive(Debug, Clone)]
pub struct Chain {
    pub id: u64,
    pub name: &'static str,
    /// Prefix of the `<SHORT>_RPC_URL` environment override
    pub env_prefix: &'static str,
    /// Built-in endpoints, tried in order
    pub rpc_urls: Vec<&'static str>,
    /// Block explorer base URL (no trailing slash)
    pub explorer: Option<&'static str>,
}

impl Chain {
    /// Explorer link for an address on this chain
    pub fn address_url(&self, address: &Address) -> Option<String> {
        self.explorer
            .map(|base| format!("{}/address/{}", base, address.to_checksum(None)))
    }

    /// Explorer link for a transaction on this chain
    pub fn tx_url(&self, hash: &str) -> Option<String> {
        self.explorer.map(|base| format!("{}/tx/{}", base, hash))
    }
}

/// An ERC-20 token checked on one chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub symbol: &'static str,
    pub address: Address,
    /// `None` means "read `decimals()` on-chain"
    pub decimals: Option<u8>,
}

/// A contract that may hold an allowance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spender {
    pub label: &'static str,
    pub address: Address,
}

// ============================================
// RAW TABLES
// ============================================

struct TokenEntry {
    symbol: &'static str,
    address: &'static str,
    decimals: Option<u8>,
}

struct SpenderEntry {
    label: &'static str,
    address: &'static str,
}

const PERMIT2: &str = "0x000000000022D473030F116dDEE9F6B43aC78BA3";
const ONEINCH_V5: &str = "0x1111111254EEB25477B68fb85Ed929f73A960582";

fn raw_chains() -> Vec<Chain> {
    vec![
        Chain {
            id: CHAIN_ID_ETHEREUM,
            name: "Ethereum",
            env_prefix: "ETHEREUM",
            rpc_urls: vec!["https://eth.llamarpc.com", "https://rpc.ankr.com/eth"],
            explorer: Some("https://etherscan.io"),
        },
        Chain {
            id: CHAIN_ID_BASE,
            name: "Base",
            env_prefix: "BASE",
            rpc_urls: vec!["https://mainnet.base.org", "https://base.publicnode.com"],
            explorer: Some("https://basescan.org"),
        },
        Chain {
            id: CHAIN_ID_ARBITRUM,
            name: "Arbitrum One",
            env_prefix: "ARBITRUM",
            rpc_urls: vec![
                "https://arb1.arbitrum.io/rpc",
                "https://arbitrum-one.publicnode.com",
            ],
            explorer: Some("https://arbiscan.io"),
        },
        Chain {
            id: CHAIN_ID_BSC,
            name: "BNB Smart Chain",
            env_prefix: "BSC",
            rpc_urls: vec![
                "https://bsc-dataseed.binance.org",
                "https://bsc.publicnode.com",
            ],
            explorer: Some("https://bscscan.com"),
        },
        Chain {
            id: CHAIN_ID_AVALANCHE,
            name: "Avalanche C-Chain",
            env_prefix: "AVALANCHE",
            rpc_urls: vec![
                "https://api.avax.network/ext/bc/C/rpc",
                "https://avalanche-c-chain.publicnode.com",
            ],
            explorer: Some("https://snowtrace.io"),
        },
    ]
}

fn raw_tokens(chain_id: u64) -> Vec<TokenEntry> {
    match chain_id {
        CHAIN_ID_ETHEREUM => vec![
            TokenEntry { symbol: "USDC", address: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", decimals: Some(6) },
            TokenEntry { symbol: "USDT", address: "0xdAC17F958D2ee523a2206206994597C13D831ec7", decimals: Some(6) },
            TokenEntry { symbol: "WETH", address: "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", decimals: Some(18) },
        ],
        CHAIN_ID_BASE => vec![
            TokenEntry { symbol: "USDC", address: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913", decimals: Some(6) },
            TokenEntry { symbol: "WETH", address: "0x4200000000000000000000000000000000000006", decimals: Some(18) },
        ],
        CHAIN_ID_ARBITRUM => vec![
            TokenEntry { symbol: "USDC", address: "0xaf88d065e77c8cC2239327C5EDb3A432268e5831", decimals: Some(6) },
            TokenEntry { symbol: "WETH", address: "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1", decimals: Some(18) },
        ],
        // Binance-Peg USDC is 18 decimals; left to the on-chain read
        CHAIN_ID_BSC => vec![
            TokenEntry { symbol: "USDC", address: "0x8AC76a51cc950d9822D68b83FE1Ad97B32Cd580d", decimals: None },
            TokenEntry { symbol: "WBNB", address: "0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c", decimals: Some(18) },
        ],
        CHAIN_ID_AVALANCHE => vec![
            TokenEntry { symbol: "USDC", address: "0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E", decimals: Some(6) },
            TokenEntry { symbol: "WAVAX", address: "0xB31f66AA3C1e785363F0875A1B74E27b85FD66c7", decimals: Some(18) },
        ],
        _ => vec![],
    }
}

fn raw_spenders(chain_id: u64) -> Vec<SpenderEntry> {
    match chain_id {
        CHAIN_ID_ETHEREUM => vec![
            SpenderEntry { label: "Uniswap V2 Router", address: "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D" },
            SpenderEntry { label: "Uniswap SwapRouter02", address: "0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45" },
            SpenderEntry { label: "SushiSwap Router", address: "0xd9e1cE17f2641f24aE83637ab66a2cca9C378B9F" },
            SpenderEntry { label: "1inch Router V5", address: ONEINCH_V5 },
            SpenderEntry { label: "Permit2", address: PERMIT2 },
        ],
        CHAIN_ID_BASE => vec![
            SpenderEntry { label: "Uniswap SwapRouter02", address: "0x2626664c2603336E57B271c5C0b26F421741e481" },
            SpenderEntry { label: "Aerodrome Router", address: "0xcF77a3Ba9A5CA399B7c97c74d54e5b1Beb874E43" },
            SpenderEntry { label: "1inch Router V5", address: ONEINCH_V5 },
            SpenderEntry { label: "Permit2", address: PERMIT2 },
        ],
        CHAIN_ID_ARBITRUM => vec![
            SpenderEntry { label: "Uniswap SwapRouter02", address: "0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45" },
            SpenderEntry { label: "Camelot Router", address: "0xc873fEcbd354f5A56E00E710B90EF4201db2448d" },
            SpenderEntry { label: "SushiSwap Router", address: "0x1b02dA8Cb0d097eB8D57A175b88c7D8b47997506" },
            SpenderEntry { label: "Permit2", address: PERMIT2 },
        ],
        CHAIN_ID_BSC => vec![
            SpenderEntry { label: "PancakeSwap V2 Router", address: "0x10ED43C718714eb63d5aA57B78B54704E256024E" },
            SpenderEntry { label: "BiSwap Router", address: "0x3a6d8cA21D1CF76F653A67577FA0D27453350dD8" },
            SpenderEntry { label: "1inch Router V5", address: ONEINCH_V5 },
            SpenderEntry { label: "Permit2", address: PERMIT2 },
        ],
        CHAIN_ID_AVALANCHE => vec![
            SpenderEntry { label: "Trader Joe Router", address: "0x60aE616a2155Ee3d9A68541Ba4544862310933d4" },
            SpenderEntry { label: "Pangolin Router", address: "0xE54Ca86531e17Ef3616d22Ca28b0D458b6C89106" },
            SpenderEntry { label: "1inch Router V5", address: ONEINCH_V5 },
        ],
        _ => vec![],
    }
}

// ============================================
// PARSED REGISTRIES
// ============================================

fn parse_address(raw: &str, what: &str) -> Option<Address> {
    match Address::from_str(raw) {
        Ok(addr) => Some(addr),
        Err(e) => {
            warn!("⚠️ Dropping malformed {} address {}: {}", what, raw, e);
            None
        }
    }
}

lazy_static! {
    static ref CHAINS: Vec<Chain> = raw_chains();

    static ref TOKENS: HashMap<u64, Vec<Token>> = SUPPORTED_CHAIN_IDS
        .iter()
        .map(|&id| {
            let tokens = raw_tokens(id)
                .into_iter()
                .filter_map(|t| {
                    parse_address(t.address, "token").map(|address| Token {
                        symbol: t.symbol,
                        address,
                        decimals: t.decimals,
                    })
                })
                .collect();
            (id, tokens)
        })
        .collect();

    static ref SPENDERS: HashMap<u64, Vec<Spender>> = SUPPORTED_CHAIN_IDS
        .iter()
        .map(|&id| {
            let spenders = raw_spenders(id)
                .into_iter()
                .filter_map(|s| {
                    parse_address(s.address, "spender").map(|address| Spender {
                        label: s.label,
                        address,
                    })
                })
                .collect();
            (id, spenders)
        })
        .collect();

    /// Parsed Multicall3 address
    pub static ref MULTICALL3: Address =
        Address::from_str(MULTICALL3_ADDRESS).unwrap_or(Address::ZERO);

    /// Parsed ENS registry address
    pub static ref ENS_REGISTRY: Address =
        Address::from_str(ENS_REGISTRY_ADDRESS).unwrap_or(Address::ZERO);
}

/// Look up a supported chain
pub fn chain(chain_id: u64) -> Option<&'static Chain> {
    CHAINS.iter().find(|c| c.id == chain_id)
}

/// All supported chains, in display order
pub fn all_chains() -> &'static [Chain] {
    &CHAINS
}

/// Display name for a chain id
pub fn chain_name(chain_id: u64) -> String {
    chain(chain_id)
        .map(|c| c.name.to_string())
        .unwrap_or_else(|| format!("Chain {}", chain_id))
}

/// Tokens checked on a chain (empty for unknown chains)
pub fn tokens_for(chain_id: u64) -> &'static [Token] {
    TOKENS.get(&chain_id).map(Vec::as_slice).unwrap_or(&[])
}

/// Spenders checked on a chain (empty for unknown chains)
pub fn spenders_for(chain_id: u64) -> &'static [Spender] {
    SPENDERS.get(&chain_id).map(Vec::as_slice).unwrap_or(&[])
}

/// Token and spender lists a scan works from, per chain
#[derive(Debug, Clone, Default)]
pub struct Registry {
    tokens: HashMap<u64, Vec<Token>>,
    spenders: HashMap<u64, Vec<Spender>>,
}

impl Registry {
    /// The built-in tables
    pub fn builtin() -> Self {
        Self {
            tokens: TOKENS.clone(),
            spenders: SPENDERS.clone(),
        }
    }

    /// Replace the token list of one chain
    pub fn with_tokens(mut self, chain_id: u64, tokens: Vec<Token>) -> Self {
        self.tokens.insert(chain_id, tokens);
        self
    }

    /// Replace the spender list of one chain
    pub fn with_spenders(mut self, chain_id: u64, spenders: Vec<Spender>) -> Self {
        self.spenders.insert(chain_id, spenders);
        self
    }

    pub fn tokens(&self, chain_id: u64) -> &[Token] {
        self.tokens.get(&chain_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn spenders(&self, chain_id: u64) -> &[Spender] {
        self.spenders.get(&chain_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Both lists are non-empty
    pub fn is_configured(&self, chain_id: u64) -> bool {
        !self.tokens(chain_id).is_empty() && !self.spenders(chain_id).is_empty()
    }
}

/// Look up a spender label by address on a chain
pub fn spender_label(chain_id: u64, address: &Address) -> Option<&'static str> {
    spenders_for(chain_id)
        .iter()
        .find(|s| &s.address == address)
        .map(|s| s.label)
}
