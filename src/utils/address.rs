//! Owner input normalization
//!
//! Turns whatever the user pasted into either a canonical address or an
//! ENS name to resolve. Pure: never touches the network.

use alloy_primitives::{keccak256, Address, B256};
use std::str::FromStr;

use crate::models::errors::{AppError, AppResult};

/// Zero-width characters some mobile keyboards paste along with addresses
const ZERO_WIDTH: [char; 4] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

/// Straight and curly quotes
const QUOTES: [char; 6] = ['"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

/// Parsed owner input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerInput {
    /// A hex address, already validated
    Address(Address),
    /// A human-readable name (e.g. `vitalik.eth`), lower-cased
    Name(String),
}

/// Remove invisible characters and quotes, then trim
pub fn clean_input(input: &str) -> String {
    input
        .chars()
        .filter(|c| !ZERO_WIDTH.contains(c) && !QUOTES.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Classify and validate owner input
pub fn normalize_input(input: &str) -> AppResult<OwnerInput> {
    let raw = clean_input(input);
    if raw.is_empty() {
        return Err(AppError::input_empty());
    }

    if raw.starts_with("0x") || raw.starts_with("0X") {
        return parse_hex_address(&raw).map(OwnerInput::Address);
    }

    if looks_like_name(&raw) {
        return Ok(OwnerInput::Name(raw.to_lowercase()));
    }

    Err(AppError::invalid_address(
        "must start with 0x or be a name like name.eth",
    ))
}

/// Strict hex address parse with EIP-55 check for mixed-case input
pub fn parse_hex_address(raw: &str) -> AppResult<Address> {
    let raw = raw.trim();
    let body = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| AppError::invalid_address("must start with 0x"))?;
    if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::invalid_address(
            "must be 20 bytes (40 hex chars)",
        ));
    }

    let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
    let normalized = format!("0x{}", body);

    if has_lower && has_upper {
        Address::parse_checksummed(&normalized, None)
            .map_err(|_| AppError::invalid_address("checksum mismatch"))
    } else {
        Address::from_str(&normalized)
            .map_err(|_| AppError::invalid_address("must be 20 bytes (40 hex chars)"))
    }
}

fn looks_like_name(raw: &str) -> bool {
    raw.contains('.')
        && !raw.starts_with('.')
        && !raw.ends_with('.')
        && !raw.contains("..")
        && !raw.chars().any(char::is_whitespace)
}

/// EIP-55 checksummed string
pub fn to_checksum(address: &Address) -> String {
    address.to_checksum(None)
}

/// `0x1234…abcd` for compact display
pub fn short(address: &Address) -> String {
    let full = to_checksum(address);
    format!("{}…{}", &full[..6], &full[full.len() - 4..])
}

/// ENS namehash of a (lower-cased) name
pub fn namehash(name: &str) -> B256 {
    let mut node = B256::ZERO;
    if name.is_empty() {
        return node;
    }
    for label in name.rsplit('.') {
        let label_hash = keccak256(label.as_bytes());
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(node.as_slice());
        buf[32..].copy_from_slice(label_hash.as_slice());
        node = keccak256(buf);
    }
    node
}
