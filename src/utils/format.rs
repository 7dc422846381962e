//! Amount formatting
//!
//! Raw allowances stay as exact `U256` values; only the display string is
//! derived here. Fractions are truncated, never rounded up.

use alloy_primitives::U256;

use super::constants::{DISPLAY_FRACTION_DIGITS, UNLIMITED_THRESHOLD};

/// Text shown instead of a number for unlimited approvals
pub const UNLIMITED_LABEL: &str = "Unlimited";

/// Format `raw` scaled by `10^decimals`, e.g. `5_000_000 @ 6 -> "5"`
pub fn format_amount(raw: U256, decimals: u8) -> String {
    let digits = raw.to_string();
    let decimals = decimals as usize;

    let (whole, fraction) = if digits.len() > decimals {
        let split = digits.len() - decimals;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        ("0".to_string(), format!("{:0>width$}", digits, width = decimals))
    };

    let mut fraction: String = fraction.chars().take(DISPLAY_FRACTION_DIGITS).collect();
    while fraction.ends_with('0') {
        fraction.pop();
    }

    let whole = group_thousands(&whole);
    if fraction.is_empty() {
        whole
    } else {
        format!("{}.{}", whole, fraction)
    }
}

/// Display string for an allowance, with the unlimited indicator
pub fn display_allowance(raw: U256, decimals: u8) -> String {
    if raw >= *UNLIMITED_THRESHOLD {
        UNLIMITED_LABEL.to_string()
    } else {
        format_amount(raw, decimals)
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
