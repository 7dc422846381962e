//! Risk Classification Module
//! Maps a raw allowance to a coarse label
//!
//! - >= 2^255 raw units: Unlimited (shown as "unlimited/high")
//! - >= `high_units` whole tokens: High
//! - >= `medium_units` whole tokens: Medium
//! - anything else above zero: Low

use alloy_primitives::U256;

use crate::models::config::RiskThresholds;
use crate::models::types::RiskLevel;
use crate::utils::constants::UNLIMITED_THRESHOLD;

/// Classify a positive allowance
///
/// Monotonic in `raw` for fixed `decimals` and thresholds: a larger
/// allowance never gets a lower label.
pub fn classify(raw: U256, decimals: u8, thresholds: &RiskThresholds) -> RiskLevel {
    if raw >= *UNLIMITED_THRESHOLD {
        return RiskLevel::Unlimited;
    }
    if raw >= whole_units(thresholds.high_units, decimals) {
        return RiskLevel::High;
    }
    if raw >= whole_units(thresholds.medium_units, decimals) {
        return RiskLevel::Medium;
    }
    RiskLevel::Low
}

/// `units * 10^decimals`, saturating at `U256::MAX`
pub fn whole_units(units: u64, decimals: u8) -> U256 {
    let scale = U256::from(10u8).saturating_pow(U256::from(decimals));
    U256::from(units).saturating_mul(scale)
}

/// Human-readable recommendation for a label
pub fn recommendation(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "🟡 LOW RISK - small bounded approval",
        RiskLevel::Medium => "🟠 ELEVATED RISK - review if unused",
        RiskLevel::High => "🔴 HIGH RISK - revoke unless actively used",
        RiskLevel::Unlimited => "💀 UNLIMITED - spender can move the full balance, revoke if unused",
    }
}
