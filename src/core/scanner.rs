//! Allowance Scanner - Main Orchestrator
//!
//! Flow:
//! 1. Resolve the owner (hex locally, names through ENS on mainnet)
//! 2. For every requested chain, concurrently:
//!    - read `decimals()` for tokens without a static value (one batch)
//!    - per token, read `allowance(owner, spender)` for every spender (one batch)
//! 3. Keep strictly positive allowances, format and classify them
//! 4. Sort into a stable order
//!
//! Individual read failures never abort a scan; they are recorded as issues
//! next to the findings that did succeed.

use alloy_primitives::{Address, U256};
use futures_util::future::join_all;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::core::risk::classify;
use crate::models::config::RiskThresholds;
use crate::models::errors::{is_rate_limited, looks_rate_limited, AppError, AppResult};
use crate::models::types::{Finding, IssueKind, ScanIssue, ScanReport, ScanTarget};
use crate::providers::reader::ChainReader;
use crate::utils::address::{normalize_input, short, OwnerInput};
use crate::utils::constants::{chain, Chain, Registry, Spender, Token, DEFAULT_DECIMALS};
use crate::utils::decoder::{AllowanceDecoder, CallOutcome, ReadCall};
use crate::utils::format::display_allowance;

/// Findings and issues of one chain
#[derive(Debug, Default)]
struct ChainScan {
    findings: Vec<Finding>,
    issues: Vec<ScanIssue>,
}

/// Multi-chain allowance scanner
pub struct Scanner<R: ChainReader + ?Sized> {
    reader: Arc<R>,
    risk: RiskThresholds,
    registry: Arc<Registry>,
}

impl<R: ChainReader + ?Sized> Clone for Scanner<R> {
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
            risk: self.risk,
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<R: ChainReader + ?Sized> Scanner<R> {
    /// Scanner over the built-in token and spender tables
    pub fn new(reader: Arc<R>, risk: RiskThresholds) -> Self {
        Self {
            reader,
            risk,
            registry: Arc::new(Registry::builtin()),
        }
    }

    /// Scan against `registry` instead of the built-in tables
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.risk
    }

    /// Turn user input into the owner address
    ///
    /// Hex input never reaches the network; invalid input fails before any
    /// read is issued.
    pub async fn resolve_owner(&self, input: &str) -> AppResult<Address> {
        match normalize_input(input)? {
            OwnerInput::Address(address) => Ok(address),
            OwnerInput::Name(name) => {
                info!("🔎 Resolving {}", name);
                match self.reader.resolve_name(&name).await {
                    Ok(Some(address)) => Ok(address),
                    Ok(None) => Err(AppError::name_not_found(&name)),
                    Err(e) => {
                        warn!("⚠️ Name lookup for {} failed: {}", name, e);
                        Err(AppError::from(e))
                    }
                }
            }
        }
    }

    /// Resolve `input` and scan the requested chains
    pub async fn scan(&self, input: &str, target: &ScanTarget) -> AppResult<ScanReport> {
        let owner = self.resolve_owner(input).await?;
        self.scan_owner(owner, &target.chain_ids()).await
    }

    /// Scan `owner` on `chain_ids`
    pub async fn scan_owner(&self, owner: Address, chain_ids: &[u64]) -> AppResult<ScanReport> {
        let start = Instant::now();

        let mut targets: Vec<&'static Chain> = Vec::new();
        let mut chains_skipped = Vec::new();
        for &chain_id in chain_ids {
            let Some(c) = chain(chain_id) else {
                return Err(AppError::unsupported_chain(chain_id));
            };
            if targets.iter().any(|t| t.id == chain_id) || chains_skipped.contains(&chain_id) {
                continue;
            }
            if !self.registry.is_configured(chain_id) {
                debug!("⏭️ Skipping {}: nothing configured", c.name);
                chains_skipped.push(chain_id);
            } else {
                targets.push(c);
            }
        }

        if targets.is_empty() {
            return Err(AppError::no_targets());
        }

        info!("🔍 Scanning {} on {} chain(s)", short(&owner), targets.len());

        let results = join_all(targets.iter().map(|&c| self.scan_chain(owner, c))).await;

        let mut findings = Vec::new();
        let mut issues = Vec::new();
        for result in results {
            findings.extend(result.findings);
            issues.extend(result.issues);
        }
        sort_findings(&mut findings);

        let report = ScanReport {
            owner,
            findings,
            issues,
            chains_scanned: targets.iter().map(|c| c.id).collect(),
            chains_skipped,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "✅ Scan complete: {} approval(s), {} unlimited, {} failed read(s) in {}ms",
            report.findings.len(),
            report.summary().unlimited,
            report.failure_count(),
            report.duration_ms
        );
        Ok(report)
    }

    async fn scan_chain(&self, owner: Address, chain: &'static Chain) -> ChainScan {
        let mut scan = ChainScan::default();
        let tokens = self.registry.tokens(chain.id);
        let spenders = self.registry.spenders(chain.id);

        let decimals = self.token_decimals(chain, tokens, &mut scan.issues).await;

        let reads = tokens.iter().map(|token| {
            let calls: Vec<ReadCall> = spenders
                .iter()
                .map(|s| {
                    ReadCall::new(
                        token.address,
                        AllowanceDecoder::encode_allowance(owner, s.address),
                    )
                })
                .collect();
            async move { (token, self.read_batch(chain.id, calls).await) }
        });

        for (token, outcomes) in join_all(reads).await {
            let token_decimals = decimals
                .get(&token.address)
                .copied()
                .unwrap_or(DEFAULT_DECIMALS);

            let outcomes = match outcomes {
                Ok(outcomes) => outcomes,
                Err(e) => {
                    warn!("⚠️ {} {} batch failed: {}", chain.name, token.symbol, e);
                    let rate_limited = is_rate_limited(&e);
                    for spender in spenders {
                        scan.issues.push(ScanIssue::new(
                            chain.id,
                            chain.name,
                            IssueKind::ReadFailed {
                                token: token.address,
                                spender: spender.address,
                            },
                            format!("{} / {}: {}", token.symbol, spender.label, e),
                            rate_limited,
                        ));
                    }
                    continue;
                }
            };

            // Outcomes line up with `spenders` by position.
            for (spender, outcome) in spenders.iter().zip(outcomes) {
                let read = match outcome {
                    CallOutcome::Success(data) => {
                        AllowanceDecoder::decode_allowance(&data).map_err(|e| e.to_string())
                    }
                    CallOutcome::Failure(reason) => Err(reason),
                };

                match read {
                    Ok(raw) if raw.is_zero() => {}
                    Ok(raw) => {
                        scan.findings
                            .push(self.finding(chain, token, spender, raw, token_decimals));
                    }
                    Err(reason) => {
                        debug!(
                            "❌ {} {} -> {} failed: {}",
                            chain.name, token.symbol, spender.label, reason
                        );
                        let rate_limited = looks_rate_limited(&reason);
                        scan.issues.push(ScanIssue::new(
                            chain.id,
                            chain.name,
                            IssueKind::ReadFailed {
                                token: token.address,
                                spender: spender.address,
                            },
                            format!("{} / {}: {}", token.symbol, spender.label, reason),
                            rate_limited,
                        ));
                    }
                }
            }
        }

        info!(
            "⛓️ {}: {} approval(s), {} issue(s)",
            chain.name,
            scan.findings.len(),
            scan.issues.len()
        );
        scan
    }

    /// Decimals for every token; on-chain reads only for tokens without a static value
    async fn token_decimals(
        &self,
        chain: &'static Chain,
        tokens: &[Token],
        issues: &mut Vec<ScanIssue>,
    ) -> HashMap<Address, u8> {
        let mut decimals: HashMap<Address, u8> = tokens
            .iter()
            .filter_map(|t| t.decimals.map(|d| (t.address, d)))
            .collect();

        let missing: Vec<&Token> = tokens.iter().filter(|t| t.decimals.is_none()).collect();
        if missing.is_empty() {
            return decimals;
        }

        let calls: Vec<ReadCall> = missing
            .iter()
            .map(|t| ReadCall::new(t.address, AllowanceDecoder::encode_decimals()))
            .collect();

        let outcomes: Vec<Result<u8, String>> = match self.read_batch(chain.id, calls).await {
            Ok(outcomes) => outcomes
                .into_iter()
                .map(|o| match o {
                    CallOutcome::Success(data) => {
                        AllowanceDecoder::decode_decimals(&data).map_err(|e| e.to_string())
                    }
                    CallOutcome::Failure(reason) => Err(reason),
                })
                .collect(),
            Err(e) => vec![Err(e.to_string()); missing.len()],
        };

        for (token, outcome) in missing.iter().zip(outcomes) {
            match outcome {
                Ok(d) => {
                    decimals.insert(token.address, d);
                }
                Err(reason) => {
                    warn!(
                        "⚠️ {} {} decimals unavailable, assuming {}: {}",
                        chain.name, token.symbol, DEFAULT_DECIMALS, reason
                    );
                    issues.push(ScanIssue::new(
                        chain.id,
                        chain.name,
                        IssueKind::DecimalsFallback {
                            token: token.address,
                        },
                        format!("{} decimals(): {}", token.symbol, reason),
                        looks_rate_limited(&reason),
                    ));
                    decimals.insert(token.address, DEFAULT_DECIMALS);
                }
            }
        }
        decimals
    }

    /// `read_many` with a length check so positional mapping is always safe
    async fn read_batch(
        &self,
        chain_id: u64,
        calls: Vec<ReadCall>,
    ) -> eyre::Result<Vec<CallOutcome>> {
        let outcomes = self.reader.read_many(chain_id, &calls).await?;
        if outcomes.len() != calls.len() {
            return Err(eyre::eyre!(
                "reader returned {} outcomes for {} calls",
                outcomes.len(),
                calls.len()
            ));
        }
        Ok(outcomes)
    }

    fn finding(
        &self,
        chain: &Chain,
        token: &Token,
        spender: &Spender,
        raw: U256,
        decimals: u8,
    ) -> Finding {
        Finding {
            chain_id: chain.id,
            chain_name: chain.name.to_string(),
            token_symbol: token.symbol.to_string(),
            token_address: token.address,
            spender_label: spender.label.to_string(),
            spender_address: spender.address,
            raw_allowance: raw,
            decimals,
            amount_display: display_allowance(raw, decimals),
            risk: classify(raw, decimals, &self.risk),
        }
    }
}

/// Stable presentation order: chain name, token symbol, largest allowance
/// first, then spender label and address
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(compare_findings);
}

fn compare_findings(a: &Finding, b: &Finding) -> Ordering {
    a.chain_name
        .cmp(&b.chain_name)
        .then_with(|| a.token_symbol.cmp(&b.token_symbol))
        .then_with(|| b.raw_allowance.cmp(&a.raw_allowance))
        .then_with(|| a.spender_label.cmp(&b.spender_label))
        .then_with(|| a.spender_address.cmp(&b.spender_address))
}
