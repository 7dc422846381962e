//! Allowance Watch - multi-chain ERC-20 allowance scanner
//!
//! Finds every non-zero allowance an address has granted to well-known
//! routers and aggregators, labels it by risk, and can revoke it with
//! `approve(spender, 0)`.

use allowance_watch::api::ScanData;
use allowance_watch::core::{classify, recommendation, ScanSession, Scanner};
use allowance_watch::models::{AppConfig, RiskLevel, ScanReport, ScanTarget};
use allowance_watch::providers::{read_allowance, ChainReader, LocalWallet, RpcChainReader};
use allowance_watch::store::{AddressBook, RecentAddresses};
use allowance_watch::utils::address::{clean_input, short, to_checksum};
use allowance_watch::utils::constants::{
    all_chains, chain_name, spender_label, spenders_for, tokens_for, APP_VERSION,
};
use allowance_watch::utils::format::display_allowance;

use alloy_primitives::Address;
use clap::{Parser, Subcommand};
use eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// -------
// | CLI |
// -------

/// Inspect and revoke ERC-20 allowances across EVM chains
#[derive(Debug, Parser)]
#[command(name = "allowance_watch", version = APP_VERSION)]
struct Cli {
    /// Directory for the address book and recent list
    #[arg(long, global = true, env = "ALLOWANCE_WATCH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan an address or ENS name for open allowances
    Scan {
        /// 0x address or name like vitalik.eth
        input: String,
        /// Only scan this chain id
        #[arg(long)]
        chain: Option<u64>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set one allowance to zero (needs ALLOWANCE_WATCH_PRIVATE_KEY)
    Revoke {
        /// Owner address; must match the signing key
        address: String,
        #[arg(long)]
        chain: u64,
        #[arg(long)]
        token: Address,
        #[arg(long)]
        spender: Address,
    },
    /// Read one allowance straight from the chain
    Check {
        /// Owner: 0x address or name like vitalik.eth
        owner: String,
        #[arg(long)]
        chain: u64,
        #[arg(long)]
        token: Address,
        #[arg(long)]
        spender: Address,
    },
    /// List supported chains, tokens and spenders
    Chains,
    /// Manage saved addresses
    Book {
        #[command(subcommand)]
        action: BookAction,
    },
    /// Show recently scanned addresses
    Recent,
}

#[derive(Debug, Subcommand)]
enum BookAction {
    /// Save (or relabel) an address
    Add { address: String, label: String },
    /// Show saved addresses
    List,
    /// Delete a saved address
    Remove { address: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.command {
        Command::Scan { input, chain, json } => run_scan(&config, &input, chain, json).await,
        Command::Revoke {
            address,
            chain,
            token,
            spender,
        } => run_revoke(&config, &address, chain, token, spender).await,
        Command::Check {
            owner,
            chain,
            token,
            spender,
        } => run_check(&config, &owner, chain, token, spender).await,
        Command::Chains => {
            print_chains();
            Ok(())
        }
        Command::Book { action } => run_book(&config, action),
        Command::Recent => {
            let recent = RecentAddresses::load(&config.data_dir);
            if recent.entries().is_empty() {
                println!("No recent addresses.");
            }
            for address in recent.entries() {
                println!("{}", address);
            }
            Ok(())
        }
    }
}

fn scanner(config: &AppConfig) -> Scanner<dyn ChainReader> {
    let reader: Arc<dyn ChainReader> = Arc::new(RpcChainReader::from_config(config));
    Scanner::new(reader, config.risk)
}

async fn run_scan(
    config: &AppConfig,
    input: &str,
    chain: Option<u64>,
    json: bool,
) -> Result<()> {
    let scanner = scanner(config);
    let report = scanner.scan(input, &ScanTarget::from(chain)).await?;

    let mut recent = RecentAddresses::load(&config.data_dir);
    if let Err(e) = recent.push(&clean_input(input)) {
        tracing::warn!("⚠️ Could not update recent list: {}", e);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&ScanData::from(report))?);
    } else {
        print_report(&report);
    }
    Ok(())
}

async fn run_revoke(
    config: &AppConfig,
    address: &str,
    chain: u64,
    token: Address,
    spender: Address,
) -> Result<()> {
    let wallet = LocalWallet::from_config(config.private_key.as_deref())?;
    let scanner = scanner(config);
    let session = ScanSession::new();

    // Re-read the chain so the revoke acts on the current on-chain state.
    session
        .run_scan(&scanner, address, &ScanTarget::Single(chain))
        .await?;

    let receipt = session.revoke(&wallet, chain, &token, &spender).await?;
    println!(
        "✅ Revoke submitted for {} / {} on {}",
        receipt.token_symbol, receipt.spender_label, receipt.chain_name
    );
    println!("   tx: {}", receipt.tx_hash);
    if let Some(url) = receipt.explorer_url {
        println!("   {}", url);
    }
    Ok(())
}

async fn run_check(
    config: &AppConfig,
    owner: &str,
    chain: u64,
    token: Address,
    spender: Address,
) -> Result<()> {
    let scanner = scanner(config);
    let owner = scanner.resolve_owner(owner).await?;
    let raw = read_allowance(scanner.reader().as_ref(), chain, token, owner, spender).await?;

    let spender_name = spender_label(chain, &spender).unwrap_or("unknown spender");
    println!(
        "{} -> {} ({}) on {}",
        short(&owner),
        short(&spender),
        spender_name,
        chain_name(chain)
    );
    if raw.is_zero() {
        println!("   no allowance");
        return Ok(());
    }
    println!("   raw: {}", raw);

    // Amount and risk need decimals; only registry tokens carry them.
    let known = tokens_for(chain).iter().find(|t| t.address == token);
    match known.and_then(|t| t.decimals.map(|d| (t.symbol, d))) {
        Some((symbol, decimals)) => println!(
            "   {} {}  [{}]",
            display_allowance(raw, decimals),
            symbol,
            classify(raw, decimals, &config.risk).as_str()
        ),
        None => println!("   token decimals unknown; raw value only"),
    }
    Ok(())
}

fn run_book(config: &AppConfig, action: BookAction) -> Result<()> {
    let mut book = AddressBook::load(&config.data_dir);
    match action {
        BookAction::Add { address, label } => {
            let address = clean_input(&address);
            if book.add(&address, &label)? {
                println!("★ Saved {} as \"{}\"", address, label.trim());
            } else {
                println!("★ Relabelled {} as \"{}\"", address, label.trim());
            }
        }
        BookAction::List => {
            if book.entries().is_empty() {
                println!("No saved addresses.");
            }
            for entry in book.entries() {
                println!(
                    "{:<24} {}  (saved {})",
                    entry.label,
                    entry.address,
                    entry.created_at.format("%Y-%m-%d")
                );
            }
        }
        BookAction::Remove { address } => {
            if book.remove(&address)? {
                println!("Removed {}", address.trim());
            } else {
                println!("{} is not in the address book", address.trim());
            }
        }
    }
    Ok(())
}

fn print_chains() {
    for chain in all_chains() {
        println!("{} ({})", chain.name, chain.id);
        let tokens: Vec<&str> = tokens_for(chain.id).iter().map(|t| t.symbol).collect();
        println!("  tokens:   {}", tokens.join(", "));
        for spender in spenders_for(chain.id) {
            println!("  spender:  {:<28} {}", spender.label, to_checksum(&spender.address));
        }
    }
}

fn print_report(report: &ScanReport) {
    let summary = report.summary();
    println!();
    println!("Owner: {}", to_checksum(&report.owner));
    println!(
        "Approvals: {}   Unlimited: {}   Chains: {}   ({}ms)",
        summary.approvals, summary.unlimited, summary.chains, report.duration_ms
    );
    println!();

    if report.findings.is_empty() {
        if report.failure_count() == 0 {
            println!("✅ No open approvals to the known spenders.");
        } else {
            println!("No approvals found, but some reads failed (see below).");
        }
    }

    for finding in &report.findings {
        println!("{}", finding.summary());
        println!(
            "     token {}  spender {}",
            short(&finding.token_address),
            short(&finding.spender_address)
        );
        if finding.risk >= RiskLevel::High {
            println!("     {}", recommendation(finding.risk));
        }
    }

    if !report.issues.is_empty() {
        println!();
        println!("⚠️  {} issue(s):", report.issues.len());
        for issue in &report.issues {
            println!("  [{}] {}", issue.chain_name, issue.message);
        }
        let mut hints: Vec<&str> = report.issues.iter().filter_map(|i| i.hint()).collect();
        hints.sort_unstable();
        hints.dedup();
        for hint in hints {
            println!("  → {}", hint);
        }
    }
}
