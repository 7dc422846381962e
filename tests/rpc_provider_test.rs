//! JSON-RPC provider tests against a local stub node

use allowance_watch::core::Scanner;
use allowance_watch::models::{
    AppError, BatchMode, ErrorCode, IssueKind, RiskThresholds, RpcSettings, ScanReport,
};
use allowance_watch::providers::{read_allowance, RpcChainReader, RpcProvider};
use allowance_watch::utils::constants::{spenders_for, tokens_for, CHAIN_ID_ETHEREUM, MULTICALL3};
use allowance_watch::utils::decoder::{aggregate3Call, allowanceCall, Result3};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn fast_settings(max_retries: u32) -> RpcSettings {
    RpcSettings {
        timeout: Duration::from_secs(2),
        max_retries,
        retry_delay: Duration::from_millis(1),
    }
}

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Endpoint that always answers 429 and counts hits
async fn limited_node() -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/",
        post(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                StatusCode::TOO_MANY_REQUESTS
            }
        }),
    );
    (spawn(router).await, hits)
}

/// Healthy mainnet node for single requests
async fn mainnet_node() -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().route(
        "/",
        post(move |Json(body): Json<Value>| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let result = match body["method"].as_str() {
                    Some("eth_call") => json!(format!("0x{}", "00".repeat(31) + "2a")),
                    _ => Value::Null,
                };
                Json(json!({ "jsonrpc": "2.0", "id": body["id"], "result": result }))
            }
        }),
    );
    (spawn(router).await, hits)
}

#[tokio::test]
async fn test_rate_limited_endpoint_reports_rate_limit() {
    let (url, hits) = limited_node().await;
    let provider = RpcProvider::with_urls(1, vec![url], &fast_settings(2)).unwrap();

    let err = provider
        .eth_call(Address::ZERO, &Bytes::new())
        .await
        .unwrap_err();
    assert_eq!(AppError::from(err).code, ErrorCode::RpcRateLimited);
    // first attempt plus two retries
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_falls_back_to_next_endpoint() {
    let (limited, limited_hits) = limited_node().await;
    let (healthy, healthy_hits) = mainnet_node().await;
    let provider =
        RpcProvider::with_urls(1, vec![limited, healthy], &fast_settings(0)).unwrap();

    let data = provider.eth_call(Address::ZERO, &Bytes::new()).await.unwrap();
    assert_eq!(data.len(), 32);
    assert_eq!(limited_hits.load(Ordering::SeqCst), 1);
    assert_eq!(healthy_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_eth_call_returns_raw_bytes() {
    let (url, _) = mainnet_node().await;
    let provider = RpcProvider::with_urls(1, vec![url], &fast_settings(0)).unwrap();

    let data = provider
        .eth_call(Address::repeat_byte(0x11), &Bytes::from(vec![0xde, 0xad]))
        .await
        .unwrap();
    assert_eq!(data.len(), 32);
    assert_eq!(data[31], 0x2a);
}

#[tokio::test]
async fn test_revert_is_not_retried_or_failed_over() {
    let reverts = Arc::new(AtomicUsize::new(0));
    let counter = reverts.clone();
    let reverting = spawn(Router::new().route(
        "/",
        post(move |Json(body): Json<Value>| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Json(json!({
                    "jsonrpc": "2.0",
                    "id": body["id"],
                    "error": { "code": 3, "message": "execution reverted" }
                }))
            }
        }),
    ))
    .await;
    let (healthy, healthy_hits) = mainnet_node().await;

    let provider =
        RpcProvider::with_urls(1, vec![reverting, healthy], &fast_settings(3)).unwrap();
    let err = provider
        .eth_call(Address::ZERO, &Bytes::new())
        .await
        .unwrap_err();

    assert_eq!(AppError::from(err).code, ErrorCode::RpcError);
    assert_eq!(reverts.load(Ordering::SeqCst), 1);
    assert_eq!(healthy_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_batch_responses_are_matched_by_id() {
    // Answers in reverse order; id 2 gets an error
    let url = spawn(Router::new().route(
        "/",
        post(|Json(batch): Json<Vec<Value>>| async move {
            let replies: Vec<Value> = batch
                .iter()
                .rev()
                .map(|req| {
                    let id = req["id"].as_u64().unwrap_or_default();
                    if id == 2 {
                        json!({ "jsonrpc": "2.0", "id": id, "error": { "code": -32000, "message": "header not found" } })
                    } else {
                        json!({ "jsonrpc": "2.0", "id": id, "result": format!("0x{:x}", id * 10) })
                    }
                })
                .collect();
            Json(replies)
        }),
    ))
    .await;

    let provider = RpcProvider::with_urls(1, vec![url], &fast_settings(0)).unwrap();
    let results = provider
        .batch_call::<String>(vec![
            ("eth_blockNumber", json!([])),
            ("eth_blockNumber", json!([])),
            ("eth_blockNumber", json!([])),
        ])
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap(), "0xa");
    assert!(results[1].is_err());
    assert_eq!(results[2].as_ref().unwrap(), "0x1e");
}

#[tokio::test]
async fn test_empty_batch_makes_no_request() {
    let (url, hits) = limited_node().await;
    let provider = RpcProvider::with_urls(1, vec![url], &fast_settings(0)).unwrap();
    let results = provider.batch_call::<String>(vec![]).await.unwrap();
    assert!(results.is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

// ============================================
// READER OVER A STUB CHAIN
// ============================================

#[derive(Clone, Copy, PartialEq, Eq)]
enum AggregateMode {
    Answer,
    Revert,
    RateLimit,
}

/// ERC-20 allowances of one owner on Ethereum, served over JSON-RPC
struct StubChain {
    owner: Address,
    allowances: HashMap<(Address, Address), U256>,
    reverting: HashSet<(Address, Address)>,
    aggregate: AggregateMode,
    aggregate_hits: AtomicUsize,
    batch_hits: AtomicUsize,
}

impl StubChain {
    fn new(aggregate: AggregateMode) -> Self {
        let usdc = tokens_for(CHAIN_ID_ETHEREUM)[0].address;
        let usdt = tokens_for(CHAIN_ID_ETHEREUM)[1].address;
        let weth = tokens_for(CHAIN_ID_ETHEREUM)[2].address;
        let spenders = spenders_for(CHAIN_ID_ETHEREUM);

        let mut allowances = HashMap::new();
        allowances.insert((usdc, spenders[0].address), U256::from(5_000_000u64));
        allowances.insert((weth, spenders[4].address), U256::MAX);
        let mut reverting = HashSet::new();
        reverting.insert((usdt, spenders[2].address));

        Self {
            owner: Address::repeat_byte(0xaa),
            allowances,
            reverting,
            aggregate,
            aggregate_hits: AtomicUsize::new(0),
            batch_hits: AtomicUsize::new(0),
        }
    }

    fn allowance(&self, token: Address, data: &[u8]) -> Result<Bytes, String> {
        let args = allowanceCall::abi_decode(data, false).map_err(|e| e.to_string())?;
        if self.reverting.contains(&(token, args.spender)) {
            return Err("execution reverted".to_string());
        }
        let raw = if args.owner == self.owner {
            self.allowances
                .get(&(token, args.spender))
                .copied()
                .unwrap_or_default()
        } else {
            U256::ZERO
        };
        Ok(Bytes::from(raw.to_be_bytes::<32>().to_vec()))
    }

    fn eth_call(&self, to: Address, data: &Bytes) -> Result<Bytes, Value> {
        if to != *MULTICALL3 {
            return self
                .allowance(to, data)
                .map_err(|message| json!({ "code": 3, "message": message }));
        }
        if self.aggregate == AggregateMode::Revert {
            return Err(json!({ "code": 3, "message": "execution reverted" }));
        }
        let call = aggregate3Call::abi_decode(data, false)
            .map_err(|e| json!({ "code": -32602, "message": e.to_string() }))?;
        let results: Vec<Result3> = call
            .calls
            .iter()
            .map(|c| match self.allowance(c.target, &c.callData) {
                Ok(ret) => Result3 { success: true, returnData: ret },
                Err(_) => Result3 { success: false, returnData: Bytes::new() },
            })
            .collect();
        Ok(aggregate3Call::abi_encode_returns(&(results,)).into())
    }

    fn reply(&self, request: &Value) -> Value {
        let (to, data) = call_params(request);
        match self.eth_call(to, &data) {
            Ok(ret) => json!({ "jsonrpc": "2.0", "id": request["id"], "result": ret }),
            Err(error) => json!({ "jsonrpc": "2.0", "id": request["id"], "error": error }),
        }
    }

    fn handle(&self, body: Value) -> Response {
        if let Value::Array(batch) = &body {
            self.batch_hits.fetch_add(1, Ordering::SeqCst);
            let replies: Vec<Value> = batch.iter().map(|r| self.reply(r)).collect();
            return Json(Value::Array(replies)).into_response();
        }
        if call_params(&body).0 == *MULTICALL3 {
            self.aggregate_hits.fetch_add(1, Ordering::SeqCst);
            if self.aggregate == AggregateMode::RateLimit {
                return StatusCode::TOO_MANY_REQUESTS.into_response();
            }
        }
        Json(self.reply(&body)).into_response()
    }
}

fn call_params(request: &Value) -> (Address, Bytes) {
    let call = &request["params"][0];
    let to = call["to"]
        .as_str()
        .and_then(|s| Address::from_str(s).ok())
        .unwrap_or_default();
    let data = call["data"]
        .as_str()
        .and_then(|s| Bytes::from_str(s).ok())
        .unwrap_or_default();
    (to, data)
}

async fn spawn_chain(aggregate: AggregateMode) -> (String, Arc<StubChain>) {
    let chain = Arc::new(StubChain::new(aggregate));
    let state = chain.clone();
    let router = Router::new().route(
        "/",
        post(move |Json(body): Json<Value>| {
            let state = state.clone();
            async move { state.handle(body) }
        }),
    );
    (spawn(router).await, chain)
}

fn stub_reader(url: String, mode: BatchMode) -> RpcChainReader {
    RpcChainReader::new(fast_settings(0), mode).with_endpoints(CHAIN_ID_ETHEREUM, vec![url])
}

async fn scan_stub(aggregate: AggregateMode, mode: BatchMode) -> (ScanReport, Arc<StubChain>) {
    let (url, chain) = spawn_chain(aggregate).await;
    let scanner = Scanner::new(Arc::new(stub_reader(url, mode)), RiskThresholds::default());
    let report = scanner
        .scan_owner(chain.owner, &[CHAIN_ID_ETHEREUM])
        .await
        .unwrap();
    (report, chain)
}

fn issue_kinds(report: &ScanReport) -> Vec<IssueKind> {
    report.issues.iter().map(|i| i.kind.clone()).collect()
}

#[tokio::test]
async fn test_multicall_fallback_and_sequential_agree() {
    let (multicall, chain) = scan_stub(AggregateMode::Answer, BatchMode::Multicall).await;
    assert_eq!(chain.aggregate_hits.load(Ordering::SeqCst), 3);
    assert_eq!(chain.batch_hits.load(Ordering::SeqCst), 0);

    let (fallback, chain) = scan_stub(AggregateMode::Revert, BatchMode::Multicall).await;
    assert_eq!(chain.aggregate_hits.load(Ordering::SeqCst), 3);
    assert_eq!(chain.batch_hits.load(Ordering::SeqCst), 3);

    let (sequential, chain) = scan_stub(AggregateMode::Answer, BatchMode::Sequential).await;
    assert_eq!(chain.aggregate_hits.load(Ordering::SeqCst), 0);
    assert_eq!(chain.batch_hits.load(Ordering::SeqCst), 3);

    assert_eq!(multicall.findings.len(), 2);
    assert_eq!(multicall.findings[0].amount_display, "5");
    assert_eq!(multicall.findings[1].amount_display, "Unlimited");
    assert_eq!(multicall.failure_count(), 1);

    for other in [&fallback, &sequential] {
        assert_eq!(other.findings, multicall.findings);
        assert_eq!(other.failure_count(), multicall.failure_count());
        assert_eq!(issue_kinds(other), issue_kinds(&multicall));
    }
}

#[tokio::test]
async fn test_rate_limited_aggregate_is_not_split_into_single_calls() {
    let (report, chain) = scan_stub(AggregateMode::RateLimit, BatchMode::Multicall).await;

    assert_eq!(chain.aggregate_hits.load(Ordering::SeqCst), 3);
    assert_eq!(chain.batch_hits.load(Ordering::SeqCst), 0);
    assert!(report.findings.is_empty());
    assert_eq!(
        report.failure_count(),
        tokens_for(CHAIN_ID_ETHEREUM).len() * spenders_for(CHAIN_ID_ETHEREUM).len()
    );
    assert!(report.issues.iter().all(|i| i.rate_limited));
}

#[tokio::test]
async fn test_read_allowance_reads_one_pair() {
    let (url, chain) = spawn_chain(AggregateMode::Answer).await;
    let reader = stub_reader(url, BatchMode::Multicall);
    let usdc = tokens_for(CHAIN_ID_ETHEREUM)[0].address;
    let usdt = tokens_for(CHAIN_ID_ETHEREUM)[1].address;
    let spenders = spenders_for(CHAIN_ID_ETHEREUM);

    let raw = read_allowance(&reader, CHAIN_ID_ETHEREUM, usdc, chain.owner, spenders[0].address)
        .await
        .unwrap();
    assert_eq!(raw, U256::from(5_000_000u64));

    let other_owner = Address::repeat_byte(0xbb);
    let raw = read_allowance(&reader, CHAIN_ID_ETHEREUM, usdc, other_owner, spenders[0].address)
        .await
        .unwrap();
    assert!(raw.is_zero());

    let reverted =
        read_allowance(&reader, CHAIN_ID_ETHEREUM, usdt, chain.owner, spenders[2].address).await;
    assert!(reverted.is_err());
}
