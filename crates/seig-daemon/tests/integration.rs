// crates/seig-daemon/tests/integration.rs
//
// Integration tests for the staking daemon.
//
// The daemon is a binary crate with no lib.rs, so these tests wire the
// library crates together the way main.rs does: a shared engine behind
// `Arc<RwLock<_>>`, the RPC server dispatching in-process, and a
// RocksDB-backed snapshot store in a temporary directory.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::RwLock;

use seig_core::{wrapped_tokens, Address, ManualClock};
use seig_economics::{EngineConfig, SeededEntropy, StakingEngine, TokenLedger};
use seig_rpc::{JsonRpcRequest, RpcConfig, SeigRpcServer, SharedEngine};
use seig_store::{EngineStore, RocksStore};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Node {
    server: SeigRpcServer,
    engine: SharedEngine,
    clock: ManualClock,
    store: Arc<EngineStore>,
}

/// Rounding allowance for effective balances, in wrapped units.
const DUST: u128 = 1_000_000_000;

fn economics() -> EngineConfig {
    EngineConfig {
        per_tick_rate: wrapped_tokens(100),
        withdrawal_delay: 10,
        round_duration: 50,
        power_share_bps: 0,
        ..EngineConfig::default()
    }
}

fn open_node(path: &str) -> Node {
    let store = Arc::new(EngineStore::new(Arc::new(RocksStore::open(path).unwrap())));
    let clock = ManualClock::new(0);
    let engine = match store.load_snapshot().unwrap() {
        Some(snapshot) => {
            clock.set(snapshot.minter.last_mint_tick());
            let asset: TokenLedger = store.load_asset().unwrap().unwrap_or_default();
            StakingEngine::from_snapshot(
                economics(),
                snapshot,
                asset,
                Arc::new(SeededEntropy),
                Arc::new(clock.clone()),
            )
        }
        None => StakingEngine::new(
            economics(),
            TokenLedger::new(),
            Arc::new(SeededEntropy),
            Arc::new(clock.clone()),
        ),
    };
    let engine = Arc::new(RwLock::new(engine));
    let server = SeigRpcServer::new(RpcConfig::default(), engine.clone()).with_store(store.clone());
    Node {
        server,
        engine,
        clock,
        store,
    }
}

async fn rpc(node: &Node, method: &str, params: Value) -> Result<Value, String> {
    let resp = node
        .server
        .call(JsonRpcRequest {
            method: method.to_string(),
            params,
        })
        .await;
    if resp.success {
        Ok(resp.result.unwrap_or(Value::Null))
    } else {
        Err(resp.error.unwrap_or_default())
    }
}

fn amount(value: &Value) -> u128 {
    value.as_str().unwrap().parse().unwrap()
}

fn chain() -> String {
    Address::from_label("chain-a").to_string()
}

fn alice() -> String {
    Address::from_label("alice").to_string()
}

fn bob() -> String {
    Address::from_label("bob").to_string()
}

/// Fund `staker` from the faucet and stake `tokens` wrapped tokens on chain-a.
async fn stake(node: &Node, staker: &str, tokens: u64) {
    let amount = wrapped_tokens(tokens).to_string();
    rpc(
        node,
        "asset/faucet",
        json!({ "account": staker, "asset": "wrapped", "amount": amount }),
    )
    .await
    .unwrap();
    rpc(node, "asset/approve", json!({ "owner": staker, "amount": amount }))
        .await
        .unwrap();
    rpc(
        node,
        "staking/deposit",
        json!({ "chain": chain(), "staker": staker, "amount": amount }),
    )
    .await
    .unwrap();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_seigniorage_doubles_single_stake() {
    let dir = tempfile::tempdir().unwrap();
    let node = open_node(dir.path().join("db").to_str().unwrap());

    rpc(&node, "chain/register", json!({ "chain": chain() })).await.unwrap();
    stake(&node, &alice(), 1000).await;

    node.clock.set(10);
    rpc(&node, "chain/commit", json!({ "chain": chain() })).await.unwrap();
    let result = rpc(
        &node,
        "staking/stake",
        json!({ "staker": alice(), "chain": chain() }),
    )
    .await
    .unwrap();
    let balance = amount(&result["stake"]);
    let expected = wrapped_tokens(2000);
    assert!(expected.abs_diff(balance) <= DUST);
}

#[tokio::test]
async fn test_withdrawal_delay_over_rpc() {
    let dir = tempfile::tempdir().unwrap();
    let node = open_node(dir.path().join("db").to_str().unwrap());

    rpc(&node, "chain/register", json!({ "chain": chain() })).await.unwrap();
    stake(&node, &alice(), 1000).await;

    node.clock.set(10);
    let five_hundred = wrapped_tokens(500).to_string();
    let request = rpc(
        &node,
        "staking/request_withdrawal",
        json!({ "chain": chain(), "staker": alice(), "amount": five_hundred }),
    )
    .await
    .unwrap();
    assert_eq!(request["index"], json!(0));
    assert_eq!(request["ready_at"], json!(20));

    node.clock.set(15);
    let err = rpc(
        &node,
        "staking/process",
        json!({ "chain": chain(), "staker": alice() }),
    )
    .await
    .unwrap_err();
    assert!(err.contains("withdrawal delay not elapsed"));

    node.clock.set(21);
    let outcome = rpc(
        &node,
        "staking/process",
        json!({ "chain": chain(), "staker": alice() }),
    )
    .await
    .unwrap();
    assert_eq!(amount(&outcome["amount"]), wrapped_tokens(500));

    let balance = rpc(&node, "asset/balance", json!({ "account": alice() }))
        .await
        .unwrap();
    assert_eq!(amount(&balance["wrapped"]), wrapped_tokens(500));
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db").to_str().unwrap().to_string();

    let before = {
        let node = open_node(&path);
        rpc(&node, "chain/register", json!({ "chain": chain() })).await.unwrap();
        stake(&node, &alice(), 100).await;
        stake(&node, &bob(), 300).await;
        node.clock.set(4);
        rpc(
            &node,
            "staking/request_withdrawal",
            json!({ "chain": chain(), "staker": bob(), "amount": wrapped_tokens(50).to_string() }),
        )
        .await
        .unwrap();
        assert!(node.store.version() > 0);
        let snapshot = node.engine.read().await.snapshot();
        snapshot
    };

    let node = open_node(&path);
    let after = node.engine.read().await.snapshot();
    assert_eq!(before, after);

    let requests = rpc(
        &node,
        "staking/requests",
        json!({ "chain": chain(), "staker": bob() }),
    )
    .await
    .unwrap();
    assert_eq!(requests["num_pending"], json!(1));
    assert_eq!(amount(&requests["pending_amount"]), wrapped_tokens(50));

    let balance = rpc(&node, "asset/balance", json!({ "account": bob() }))
        .await
        .unwrap();
    assert_eq!(amount(&balance["custody_allowance"]), 0);
}

#[tokio::test]
async fn test_lottery_round_over_rpc() {
    let dir = tempfile::tempdir().unwrap();
    let node = open_node(dir.path().join("db").to_str().unwrap());

    rpc(&node, "chain/register", json!({ "chain": chain() })).await.unwrap();
    stake(&node, &alice(), 10).await;
    rpc(&node, "lottery/init", json!({})).await.unwrap();
    let round = rpc(&node, "lottery/start", json!({})).await.unwrap();
    assert_eq!(round["end_tick"], json!(50));

    node.clock.set(25);
    let power = rpc(&node, "lottery/power", json!({ "staker": alice() }))
        .await
        .unwrap();
    assert!(amount(&power["power"]) > 0);

    let early = rpc(&node, "lottery/end_round", json!({})).await.unwrap_err();
    assert!(early.contains("not finished"));

    node.clock.set(50);
    let ended = rpc(&node, "lottery/end_round", json!({})).await.unwrap();
    assert_eq!(ended["winner"], json!(alice()));

    let winner = rpc(&node, "lottery/winner", json!({ "index": 0 }))
        .await
        .unwrap();
    assert_eq!(winner["winner"], json!(alice()));

    let status = rpc(&node, "node/status", json!({})).await.unwrap();
    assert_eq!(status["engine"]["current_round"], json!(1));
    assert_eq!(status["persistent"], json!(true));
}
