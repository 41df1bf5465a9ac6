// crates/seig-store/tests/rocks_snapshot.rs
//
// Engine snapshots written to RocksDB, reopened from disk, and resumed.

use std::sync::Arc;

use seig_core::{wrapped_tokens, Address, Asset, AssetService, ManualClock};
use seig_economics::{EngineConfig, SeededEntropy, StakingEngine, TokenLedger};
use seig_store::{EngineStore, RocksStore};

fn config() -> EngineConfig {
    EngineConfig {
        per_tick_rate: wrapped_tokens(10),
        withdrawal_delay: 3,
        ..EngineConfig::default()
    }
}

fn fund_and_stake(engine: &mut StakingEngine<TokenLedger>, chain: Address, staker: Address, tokens: u64) {
    let custody = engine.config().custody;
    engine
        .asset_mut()
        .mint(Asset::Wrapped, &staker, wrapped_tokens(tokens))
        .unwrap();
    engine
        .asset_mut()
        .approve(Asset::Wrapped, &staker, &custody, wrapped_tokens(tokens));
    engine.deposit(chain, staker, wrapped_tokens(tokens)).unwrap();
}

#[test]
fn test_resumed_engine_accrues_like_the_original() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db").to_str().unwrap().to_string();
    let chain = Address::from_label("chain-a");
    let alice = Address::from_label("alice");
    let bob = Address::from_label("bob");

    let clock = ManualClock::new(0);
    let mut original = StakingEngine::new(
        config(),
        TokenLedger::new(),
        Arc::new(SeededEntropy),
        Arc::new(clock.clone()),
    );
    original.register_chain(chain).unwrap();
    fund_and_stake(&mut original, chain, alice, 30);
    fund_and_stake(&mut original, chain, bob, 10);
    clock.set(4);
    original.commit(chain).unwrap();
    original.request_withdrawal(chain, bob, wrapped_tokens(2)).unwrap();

    {
        let store = EngineStore::new(Arc::new(RocksStore::open(&path).unwrap()));
        assert_eq!(store.save(&original).unwrap(), 1);
    }

    let store = EngineStore::new(Arc::new(RocksStore::open(&path).unwrap()));
    let snapshot = store.load_snapshot().unwrap().unwrap();
    assert_eq!(snapshot, original.snapshot());
    assert_eq!(store.version(), 1);

    let asset: TokenLedger = store.load_asset().unwrap().unwrap();
    assert_eq!(asset.balance_of(Asset::Wrapped, &alice), 0);

    let resumed_clock = ManualClock::new(4);
    let mut resumed = StakingEngine::from_snapshot(
        config(),
        snapshot,
        asset,
        Arc::new(SeededEntropy),
        Arc::new(resumed_clock.clone()),
    );

    clock.set(9);
    resumed_clock.set(9);
    original.catch_up().unwrap();
    resumed.catch_up().unwrap();
    assert_eq!(resumed.snapshot(), original.snapshot());
    assert_eq!(
        resumed.stake_of(chain, alice).unwrap(),
        original.stake_of(chain, alice).unwrap()
    );

    let outcome = resumed.process_request(chain, bob, false).unwrap();
    assert_eq!(outcome.amount, wrapped_tokens(2));
    assert_eq!(store.save(&resumed).unwrap(), 2);
}

#[test]
fn test_later_save_replaces_earlier_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db").to_str().unwrap().to_string();
    let chain = Address::from_label("chain-a");
    let alice = Address::from_label("alice");

    let clock = ManualClock::new(0);
    let mut engine = StakingEngine::new(
        config(),
        TokenLedger::new(),
        Arc::new(SeededEntropy),
        Arc::new(clock.clone()),
    );
    engine.register_chain(chain).unwrap();
    fund_and_stake(&mut engine, chain, alice, 5);

    let store = EngineStore::new(Arc::new(RocksStore::open(&path).unwrap()));
    store.save(&engine).unwrap();

    clock.set(2);
    engine.request_withdrawal(chain, alice, wrapped_tokens(1)).unwrap();
    store.save(&engine).unwrap();
    drop(store);

    let store = EngineStore::new(Arc::new(RocksStore::open(&path).unwrap()));
    let snapshot = store.load_snapshot().unwrap().unwrap();
    assert_eq!(snapshot, engine.snapshot());
    assert_eq!(store.version(), 2);
}
