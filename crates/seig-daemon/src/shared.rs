// crates/seig-daemon/src/shared.rs
//
// DaemonSharedState: the engine and its collaborators, shared between the
// tick scheduler and the RPC server.
//
// Constructed once in main.rs. On startup the engine is restored from the
// snapshot store when one exists, and the clock resumes from the latest
// tick recorded in that snapshot.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use seig_core::{ManualClock, SeigError, Tick};
use seig_economics::{EngineSnapshot, SeededEntropy, StakingEngine, TokenLedger};
use seig_rpc::SharedEngine;
use seig_store::{EngineStore, RocksStore};

use crate::config::DaemonConfig;

/// Shared state for the daemon tasks.
#[derive(Clone)]
pub struct DaemonSharedState {
    /// The staking engine behind an async RwLock.
    pub engine: SharedEngine,
    /// Tick source advanced by the scheduler.
    pub clock: ManualClock,
    /// Snapshot store, absent when running in memory.
    pub store: Option<Arc<EngineStore>>,
    /// Daemon start time for uptime calculation.
    pub start_time: Instant,
}

/// Latest tick any persisted entity refers to.
fn resume_tick(snapshot: &EngineSnapshot) -> Tick {
    let round_start = snapshot
        .lottery
        .current_round()
        .map(|r| r.start_tick)
        .unwrap_or(0);
    let last_commit = snapshot
        .chains
        .values()
        .filter_map(|c| c.last_commit_tick)
        .max()
        .unwrap_or(0);
    snapshot
        .minter
        .last_mint_tick()
        .max(round_start)
        .max(last_commit)
}

impl DaemonSharedState {
    /// Open the snapshot store and restore or create the engine.
    pub fn open(config: &DaemonConfig, data_dir: &str) -> Result<Self, SeigError> {
        let store = if config.in_memory {
            tracing::info!("Running in memory; state is not persisted");
            None
        } else {
            std::fs::create_dir_all(data_dir).map_err(|e| {
                SeigError::Storage(format!("Failed to create data dir {}: {}", data_dir, e))
            })?;
            let db_path = format!("{}/rocksdb", data_dir);
            let rocks = RocksStore::open(&db_path)?;
            tracing::info!("Snapshot store opened at {}", db_path);
            Some(Arc::new(EngineStore::new(Arc::new(rocks))))
        };

        let snapshot = match &store {
            Some(store) => store.load_snapshot()?,
            None => None,
        };

        let clock = ManualClock::new(0);
        let engine = match (snapshot, &store) {
            (Some(snapshot), Some(store)) => {
                let tick = resume_tick(&snapshot);
                clock.set(tick);
                let asset: TokenLedger = store.load_asset()?.unwrap_or_default();
                tracing::info!(
                    "Restored snapshot version {} ({} chains, resuming at tick {})",
                    store.version(),
                    snapshot.chains.len(),
                    tick
                );
                StakingEngine::from_snapshot(
                    config.engine_config(),
                    snapshot,
                    asset,
                    Arc::new(SeededEntropy),
                    Arc::new(clock.clone()),
                )
            }
            _ => {
                tracing::info!("No snapshot found; starting a fresh engine");
                StakingEngine::new(
                    config.engine_config(),
                    TokenLedger::new(),
                    Arc::new(SeededEntropy),
                    Arc::new(clock.clone()),
                )
            }
        };

        Ok(Self {
            engine: Arc::new(RwLock::new(engine)),
            clock,
            store,
            start_time: Instant::now(),
        })
    }

    /// Register configured chains that are missing and optionally start the
    /// lottery. Persists if anything changed.
    pub async fn bootstrap(&self, config: &DaemonConfig) -> Result<(), SeigError> {
        let mut engine = self.engine.write().await;
        let mut changed = false;

        for chain in config.chain_ids() {
            if engine.chain_info(&chain).is_ok() {
                continue;
            }
            engine.register_chain(chain)?;
            changed = true;
        }

        if config.start_lottery && !engine.lottery().is_running() {
            if engine.lottery().state() == seig_economics::LotteryState::Uninitialized {
                engine.lottery_init()?;
            }
            let round = engine.lottery_start()?;
            tracing::info!(
                "Lottery started: round {} ends at tick {}",
                round.index,
                round.end_tick
            );
            changed = true;
        }

        if changed {
            if let Some(store) = &self.store {
                store.save(&*engine)?;
            }
        }
        Ok(())
    }
}
