// crates/seig-daemon/src/scheduler.rs
//
// Tick scheduler for the staking daemon.
//
// Advances the manual clock one tick per interval, catches the minter up,
// and ends the open lottery round once its end tick has passed. State is
// persisted after every tick that changed it.

use std::sync::Arc;
use std::time::Duration;

use seig_core::{format_wrapped, Clock, ManualClock, SeigError, Tick};
use seig_economics::{LotteryRound, MintReport};
use seig_rpc::SharedEngine;
use seig_store::EngineStore;

/// What one scheduler step did.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub tick: Tick,
    pub mint: MintReport,
    pub ended_round: Option<LotteryRound>,
}

/// Drives the clock and the keeper duties.
pub struct TickScheduler {
    engine: SharedEngine,
    clock: ManualClock,
    store: Option<Arc<EngineStore>>,
    interval: Duration,
}

impl TickScheduler {
    pub fn new(
        engine: SharedEngine,
        clock: ManualClock,
        store: Option<Arc<EngineStore>>,
        interval: Duration,
    ) -> Self {
        Self {
            engine,
            clock,
            store,
            interval,
        }
    }

    /// Run until ctrl-c. Step failures are logged and the loop continues.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        tracing::info!(
            "Tick scheduler started (interval={}ms, tick={})",
            self.interval.as_millis(),
            self.clock.current_tick()
        );

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Tick scheduler received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(self.interval) => {
                    if let Err(e) = self.step().await {
                        tracing::error!("Tick {} failed: {}", self.clock.current_tick(), e);
                    }
                }
            }
        }

        Ok(())
    }

    /// Advance one tick and perform due work.
    ///
    /// The tick moves only while the engine write lock is held, so no
    /// request handler observes two ticks within one operation.
    pub async fn step(&self) -> Result<TickOutcome, SeigError> {
        let mut engine = self.engine.write().await;
        let tick = self.clock.advance(1);

        let mint = engine.catch_up()?;
        if mint.total_mint > 0 {
            tracing::trace!(
                "Tick {}: minted {} ({} forfeited)",
                tick,
                format_wrapped(mint.distributed),
                format_wrapped(mint.forfeited)
            );
        }

        let ended_round = if engine.round_due() {
            let round = engine.lottery_end_round()?;
            match round.winner {
                Some(winner) => tracing::info!(
                    "Round {} ended: {} won {}",
                    round.index,
                    winner,
                    format_wrapped(round.payout)
                ),
                None => tracing::info!(
                    "Round {} ended without power; pool rolls over",
                    round.index
                ),
            }
            Some(round)
        } else {
            None
        };

        if mint.elapsed > 0 || ended_round.is_some() {
            if let Some(store) = &self.store {
                store.save(&*engine)?;
            }
        }

        Ok(TickOutcome {
            tick,
            mint,
            ended_round,
        })
    }
}
