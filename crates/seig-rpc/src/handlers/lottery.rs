// crates/seig-rpc/src/handlers/lottery.rs
//
// PowerTON handlers: Init, Start, EndRound, GetPower, GetWinner, GetRound.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use seig_core::{amount_str, StakerId};
use seig_economics::{LotteryRound, LotteryState};
use seig_store::EngineStore;

use super::{engine_err, persist};
use crate::server::SharedEngine;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitResponse {
    pub state: LotteryState,
}

pub async fn handle_init(
    _request: InitRequest,
    engine: &SharedEngine,
    store: Option<&Arc<EngineStore>>,
) -> Result<InitResponse, String> {
    let mut engine = engine.write().await;
    engine.lottery_init().map_err(engine_err)?;
    persist(store, &engine)?;
    Ok(InitResponse {
        state: engine.lottery().state(),
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartRequest {}

/// Handle a Start request. Returns the newly opened round 0.
pub async fn handle_start(
    _request: StartRequest,
    engine: &SharedEngine,
    store: Option<&Arc<EngineStore>>,
) -> Result<LotteryRound, String> {
    let mut engine = engine.write().await;
    let round = engine.lottery_start().map_err(engine_err)?;
    persist(store, &engine)?;
    Ok(round)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndRoundRequest {}

/// Handle an EndRound request. Returns the round that was closed.
pub async fn handle_end_round(
    _request: EndRoundRequest,
    engine: &SharedEngine,
    store: Option<&Arc<EngineStore>>,
) -> Result<LotteryRound, String> {
    let mut engine = engine.write().await;
    let round = engine.lottery_end_round().map_err(engine_err)?;
    persist(store, &engine)?;
    Ok(round)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPowerRequest {
    pub staker: StakerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPowerResponse {
    /// Power accrued in the open round, in base-unit ticks.
    #[serde(with = "amount_str")]
    pub power: u128,
}

pub async fn handle_get_power(
    request: GetPowerRequest,
    engine: &SharedEngine,
) -> Result<GetPowerResponse, String> {
    let power = engine
        .read()
        .await
        .lottery_power_of(&request.staker)
        .map_err(engine_err)?;
    Ok(GetPowerResponse { power })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetWinnerRequest {
    pub index: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetWinnerResponse {
    pub index: u64,
    /// `None` when nobody held power during the round.
    pub winner: Option<StakerId>,
}

pub async fn handle_get_winner(
    request: GetWinnerRequest,
    engine: &SharedEngine,
) -> Result<GetWinnerResponse, String> {
    let winner = engine
        .read()
        .await
        .lottery_winner_of(request.index)
        .map_err(engine_err)?;
    Ok(GetWinnerResponse {
        index: request.index,
        winner,
    })
}

/// Round lookup. Without an index, returns the open round.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetRoundRequest {
    #[serde(default)]
    pub index: Option<u64>,
}

pub async fn handle_get_round(
    request: GetRoundRequest,
    engine: &SharedEngine,
) -> Result<LotteryRound, String> {
    let engine = engine.read().await;
    match request.index {
        Some(index) => engine.lottery_round(index).map_err(engine_err),
        None => engine
            .lottery_current_round()
            .ok_or_else(|| "no open round".to_string()),
    }
}
