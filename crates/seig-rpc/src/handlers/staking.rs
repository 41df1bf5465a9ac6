// crates/seig-rpc/src/handlers/staking.rs
//
// Staking handlers: Deposit, DepositBase, RequestWithdrawal, ProcessRequest,
// Redeposit, RedepositMulti, GetRequests, GetStake.
//
// Amounts cross the wire as decimal strings in wrapped units (27 decimals),
// except `base_amount`, which is in base units (18 decimals).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use seig_core::{amount_str, Amount, ChainId, StakerId, Tick};
use seig_economics::{ProcessOutcome, RedepositSummary, WithdrawalRequest};
use seig_store::EngineStore;

use super::{engine_err, persist};
use crate::server::SharedEngine;

/// A staker's balance after a staking call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeResponse {
    #[serde(with = "amount_str")]
    pub stake: Amount,
}

// ---------------------------------------------------------------------------
// Deposit
// ---------------------------------------------------------------------------

/// Request to stake wrapped currency on a chain.
///
/// The staker must already have approved the custody account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositRequest {
    pub chain: ChainId,
    pub staker: StakerId,
    #[serde(with = "amount_str")]
    pub amount: Amount,
}

pub async fn handle_deposit(
    request: DepositRequest,
    engine: &SharedEngine,
    store: Option<&Arc<EngineStore>>,
) -> Result<StakeResponse, String> {
    let mut engine = engine.write().await;
    let stake = engine
        .deposit(request.chain, request.staker, request.amount)
        .map_err(engine_err)?;
    persist(store, &engine)?;
    Ok(StakeResponse { stake })
}

/// Request to wrap base currency and stake the result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositBaseRequest {
    pub chain: ChainId,
    pub staker: StakerId,
    #[serde(with = "amount_str")]
    pub base_amount: u128,
}

pub async fn handle_deposit_base(
    request: DepositBaseRequest,
    engine: &SharedEngine,
    store: Option<&Arc<EngineStore>>,
) -> Result<StakeResponse, String> {
    let mut engine = engine.write().await;
    let stake = engine
        .deposit_base(request.chain, request.staker, request.base_amount)
        .map_err(engine_err)?;
    persist(store, &engine)?;
    Ok(StakeResponse { stake })
}

// ---------------------------------------------------------------------------
// RequestWithdrawal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestWithdrawalRequest {
    pub chain: ChainId,
    pub staker: StakerId,
    #[serde(with = "amount_str")]
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestWithdrawalResponse {
    /// Position of the new request in the staker's queue.
    pub index: usize,
    /// First tick at which the request can be processed.
    pub ready_at: Tick,
}

pub async fn handle_request_withdrawal(
    request: RequestWithdrawalRequest,
    engine: &SharedEngine,
    store: Option<&Arc<EngineStore>>,
) -> Result<RequestWithdrawalResponse, String> {
    let mut engine = engine.write().await;
    let index = engine
        .request_withdrawal(request.chain, request.staker, request.amount)
        .map_err(engine_err)?;
    let delay = engine.config().withdrawal_delay;
    let ready_at = engine
        .withdrawal_request(request.chain, request.staker, index)
        .map_err(engine_err)?
        .map(|r| r.ready_at(delay))
        .unwrap_or_else(|| engine.now().saturating_add(delay));
    persist(store, &engine)?;
    Ok(RequestWithdrawalResponse { index, ready_at })
}

// ---------------------------------------------------------------------------
// ProcessRequest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRequestRequest {
    pub chain: ChainId,
    pub staker: StakerId,
    /// Unwrap the payout into the base currency.
    #[serde(default)]
    pub payout_in_base: bool,
}

pub async fn handle_process_request(
    request: ProcessRequestRequest,
    engine: &SharedEngine,
    store: Option<&Arc<EngineStore>>,
) -> Result<ProcessOutcome, String> {
    let mut engine = engine.write().await;
    let outcome = engine
        .process_request(request.chain, request.staker, request.payout_in_base)
        .map_err(engine_err)?;
    persist(store, &engine)?;
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Redeposit / RedepositMulti
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedepositRequest {
    pub chain: ChainId,
    pub staker: StakerId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedepositResponse {
    /// Amount moved back into the ledger.
    #[serde(with = "amount_str")]
    pub amount: Amount,
    /// Staker's balance on the chain afterwards.
    #[serde(with = "amount_str")]
    pub stake: Amount,
}

pub async fn handle_redeposit(
    request: RedepositRequest,
    engine: &SharedEngine,
    store: Option<&Arc<EngineStore>>,
) -> Result<RedepositResponse, String> {
    let mut engine = engine.write().await;
    let amount = engine
        .redeposit(request.chain, request.staker)
        .map_err(engine_err)?;
    let stake = engine
        .stake_of(request.chain, request.staker)
        .map_err(engine_err)?;
    persist(store, &engine)?;
    Ok(RedepositResponse { amount, stake })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedepositMultiRequest {
    pub chain: ChainId,
    pub staker: StakerId,
    pub count: usize,
}

pub async fn handle_redeposit_multi(
    request: RedepositMultiRequest,
    engine: &SharedEngine,
    store: Option<&Arc<EngineStore>>,
) -> Result<RedepositSummary, String> {
    let mut engine = engine.write().await;
    let summary = engine
        .redeposit_multi(request.chain, request.staker, request.count)
        .map_err(engine_err)?;
    persist(store, &engine)?;
    Ok(summary)
}

// ---------------------------------------------------------------------------
// GetRequests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetRequestsRequest {
    pub chain: ChainId,
    pub staker: StakerId,
}

/// Withdrawal queue of one staker on one chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetRequestsResponse {
    /// All requests, oldest first, including processed and cancelled ones.
    pub requests: Vec<WithdrawalRequest>,
    pub num_pending: usize,
    #[serde(with = "amount_str")]
    pub pending_amount: Amount,
    /// Configured withdrawal delay in ticks.
    pub withdrawal_delay: Tick,
}

pub async fn handle_get_requests(
    request: GetRequestsRequest,
    engine: &SharedEngine,
) -> Result<GetRequestsResponse, String> {
    let engine = engine.read().await;
    let requests = engine
        .withdrawal_requests(request.chain, request.staker)
        .map_err(engine_err)?;
    let num_pending = engine
        .num_pending_requests(request.chain, request.staker)
        .map_err(engine_err)?;
    let pending_amount = engine
        .pending_amount(request.chain, request.staker)
        .map_err(engine_err)?;
    Ok(GetRequestsResponse {
        requests,
        num_pending,
        pending_amount,
        withdrawal_delay: engine.config().withdrawal_delay,
    })
}

// ---------------------------------------------------------------------------
// GetStake
// ---------------------------------------------------------------------------

/// Stake query. Without a chain, sums over every chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetStakeRequest {
    pub staker: StakerId,
    #[serde(default)]
    pub chain: Option<ChainId>,
}

pub async fn handle_get_stake(
    request: GetStakeRequest,
    engine: &SharedEngine,
) -> Result<StakeResponse, String> {
    let engine = engine.read().await;
    let stake = match request.chain {
        Some(chain) => engine.stake_of(chain, request.staker),
        None => engine.total_stake_of(request.staker),
    }
    .map_err(engine_err)?;
    Ok(StakeResponse { stake })
}
