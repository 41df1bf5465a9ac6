// crates/seig-rpc/src/handlers/asset.rs
//
// Asset handlers for the development network: Faucet, Approve, GetBalance.
//
// The daemon runs its own in-memory token ledger, so accounts are funded
// through the faucet instead of an external token contract.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use seig_core::{amount_str, Address, Asset, AssetService};
use seig_store::EngineStore;

use super::persist;
use crate::server::SharedEngine;

fn default_asset() -> Asset {
    Asset::Base
}

// ---------------------------------------------------------------------------
// Faucet
// ---------------------------------------------------------------------------

/// Mint fresh currency to an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaucetRequest {
    pub account: Address,
    #[serde(default = "default_asset")]
    pub asset: Asset,
    #[serde(with = "amount_str")]
    pub amount: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub account: Address,
    #[serde(with = "amount_str")]
    pub base: u128,
    #[serde(with = "amount_str")]
    pub wrapped: u128,
    /// Wrapped allowance granted to the custody account.
    #[serde(with = "amount_str")]
    pub custody_allowance: u128,
}

fn balance_view<A: AssetService>(asset: &A, account: Address, custody: &Address) -> BalanceResponse {
    BalanceResponse {
        account,
        base: asset.balance_of(Asset::Base, &account),
        wrapped: asset.balance_of(Asset::Wrapped, &account),
        custody_allowance: asset.allowance(Asset::Wrapped, &account, custody),
    }
}

pub async fn handle_faucet(
    request: FaucetRequest,
    engine: &SharedEngine,
    store: Option<&Arc<EngineStore>>,
) -> Result<BalanceResponse, String> {
    if request.amount == 0 {
        return Err("faucet amount must be positive".to_string());
    }
    let mut engine = engine.write().await;
    engine
        .asset_mut()
        .mint(request.asset, &request.account, request.amount)
        .map_err(|e| e.to_string())?;
    tracing::info!(
        "Faucet minted {} {} to {}",
        request.amount,
        request.asset,
        request.account
    );
    persist(store, &engine)?;
    let custody = engine.config().custody;
    Ok(balance_view(engine.asset(), request.account, &custody))
}

// ---------------------------------------------------------------------------
// Approve
// ---------------------------------------------------------------------------

/// Set the wrapped allowance an owner grants to the custody account.
///
/// Replaces any earlier allowance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveRequest {
    pub owner: Address,
    #[serde(with = "amount_str")]
    pub amount: u128,
}

pub async fn handle_approve(
    request: ApproveRequest,
    engine: &SharedEngine,
    store: Option<&Arc<EngineStore>>,
) -> Result<BalanceResponse, String> {
    let mut engine = engine.write().await;
    let custody = engine.config().custody;
    engine
        .asset_mut()
        .approve(Asset::Wrapped, &request.owner, &custody, request.amount);
    persist(store, &engine)?;
    Ok(balance_view(engine.asset(), request.owner, &custody))
}

// ---------------------------------------------------------------------------
// GetBalance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetBalanceRequest {
    pub account: Address,
}

pub async fn handle_get_balance(
    request: GetBalanceRequest,
    engine: &SharedEngine,
) -> Result<BalanceResponse, String> {
    let engine = engine.read().await;
    let custody = engine.config().custody;
    Ok(balance_view(engine.asset(), request.account, &custody))
}
