// crates/seig-rpc/src/handlers/chain.rs
//
// Chain handlers: RegisterChain, Commit, GetChainInfo, ListChains.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use seig_core::ChainId;
use seig_economics::{ChainInfo, ChainRecord, MintReport};
use seig_store::EngineStore;

use super::{engine_err, persist};
use crate::server::SharedEngine;

// ---------------------------------------------------------------------------
// RegisterChain
// ---------------------------------------------------------------------------

/// Request to register a chain as a staking target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterChainRequest {
    /// Hex-encoded chain address.
    pub chain: ChainId,
}

pub async fn handle_register_chain(
    request: RegisterChainRequest,
    engine: &SharedEngine,
    store: Option<&Arc<EngineStore>>,
) -> Result<ChainRecord, String> {
    let mut engine = engine.write().await;
    let record = engine.register_chain(request.chain).map_err(engine_err)?;
    persist(store, &engine)?;
    Ok(record)
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// A chain announcing a new block of work. Triggers a seigniorage catch-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRequest {
    pub chain: ChainId,
}

pub async fn handle_commit(
    request: CommitRequest,
    engine: &SharedEngine,
    store: Option<&Arc<EngineStore>>,
) -> Result<MintReport, String> {
    let mut engine = engine.write().await;
    let report = engine.commit(request.chain).map_err(engine_err)?;
    persist(store, &engine)?;
    Ok(report)
}

// ---------------------------------------------------------------------------
// GetChainInfo / ListChains
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetChainInfoRequest {
    pub chain: ChainId,
}

/// Handle a GetChainInfo request. Stake figures include seigniorage that
/// has accrued but not yet been minted.
pub async fn handle_get_chain_info(
    request: GetChainInfoRequest,
    engine: &SharedEngine,
) -> Result<ChainInfo, String> {
    engine
        .read()
        .await
        .chain_info(&request.chain)
        .map_err(engine_err)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListChainsRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListChainsResponse {
    pub chains: Vec<ChainInfo>,
}

pub async fn handle_list_chains(
    _request: ListChainsRequest,
    engine: &SharedEngine,
) -> Result<ListChainsResponse, String> {
    let chains = engine.read().await.chains().map_err(engine_err)?;
    Ok(ListChainsResponse { chains })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{chain, engine_with_clock};

    #[tokio::test]
    async fn test_register_then_list() {
        let (engine, _clock) = engine_with_clock();
        let record = handle_register_chain(RegisterChainRequest { chain: chain() }, &engine, None)
            .await
            .unwrap();
        assert_eq!(record.id, chain());

        let list = handle_list_chains(ListChainsRequest {}, &engine).await.unwrap();
        assert_eq!(list.chains.len(), 1);
        assert_eq!(list.chains[0].total_stake, 0);
    }

    #[tokio::test]
    async fn test_register_twice_reports_error() {
        let (engine, _clock) = engine_with_clock();
        handle_register_chain(RegisterChainRequest { chain: chain() }, &engine, None)
            .await
            .unwrap();
        let err = handle_register_chain(RegisterChainRequest { chain: chain() }, &engine, None)
            .await
            .unwrap_err();
        assert!(err.contains("already registered"));
    }

    #[tokio::test]
    async fn test_commit_records_tick() {
        let (engine, clock) = engine_with_clock();
        handle_register_chain(RegisterChainRequest { chain: chain() }, &engine, None)
            .await
            .unwrap();
        clock.advance(3);
        handle_commit(CommitRequest { chain: chain() }, &engine, None)
            .await
            .unwrap();
        let info = handle_get_chain_info(GetChainInfoRequest { chain: chain() }, &engine)
            .await
            .unwrap();
        assert_eq!(info.last_commit_tick, Some(3));
        assert_eq!(info.commit_count, 1);
    }
}
