// crates/seig-rpc/src/handlers/mod.rs
//
// Handler modules for all RPC endpoints.
// Each module defines request/response types and handler functions
// for a specific API group.

pub mod asset;
pub mod chain;
pub mod lottery;
pub mod node;
pub mod staking;

use std::sync::Arc;

use seig_core::SeigError;
use seig_economics::{StakingEngine, TokenLedger};
use seig_store::EngineStore;

/// Render an engine error for the response envelope.
pub(crate) fn engine_err(e: SeigError) -> String {
    e.to_string()
}

/// Persist the engine after a mutation, if a store is attached.
///
/// The in-memory engine has already changed when this runs; a failed save
/// is reported to the caller and logged, and the next successful save
/// carries the change.
pub(crate) fn persist(
    store: Option<&Arc<EngineStore>>,
    engine: &StakingEngine<TokenLedger>,
) -> Result<(), String> {
    let Some(store) = store else {
        return Ok(());
    };
    match store.save(engine) {
        Ok(version) => {
            tracing::debug!("Persisted engine snapshot version {}", version);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Failed to persist engine snapshot: {}", e);
            Err(format!("state changed but was not persisted: {}", e))
        }
    }
}
