// crates/seig-rpc/src/handlers/node.rs
//
// Node handlers: GetStatus, CatchUp.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use seig_economics::{EngineStatus, MintReport};
use seig_store::EngineStore;

use super::{engine_err, persist};
use crate::server::SharedEngine;

// ---------------------------------------------------------------------------
// GetStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetStatusRequest {}

/// Response containing engine and node status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetStatusResponse {
    /// Software version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
    /// Whether engine state is persisted after each mutation.
    pub persistent: bool,
    /// Last snapshot version written, 0 when not persistent.
    pub snapshot_version: u64,
    pub engine: EngineStatus,
}

pub async fn handle_get_status(
    _request: GetStatusRequest,
    engine: &SharedEngine,
    store: Option<&Arc<EngineStore>>,
    start_time: Option<Instant>,
) -> Result<GetStatusResponse, String> {
    let status = engine.read().await.status().map_err(engine_err)?;
    Ok(GetStatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0),
        persistent: store.is_some(),
        snapshot_version: store.map(|s| s.version()).unwrap_or(0),
        engine: status,
    })
}

// ---------------------------------------------------------------------------
// CatchUp
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatchUpRequest {}

/// Handle a CatchUp request: mint seigniorage for every elapsed tick now.
pub async fn handle_catch_up(
    _request: CatchUpRequest,
    engine: &SharedEngine,
    store: Option<&Arc<EngineStore>>,
) -> Result<MintReport, String> {
    let mut engine = engine.write().await;
    let report = engine.catch_up().map_err(engine_err)?;
    if report.elapsed > 0 {
        persist(store, &engine)?;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use seig_store::MemoryStore;

    use crate::handlers::test_support::{chain, engine_with_clock};

    #[tokio::test]
    async fn test_status_reports_chains_and_persistence() {
        let (engine, clock) = engine_with_clock();
        engine.write().await.register_chain(chain()).unwrap();
        clock.set(4);
        let store = Arc::new(EngineStore::new(Arc::new(MemoryStore::new())));

        let report = handle_catch_up(CatchUpRequest {}, &engine, Some(&store))
            .await
            .unwrap();
        assert_eq!(report.elapsed, 4);

        let status = handle_get_status(GetStatusRequest {}, &engine, Some(&store), None)
            .await
            .unwrap();
        assert!(status.persistent);
        assert_eq!(status.snapshot_version, 1);
        assert_eq!(status.engine.chains, 1);
        assert_eq!(status.engine.now, 4);
        assert_eq!(status.engine.last_mint_tick, 4);
    }
}
