// crates/seig-cli/src/commands/status.rs
//
// `seig status` and `seig catch-up`: daemon status and manual minting.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::Tabled;

use seig_core::format_wrapped;
use seig_economics::{EngineStatus, MintReport};

use super::chain::print_mint;
use crate::output::{emit, OutputFormat};
use crate::rpc_client::RpcClient;

#[derive(Debug, Serialize, Deserialize)]
struct StatusView {
    version: String,
    uptime_seconds: u64,
    persistent: bool,
    snapshot_version: u64,
    engine: EngineStatus,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn status_rows(view: &StatusView) -> Vec<StatusRow> {
    let engine = &view.engine;
    let row = |field: &'static str, value: String| StatusRow { field, value };
    vec![
        row("Version", view.version.clone()),
        row("Uptime", format!("{}s", view.uptime_seconds)),
        row(
            "Persistence",
            if view.persistent {
                format!("on (snapshot v{})", view.snapshot_version)
            } else {
                "off".to_string()
            },
        ),
        row("Tick", engine.now.to_string()),
        row("Last mint", engine.last_mint_tick.to_string()),
        row("Rate per tick", format_wrapped(engine.per_tick_rate)),
        row("Chains", engine.chains.to_string()),
        row("Total staked", format_wrapped(engine.total_staked)),
        row(
            "Lottery",
            format!("{:?}", engine.lottery_state).to_lowercase(),
        ),
        row(
            "Current round",
            engine
                .current_round
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
    ]
}

/// Print daemon and engine status.
pub async fn run(client: &RpcClient, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let view: StatusView = client.call_as("node/status", json!({})).await?;
    emit(format, &status_rows(&view), &view);
    Ok(())
}

/// Mint seigniorage for every elapsed tick now.
pub async fn catch_up(client: &RpcClient, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let report: MintReport = client.call_as("node/catch_up", json!({})).await?;
    print_mint(&report, format);
    Ok(())
}
