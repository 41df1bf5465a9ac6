// crates/seig-cli/src/commands/chain.rs
//
// `seig chain {register, commit, info, list}`: chain registry commands.

use clap::Subcommand;
use serde::Deserialize;
use serde_json::json;
use tabled::Tabled;

use seig_core::{format_wrapped, Tick};
use seig_economics::{ChainInfo, MintReport};

use super::address_param;
use crate::output::{emit, OutputFormat};
use crate::rpc_client::RpcClient;

/// Chain subcommands.
#[derive(Debug, Subcommand)]
pub enum ChainCmd {
    /// Register a chain so it can accept stake.
    Register {
        /// Chain address (hex) or label.
        chain: String,
    },
    /// Commit on behalf of a chain, minting accrued seigniorage.
    Commit { chain: String },
    /// Show one chain.
    Info { chain: String },
    /// List every registered chain.
    List,
}

#[derive(Tabled)]
struct ChainRow {
    #[tabled(rename = "Chain")]
    id: String,
    #[tabled(rename = "Registered")]
    registered_at: Tick,
    #[tabled(rename = "Last commit")]
    last_commit: String,
    #[tabled(rename = "Commits")]
    commits: u64,
    #[tabled(rename = "Total stake")]
    total_stake: String,
    #[tabled(rename = "Stakers")]
    stakers: usize,
}

impl From<&ChainInfo> for ChainRow {
    fn from(info: &ChainInfo) -> Self {
        Self {
            id: info.id.to_string(),
            registered_at: info.registered_at,
            last_commit: info
                .last_commit_tick
                .map(|t| t.to_string())
                .unwrap_or_else(|| "-".to_string()),
            commits: info.commit_count,
            total_stake: format_wrapped(info.total_stake),
            stakers: info.stakers,
        }
    }
}

#[derive(Tabled)]
struct MintRow {
    #[tabled(rename = "Ticks")]
    elapsed: Tick,
    #[tabled(rename = "Minted")]
    total_mint: String,
    #[tabled(rename = "To stakers")]
    distributed: String,
    #[tabled(rename = "To lottery")]
    lottery: String,
    #[tabled(rename = "Forfeited")]
    forfeited: String,
}

pub(crate) fn print_mint(report: &MintReport, format: OutputFormat) {
    let row = MintRow {
        elapsed: report.elapsed,
        total_mint: format_wrapped(report.total_mint),
        distributed: format_wrapped(report.distributed),
        lottery: format_wrapped(report.lottery_slice),
        forfeited: format_wrapped(report.forfeited),
    };
    emit(format, &[row], report);
}

#[derive(Deserialize)]
struct ChainList {
    chains: Vec<ChainInfo>,
}

/// Run the chain subcommand.
pub async fn run(
    cmd: &ChainCmd,
    client: &RpcClient,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ChainCmd::Register { chain } => {
            let chain = address_param(chain);
            client
                .call("chain/register", json!({ "chain": chain }))
                .await?;
            let info: ChainInfo = client.call_as("chain/info", json!({ "chain": chain })).await?;
            emit(format, &[ChainRow::from(&info)], &info);
        }
        ChainCmd::Commit { chain } => {
            let report: MintReport = client
                .call_as("chain/commit", json!({ "chain": address_param(chain) }))
                .await?;
            print_mint(&report, format);
        }
        ChainCmd::Info { chain } => {
            let info: ChainInfo = client
                .call_as("chain/info", json!({ "chain": address_param(chain) }))
                .await?;
            emit(format, &[ChainRow::from(&info)], &info);
        }
        ChainCmd::List => {
            let list: ChainList = client.call_as("chain/list", json!({})).await?;
            if list.chains.is_empty() && format == OutputFormat::Table {
                println!("No chains registered.");
                return Ok(());
            }
            let rows: Vec<ChainRow> = list.chains.iter().map(ChainRow::from).collect();
            emit(format, &rows, &list.chains);
        }
    }
    Ok(())
}
