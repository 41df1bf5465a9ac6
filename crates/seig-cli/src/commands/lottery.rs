// crates/seig-cli/src/commands/lottery.rs
//
// `seig lottery {init, start, end-round, power, winner, round}`.

use clap::Subcommand;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::Tabled;

use seig_core::{amount_str, format_wrapped, Address, Tick};
use seig_economics::LotteryRound;

use super::address_param;
use crate::output::{emit, format_json, OutputFormat};
use crate::rpc_client::RpcClient;

/// Lottery subcommands.
#[derive(Debug, Subcommand)]
pub enum LotteryCmd {
    /// Move the lottery out of the uninitialized state.
    Init,
    /// Open round 0.
    Start,
    /// Close the current round, draw a winner and open the next round.
    EndRound,
    /// Show a staker's power in the open round.
    Power { staker: String },
    /// Show the winner of a finished round.
    Winner { index: u64 },
    /// Show a round, or the current one.
    Round {
        #[arg(long)]
        index: Option<u64>,
    },
}

#[derive(Tabled)]
struct RoundRow {
    #[tabled(rename = "Round")]
    index: u64,
    #[tabled(rename = "Start")]
    start_tick: Tick,
    #[tabled(rename = "End")]
    end_tick: Tick,
    #[tabled(rename = "Pool")]
    pool: String,
    #[tabled(rename = "Winner")]
    winner: String,
    #[tabled(rename = "Payout")]
    payout: String,
}

impl From<&LotteryRound> for RoundRow {
    fn from(round: &LotteryRound) -> Self {
        let winner = match (round.ended, round.winner) {
            (false, _) => "(open)".to_string(),
            (true, Some(w)) => w.to_string(),
            (true, None) => "(none)".to_string(),
        };
        Self {
            index: round.index,
            start_tick: round.start_tick,
            end_tick: round.end_tick,
            pool: format_wrapped(round.reward_pool),
            winner,
            payout: format_wrapped(round.payout),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PowerView {
    #[serde(with = "amount_str")]
    power: u128,
}

#[derive(Debug, Serialize, Deserialize)]
struct WinnerView {
    index: u64,
    winner: Option<Address>,
}

/// Run the lottery subcommand.
pub async fn run(
    cmd: &LotteryCmd,
    client: &RpcClient,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        LotteryCmd::Init => {
            let result = client.call("lottery/init", json!({})).await?;
            match format {
                OutputFormat::Json => println!("{}", format_json(&result)),
                OutputFormat::Table => println!("Lottery state: {}", result["state"]),
            }
        }
        LotteryCmd::Start => {
            let round: LotteryRound = client.call_as("lottery/start", json!({})).await?;
            emit(format, &[RoundRow::from(&round)], &round);
        }
        LotteryCmd::EndRound => {
            let round: LotteryRound = client.call_as("lottery/end_round", json!({})).await?;
            emit(format, &[RoundRow::from(&round)], &round);
        }
        LotteryCmd::Power { staker } => {
            let view: PowerView = client
                .call_as("lottery/power", json!({ "staker": address_param(staker) }))
                .await?;
            match format {
                OutputFormat::Json => println!("{}", format_json(&view)),
                OutputFormat::Table => println!("Power: {}", view.power),
            }
        }
        LotteryCmd::Winner { index } => {
            let view: WinnerView = client
                .call_as("lottery/winner", json!({ "index": index }))
                .await?;
            match format {
                OutputFormat::Json => println!("{}", format_json(&view)),
                OutputFormat::Table => match view.winner {
                    Some(winner) => println!("Round {} winner: {}", view.index, winner),
                    None => println!("Round {} had no winner.", view.index),
                },
            }
        }
        LotteryCmd::Round { index } => {
            let params = match index {
                Some(i) => json!({ "index": i }),
                None => json!({}),
            };
            let round: LotteryRound = client.call_as("lottery/round", params).await?;
            emit(format, &[RoundRow::from(&round)], &round);
        }
    }
    Ok(())
}
