// crates/seig-cli/src/commands/stake.rs
//
// `seig stake {deposit, withdraw, process, redeposit, requests, show}`:
// staking and withdrawal queue commands.
//
// Amounts are decimal tokens. Wrapped amounts have 27 decimals, base
// amounts 18.

use clap::Subcommand;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::Tabled;

use seig_core::{amount_str, format_wrapped, Amount, Tick, BASE_DECIMALS};
use seig_economics::{ProcessOutcome, RedepositSummary, WithdrawalRequest};

use super::{address_param, amount_param};
use crate::output::{emit, format_units, OutputFormat};
use crate::rpc_client::RpcClient;

/// Staking subcommands.
#[derive(Debug, Subcommand)]
pub enum StakeCmd {
    /// Stake wrapped tokens on a chain. The staker must have approved custody.
    Deposit {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        staker: String,
        /// Amount to stake.
        #[arg(long)]
        amount: String,
        /// Treat `amount` as base tokens, wrapped on the way in.
        #[arg(long)]
        base: bool,
    },
    /// Queue a withdrawal. The amount leaves the stake immediately.
    Withdraw {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        staker: String,
        #[arg(long)]
        amount: String,
    },
    /// Pay out the oldest pending request once its delay has elapsed.
    Process {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        staker: String,
        /// Receive the payout in base tokens.
        #[arg(long)]
        base: bool,
    },
    /// Move pending requests back into the stake.
    Redeposit {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        staker: String,
        /// Number of pending requests to move, oldest first. Defaults to one.
        #[arg(long)]
        count: Option<usize>,
    },
    /// Show a staker's withdrawal queue on a chain.
    Requests {
        #[arg(long)]
        chain: String,
        #[arg(long)]
        staker: String,
    },
    /// Show a staker's stake on one chain, or across all chains.
    Show {
        #[arg(long)]
        staker: String,
        #[arg(long)]
        chain: Option<String>,
    },
}

#[derive(Serialize, Deserialize)]
struct StakeView {
    #[serde(with = "amount_str")]
    stake: Amount,
}

#[derive(Serialize, Deserialize)]
struct RequestQueueView {
    requests: Vec<WithdrawalRequest>,
    num_pending: usize,
    #[serde(with = "amount_str")]
    pending_amount: Amount,
    withdrawal_delay: Tick,
}

#[derive(Serialize, Deserialize)]
struct RedepositView {
    #[serde(with = "amount_str")]
    amount: Amount,
    #[serde(with = "amount_str")]
    stake: Amount,
}

#[derive(Tabled)]
struct StakeRow {
    #[tabled(rename = "Staker")]
    staker: String,
    #[tabled(rename = "Chain")]
    chain: String,
    #[tabled(rename = "Stake")]
    stake: String,
}

#[derive(Tabled)]
struct RequestRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Requested")]
    requested_at: Tick,
    #[tabled(rename = "Ready at")]
    ready_at: Tick,
    #[tabled(rename = "Status")]
    status: String,
}

#[derive(Tabled)]
struct PayoutRow {
    #[tabled(rename = "Processed")]
    processed: usize,
    #[tabled(rename = "Withdrawn")]
    amount: String,
    #[tabled(rename = "Paid")]
    paid: String,
}

fn request_rows(view: &RequestQueueView) -> Vec<RequestRow> {
    view.requests
        .iter()
        .enumerate()
        .map(|(index, r)| RequestRow {
            index,
            amount: format_wrapped(r.amount),
            requested_at: r.requested_at,
            ready_at: r.ready_at(view.withdrawal_delay),
            status: format!("{:?}", r.status).to_lowercase(),
        })
        .collect()
}

/// Run the stake subcommand.
pub async fn run(
    cmd: &StakeCmd,
    client: &RpcClient,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        StakeCmd::Deposit {
            chain,
            staker,
            amount,
            base,
        } => {
            let (method, field) = if *base {
                ("staking/deposit_base", "base_amount")
            } else {
                ("staking/deposit", "amount")
            };
            let mut params = json!({
                "chain": address_param(chain),
                "staker": address_param(staker),
            });
            params[field] = json!(amount_param(amount, *base)?);
            let view: StakeView = client.call_as(method, params).await?;
            let row = StakeRow {
                staker: address_param(staker),
                chain: address_param(chain),
                stake: format_wrapped(view.stake),
            };
            emit(format, &[row], &view);
        }
        StakeCmd::Withdraw {
            chain,
            staker,
            amount,
        } => {
            let result = client
                .call(
                    "staking/request_withdrawal",
                    json!({
                        "chain": address_param(chain),
                        "staker": address_param(staker),
                        "amount": amount_param(amount, false)?,
                    }),
                )
                .await?;
            match format {
                OutputFormat::Json => println!("{}", crate::output::format_json(&result)),
                OutputFormat::Table => println!(
                    "Withdrawal request #{} queued; ready at tick {}.",
                    result["index"], result["ready_at"]
                ),
            }
        }
        StakeCmd::Process {
            chain,
            staker,
            base,
        } => {
            let outcome: ProcessOutcome = client
                .call_as(
                    "staking/process",
                    json!({
                        "chain": address_param(chain),
                        "staker": address_param(staker),
                        "payout_in_base": base,
                    }),
                )
                .await?;
            let paid = if *base {
                format!("{} base", format_units(outcome.payout_amount, BASE_DECIMALS))
            } else {
                format!("{} wrapped", format_wrapped(outcome.payout_amount))
            };
            let row = PayoutRow {
                processed: outcome.processed,
                amount: format_wrapped(outcome.amount),
                paid,
            };
            emit(format, &[row], &outcome);
        }
        StakeCmd::Redeposit {
            chain,
            staker,
            count,
        } => {
            let chain = address_param(chain);
            let staker = address_param(staker);
            match count {
                None => {
                    let view: RedepositView = client
                        .call_as(
                            "staking/redeposit",
                            json!({ "chain": chain, "staker": staker }),
                        )
                        .await?;
                    match format {
                        OutputFormat::Json => println!("{}", crate::output::format_json(&view)),
                        OutputFormat::Table => println!(
                            "Redeposited {}; stake is now {}.",
                            format_wrapped(view.amount),
                            format_wrapped(view.stake)
                        ),
                    }
                }
                Some(count) => {
                    let summary: RedepositSummary = client
                        .call_as(
                            "staking/redeposit_multi",
                            json!({ "chain": chain, "staker": staker, "count": count }),
                        )
                        .await?;
                    match format {
                        OutputFormat::Json => {
                            println!("{}", crate::output::format_json(&summary))
                        }
                        OutputFormat::Table => println!(
                            "Redeposited {} request(s) totalling {}.",
                            summary.redeposited,
                            format_wrapped(summary.amount)
                        ),
                    }
                }
            }
        }
        StakeCmd::Requests { chain, staker } => {
            let view: RequestQueueView = client
                .call_as(
                    "staking/requests",
                    json!({ "chain": address_param(chain), "staker": address_param(staker) }),
                )
                .await?;
            if format == OutputFormat::Table {
                if view.requests.is_empty() {
                    println!("No withdrawal requests.");
                    return Ok(());
                }
                println!(
                    "{} pending, {} total pending.",
                    view.num_pending,
                    format_wrapped(view.pending_amount)
                );
            }
            emit(format, &request_rows(&view), &view);
        }
        StakeCmd::Show { staker, chain } => {
            let mut params = json!({ "staker": address_param(staker) });
            if let Some(chain) = chain {
                params["chain"] = json!(address_param(chain));
            }
            let view: StakeView = client.call_as("staking/stake", params).await?;
            let row = StakeRow {
                staker: address_param(staker),
                chain: chain
                    .as_deref()
                    .map(address_param)
                    .unwrap_or_else(|| "(all)".to_string()),
                stake: format_wrapped(view.stake),
            };
            emit(format, &[row], &view);
        }
    }
    Ok(())
}
