// crates/seig-cli/src/commands/asset.rs
//
// `seig asset {faucet, approve, balance}`: token helpers for operators and
// local testing.

use clap::Subcommand;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::Tabled;

use seig_core::{amount_str, format_wrapped, Address, BASE_DECIMALS};

use super::{address_param, amount_param};
use crate::output::{emit, format_units, OutputFormat};
use crate::rpc_client::RpcClient;

/// Asset subcommands.
#[derive(Debug, Subcommand)]
pub enum AssetCmd {
    /// Mint test tokens to an account.
    Faucet {
        account: String,
        amount: String,
        /// Mint base tokens instead of wrapped.
        #[arg(long)]
        base: bool,
    },
    /// Set the custody allowance an owner grants for wrapped deposits.
    Approve { owner: String, amount: String },
    /// Show balances and the custody allowance.
    Balance { account: String },
}

#[derive(Debug, Serialize, Deserialize)]
struct BalanceView {
    account: Address,
    #[serde(with = "amount_str")]
    base: u128,
    #[serde(with = "amount_str")]
    wrapped: u128,
    #[serde(with = "amount_str")]
    custody_allowance: u128,
}

#[derive(Tabled)]
struct BalanceRow {
    #[tabled(rename = "Account")]
    account: String,
    #[tabled(rename = "Base")]
    base: String,
    #[tabled(rename = "Wrapped")]
    wrapped: String,
    #[tabled(rename = "Custody allowance")]
    allowance: String,
}

impl From<&BalanceView> for BalanceRow {
    fn from(view: &BalanceView) -> Self {
        Self {
            account: view.account.to_string(),
            base: format_units(view.base, BASE_DECIMALS),
            wrapped: format_wrapped(view.wrapped),
            allowance: format_wrapped(view.custody_allowance),
        }
    }
}

/// Run the asset subcommand.
pub async fn run(
    cmd: &AssetCmd,
    client: &RpcClient,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let view: BalanceView = match cmd {
        AssetCmd::Faucet {
            account,
            amount,
            base,
        } => {
            let asset = if *base { "base" } else { "wrapped" };
            client
                .call_as(
                    "asset/faucet",
                    json!({
                        "account": address_param(account),
                        "asset": asset,
                        "amount": amount_param(amount, *base)?,
                    }),
                )
                .await?
        }
        AssetCmd::Approve { owner, amount } => {
            client
                .call_as(
                    "asset/approve",
                    json!({
                        "owner": address_param(owner),
                        "amount": amount_param(amount, false)?,
                    }),
                )
                .await?
        }
        AssetCmd::Balance { account } => {
            client
                .call_as("asset/balance", json!({ "account": address_param(account) }))
                .await?
        }
    };
    emit(format, &[BalanceRow::from(&view)], &view);
    Ok(())
}
