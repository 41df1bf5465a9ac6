// crates/seig-cli/src/main.rs
//
// CLI entrypoint for the seigniorage staking daemon.
//
// Every subcommand is a thin wrapper over one or two JSON-RPC calls.
// Addresses may be given as hex or as labels, which are hashed the same
// way the daemon hashes configured chain labels.

mod commands;
mod output;
mod rpc_client;

use clap::{Parser, Subcommand};
use commands::asset::AssetCmd;
use commands::chain::ChainCmd;
use commands::lottery::LotteryCmd;
use commands::stake::StakeCmd;
use output::OutputFormat;
use rpc_client::RpcClient;

/// Seig CLI: drive a seigd node over JSON-RPC.
#[derive(Parser, Debug)]
#[command(name = "seig", version = "0.1.0", about = "CLI for the seigniorage staking daemon")]
struct Cli {
    /// RPC endpoint of the seigd daemon.
    #[arg(long, global = true, default_value = "http://127.0.0.1:50061")]
    rpc: String,

    /// Print raw JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Chain registry: register, commit, info, list.
    #[command(subcommand)]
    Chain(ChainCmd),

    /// Staking: deposit, withdraw, process, redeposit, requests, show.
    #[command(subcommand)]
    Stake(StakeCmd),

    /// Reward lottery: init, start, end-round, power, winner, round.
    #[command(subcommand)]
    Lottery(LotteryCmd),

    /// Token helpers: faucet, approve, balance.
    #[command(subcommand)]
    Asset(AssetCmd),

    /// Display daemon and engine status.
    Status,

    /// Mint seigniorage for all elapsed ticks.
    CatchUp,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = RpcClient::new(&cli.rpc);
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Table
    };

    match &cli.command {
        Commands::Chain(cmd) => commands::chain::run(cmd, &client, format).await?,
        Commands::Stake(cmd) => commands::stake::run(cmd, &client, format).await?,
        Commands::Lottery(cmd) => commands::lottery::run(cmd, &client, format).await?,
        Commands::Asset(cmd) => commands::asset::run(cmd, &client, format).await?,
        Commands::Status => commands::status::run(&client, format).await?,
        Commands::CatchUp => commands::status::catch_up(&client, format).await?,
    }

    Ok(())
}
