// crates/seig-daemon/src/main.rs
//
// Binary entrypoint for the seigniorage staking daemon.
//
// Parses CLI arguments, loads configuration, initializes tracing, restores
// or creates the staking engine, then runs the tick scheduler and the RPC
// server until shutdown.

mod config;
mod scheduler;
mod shared;

use std::time::Duration;

use clap::Parser;
use config::DaemonConfig;
use scheduler::TickScheduler;
use shared::DaemonSharedState;

use seig_core::format_wrapped;
use seig_rpc::{RpcConfig, SeigRpcServer};

/// Seigniorage staking daemon.
#[derive(Parser, Debug)]
#[command(name = "seigd", version = "0.1.0", about = "Seigniorage staking daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "~/.seig/config.toml")]
    config: String,

    /// Override the configured data directory.
    #[arg(long)]
    data_dir: Option<String>,

    /// Keep all state in memory.
    #[arg(long)]
    in_memory: bool,

    /// Override the configured RPC port.
    #[arg(long)]
    rpc_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Config is read before tracing starts so its log level can apply.
    let config_path = expand_tilde(&args.config);
    let loaded = DaemonConfig::load(&config_path);
    let mut daemon_config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => DaemonConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&daemon_config.log_level)),
        )
        .init();

    match loaded {
        Ok(_) => tracing::info!("Loaded configuration from {}", config_path),
        Err(e) => tracing::warn!(
            "Could not load config from {}: {}. Using defaults.",
            config_path,
            e
        ),
    }

    if let Some(dir) = args.data_dir {
        daemon_config.data_dir = dir;
    }
    if args.in_memory {
        daemon_config.in_memory = true;
    }
    if let Some(port) = args.rpc_port {
        daemon_config.rpc_port = port;
    }

    let data_dir = expand_tilde(&daemon_config.data_dir);
    tracing::info!("Seig staking daemon v0.1.0");
    tracing::info!(
        "Data directory: {}",
        if daemon_config.in_memory { "(memory)" } else { data_dir.as_str() }
    );
    tracing::info!(
        "RPC endpoint: {}:{}",
        daemon_config.rpc_host,
        daemon_config.rpc_port
    );
    tracing::info!(
        "Economics: {} per tick, withdrawal delay {} ticks, rounds of {} ticks, lottery share {} bps",
        format_wrapped(daemon_config.per_tick_rate),
        daemon_config.withdrawal_delay,
        daemon_config.round_duration,
        daemon_config.power_share_bps
    );

    let shared = DaemonSharedState::open(&daemon_config, &data_dir)
        .map_err(|e| format!("Failed to open engine state: {}", e))?;
    shared
        .bootstrap(&daemon_config)
        .await
        .map_err(|e| format!("Failed to bootstrap engine: {}", e))?;

    let rpc_config = RpcConfig {
        host: daemon_config.rpc_host.clone(),
        port: daemon_config.rpc_port,
    };
    let mut rpc_server = SeigRpcServer::new(rpc_config, shared.engine.clone())
        .with_start_time(shared.start_time);
    if let Some(store) = &shared.store {
        rpc_server = rpc_server.with_store(store.clone());
    }

    tokio::spawn(async move {
        if let Err(e) = rpc_server.start().await {
            tracing::error!("RPC server error: {}", e);
        }
    });

    // The scheduler runs in the foreground and returns on ctrl-c.
    let scheduler = TickScheduler::new(
        shared.engine.clone(),
        shared.clock.clone(),
        shared.store.clone(),
        Duration::from_millis(daemon_config.tick_interval_ms),
    );
    scheduler.run().await?;

    if let Some(store) = &shared.store {
        let engine = shared.engine.read().await;
        match store.save(&*engine) {
            Ok(version) => tracing::info!("Final snapshot written (version {})", version),
            Err(e) => tracing::error!("Failed to write final snapshot: {}", e),
        }
    }
    tracing::info!("Seig daemon shut down gracefully");

    Ok(())
}

/// Expand `~` at the start of a path to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}
