// crates/seig-daemon/src/config.rs
//
// Runtime configuration for the staking daemon.
// Loaded from a TOML file or populated with defaults.

use serde::Deserialize;
use std::fs;

use seig_core::{amount_str, Address, Amount, Tick, WRAPPED_ONE};
use seig_economics::EngineConfig;

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Directory for the RocksDB snapshot store.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Keep all state in memory and never touch `data_dir`.
    #[serde(default)]
    pub in_memory: bool,

    /// Host address for the RPC server.
    #[serde(default = "default_rpc_host")]
    pub rpc_host: String,

    /// Port for the RPC server.
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Wall-clock milliseconds per tick.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Wrapped units minted per tick, as a decimal string.
    #[serde(default = "default_per_tick_rate", with = "amount_str")]
    pub per_tick_rate: Amount,

    /// Ticks between a withdrawal request and its payout.
    #[serde(default = "default_withdrawal_delay")]
    pub withdrawal_delay: Tick,

    /// Lottery round length in ticks.
    #[serde(default = "default_round_duration")]
    pub round_duration: Tick,

    /// Share of each mint paid into the lottery pool, in basis points.
    #[serde(default)]
    pub power_share_bps: u32,

    /// Salt mixed into lottery draw seeds.
    #[serde(default = "default_entropy_salt")]
    pub entropy_salt: String,

    /// Chains registered at startup if missing. Each entry is a hex address
    /// or a label hashed into one.
    #[serde(default)]
    pub chains: Vec<String>,

    /// Initialize and start the lottery at startup if it is not running.
    #[serde(default)]
    pub start_lottery: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_data_dir() -> String {
    "~/.seig/data".to_string()
}

fn default_rpc_host() -> String {
    "127.0.0.1".to_string()
}

fn default_rpc_port() -> u16 {
    50061
}

fn default_tick_interval_ms() -> u64 {
    1_000
}

fn default_per_tick_rate() -> Amount {
    WRAPPED_ONE
}

fn default_withdrawal_delay() -> Tick {
    10
}

fn default_round_duration() -> Tick {
    100
}

fn default_entropy_salt() -> String {
    "seig".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            in_memory: false,
            rpc_host: default_rpc_host(),
            rpc_port: default_rpc_port(),
            tick_interval_ms: default_tick_interval_ms(),
            per_tick_rate: default_per_tick_rate(),
            withdrawal_delay: default_withdrawal_delay(),
            round_duration: default_round_duration(),
            power_share_bps: 0,
            entropy_salt: default_entropy_salt(),
            chains: Vec::new(),
            start_lottery: false,
            log_level: default_log_level(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: DaemonConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.power_share_bps > 10_000 {
            return Err(format!(
                "power_share_bps must be at most 10000, got {}",
                self.power_share_bps
            ));
        }
        if self.round_duration == 0 {
            return Err("round_duration must be nonzero".to_string());
        }
        if self.tick_interval_ms == 0 {
            return Err("tick_interval_ms must be nonzero".to_string());
        }
        Ok(())
    }

    /// Economic parameters for the engine.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            per_tick_rate: self.per_tick_rate,
            withdrawal_delay: self.withdrawal_delay,
            round_duration: self.round_duration,
            power_share_bps: self.power_share_bps,
            entropy_salt: self.entropy_salt.clone(),
            ..EngineConfig::default()
        }
    }

    /// Addresses of the configured startup chains.
    pub fn chain_ids(&self) -> Vec<Address> {
        self.chains.iter().map(|c| Address::parse_or_label(c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = DaemonConfig::parse("").unwrap();
        assert_eq!(config.rpc_port, 50061);
        assert_eq!(config.per_tick_rate, WRAPPED_ONE);
        assert_eq!(config.withdrawal_delay, 10);
        assert!(config.chains.is_empty());
    }

    #[test]
    fn test_parse_economics() {
        let config = DaemonConfig::parse(
            r#"
            per_tick_rate = "5000000000000000000000000000"
            withdrawal_delay = 3
            round_duration = 20
            power_share_bps = 500
            chains = ["chain-a", "0x00000000000000000000000000000000000000aa"]
            "#,
        )
        .unwrap();
        let engine = config.engine_config();
        assert_eq!(engine.per_tick_rate, 5 * WRAPPED_ONE);
        assert_eq!(engine.withdrawal_delay, 3);
        assert_eq!(engine.round_duration, 20);
        assert_eq!(engine.power_share_bps, 500);

        let ids = config.chain_ids();
        assert_eq!(ids[0], Address::from_label("chain-a"));
        assert_eq!(ids[1].0[19], 0xaa);
    }

    #[test]
    fn test_rejects_share_above_one() {
        assert!(DaemonConfig::parse("power_share_bps = 10001").is_err());
    }

    #[test]
    fn test_rejects_zero_round() {
        assert!(DaemonConfig::parse("round_duration = 0").is_err());
    }
}
