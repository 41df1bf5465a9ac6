// crates/seig-cli/src/commands/mod.rs
//
// Command module declarations for the seig CLI, plus argument helpers
// shared between them.

pub mod asset;
pub mod chain;
pub mod lottery;
pub mod stake;
pub mod status;

use seig_core::{Address, BASE_DECIMALS, WRAPPED_DECIMALS};

use crate::output::parse_units;

/// Resolve a hex address or label argument to its wire form.
pub fn address_param(value: &str) -> String {
    Address::parse_or_label(value).to_string()
}

/// Convert a decimal token argument into the wire string of smallest units.
pub fn amount_param(value: &str, in_base: bool) -> Result<String, String> {
    let decimals = if in_base { BASE_DECIMALS } else { WRAPPED_DECIMALS };
    parse_units(value, decimals).map(|units| units.to_string())
}
