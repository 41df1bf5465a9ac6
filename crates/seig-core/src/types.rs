// crates/seig-core/src/types.rs
//
// Identifiers, amount units, and tick types shared by every crate.
//
// Amounts are tracked in the smallest unit of the wrapped currency (27
// decimals). The base currency uses 18 decimals, so one base unit is worth
// 10^9 wrapped units. All ledger math is integer math on u128.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::SeigError;

/// Amount in wrapped-currency units (27 decimals).
pub type Amount = u128;

/// External monotonic time unit (block height in production).
pub type Tick = u64;

/// Decimals of the base currency.
pub const BASE_DECIMALS: u32 = 18;

/// Decimals of the wrapped currency. Equal to the ledger factor precision.
pub const WRAPPED_DECIMALS: u32 = 27;

/// Wrapped units per base unit: 10^(27 - 18).
pub const WRAPPED_PER_BASE: u128 = 1_000_000_000;

/// One whole wrapped token in wrapped units (10^27).
pub const WRAPPED_ONE: Amount = 1_000_000_000_000_000_000_000_000_000;

/// One whole base token in base units (10^18).
pub const BASE_ONE: u128 = 1_000_000_000_000_000_000;

/// Convert a whole number of tokens into wrapped units.
pub fn wrapped_tokens(tokens: u64) -> Amount {
    tokens as u128 * WRAPPED_ONE
}

/// A 20-byte account address.
///
/// Used for chains, stakers, and service accounts (custody, lottery).
/// Rendered and parsed as `0x`-prefixed lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; 20]);

/// Identity of a registered chain (tenant).
pub type ChainId = Address;

/// Identity of a staker.
pub type StakerId = Address;

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Derive a deterministic address from a label.
    ///
    /// Takes the last 20 bytes of `sha256(label)`. Used for well-known service
    /// accounts and for test fixtures.
    pub fn from_label(label: &str) -> Self {
        let digest = Sha256::digest(label.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[12..]);
        Address(bytes)
    }

    /// Parse a hex address, falling back to `from_label` for anything that
    /// is not one. Lets operators name chains and accounts in config files
    /// and on the command line.
    pub fn parse_or_label(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| Self::from_label(value))
    }

    /// Raw bytes of the address.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lowercase hex without the `0x` prefix. Used in storage keys.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = SeigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(trimmed)
            .map_err(|e| SeigError::Serialization(format!("invalid address {}: {}", s, e)))?;
        let array: [u8; 20] = bytes.try_into().map_err(|_| {
            SeigError::Serialization(format!("address {} must be exactly 20 bytes", s))
        })?;
        Ok(Address(array))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The two currencies handled by the asset service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Asset {
    /// The base, transferable currency (18 decimals).
    Base,
    /// The wrapped currency staked in ledgers (27 decimals).
    Wrapped,
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Base => write!(f, "base"),
            Asset::Wrapped => write!(f, "wrapped"),
        }
    }
}

/// Format a wrapped amount as a decimal token string, trimming trailing zeros.
pub fn format_wrapped(amount: Amount) -> String {
    let whole = amount / WRAPPED_ONE;
    let frac = amount % WRAPPED_ONE;
    if frac == 0 {
        format!("{}", whole)
    } else {
        let frac_str = format!("{:027}", frac);
        format!("{}.{}", whole, frac_str.trim_end_matches('0'))
    }
}

/// Serde adapter rendering `u128` amounts as decimal strings.
///
/// JSON numbers routed through `serde_json::Value` only hold 64 bits, and a
/// single wrapped token is 10^27 units. Use with `#[serde(with = "...")]` on
/// every amount that crosses the RPC envelope.
pub mod amount_str {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.trim().parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_relationship() {
        assert_eq!(BASE_ONE * WRAPPED_PER_BASE, WRAPPED_ONE);
        assert_eq!(10u128.pow(WRAPPED_DECIMALS - BASE_DECIMALS), WRAPPED_PER_BASE);
    }

    #[test]
    fn test_address_display_and_parse() {
        let addr = Address::from_label("custody");
        let rendered = addr.to_string();
        assert!(rendered.starts_with("0x"));
        assert_eq!(rendered.len(), 42);
        let parsed: Address = rendered.parse().unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn test_address_parse_without_prefix() {
        let addr: Address = "0101010101010101010101010101010101010101".parse().unwrap();
        assert_eq!(addr, Address([1u8; 20]));
    }

    #[test]
    fn test_address_parse_wrong_length() {
        assert!("0x0102".parse::<Address>().is_err());
        assert!("0xzz".parse::<Address>().is_err());
    }

    #[test]
    fn test_address_serde_as_string() {
        let addr = Address([0xab; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "ab".repeat(20)));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_parse_or_label() {
        let hex = "0x00000000000000000000000000000000000000aa";
        assert_eq!(Address::parse_or_label(hex), hex.parse::<Address>().unwrap());
        assert_eq!(Address::parse_or_label("alice"), Address::from_label("alice"));
    }

    #[test]
    fn test_labels_are_distinct() {
        assert_ne!(Address::from_label("a"), Address::from_label("b"));
    }

    #[test]
    fn test_amount_str_survives_json_value() {
        #[derive(Serialize, Deserialize)]
        struct Wire {
            #[serde(with = "amount_str")]
            amount: u128,
        }
        let value = serde_json::to_value(Wire { amount: wrapped_tokens(1_000) }).unwrap();
        assert_eq!(value["amount"], "1000000000000000000000000000000");
        let back: Wire = serde_json::from_value(value).unwrap();
        assert_eq!(back.amount, wrapped_tokens(1_000));
    }

    #[test]
    fn test_format_wrapped() {
        assert_eq!(format_wrapped(wrapped_tokens(42)), "42");
        assert_eq!(format_wrapped(WRAPPED_ONE + WRAPPED_ONE / 2), "1.5");
        assert_eq!(format_wrapped(0), "0");
    }
}
