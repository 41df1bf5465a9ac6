// crates/seig-core/src/error.rs
//
// Error taxonomy for the seigniorage staking service.
//
// Errors fall into four kinds:
//   - Validation: the caller's request was invalid for the current state.
//   - Arithmetic: ledger math hit a numeric boundary (fatal to the operation).
//   - Dependency: the asset service refused a transfer or mint.
//   - Storage: persistence or (de)serialization failed.

use thiserror::Error;

use crate::types::{Address, Amount, Asset, Tick};

/// Coarse classification of a `SeigError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Arithmetic,
    Dependency,
    Storage,
}

/// Numeric failures inside fixed-point ledger math.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("arithmetic underflow in {0}")]
    Underflow(&'static str),

    #[error("division by zero in {0}")]
    DivisionByZero(&'static str),

    /// A nonzero mint rounded down to zero principal.
    #[error("mint of {amount} rounds to zero principal at factor {factor}")]
    DustMint { amount: Amount, factor: u128 },
}

/// Failures reported by the fungible-asset service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("insufficient {asset} funds for {account}: requested {requested}, available {available}")]
    InsufficientFunds {
        asset: Asset,
        account: Address,
        requested: u128,
        available: u128,
    },

    #[error("insufficient {asset} allowance from {owner} to {spender}: requested {requested}, approved {approved}")]
    InsufficientAllowance {
        asset: Asset,
        owner: Address,
        spender: Address,
        requested: u128,
        approved: u128,
    },

    #[error("{asset} supply overflow")]
    SupplyOverflow { asset: Asset },
}

/// Service-wide error type.
#[derive(Debug, Error)]
pub enum SeigError {
    #[error("unknown chain: {0}")]
    UnknownChain(Address),

    #[error("chain already registered: {0}")]
    AlreadyRegistered(Address),

    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Amount, available: Amount },

    #[error("no pending withdrawal requests")]
    NoPendingRequests,

    #[error("withdrawal delay not elapsed: ready at tick {ready_at}, now {now}")]
    WithdrawalDelayNotElapsed { ready_at: Tick, now: Tick },

    #[error("round {index} not finished: ends at tick {ends_at}, now {now}")]
    RoundNotFinished { index: u64, ends_at: Tick, now: Tick },

    #[error("round not found: {0}")]
    RoundNotFound(u64),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("arithmetic error: {0}")]
    Arithmetic(#[from] ArithmeticError),

    #[error("asset service error: {0}")]
    Asset(#[from] AssetError),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl SeigError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SeigError::UnknownChain(_)
            | SeigError::AlreadyRegistered(_)
            | SeigError::InsufficientBalance { .. }
            | SeigError::NoPendingRequests
            | SeigError::WithdrawalDelayNotElapsed { .. }
            | SeigError::RoundNotFinished { .. }
            | SeigError::RoundNotFound(_)
            | SeigError::InvalidAmount(_)
            | SeigError::InvalidState(_) => ErrorKind::Validation,
            SeigError::Arithmetic(_) => ErrorKind::Arithmetic,
            SeigError::Asset(_) => ErrorKind::Dependency,
            SeigError::Storage(_) | SeigError::Serialization(_) => ErrorKind::Storage,
        }
    }

    /// True for errors the caller can fix by changing the request or retrying later.
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

impl From<serde_json::Error> for SeigError {
    fn from(e: serde_json::Error) -> Self {
        SeigError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(SeigError::NoPendingRequests.kind(), ErrorKind::Validation);
        assert_eq!(
            SeigError::from(ArithmeticError::Overflow("mint")).kind(),
            ErrorKind::Arithmetic
        );
        let asset_err = AssetError::SupplyOverflow { asset: Asset::Wrapped };
        assert_eq!(SeigError::from(asset_err).kind(), ErrorKind::Dependency);
        assert_eq!(SeigError::Storage("x".into()).kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_recoverable() {
        assert!(SeigError::RoundNotFound(3).is_recoverable());
        assert!(!SeigError::from(ArithmeticError::DivisionByZero("x")).is_recoverable());
    }

    #[test]
    fn test_display_mentions_ticks() {
        let err = SeigError::WithdrawalDelayNotElapsed { ready_at: 20, now: 15 };
        assert_eq!(
            err.to_string(),
            "withdrawal delay not elapsed: ready at tick 20, now 15"
        );
    }
}
