// crates/seig-core/src/traits.rs
//
// Interfaces to the external collaborators the staking core consumes:
// the fungible-asset service, the entropy source, the clock, and the
// key-value store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{AssetError, SeigError};
use crate::types::{Address, Asset, Tick};

/// Fungible-asset service backing every ledger credit and debit.
///
/// Implemented in-memory by `seig-economics::token::TokenLedger`.
pub trait AssetService: Send + Sync {
    /// Balance of `account` in `asset`.
    fn balance_of(&self, asset: Asset, account: &Address) -> u128;

    /// Remaining allowance `owner` granted to `spender`.
    fn allowance(&self, asset: Asset, owner: &Address, spender: &Address) -> u128;

    /// Set the allowance `owner` grants to `spender`.
    fn approve(&mut self, asset: Asset, owner: &Address, spender: &Address, amount: u128);

    /// Move `amount` from `from` to `to`.
    fn transfer(
        &mut self,
        asset: Asset,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), AssetError>;

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming allowance.
    fn transfer_from(
        &mut self,
        asset: Asset,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), AssetError>;

    /// Create `amount` new units for `to`.
    fn mint(&mut self, asset: Asset, to: &Address, amount: u128) -> Result<(), AssetError>;

    /// Convert `base_amount` of `account`'s base currency into wrapped currency.
    /// Returns the wrapped amount credited.
    fn wrap(&mut self, account: &Address, base_amount: u128) -> Result<u128, AssetError>;

    /// Convert `wrapped_amount` of `account`'s wrapped currency into base currency,
    /// rounding down. Returns the base amount credited.
    fn unwrap(&mut self, account: &Address, wrapped_amount: u128) -> Result<u128, AssetError>;
}

/// Source of randomness for lottery draws.
pub trait EntropySource: Send + Sync {
    /// Return an integer in `[0, upper_exclusive)`, deterministic for a given seed.
    ///
    /// Callers never pass `upper_exclusive == 0`.
    fn draw(&self, seed: u64, upper_exclusive: u128) -> u128;
}

/// External monotonic clock.
pub trait Clock: Send + Sync {
    fn current_tick(&self) -> Tick;
}

/// Clock whose tick is advanced explicitly.
///
/// Cloning shares the underlying counter, so a scheduler task can advance
/// the tick the engine reads.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    tick: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: Tick) -> Self {
        Self {
            tick: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Advance by `ticks` and return the new tick.
    pub fn advance(&self, ticks: Tick) -> Tick {
        self.tick.fetch_add(ticks, Ordering::SeqCst) + ticks
    }

    /// Jump to `tick`. Ignored if it would move the clock backwards.
    pub fn set(&self, tick: Tick) {
        self.tick.fetch_max(tick, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn current_tick(&self) -> Tick {
        self.tick.load(Ordering::SeqCst)
    }
}

/// One write inside an atomic batch. `None` deletes the key.
pub type BatchOp = (Vec<u8>, Option<Vec<u8>>);

/// Byte-addressable key-value persistence.
///
/// Implemented by `seig-store` (RocksDB and in-memory backends).
pub trait KvStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, SeigError>;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), SeigError>;

    fn delete(&self, key: &[u8]) -> Result<(), SeigError>;

    /// Atomically replace the value at `key` if it currently equals `expected`
    /// (`None` meaning absent). Returns `false` without writing on mismatch.
    fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: &[u8],
    ) -> Result<bool, SeigError>;

    /// Apply all writes atomically.
    fn write_batch(&self, ops: Vec<BatchOp>) -> Result<(), SeigError>;

    /// All entries whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, SeigError>;
}
