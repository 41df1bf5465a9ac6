// crates/seig-core/src/lib.rs
//
// seig-core: Core types, error taxonomy, and collaborator traits for the
// seigniorage staking service.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines identifiers and amount units, the service-wide error type, and
// the interfaces to the external asset service, entropy source, clock, and
// key-value store.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use seig_core::{Address, SeigError};`

pub use error::{ArithmeticError, AssetError, ErrorKind, SeigError};
pub use traits::{AssetService, BatchOp, Clock, EntropySource, KvStore, ManualClock};
pub use types::{
    amount_str, format_wrapped, wrapped_tokens, Address, Amount, Asset, ChainId, StakerId, Tick, BASE_DECIMALS,
    BASE_ONE, WRAPPED_DECIMALS, WRAPPED_ONE, WRAPPED_PER_BASE,
};
