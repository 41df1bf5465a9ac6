// crates/seig-economics/src/tot.rs
//
// Tot: the aggregate ledger over chains.
//
// Tot is a FixedPointLedger whose participants are chains. Each chain's entry
// mirrors that chain's total effective stake as of the last synchronisation,
// and the minter splits each reward across chains in proportion to these
// entries. Tot's own factor is never raised; distributions are mirrored by
// minting the credited value into the chain's entry.

use serde::{Deserialize, Serialize};
use tracing::debug;

use seig_core::{Amount, ChainId, SeigError, StakerId};

use crate::coinage::FixedPointLedger;

/// Aggregate ledger keyed by chain.
pub type AggregateLedger = FixedPointLedger<ChainId>;

/// Per-chain ledger keyed by staker.
pub type ChainLedger = FixedPointLedger<StakerId>;

/// What a synchronisation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncOutcome {
    Unchanged,
    Increased(Amount),
    Decreased(Amount),
}

/// Bring `chain`'s aggregate entry in line with `target` (the chain ledger's
/// total effective value).
pub fn sync_entry(
    tot: &mut AggregateLedger,
    chain: ChainId,
    target: Amount,
) -> Result<SyncOutcome, SeigError> {
    let current = tot.effective_balance_of(&chain)?;
    let outcome = if target > current {
        let diff = target - current;
        tot.mint(chain, diff)?;
        SyncOutcome::Increased(diff)
    } else if target < current {
        let diff = current - target;
        tot.burn(chain, diff)?;
        SyncOutcome::Decreased(diff)
    } else {
        SyncOutcome::Unchanged
    };
    debug!(chain = %chain, target, ?outcome, "tot synchronised");
    Ok(outcome)
}

/// Synchronise `chain`'s aggregate entry with its ledger.
pub fn sync_chain(
    tot: &mut AggregateLedger,
    chain: ChainId,
    ledger: &ChainLedger,
) -> Result<SyncOutcome, SeigError> {
    let target = ledger.total_effective()?;
    sync_entry(tot, chain, target)
}
