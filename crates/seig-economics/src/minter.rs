// crates/seig-economics/src/minter.rs
//
// Seigniorage minting and distribution.
//
// Every `per_tick_rate` wrapped units minted per elapsed tick are split across
// chain ledgers in proportion to each chain's aggregate (tot) entry. A chain's
// share is credited by raising its ledger factor, so every staker on the
// chain accrues pro rata without per-staker writes.
//
// Catch-up runs in two phases:
//   1. `plan` does all checked math against borrowed ledgers and returns a
//      `MintPlan` describing every factor change and mirror mint.
//   2. `apply` writes the plan. The caller mints the backing asset between
//      the two phases, so an asset failure leaves every ledger untouched.
//
// A share that rounds to a zero factor delta, and the remainder of floor
// division, are forfeited. The shortfall is at most a few units per chain.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use seig_core::{amount_str, Amount, ArithmeticError, ChainId, SeigError, Tick};

use crate::fixed::{checked_add, checked_sub, mul_div, Rounding};
use crate::tot::{AggregateLedger, ChainLedger};

/// Basis-point denominator for the lottery slice.
pub const BPS_DENOMINATOR: u128 = 10_000;

/// One chain's part of a distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainShare {
    pub chain: ChainId,
    /// Value allotted by the proportional split.
    #[serde(with = "amount_str")]
    pub share: Amount,
    /// Value actually credited after factor rounding (`<= share`).
    #[serde(with = "amount_str")]
    pub credited: Amount,
    /// Delta passed to `add_factor`.
    #[serde(with = "amount_str")]
    pub delta: u128,
    /// Factor after the change.
    #[serde(with = "amount_str")]
    pub factor: u128,
}

/// A fully computed distribution, not yet written to any ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintPlan {
    pub now: Tick,
    pub elapsed: Tick,
    pub total_mint: Amount,
    pub lottery_slice: Amount,
    pub shares: Vec<ChainShare>,
}

impl MintPlan {
    /// Sum of value credited to chains.
    pub fn distributed(&self) -> Amount {
        self.shares.iter().map(|s| s.credited).sum()
    }

    /// Minted value that reaches neither a chain nor the lottery.
    pub fn forfeited(&self) -> Amount {
        self.total_mint
            .saturating_sub(self.lottery_slice)
            .saturating_sub(self.distributed())
    }

    /// Whether any asset needs minting for this plan.
    pub fn mints_anything(&self) -> bool {
        self.lottery_slice > 0 || self.distributed() > 0
    }
}

/// Outcome of one `catch_up`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintReport {
    pub elapsed: Tick,
    #[serde(with = "amount_str")]
    pub total_mint: Amount,
    #[serde(with = "amount_str")]
    pub distributed: Amount,
    #[serde(with = "amount_str")]
    pub lottery_slice: Amount,
    #[serde(with = "amount_str")]
    pub forfeited: Amount,
    pub shares: Vec<ChainShare>,
}

impl MintReport {
    /// Report for a catch-up that found nothing to do.
    pub fn idle(elapsed: Tick) -> Self {
        Self {
            elapsed,
            ..Self::default()
        }
    }
}

/// Minting state: when rewards were last minted and at what rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeigniorageMinter {
    last_mint_tick: Tick,
    per_tick_rate: Amount,
}

impl SeigniorageMinter {
    pub fn new(per_tick_rate: Amount, start: Tick) -> Self {
        Self {
            last_mint_tick: start,
            per_tick_rate,
        }
    }

    pub fn last_mint_tick(&self) -> Tick {
        self.last_mint_tick
    }

    pub fn per_tick_rate(&self) -> Amount {
        self.per_tick_rate
    }

    /// Change the rate. Takes effect for ticks after the next catch-up, so
    /// callers should catch up first.
    pub fn set_per_tick_rate(&mut self, rate: Amount) {
        self.per_tick_rate = rate;
    }

    /// Compute the distribution for catching up to `now`.
    ///
    /// Returns `None` when no time has elapsed. `lottery_bps` is the slice
    /// carved out for the lottery pool; pass 0 when no round is open.
    pub fn plan(
        &self,
        now: Tick,
        tot: &AggregateLedger,
        ledgers: &BTreeMap<ChainId, ChainLedger>,
        lottery_bps: u32,
    ) -> Result<Option<MintPlan>, SeigError> {
        if now <= self.last_mint_tick {
            return Ok(None);
        }
        let elapsed = now - self.last_mint_tick;
        let total_mint = self
            .per_tick_rate
            .checked_mul(elapsed as u128)
            .ok_or(ArithmeticError::Overflow("catch_up"))?;
        let aggregate_total = tot.total_effective()?;

        let mut plan = MintPlan {
            now,
            elapsed,
            total_mint,
            lottery_slice: 0,
            shares: Vec::new(),
        };
        if total_mint == 0 || aggregate_total == 0 {
            return Ok(Some(plan));
        }

        let bps = (lottery_bps as u128).min(BPS_DENOMINATOR);
        plan.lottery_slice = mul_div(total_mint, bps, BPS_DENOMINATOR, Rounding::Down, "lottery_slice")?;
        let chain_mint = checked_sub(total_mint, plan.lottery_slice, "catch_up")?;

        let mut tot_principal = tot.total_principal();
        for (chain, _) in tot.participants() {
            let chain_stake = tot.effective_balance_of(chain)?;
            if chain_stake == 0 {
                continue;
            }
            let Some(ledger) = ledgers.get(chain) else {
                continue;
            };
            let share = mul_div(chain_mint, chain_stake, aggregate_total, Rounding::Down, "chain_share")?;
            let delta = ledger.delta_for_increase(share)?;
            if delta == 0 {
                continue;
            }
            let factor = ledger.factor_after(delta)?;
            let before = ledger.total_effective()?;
            let after = ledger.total_effective_at(factor)?;
            let credited = checked_sub(after, before, "catch_up")?;
            // Tot keeps factor ONE, so the mirror mint adds exactly `credited` principal.
            tot_principal = checked_add(tot_principal, credited, "catch_up")?;
            plan.shares.push(ChainShare {
                chain: *chain,
                share,
                credited,
                delta,
                factor,
            });
        }

        debug!(
            now,
            elapsed,
            total_mint,
            lottery_slice = plan.lottery_slice,
            chains = plan.shares.len(),
            "mint planned"
        );
        Ok(Some(plan))
    }

    /// Write a plan produced by `plan` against the same ledgers.
    pub fn apply(
        &mut self,
        plan: MintPlan,
        tot: &mut AggregateLedger,
        ledgers: &mut BTreeMap<ChainId, ChainLedger>,
    ) -> Result<MintReport, SeigError> {
        for share in &plan.shares {
            let ledger = ledgers
                .get_mut(&share.chain)
                .ok_or(SeigError::UnknownChain(share.chain))?;
            ledger.add_factor(share.delta)?;
            if share.credited > 0 {
                tot.mint(share.chain, share.credited)?;
            }
        }
        self.last_mint_tick = plan.now;

        let report = MintReport {
            elapsed: plan.elapsed,
            total_mint: plan.total_mint,
            distributed: plan.distributed(),
            lottery_slice: plan.lottery_slice,
            forfeited: plan.forfeited(),
            shares: plan.shares,
        };
        if report.total_mint > 0 && (report.distributed > 0 || report.lottery_slice > 0) {
            info!(
                elapsed = report.elapsed,
                total_mint = report.total_mint,
                distributed = report.distributed,
                lottery_slice = report.lottery_slice,
                forfeited = report.forfeited,
                "seigniorage minted"
            );
        }
        Ok(report)
    }

    /// Plan and apply in one step, for callers with no asset backing to mint.
    pub fn catch_up(
        &mut self,
        now: Tick,
        tot: &mut AggregateLedger,
        ledgers: &mut BTreeMap<ChainId, ChainLedger>,
        lottery_bps: u32,
    ) -> Result<MintReport, SeigError> {
        match self.plan(now, tot, ledgers, lottery_bps)? {
            Some(plan) => self.apply(plan, tot, ledgers),
            None => Ok(MintReport::idle(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seig_core::{wrapped_tokens, Address};

    use crate::tot::sync_chain;

    struct Fixture {
        tot: AggregateLedger,
        ledgers: BTreeMap<ChainId, ChainLedger>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                tot: AggregateLedger::new(),
                ledgers: BTreeMap::new(),
            }
        }

        fn stake(&mut self, chain: &str, staker: &str, tokens: u64) {
            let chain = Address::from_label(chain);
            let ledger = self.ledgers.entry(chain).or_default();
            ledger.mint(Address::from_label(staker), wrapped_tokens(tokens)).unwrap();
            sync_chain(&mut self.tot, chain, ledger).unwrap();
        }

        fn chain_total(&self, chain: &str) -> Amount {
            self.ledgers[&Address::from_label(chain)].total_effective().unwrap()
        }
    }

    #[test]
    fn test_single_chain_doubles_in_ten_ticks() {
        let mut f = Fixture::new();
        f.stake("chain-a", "alice", 1_000);
        let mut minter = SeigniorageMinter::new(wrapped_tokens(100), 0);

        let report = minter.catch_up(10, &mut f.tot, &mut f.ledgers, 0).unwrap();

        assert_eq!(report.total_mint, wrapped_tokens(1_000));
        let alice = f.ledgers[&Address::from_label("chain-a")]
            .effective_balance_of(&Address::from_label("alice"))
            .unwrap();
        assert!(wrapped_tokens(2_000) - alice <= 1_000_000_000);
        assert_eq!(minter.last_mint_tick(), 10);
    }

    #[test]
    fn test_split_proportional_to_stake() {
        let mut f = Fixture::new();
        f.stake("chain-a", "alice", 100);
        f.stake("chain-b", "bob", 300);
        let mut minter = SeigniorageMinter::new(wrapped_tokens(40), 0);

        let report = minter.catch_up(1, &mut f.tot, &mut f.ledgers, 0).unwrap();

        assert_eq!(report.shares.len(), 2);
        assert!(wrapped_tokens(110) - f.chain_total("chain-a") <= 2);
        assert!(wrapped_tokens(330) - f.chain_total("chain-b") <= 2);
        assert!(report.distributed <= report.total_mint);
        assert!(report.forfeited <= 2 * 2);
    }

    #[test]
    fn test_tot_mirrors_credited_value() {
        let mut f = Fixture::new();
        f.stake("chain-a", "alice", 7);
        f.stake("chain-b", "bob", 13);
        let mut minter = SeigniorageMinter::new(wrapped_tokens(3), 0);
        minter.catch_up(5, &mut f.tot, &mut f.ledgers, 0).unwrap();

        for chain in ["chain-a", "chain-b"] {
            let id = Address::from_label(chain);
            assert_eq!(f.tot.effective_balance_of(&id).unwrap(), f.chain_total(chain));
        }
    }

    #[test]
    fn test_zero_elapsed_is_noop() {
        let mut f = Fixture::new();
        f.stake("chain-a", "alice", 10);
        let mut minter = SeigniorageMinter::new(wrapped_tokens(1), 4);
        let before = f.ledgers.clone();

        assert!(minter.plan(4, &f.tot, &f.ledgers, 0).unwrap().is_none());
        assert!(minter.plan(3, &f.tot, &f.ledgers, 0).unwrap().is_none());
        let report = minter.catch_up(4, &mut f.tot, &mut f.ledgers, 0).unwrap();
        assert_eq!(report.total_mint, 0);
        assert_eq!(f.ledgers, before);
    }

    #[test]
    fn test_zero_stake_advances_tick_only() {
        let mut f = Fixture::new();
        let mut minter = SeigniorageMinter::new(wrapped_tokens(1), 0);
        let report = minter.catch_up(50, &mut f.tot, &mut f.ledgers, 0).unwrap();
        assert_eq!(report.distributed, 0);
        assert!(report.shares.is_empty());
        assert_eq!(minter.last_mint_tick(), 50);
    }

    #[test]
    fn test_lottery_slice_is_carved_out() {
        let mut f = Fixture::new();
        f.stake("chain-a", "alice", 1_000);
        let mut minter = SeigniorageMinter::new(wrapped_tokens(100), 0);

        let report = minter.catch_up(1, &mut f.tot, &mut f.ledgers, 2_500).unwrap();

        assert_eq!(report.lottery_slice, wrapped_tokens(25));
        assert!(wrapped_tokens(1_075) - f.chain_total("chain-a") <= 1);
    }

    #[test]
    fn test_plan_does_not_mutate() {
        let mut f = Fixture::new();
        f.stake("chain-a", "alice", 10);
        let minter = SeigniorageMinter::new(wrapped_tokens(1), 0);
        let before = f.ledgers.clone();
        let plan = minter.plan(9, &f.tot, &f.ledgers, 0).unwrap().unwrap();
        assert!(plan.mints_anything());
        assert_eq!(f.ledgers, before);
        assert_eq!(minter.last_mint_tick(), 0);
    }

    #[test]
    fn test_rate_overflow_is_arithmetic_error() {
        let f = Fixture::new();
        let minter = SeigniorageMinter::new(u128::MAX, 0);
        let err = minter.plan(2, &f.tot, &f.ledgers, 0).unwrap_err();
        assert!(matches!(err, SeigError::Arithmetic(ArithmeticError::Overflow(_))));
    }
}
