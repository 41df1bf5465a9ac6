// crates/seig-economics/src/coinage.rs
//
// Coinage: a compounding-interest balance ledger.
//
// Each participant stores a factor-independent `principal`. Their effective
// value is `principal * factor / FACTOR_ONE`, computed on read and never
// stored. Raising `factor` therefore accrues interest to every participant
// at once without touching individual records.
//
// Rounding always favours the ledger:
//   - mint converts value to principal rounding DOWN,
//   - burn converts value to principal rounding UP,
// so the sum of withdrawable value never exceeds what was deposited plus
// interest actually credited.
//
// Every mutating method computes all checked values before writing, so an
// error leaves the ledger untouched.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use seig_core::{Amount, ArithmeticError, SeigError};

use crate::fixed::{checked_add, checked_sub, mul_div, to_effective, to_principal, Rounding, FACTOR_ONE};

/// Interest-bearing ledger keyed by participant id `P`.
///
/// Used per chain (participants are stakers) and once globally as the
/// aggregate ledger (participants are chains).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedPointLedger<P: Ord> {
    /// Compounding factor in FACTOR_ONE precision. Never decreases.
    factor: u128,
    /// Sum of all participants' principal.
    total_principal: u128,
    /// Per-participant principal. Zero entries are removed.
    principals: BTreeMap<P, u128>,
}

impl<P: Ord + Copy + fmt::Display> FixedPointLedger<P> {
    /// Create an empty ledger with factor 1.0.
    pub fn new() -> Self {
        Self {
            factor: FACTOR_ONE,
            total_principal: 0,
            principals: BTreeMap::new(),
        }
    }

    pub fn factor(&self) -> u128 {
        self.factor
    }

    pub fn total_principal(&self) -> u128 {
        self.total_principal
    }

    pub fn principal_of(&self, participant: &P) -> u128 {
        self.principals.get(participant).copied().unwrap_or(0)
    }

    /// Effective value of a participant: `principal * factor`, rounded down.
    pub fn effective_balance_of(&self, participant: &P) -> Result<Amount, ArithmeticError> {
        to_effective(self.principal_of(participant), self.factor)
    }

    /// Effective value of the whole ledger, rounded down.
    ///
    /// May exceed the sum of individual effective balances by up to one unit
    /// per participant (each of those is rounded down separately).
    pub fn total_effective(&self) -> Result<Amount, ArithmeticError> {
        to_effective(self.total_principal, self.factor)
    }

    /// Participants with nonzero principal, in key order.
    pub fn participants(&self) -> impl Iterator<Item = (&P, &u128)> {
        self.principals.iter()
    }

    pub fn len(&self) -> usize {
        self.principals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }

    /// The factor that `add_factor(delta)` would produce, without applying it.
    pub fn factor_after(&self, delta: u128) -> Result<u128, ArithmeticError> {
        let multiplier = checked_add(FACTOR_ONE, delta, "add_factor")?;
        mul_div(self.factor, multiplier, FACTOR_ONE, Rounding::Down, "add_factor")
    }

    /// Multiply the factor by `(1 + delta)` with `delta` in FACTOR_ONE precision,
    /// rounding down. Returns the new factor.
    pub fn add_factor(&mut self, delta: u128) -> Result<u128, ArithmeticError> {
        let next = self.factor_after(delta)?;
        self.factor = next;
        Ok(next)
    }

    /// Delta that raises the ledger's total effective value by at most `amount`.
    ///
    /// Uses the total effective value rounded UP as the denominator so the
    /// realised increase never exceeds `amount`. Returns 0 for an empty ledger.
    pub fn delta_for_increase(&self, amount: Amount) -> Result<u128, ArithmeticError> {
        if self.total_principal == 0 || amount == 0 {
            return Ok(0);
        }
        let total_up = mul_div(
            self.total_principal,
            self.factor,
            FACTOR_ONE,
            Rounding::Up,
            "delta_for_increase",
        )?;
        mul_div(amount, FACTOR_ONE, total_up, Rounding::Down, "delta_for_increase")
    }

    /// Total effective value this ledger would have at `factor`.
    pub fn total_effective_at(&self, factor: u128) -> Result<Amount, ArithmeticError> {
        to_effective(self.total_principal, factor)
    }

    /// Credit `amount` of effective value to `participant`.
    ///
    /// Returns the principal credited. A nonzero amount that rounds to zero
    /// principal is rejected as dust rather than silently dropped.
    pub fn mint(&mut self, participant: P, amount: Amount) -> Result<u128, SeigError> {
        if amount == 0 {
            return Ok(0);
        }
        let principal = to_principal(amount, self.factor, Rounding::Down)?;
        if principal == 0 {
            return Err(ArithmeticError::DustMint {
                amount,
                factor: self.factor,
            }
            .into());
        }
        self.credit_principal(participant, principal)?;
        Ok(principal)
    }

    /// Debit `amount` of effective value from `participant`.
    ///
    /// Returns the principal removed (rounded up).
    pub fn burn(&mut self, participant: P, amount: Amount) -> Result<u128, SeigError> {
        if amount == 0 {
            return Ok(0);
        }
        let principal = to_principal(amount, self.factor, Rounding::Up)?;
        let held = self.principal_of(&participant);
        if principal > held {
            return Err(SeigError::InsufficientBalance {
                requested: amount,
                available: to_effective(held, self.factor)?,
            });
        }
        self.debit_principal(participant, principal)?;
        Ok(principal)
    }

    /// Remove an exact principal amount. The inverse of the principal returned by `mint`.
    pub fn burn_principal(&mut self, participant: P, principal: u128) -> Result<(), SeigError> {
        let held = self.principal_of(&participant);
        if principal > held {
            return Err(SeigError::InsufficientBalance {
                requested: to_effective(principal, self.factor)?,
                available: to_effective(held, self.factor)?,
            });
        }
        self.debit_principal(participant, principal)
    }

    /// Move `amount` of effective value from `from` to `to` as principal,
    /// with a single round-up conversion. Returns the principal moved.
    pub fn transfer_principal(&mut self, from: P, to: P, amount: Amount) -> Result<u128, SeigError> {
        if amount == 0 || from == to {
            return Ok(0);
        }
        let principal = to_principal(amount, self.factor, Rounding::Up)?;
        let held = self.principal_of(&from);
        if principal > held {
            return Err(SeigError::InsufficientBalance {
                requested: amount,
                available: to_effective(held, self.factor)?,
            });
        }
        let to_next = checked_add(self.principal_of(&to), principal, "transfer_principal")?;
        self.set_principal(from, held - principal);
        self.set_principal(to, to_next);
        Ok(principal)
    }

    fn credit_principal(&mut self, participant: P, principal: u128) -> Result<(), SeigError> {
        let next_total = checked_add(self.total_principal, principal, "mint")?;
        let next = checked_add(self.principal_of(&participant), principal, "mint")?;
        self.total_principal = next_total;
        self.set_principal(participant, next);
        Ok(())
    }

    fn debit_principal(&mut self, participant: P, principal: u128) -> Result<(), SeigError> {
        let next_total = checked_sub(self.total_principal, principal, "burn")?;
        let next = checked_sub(self.principal_of(&participant), principal, "burn")?;
        self.total_principal = next_total;
        self.set_principal(participant, next);
        Ok(())
    }

    fn set_principal(&mut self, participant: P, principal: u128) {
        if principal == 0 {
            self.principals.remove(&participant);
        } else {
            self.principals.insert(participant, principal);
        }
    }
}

impl<P: Ord + Copy + fmt::Display> Default for FixedPointLedger<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use seig_core::{wrapped_tokens, Address};

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn bob() -> Address {
        Address::from_label("bob")
    }

    fn sum_principal(ledger: &FixedPointLedger<Address>) -> u128 {
        ledger.participants().map(|(_, p)| *p).sum()
    }

    #[test]
    fn test_mint_at_factor_one() {
        let mut ledger = FixedPointLedger::new();
        let principal = ledger.mint(alice(), wrapped_tokens(10)).unwrap();
        assert_eq!(principal, wrapped_tokens(10));
        assert_eq!(ledger.effective_balance_of(&alice()).unwrap(), wrapped_tokens(10));
        assert_eq!(ledger.total_principal(), principal);
    }

    #[test]
    fn test_add_factor_accrues_to_everyone() {
        let mut ledger = FixedPointLedger::new();
        ledger.mint(alice(), wrapped_tokens(100)).unwrap();
        ledger.mint(bob(), wrapped_tokens(300)).unwrap();

        // +10%
        ledger.add_factor(FACTOR_ONE / 10).unwrap();

        assert_eq!(ledger.effective_balance_of(&alice()).unwrap(), wrapped_tokens(110));
        assert_eq!(ledger.effective_balance_of(&bob()).unwrap(), wrapped_tokens(330));
        assert_eq!(ledger.total_effective().unwrap(), wrapped_tokens(440));
    }

    #[test]
    fn test_mint_rejects_dust() {
        let mut ledger: FixedPointLedger<Address> = FixedPointLedger::new();
        ledger.add_factor(FACTOR_ONE).unwrap(); // factor 2.0
        let err = ledger.mint(alice(), 1).unwrap_err();
        assert!(matches!(
            err,
            SeigError::Arithmetic(ArithmeticError::DustMint { amount: 1, .. })
        ));
        assert_eq!(ledger.total_principal(), 0);
    }

    #[test]
    fn test_burn_rounds_up() {
        let mut ledger = FixedPointLedger::new();
        ledger.add_factor(FACTOR_ONE * 2).unwrap(); // factor 3.0
        ledger.mint(alice(), 10).unwrap(); // principal 3, worth 9
        assert_eq!(ledger.principal_of(&alice()), 3);
        assert_eq!(ledger.effective_balance_of(&alice()).unwrap(), 9);

        // 4 units of value needs 4/3 principal -> rounds up to 2.
        let burned = ledger.burn(alice(), 4).unwrap();
        assert_eq!(burned, 2);
        assert_eq!(ledger.principal_of(&alice()), 1);
    }

    #[test]
    fn test_burn_insufficient_balance_leaves_state() {
        let mut ledger = FixedPointLedger::new();
        ledger.mint(alice(), 100).unwrap();
        let before = ledger.clone();
        let err = ledger.burn(alice(), 101).unwrap_err();
        assert!(matches!(
            err,
            SeigError::InsufficientBalance { requested: 101, available: 100 }
        ));
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_burn_full_effective_balance_always_possible() {
        let mut ledger = FixedPointLedger::new();
        ledger.mint(alice(), wrapped_tokens(7)).unwrap();
        ledger.add_factor(FACTOR_ONE / 3).unwrap();
        let balance = ledger.effective_balance_of(&alice()).unwrap();
        ledger.burn(alice(), balance).unwrap();
        assert!(ledger.effective_balance_of(&alice()).unwrap() <= 1);
    }

    #[test]
    fn test_burn_principal_undoes_mint() {
        let mut ledger = FixedPointLedger::new();
        ledger.add_factor(FACTOR_ONE / 7).unwrap();
        let before = ledger.clone();
        let principal = ledger.mint(alice(), wrapped_tokens(5)).unwrap();
        ledger.burn_principal(alice(), principal).unwrap();
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_transfer_principal() {
        let mut ledger = FixedPointLedger::new();
        ledger.mint(alice(), wrapped_tokens(10)).unwrap();
        ledger.transfer_principal(alice(), bob(), wrapped_tokens(4)).unwrap();
        assert_eq!(ledger.effective_balance_of(&alice()).unwrap(), wrapped_tokens(6));
        assert_eq!(ledger.effective_balance_of(&bob()).unwrap(), wrapped_tokens(4));
        assert_eq!(ledger.total_principal(), sum_principal(&ledger));
    }

    #[test]
    fn test_transfer_principal_insufficient() {
        let mut ledger = FixedPointLedger::new();
        ledger.mint(alice(), 10).unwrap();
        assert!(ledger.transfer_principal(alice(), bob(), 11).is_err());
        assert_eq!(ledger.principal_of(&bob()), 0);
    }

    #[test]
    fn test_delta_for_increase_never_overshoots() {
        let mut ledger = FixedPointLedger::new();
        ledger.mint(alice(), 1_000_003).unwrap();
        ledger.add_factor(FACTOR_ONE / 3).unwrap();
        let before = ledger.total_effective().unwrap();
        let delta = ledger.delta_for_increase(777).unwrap();
        ledger.add_factor(delta).unwrap();
        let after = ledger.total_effective().unwrap();
        assert!(after - before <= 777);
        assert!(after - before >= 775);
    }

    #[test]
    fn test_delta_for_increase_empty_ledger() {
        let ledger: FixedPointLedger<Address> = FixedPointLedger::new();
        assert_eq!(ledger.delta_for_increase(1_000).unwrap(), 0);
    }

    #[test]
    fn test_factor_overflow_is_rejected() {
        let mut ledger: FixedPointLedger<Address> = FixedPointLedger::new();
        // A delta whose multiplier itself leaves u128.
        let err = ledger.add_factor(u128::MAX).unwrap_err();
        assert!(matches!(err, ArithmeticError::Overflow(_)));
        assert_eq!(ledger.factor(), FACTOR_ONE);

        // From a doubled factor, the largest multiplier pushes the product past u128.
        assert_eq!(ledger.add_factor(FACTOR_ONE).unwrap(), 2 * FACTOR_ONE);
        let err = ledger.add_factor(u128::MAX - FACTOR_ONE).unwrap_err();
        assert!(matches!(err, ArithmeticError::Overflow(_)));
        assert_eq!(ledger.factor(), 2 * FACTOR_ONE);
    }

    #[test]
    fn test_serde_keys_are_addresses() {
        let mut ledger = FixedPointLedger::new();
        ledger.mint(alice(), 5).unwrap();
        let json = serde_json::to_string(&ledger).unwrap();
        assert!(json.contains(&alice().to_string()));
        let back: FixedPointLedger<Address> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ledger);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Mint(u8, u64),
        Burn(u8, u64),
        Grow(u64),
        Transfer(u8, u8, u64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..4, 1u64..1_000_000).prop_map(|(p, a)| Op::Mint(p, a)),
            (0u8..4, 1u64..1_000_000).prop_map(|(p, a)| Op::Burn(p, a)),
            (0u64..1_000_000).prop_map(Op::Grow),
            (0u8..4, 0u8..4, 1u64..1_000_000).prop_map(|(a, b, x)| Op::Transfer(a, b, x)),
        ]
    }

    proptest! {
        #[test]
        fn prop_total_principal_matches_sum(ops in proptest::collection::vec(op_strategy(), 1..60)) {
            let mut ledger: FixedPointLedger<Address> = FixedPointLedger::new();
            let who = |i: u8| Address([i; 20]);
            let mut last_factor = ledger.factor();
            for op in ops {
                let _ = match op {
                    Op::Mint(p, a) => ledger.mint(who(p), a as u128 * 1_000).map(|_| ()),
                    Op::Burn(p, a) => ledger.burn(who(p), a as u128).map(|_| ()),
                    Op::Grow(d) => ledger
                        .add_factor(d as u128 * 1_000_000_000_000)
                        .map(|_| ())
                        .map_err(SeigError::from),
                    Op::Transfer(a, b, x) => ledger.transfer_principal(who(a), who(b), x as u128).map(|_| ()),
                };
                prop_assert_eq!(ledger.total_principal(), sum_principal(&ledger));
                prop_assert!(ledger.factor() >= last_factor);
                last_factor = ledger.factor();
            }
        }

        #[test]
        fn prop_withdrawable_never_exceeds_total(ops in proptest::collection::vec(op_strategy(), 1..60)) {
            let mut ledger: FixedPointLedger<Address> = FixedPointLedger::new();
            let who = |i: u8| Address([i; 20]);
            for op in ops {
                let _ = match op {
                    Op::Mint(p, a) => ledger.mint(who(p), a as u128 * 1_000).map(|_| ()),
                    Op::Burn(p, a) => ledger.burn(who(p), a as u128).map(|_| ()),
                    Op::Grow(d) => ledger
                        .add_factor(d as u128 * 1_000_000_000_000)
                        .map(|_| ())
                        .map_err(SeigError::from),
                    Op::Transfer(a, b, x) => ledger.transfer_principal(who(a), who(b), x as u128).map(|_| ()),
                };
                let individual: u128 = (0u8..4)
                    .map(|i| ledger.effective_balance_of(&who(i)).unwrap())
                    .sum();
                prop_assert!(individual <= ledger.total_effective().unwrap());
            }
        }
    }
}
