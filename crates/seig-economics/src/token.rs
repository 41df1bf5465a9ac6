// crates/seig-economics/src/token.rs
//
// In-memory fungible-asset service for the base and wrapped currencies.
//
// TokenLedger tracks, per asset, every account's balance, the allowances
// owners grant to spenders, and total supply. The daemon runs it as the
// development network's asset backend and persists it with the engine
// snapshot; tests use it as the asset collaborator.
//
// Wrapping converts base units (18 decimals) into wrapped units (27 decimals)
// at 10^9 wrapped per base. Unwrapping rounds down and burns only the
// wrapped units that convert exactly, so dust below one base unit stays
// wrapped in the account.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use seig_core::{amount_str, Address, Asset, AssetError, AssetService, WRAPPED_PER_BASE};

/// Balances, allowances, and supply of one asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct AssetBook {
    #[serde(with = "amount_str")]
    supply: u128,
    balances: BTreeMap<Address, u128>,
    /// owner -> spender -> remaining allowance
    allowances: BTreeMap<Address, BTreeMap<Address, u128>>,
}

impl AssetBook {
    fn balance(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn set_balance(&mut self, account: Address, amount: u128) {
        if amount == 0 {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, amount);
        }
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(owner)
            .and_then(|m| m.get(spender))
            .copied()
            .unwrap_or(0)
    }

    fn set_allowance(&mut self, owner: Address, spender: Address, amount: u128) {
        let entry = self.allowances.entry(owner).or_default();
        if amount == 0 {
            entry.remove(&spender);
            if entry.is_empty() {
                self.allowances.remove(&owner);
            }
        } else {
            entry.insert(spender, amount);
        }
    }
}

/// In-memory `AssetService`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLedger {
    base: AssetBook,
    wrapped: AssetBook,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total supply of `asset`.
    pub fn total_supply(&self, asset: Asset) -> u128 {
        self.book(asset).supply
    }

    /// Accounts holding a nonzero balance of `asset`, in address order.
    pub fn holders(&self, asset: Asset) -> Vec<(Address, u128)> {
        self.book(asset)
            .balances
            .iter()
            .map(|(a, b)| (*a, *b))
            .collect()
    }

    fn book(&self, asset: Asset) -> &AssetBook {
        match asset {
            Asset::Base => &self.base,
            Asset::Wrapped => &self.wrapped,
        }
    }

    fn book_mut(&mut self, asset: Asset) -> &mut AssetBook {
        match asset {
            Asset::Base => &mut self.base,
            Asset::Wrapped => &mut self.wrapped,
        }
    }

    fn debit_check(&self, asset: Asset, account: &Address, amount: u128) -> Result<u128, AssetError> {
        let available = self.book(asset).balance(account);
        if amount > available {
            return Err(AssetError::InsufficientFunds {
                asset,
                account: *account,
                requested: amount,
                available,
            });
        }
        Ok(available)
    }

    fn move_funds(&mut self, asset: Asset, from: &Address, to: &Address, amount: u128) -> Result<(), AssetError> {
        let from_balance = self.debit_check(asset, from, amount)?;
        if from == to || amount == 0 {
            return Ok(());
        }
        let book = self.book_mut(asset);
        // Cannot overflow: supply bounds every balance.
        let to_balance = book.balance(to) + amount;
        book.set_balance(*from, from_balance - amount);
        book.set_balance(*to, to_balance);
        Ok(())
    }

    fn burn(&mut self, asset: Asset, account: &Address, amount: u128) -> Result<(), AssetError> {
        let available = self.debit_check(asset, account, amount)?;
        let book = self.book_mut(asset);
        book.set_balance(*account, available - amount);
        book.supply -= amount;
        Ok(())
    }
}

impl AssetService for TokenLedger {
    fn balance_of(&self, asset: Asset, account: &Address) -> u128 {
        self.book(asset).balance(account)
    }

    fn allowance(&self, asset: Asset, owner: &Address, spender: &Address) -> u128 {
        self.book(asset).allowance(owner, spender)
    }

    fn approve(&mut self, asset: Asset, owner: &Address, spender: &Address, amount: u128) {
        self.book_mut(asset).set_allowance(*owner, *spender, amount);
        debug!(%asset, owner = %owner, spender = %spender, amount, "allowance set");
    }

    fn transfer(&mut self, asset: Asset, from: &Address, to: &Address, amount: u128) -> Result<(), AssetError> {
        self.move_funds(asset, from, to, amount)
    }

    fn transfer_from(
        &mut self,
        asset: Asset,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), AssetError> {
        let approved = self.book(asset).allowance(from, spender);
        if amount > approved {
            return Err(AssetError::InsufficientAllowance {
                asset,
                owner: *from,
                spender: *spender,
                requested: amount,
                approved,
            });
        }
        self.move_funds(asset, from, to, amount)?;
        self.book_mut(asset).set_allowance(*from, *spender, approved - amount);
        Ok(())
    }

    fn mint(&mut self, asset: Asset, to: &Address, amount: u128) -> Result<(), AssetError> {
        let book = self.book_mut(asset);
        let supply = book
            .supply
            .checked_add(amount)
            .ok_or(AssetError::SupplyOverflow { asset })?;
        let balance = book.balance(to) + amount;
        book.supply = supply;
        book.set_balance(*to, balance);
        Ok(())
    }

    fn wrap(&mut self, account: &Address, base_amount: u128) -> Result<u128, AssetError> {
        let wrapped = base_amount
            .checked_mul(WRAPPED_PER_BASE)
            .ok_or(AssetError::SupplyOverflow { asset: Asset::Wrapped })?;
        if self.wrapped.supply.checked_add(wrapped).is_none() {
            return Err(AssetError::SupplyOverflow { asset: Asset::Wrapped });
        }
        self.burn(Asset::Base, account, base_amount)?;
        self.mint(Asset::Wrapped, account, wrapped)?;
        Ok(wrapped)
    }

    fn unwrap(&mut self, account: &Address, wrapped_amount: u128) -> Result<u128, AssetError> {
        self.debit_check(Asset::Wrapped, account, wrapped_amount)?;
        let base = wrapped_amount / WRAPPED_PER_BASE;
        let exact = base * WRAPPED_PER_BASE;
        if self.base.supply.checked_add(base).is_none() {
            return Err(AssetError::SupplyOverflow { asset: Asset::Base });
        }
        self.burn(Asset::Wrapped, account, exact)?;
        self.mint(Asset::Base, account, base)?;
        Ok(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seig_core::{wrapped_tokens, BASE_ONE};

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn custody() -> Address {
        Address::from_label("custody")
    }

    #[test]
    fn test_mint_and_transfer() {
        let mut tokens = TokenLedger::new();
        tokens.mint(Asset::Wrapped, &alice(), 100).unwrap();
        tokens.transfer(Asset::Wrapped, &alice(), &custody(), 40).unwrap();
        assert_eq!(tokens.balance_of(Asset::Wrapped, &alice()), 60);
        assert_eq!(tokens.balance_of(Asset::Wrapped, &custody()), 40);
        assert_eq!(tokens.total_supply(Asset::Wrapped), 100);
    }

    #[test]
    fn test_transfer_insufficient_funds() {
        let mut tokens = TokenLedger::new();
        tokens.mint(Asset::Base, &alice(), 5).unwrap();
        let err = tokens.transfer(Asset::Base, &alice(), &custody(), 6).unwrap_err();
        assert_eq!(
            err,
            AssetError::InsufficientFunds {
                asset: Asset::Base,
                account: alice(),
                requested: 6,
                available: 5
            }
        );
        assert_eq!(tokens.balance_of(Asset::Base, &alice()), 5);
    }

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let mut tokens = TokenLedger::new();
        tokens.mint(Asset::Wrapped, &alice(), 100).unwrap();
        tokens.approve(Asset::Wrapped, &alice(), &custody(), 70);

        tokens
            .transfer_from(Asset::Wrapped, &custody(), &alice(), &custody(), 50)
            .unwrap();
        assert_eq!(tokens.allowance(Asset::Wrapped, &alice(), &custody()), 20);

        let err = tokens
            .transfer_from(Asset::Wrapped, &custody(), &alice(), &custody(), 21)
            .unwrap_err();
        assert!(matches!(err, AssetError::InsufficientAllowance { approved: 20, .. }));
    }

    #[test]
    fn test_transfer_from_failure_keeps_allowance() {
        let mut tokens = TokenLedger::new();
        tokens.approve(Asset::Wrapped, &alice(), &custody(), 10);
        assert!(tokens
            .transfer_from(Asset::Wrapped, &custody(), &alice(), &custody(), 10)
            .is_err());
        assert_eq!(tokens.allowance(Asset::Wrapped, &alice(), &custody()), 10);
    }

    #[test]
    fn test_wrap_and_unwrap() {
        let mut tokens = TokenLedger::new();
        tokens.mint(Asset::Base, &alice(), 3 * BASE_ONE).unwrap();

        let wrapped = tokens.wrap(&alice(), 2 * BASE_ONE).unwrap();
        assert_eq!(wrapped, wrapped_tokens(2));
        assert_eq!(tokens.balance_of(Asset::Base, &alice()), BASE_ONE);
        assert_eq!(tokens.total_supply(Asset::Base), BASE_ONE);

        // Unwrap leaves sub-base-unit dust wrapped.
        let base = tokens.unwrap(&alice(), wrapped_tokens(1) + 5).unwrap();
        assert_eq!(base, BASE_ONE);
        assert_eq!(tokens.balance_of(Asset::Wrapped, &alice()), wrapped_tokens(1));
        assert_eq!(tokens.balance_of(Asset::Base, &alice()), 2 * BASE_ONE);
    }

    #[test]
    fn test_supply_overflow() {
        let mut tokens = TokenLedger::new();
        tokens.mint(Asset::Base, &alice(), u128::MAX).unwrap();
        let err = tokens.mint(Asset::Base, &custody(), 1).unwrap_err();
        assert_eq!(err, AssetError::SupplyOverflow { asset: Asset::Base });
    }

    #[test]
    fn test_serde_round_trip() {
        let mut tokens = TokenLedger::new();
        tokens.mint(Asset::Wrapped, &alice(), wrapped_tokens(1_000)).unwrap();
        tokens.approve(Asset::Wrapped, &alice(), &custody(), 7);
        let json = serde_json::to_vec(&tokens).unwrap();
        let back: TokenLedger = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, tokens);
    }
}
