//! # Share Ledger
//!
//! Holder balances, total supply, and the dead-share floor.
//!
//! Invariant, after every call: `total_supply == Σ balances + dead_shares`.
//! The dead shares are not an entry in `balances`. They belong to the burn
//! sink, which has no key and therefore can never redeem them.
//!
//! Every mutator computes its new values before writing any of them, so an
//! `Err` leaves the ledger untouched.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::DEAD_SHARES;
use crate::error::{VaultError, VaultResult};
use crate::math::SafeMath;
use crate::types::{Amount, Principal};

/// Per-holder share balances for one vault.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareLedger {
    balances: HashMap<Principal, Amount>,
    total_supply: Amount,
    dead_shares: Amount,
}

impl ShareLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `amount` shares to `holder`.
    ///
    /// # Errors
    ///
    /// [`VaultError::ArithmeticOverflow`] if the total supply would overflow.
    pub fn mint(&mut self, holder: &Principal, amount: Amount) -> VaultResult<()> {
        let new_supply = self.total_supply.safe_add(amount)?;
        // A balance never exceeds the supply, so this cannot overflow once the
        // supply check passed.
        let new_balance = self.balance_of(holder).safe_add(amount)?;

        self.total_supply = new_supply;
        self.balances.insert(holder.clone(), new_balance);
        Ok(())
    }

    /// Debits `amount` shares from `holder`.
    ///
    /// # Errors
    ///
    /// [`VaultError::InsufficientShares`] if the holder owns fewer than
    /// `amount` shares.
    pub fn burn(&mut self, holder: &Principal, amount: Amount) -> VaultResult<()> {
        let balance = self.balances.get(holder).copied().unwrap_or(0);
        if balance < amount {
            return Err(VaultError::InsufficientShares {
                balance,
                requested: amount,
            });
        }
        let new_supply = self.total_supply.safe_sub(amount)?;

        self.total_supply = new_supply;
        let remaining = balance - amount;
        if remaining == 0 {
            self.balances.remove(holder);
        } else {
            self.balances.insert(holder.clone(), remaining);
        }
        Ok(())
    }

    /// Mints [`DEAD_SHARES`] to the burn sink. Only valid on an empty ledger;
    /// on a seeded ledger this is a no-op so the floor can never grow.
    pub fn mint_dead_shares(&mut self) -> VaultResult<()> {
        if self.is_seeded() {
            return Ok(());
        }
        let new_supply = self.total_supply.safe_add(DEAD_SHARES)?;
        self.total_supply = new_supply;
        self.dead_shares = DEAD_SHARES;
        tracing::debug!(dead_shares = DEAD_SHARES, "dead shares minted to burn sink");
        Ok(())
    }

    /// Share balance of `holder`. The burn sink reports the dead shares.
    pub fn balance_of(&self, holder: &Principal) -> Amount {
        if holder.is_burn_sink() {
            return self.dead_shares;
        }
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// All outstanding shares, dead shares included.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Shares held by the burn sink.
    pub fn dead_shares(&self) -> Amount {
        self.dead_shares
    }

    /// `true` once the dead shares exist.
    pub fn is_seeded(&self) -> bool {
        self.dead_shares > 0
    }

    /// Number of holders with a non-zero balance, excluding the burn sink.
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Iterates `(holder, balance)` pairs, excluding the burn sink.
    pub fn holders(&self) -> impl Iterator<Item = (&Principal, Amount)> {
        self.balances.iter().map(|(p, b)| (p, *b))
    }

    /// Recomputes `Σ balances + dead_shares` and compares it to the supply.
    pub fn is_consistent(&self) -> bool {
        let sum = self
            .balances
            .values()
            .try_fold(self.dead_shares, |acc, b| acc.checked_add(*b));
        sum == Some(self.total_supply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Principal {
        Principal::from("alice")
    }

    #[test]
    fn mint_increases_balance_and_supply() {
        let mut ledger = ShareLedger::new();
        ledger.mint(&alice(), 500).unwrap();
        ledger.mint(&alice(), 250).unwrap();
        assert_eq!(ledger.balance_of(&alice()), 750);
        assert_eq!(ledger.total_supply(), 750);
        assert!(ledger.is_consistent());
    }

    #[test]
    fn burn_more_than_balance_rejected_without_mutation() {
        let mut ledger = ShareLedger::new();
        ledger.mint(&alice(), 100).unwrap();
        let err = ledger.burn(&alice(), 101).unwrap_err();
        assert_eq!(
            err,
            VaultError::InsufficientShares {
                balance: 100,
                requested: 101
            }
        );
        assert_eq!(ledger.balance_of(&alice()), 100);
        assert_eq!(ledger.total_supply(), 100);
    }

    #[test]
    fn burn_to_zero_removes_holder() {
        let mut ledger = ShareLedger::new();
        ledger.mint(&alice(), 100).unwrap();
        ledger.burn(&alice(), 100).unwrap();
        assert_eq!(ledger.holder_count(), 0);
        assert_eq!(ledger.total_supply(), 0);
    }

    #[test]
    fn dead_shares_minted_once() {
        let mut ledger = ShareLedger::new();
        ledger.mint_dead_shares().unwrap();
        ledger.mint_dead_shares().unwrap();
        assert_eq!(ledger.dead_shares(), DEAD_SHARES);
        assert_eq!(ledger.total_supply(), DEAD_SHARES);
        assert!(ledger.is_consistent());
    }

    #[test]
    fn burn_sink_cannot_burn_dead_shares() {
        let mut ledger = ShareLedger::new();
        ledger.mint_dead_shares().unwrap();
        let sink = Principal::burn_sink();
        assert_eq!(ledger.balance_of(&sink), DEAD_SHARES);
        assert!(ledger.burn(&sink, 1).is_err());
        assert_eq!(ledger.total_supply(), DEAD_SHARES);
    }

    #[test]
    fn mint_overflow_rejected() {
        let mut ledger = ShareLedger::new();
        ledger.mint(&alice(), u128::MAX).unwrap();
        let bob = Principal::from("bob");
        assert_eq!(ledger.mint(&bob, 1), Err(VaultError::ArithmeticOverflow));
        assert_eq!(ledger.balance_of(&bob), 0);
    }
}
