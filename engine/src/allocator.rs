//! # Strategy Allocator
//!
//! Books for capital deployed into strategies. Allocating or recalling moves
//! assets between the idle balance and a strategy; neither changes
//! `total_assets`, only where the assets sit.
//!
//! Invariant: `total_assets >= Σ allocations`, so the idle balance
//! (`total_assets - Σ allocations`) is never negative.
//!
//! This module only keeps the books. The calls out to the strategy
//! capability, and the ordering against them, live in
//! [`crate::vault::Vault::allocate_to_strategy`] and friends.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};
use crate::math::SafeMath;
use crate::types::{Amount, Principal};

/// A validated change to one strategy's allocation, ready to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationChange {
    /// The strategy whose allocation changes.
    pub strategy: Principal,
    /// Its allocation after the change.
    pub new_allocation: Amount,
    /// Σ allocations after the change.
    pub new_total: Amount,
}

/// Per-strategy allocations for one vault.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyAllocator {
    allocations: BTreeMap<Principal, Amount>,
    total_allocated: Amount,
}

impl StrategyAllocator {
    /// No capital deployed anywhere.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capital currently deployed in `strategy`.
    pub fn allocated(&self, strategy: &Principal) -> Amount {
        self.allocations.get(strategy).copied().unwrap_or(0)
    }

    /// Σ allocations.
    pub fn total_allocated(&self) -> Amount {
        self.total_allocated
    }

    /// Strategies holding capital, in address order.
    pub fn allocations(&self) -> impl Iterator<Item = (&Principal, Amount)> {
        self.allocations.iter().map(|(p, a)| (p, *a))
    }

    /// `total_assets - Σ allocations`.
    pub fn idle_balance(&self, total_assets: Amount) -> VaultResult<Amount> {
        total_assets.safe_sub(self.total_allocated)
    }

    /// Validates moving `amount` from idle into `strategy`.
    ///
    /// # Errors
    ///
    /// [`VaultError::ZeroAmount`] for zero, [`VaultError::InsufficientLiquidity`]
    /// if the idle balance cannot cover it.
    pub fn plan_allocate(
        &self,
        strategy: &Principal,
        amount: Amount,
        total_assets: Amount,
    ) -> VaultResult<AllocationChange> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let idle = self.idle_balance(total_assets)?;
        if amount > idle {
            return Err(VaultError::InsufficientLiquidity {
                requested: amount,
                idle,
            });
        }
        Ok(AllocationChange {
            strategy: strategy.clone(),
            new_allocation: self.allocated(strategy).safe_add(amount)?,
            new_total: self.total_allocated.safe_add(amount)?,
        })
    }

    /// Validates moving `amount` from `strategy` back to idle.
    ///
    /// # Errors
    ///
    /// [`VaultError::ZeroAmount`] for zero, [`VaultError::InsufficientAllocation`]
    /// if the strategy holds less than `amount`.
    pub fn plan_recall(&self, strategy: &Principal, amount: Amount) -> VaultResult<AllocationChange> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        let allocated = self.allocated(strategy);
        if amount > allocated {
            return Err(VaultError::InsufficientAllocation {
                strategy: strategy.clone(),
                allocated,
                requested: amount,
            });
        }
        Ok(AllocationChange {
            strategy: strategy.clone(),
            new_allocation: allocated - amount,
            new_total: self.total_allocated.safe_sub(amount)?,
        })
    }

    /// Commits a change produced by one of the `plan_*` methods.
    pub fn apply(&mut self, change: AllocationChange) {
        if change.new_allocation == 0 {
            self.allocations.remove(&change.strategy);
        } else {
            self.allocations
                .insert(change.strategy, change.new_allocation);
        }
        self.total_allocated = change.new_total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stacking() -> Principal {
        Principal::from("strategy-stx-stacking")
    }

    #[test]
    fn allocate_moves_idle_into_strategy() {
        let mut alloc = StrategyAllocator::new();
        let change = alloc.plan_allocate(&stacking(), 600, 1_000).unwrap();
        alloc.apply(change);
        assert_eq!(alloc.allocated(&stacking()), 600);
        assert_eq!(alloc.idle_balance(1_000).unwrap(), 400);
    }

    #[test]
    fn allocate_beyond_idle_rejected() {
        let mut alloc = StrategyAllocator::new();
        alloc.apply(alloc.plan_allocate(&stacking(), 600, 1_000).unwrap());
        let err = alloc.plan_allocate(&stacking(), 401, 1_000).unwrap_err();
        assert_eq!(
            err,
            VaultError::InsufficientLiquidity {
                requested: 401,
                idle: 400
            }
        );
    }

    #[test]
    fn recall_returns_capital_to_idle() {
        let mut alloc = StrategyAllocator::new();
        alloc.apply(alloc.plan_allocate(&stacking(), 600, 1_000).unwrap());
        alloc.apply(alloc.plan_recall(&stacking(), 600).unwrap());
        assert_eq!(alloc.allocated(&stacking()), 0);
        assert_eq!(alloc.allocations().count(), 0);
        assert_eq!(alloc.idle_balance(1_000).unwrap(), 1_000);
    }

    #[test]
    fn recall_beyond_allocation_rejected() {
        let alloc = StrategyAllocator::new();
        let err = alloc.plan_recall(&stacking(), 1).unwrap_err();
        assert_eq!(err.code(), 414);
    }

    #[test]
    fn zero_amounts_rejected() {
        let alloc = StrategyAllocator::new();
        assert_eq!(
            alloc.plan_allocate(&stacking(), 0, 10),
            Err(VaultError::ZeroAmount)
        );
        assert_eq!(alloc.plan_recall(&stacking(), 0), Err(VaultError::ZeroAmount));
    }
}
