//! Capital routing: allocate idle assets to a strategy, harvest its yield,
//! and recall capital in an emergency.
//!
//! Strategy failures are contained here. A failed or stalled strategy call
//! surfaces as an error from the one operation that made it, and the vault
//! keeps serving deposits and withdrawals.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use super::Vault;
use crate::error::{VaultError, VaultResult};
use crate::strategy::{Strategy, StrategyError};
use crate::types::{Amount, Principal};

impl Vault {
    /// Moves `amount` of idle capital into `strategy`. `total_assets` does
    /// not change.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotAuthorized`], [`VaultError::Paused`],
    /// [`VaultError::StrategyNotWhitelisted`], [`VaultError::ZeroAmount`],
    /// [`VaultError::InsufficientLiquidity`],
    /// [`VaultError::StrategyUnavailable`], or the strategy's own failure as
    /// [`VaultError::StrategyCallFailed`] / [`VaultError::StrategyTimeout`].
    pub async fn allocate_to_strategy(
        &self,
        caller: &Principal,
        strategy: &Principal,
        amount: Amount,
    ) -> VaultResult<()> {
        let mut state = self.state.lock().await;
        state.access.require_owner(caller)?;
        state.access.require_active()?;
        state.access.require_whitelisted(strategy)?;
        let change = state
            .allocator
            .plan_allocate(strategy, amount, state.total_assets)?;
        let capability = self.resolve_strategy(strategy)?;

        self.bounded_strategy_call(strategy, "deposit", capability.deposit(amount))
            .await?;

        let allocation = change.new_allocation;
        state.allocator.apply(change);
        info!(
            vault = %self.config.id,
            strategy = %strategy,
            amount,
            allocation,
            "capital allocated"
        );
        Ok(())
    }

    /// Collects the strategy's realized profit. The performance fee is kept
    /// by the vault and the rest is added to `total_assets`. Returns the net
    /// yield added.
    ///
    /// The strategy is asked for no more than the vault can book without
    /// overflowing, so a drained report is always committed.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotAuthorized`], [`VaultError::Paused`],
    /// [`VaultError::StrategyNotWhitelisted`] for a strategy the vault has
    /// neither whitelisted nor funded, [`VaultError::StrategyUnavailable`],
    /// or [`VaultError::HarvestFailed`] when the report fails or stalls.
    pub async fn harvest_strategy(&self, caller: &Principal, strategy: &Principal) -> VaultResult<Amount> {
        let mut state = self.state.lock().await;
        state.access.require_owner(caller)?;
        state.access.require_active()?;
        // A delisted strategy that still holds capital can be harvested.
        if !state.access.is_whitelisted(strategy) && state.allocator.allocated(strategy) == 0 {
            return Err(VaultError::StrategyNotWhitelisted(strategy.clone()));
        }
        let capability = self.resolve_strategy(strategy)?;

        // The report drains the strategy, so it is capped at what the books
        // can absorb; any excess stays pending for a later harvest.
        let capacity = state.harvest_capacity();
        let report = capability.report_yield(capacity);
        let profit = match tokio::time::timeout(self.ctx.call_timeout, report).await {
            Ok(Ok(profit)) if profit > capacity => {
                let reason = format!("reported {} above cap {}", profit, capacity);
                return Err(self.harvest_failed(strategy, reason));
            }
            Ok(Ok(profit)) => profit,
            Ok(Err(e)) => return Err(self.harvest_failed(strategy, e.to_string())),
            Err(_) => {
                let reason = format!("timed out after {:?}", self.ctx.call_timeout);
                return Err(self.harvest_failed(strategy, reason));
            }
        };

        let plan = state.plan_harvest(profit)?;
        state.commit_harvest(&plan);
        info!(
            vault = %self.config.id,
            strategy = %strategy,
            profit = plan.profit,
            fee = plan.fee,
            net = plan.net,
            "harvest committed"
        );
        Ok(plan.net)
    }

    /// Recalls `amount` from `strategy` back to the idle balance. Callable
    /// while paused. `total_assets` does not change.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotAuthorized`], [`VaultError::ZeroAmount`],
    /// [`VaultError::InsufficientAllocation`],
    /// [`VaultError::StrategyUnavailable`], or the strategy's own failure.
    pub async fn emergency_withdraw_from_strategy(
        &self,
        caller: &Principal,
        strategy: &Principal,
        amount: Amount,
    ) -> VaultResult<()> {
        let mut state = self.state.lock().await;
        state.access.require_owner(caller)?;
        let change = state.allocator.plan_recall(strategy, amount)?;
        let capability = self.resolve_strategy(strategy)?;

        self.bounded_strategy_call(strategy, "withdraw", capability.withdraw(amount))
            .await?;

        let allocation = change.new_allocation;
        state.allocator.apply(change);
        warn!(
            vault = %self.config.id,
            strategy = %strategy,
            amount,
            remaining = allocation,
            "emergency recall committed"
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn resolve_strategy(&self, strategy: &Principal) -> VaultResult<Arc<dyn Strategy>> {
        self.ctx
            .strategies
            .resolve(strategy)
            .ok_or_else(|| VaultError::StrategyUnavailable(strategy.clone()))
    }

    async fn bounded_strategy_call<F>(
        &self,
        strategy: &Principal,
        operation: &'static str,
        call: F,
    ) -> VaultResult<()>
    where
        F: Future<Output = Result<(), StrategyError>>,
    {
        match tokio::time::timeout(self.ctx.call_timeout, call).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!(
                    vault = %self.config.id,
                    strategy = %strategy,
                    operation,
                    error = %e,
                    "strategy call failed"
                );
                Err(VaultError::StrategyCallFailed {
                    strategy: strategy.clone(),
                    operation,
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                warn!(
                    vault = %self.config.id,
                    strategy = %strategy,
                    operation,
                    "strategy call timed out"
                );
                Err(VaultError::StrategyTimeout {
                    strategy: strategy.clone(),
                    operation,
                })
            }
        }
    }

    fn harvest_failed(&self, strategy: &Principal, reason: String) -> VaultError {
        warn!(
            vault = %self.config.id,
            strategy = %strategy,
            reason = %reason,
            "harvest failed, vault state unchanged"
        );
        VaultError::HarvestFailed {
            strategy: strategy.clone(),
            reason,
        }
    }
}
