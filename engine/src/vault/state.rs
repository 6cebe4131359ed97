//! Vault state and the plans computed against it.
//!
//! Every mutating operation is split in two: a `plan_*` method that reads
//! the state, runs every check, and computes every derived value (overflow
//! included), and a `commit_*` method that writes the plan back. Outbound
//! calls happen between the two. A plan that was never committed leaves no
//! trace.

use crate::access::AccessControl;
use crate::allocator::StrategyAllocator;
use crate::config::DEAD_SHARES;
use crate::error::{VaultError, VaultResult};
use crate::ledger::ShareLedger;
use crate::math::{self, SafeMath};
use crate::types::{Amount, Principal};

/// Gross, fee, and net for redeeming a number of shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Redemption {
    pub gross: Amount,
    pub fee: Amount,
    pub net: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DepositPlan {
    pub shares: Amount,
    pub bootstrap: bool,
    pub new_total_assets: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WithdrawPlan {
    pub shares: Amount,
    pub redemption: Redemption,
    pub new_total_assets: Amount,
    pub new_accrued_fees: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HarvestPlan {
    pub profit: Amount,
    pub fee: Amount,
    pub net: Amount,
    pub new_total_assets: Amount,
    pub new_accrued_fees: Amount,
}

/// Everything one vault owns. Lives behind the vault's mutex.
#[derive(Debug, Clone)]
pub(crate) struct VaultState {
    pub access: AccessControl,
    pub shares: ShareLedger,
    pub allocator: StrategyAllocator,
    /// Idle plus allocated assets. Accrued fees are not part of it.
    pub total_assets: Amount,
    /// Fees retained by the vault and not yet collected.
    pub accrued_fees: Amount,
    pub performance_fee_bps: u16,
    back_dead_shares: bool,
}

impl VaultState {
    pub fn new(owner: Principal, performance_fee_bps: u16, back_dead_shares: bool) -> Self {
        Self {
            access: AccessControl::new(owner),
            shares: ShareLedger::new(),
            allocator: StrategyAllocator::new(),
            total_assets: 0,
            accrued_fees: 0,
            performance_fee_bps,
            back_dead_shares,
        }
    }

    /// Assets used as the denominator in share conversions. Includes the
    /// virtual backing of the dead shares when the vault is configured for it.
    pub fn effective_assets(&self) -> VaultResult<Amount> {
        if self.back_dead_shares && self.shares.is_seeded() {
            self.total_assets.safe_add(self.shares.dead_shares())
        } else {
            Ok(self.total_assets)
        }
    }

    pub fn share_price(&self) -> VaultResult<Amount> {
        math::share_price(self.effective_assets()?, self.shares.total_supply())
    }

    pub fn idle_balance(&self) -> VaultResult<Amount> {
        self.allocator.idle_balance(self.total_assets)
    }

    /// `floor(shares * assets / supply)`, zero for an empty vault.
    pub fn assets_for_shares(&self, shares: Amount) -> VaultResult<Amount> {
        let supply = self.shares.total_supply();
        if supply == 0 {
            return Ok(0);
        }
        math::assets_for_shares(shares, supply, self.effective_assets()?)
    }

    pub fn redemption(&self, shares: Amount) -> VaultResult<Redemption> {
        let gross = self.assets_for_shares(shares)?;
        let fee = math::fee_for(gross, self.performance_fee_bps)?;
        Ok(Redemption {
            gross,
            fee,
            net: gross.safe_sub(fee)?,
        })
    }

    // -----------------------------------------------------------------------
    // Deposit
    // -----------------------------------------------------------------------

    pub fn plan_deposit(
        &self,
        caller: &Principal,
        amount: Amount,
        min_first_deposit: Amount,
    ) -> VaultResult<DepositPlan> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }
        self.access.require_active()?;
        if caller.is_burn_sink() {
            return Err(VaultError::NotAuthorized {
                caller: caller.clone(),
            });
        }

        let supply = self.shares.total_supply();
        let bootstrap = supply == 0;
        let shares = if bootstrap {
            if amount < min_first_deposit {
                return Err(VaultError::MinimumFirstDeposit {
                    amount,
                    minimum: min_first_deposit,
                });
            }
            amount
        } else {
            math::shares_for_deposit(amount, supply, self.effective_assets()?)?
        };
        // A deposit too small to buy a single share would be a donation.
        if shares == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let minted = if bootstrap {
            shares.safe_add(DEAD_SHARES)?
        } else {
            shares
        };
        supply.safe_add(minted)?;

        Ok(DepositPlan {
            shares,
            bootstrap,
            new_total_assets: self.total_assets.safe_add(amount)?,
        })
    }

    pub fn commit_deposit(&mut self, caller: &Principal, plan: &DepositPlan) -> VaultResult<()> {
        if plan.bootstrap {
            self.shares.mint_dead_shares()?;
        }
        self.shares.mint(caller, plan.shares)?;
        self.total_assets = plan.new_total_assets;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Withdraw
    // -----------------------------------------------------------------------

    pub fn plan_withdraw(
        &self,
        caller: &Principal,
        shares: Amount,
        min_assets_out: Amount,
        deadline: u64,
        current_block: u64,
    ) -> VaultResult<WithdrawPlan> {
        if shares == 0 {
            return Err(VaultError::ZeroAmount);
        }
        self.access.require_active()?;
        if current_block > deadline {
            return Err(VaultError::DeadlinePassed {
                current: current_block,
                deadline,
            });
        }
        if caller.is_burn_sink() {
            return Err(VaultError::NotAuthorized {
                caller: caller.clone(),
            });
        }
        let balance = self.shares.balance_of(caller);
        if balance < shares {
            return Err(VaultError::InsufficientShares {
                balance,
                requested: shares,
            });
        }

        let redemption = self.redemption(shares)?;
        if redemption.net < min_assets_out {
            return Err(VaultError::SlippageExceeded {
                net: redemption.net,
                min_out: min_assets_out,
            });
        }
        let idle = self.idle_balance()?;
        if redemption.gross > idle {
            return Err(VaultError::InsufficientLiquidity {
                requested: redemption.gross,
                idle,
            });
        }

        Ok(WithdrawPlan {
            shares,
            redemption,
            new_total_assets: self.total_assets.safe_sub(redemption.gross)?,
            new_accrued_fees: self.accrued_fees.safe_add(redemption.fee)?,
        })
    }

    pub fn commit_withdraw(&mut self, caller: &Principal, plan: &WithdrawPlan) -> VaultResult<()> {
        self.shares.burn(caller, plan.shares)?;
        self.total_assets = plan.new_total_assets;
        self.accrued_fees = plan.new_accrued_fees;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Harvest
    // -----------------------------------------------------------------------

    /// Largest profit [`plan_harvest`](Self::plan_harvest) can book. Both
    /// the net and the fee are at most the profit, so a profit within the
    /// headroom of both counters always fits.
    pub fn harvest_capacity(&self) -> Amount {
        (Amount::MAX - self.total_assets).min(Amount::MAX - self.accrued_fees)
    }

    pub fn plan_harvest(&self, profit: Amount) -> VaultResult<HarvestPlan> {
        let fee = math::fee_for(profit, self.performance_fee_bps)?;
        let net = profit.safe_sub(fee)?;
        Ok(HarvestPlan {
            profit,
            fee,
            net,
            new_total_assets: self.total_assets.safe_add(net)?,
            new_accrued_fees: self.accrued_fees.safe_add(fee)?,
        })
    }

    pub fn commit_harvest(&mut self, plan: &HarvestPlan) {
        self.total_assets = plan.new_total_assets;
        self.accrued_fees = plan.new_accrued_fees;
    }

    /// `total_supply == Σ balances + dead_shares` and
    /// `total_assets >= Σ allocations`.
    pub fn is_consistent(&self) -> bool {
        self.shares.is_consistent() && self.total_assets >= self.allocator.total_allocated()
    }
}
