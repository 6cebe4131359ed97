//! # Vault Core
//!
//! One [`Vault`] per risk tier. A vault orchestrates deposits, withdrawals,
//! and previews against its share ledger, enforces the slippage, deadline,
//! and first-deposit rules, and keeps the performance fees it charges.
//!
//! ## Serialization
//!
//! All state sits behind a single `tokio::sync::Mutex`. Every operation,
//! reads included, holds it from start to finish, across any awaits on the
//! asset ledger or a strategy. Two calls on the same vault never interleave.
//! Distinct vaults share no lock.
//!
//! ## Failure semantics
//!
//! Each operation plans, calls out, then commits. The outbound call is
//! bounded by the deployment's call timeout. If it fails, times out, or the
//! future is dropped, nothing was written.

mod admin;
mod allocation;
mod state;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::clock::BlockClock;
use crate::config::VaultConfig;
use crate::error::{VaultError, VaultResult};
use crate::math::SafeMath;
use crate::registry::VaultRegistry;
use crate::strategy::StrategyDirectory;
use crate::transfer::{AssetLedger, TransferError};
use crate::types::{Amount, Principal, VaultId};

use self::state::VaultState;

// ---------------------------------------------------------------------------
// Public read models
// ---------------------------------------------------------------------------

/// Result of [`Vault::preview_withdraw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawPreview {
    /// Assets the shares are worth before fees.
    pub gross: Amount,
    /// Performance fee the vault would keep.
    pub fee: Amount,
    /// What the holder would receive.
    pub net: Amount,
    /// Block height the preview was taken at.
    pub current_block: u64,
}

/// Display summary of a vault, as returned by [`Vault::get_vault_info`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultInfo {
    pub name: String,
    pub symbol: String,
    pub target_apy: String,
    pub risk_score: u8,
    pub total_assets: Amount,
    pub total_supply: Amount,
    pub share_price: Amount,
    pub strategy_focus: String,
    /// `true` once the first deposit has seeded the vault.
    pub initialized: bool,
    pub paused: bool,
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Capabilities a vault is built with. The ledger, clock, and registry are
/// shared across a deployment; the strategy directory belongs to one vault.
#[derive(Clone)]
pub struct VaultContext {
    /// Moves the base asset in and out.
    pub assets: Arc<dyn AssetLedger>,
    /// Current block height, for deadlines.
    pub clock: Arc<dyn BlockClock>,
    /// This vault's strategy capabilities by address.
    pub strategies: Arc<StrategyDirectory>,
    /// Read-only strategy registry the vault reports whitelist changes to.
    pub registry: Arc<VaultRegistry>,
    /// Bound on every outbound call.
    pub call_timeout: Duration,
}

impl std::fmt::Debug for VaultContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultContext")
            .field("strategies", &self.strategies)
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// A single vault instance.
#[derive(Debug)]
pub struct Vault {
    config: VaultConfig,
    ctx: VaultContext,
    state: Mutex<VaultState>,
}

impl Vault {
    /// Creates an empty, active vault owned by `owner`.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: VaultConfig, owner: Principal, ctx: VaultContext) -> VaultResult<Self> {
        config.validate()?;
        let state = VaultState::new(owner, config.performance_fee_bps, config.back_dead_shares);
        info!(
            vault = %config.id,
            tier = %config.tier,
            fee_bps = config.performance_fee_bps,
            "vault created"
        );
        Ok(Self {
            config,
            ctx,
            state: Mutex::new(state),
        })
    }

    /// The vault's identifier.
    pub fn id(&self) -> &VaultId {
        &self.config.id
    }

    /// Capabilities this vault resolves strategy addresses to.
    pub fn strategies(&self) -> &Arc<StrategyDirectory> {
        &self.ctx.strategies
    }

    /// The configuration this vault was created with. The live fee may
    /// differ; see [`Vault::get_performance_fee`].
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Deposit / Withdraw
    // -----------------------------------------------------------------------

    /// Deposits `amount` for `caller` and returns the shares minted.
    ///
    /// The first deposit must be at least the configured minimum, mints
    /// shares 1:1, and seeds the dead shares.
    ///
    /// # Errors
    ///
    /// [`VaultError::ZeroAmount`], [`VaultError::Paused`],
    /// [`VaultError::MinimumFirstDeposit`], [`VaultError::NotAuthorized`] for
    /// the burn sink, [`VaultError::TransferFailed`] if the asset ledger
    /// refuses, or [`VaultError::ArithmeticOverflow`].
    pub async fn deposit(&self, caller: &Principal, amount: Amount) -> VaultResult<Amount> {
        let mut state = self.state.lock().await;
        let plan = state
            .plan_deposit(caller, amount, self.config.min_first_deposit)
            .map_err(|e| self.rejected("deposit", caller, e))?;

        self.bounded_transfer(self.ctx.assets.transfer_in(caller, amount))
            .await?;

        state.commit_deposit(caller, &plan)?;
        info!(
            vault = %self.config.id,
            caller = %caller,
            amount,
            shares = plan.shares,
            bootstrap = plan.bootstrap,
            "deposit committed"
        );
        Ok(plan.shares)
    }

    /// What redeeming `shares` would pay right now. Read-only.
    pub async fn preview_withdraw(&self, shares: Amount) -> VaultResult<WithdrawPreview> {
        let state = self.state.lock().await;
        let r = state.redemption(shares)?;
        Ok(WithdrawPreview {
            gross: r.gross,
            fee: r.fee,
            net: r.net,
            current_block: self.ctx.clock.block_height(),
        })
    }

    /// Redeems `shares` for `caller` and returns the net assets paid out.
    ///
    /// `deadline` is a block height; the call fails once the current height
    /// is past it. The call also fails if the net payout would be below
    /// `min_assets_out`.
    ///
    /// # Errors
    ///
    /// [`VaultError::ZeroAmount`], [`VaultError::Paused`],
    /// [`VaultError::DeadlinePassed`], [`VaultError::InsufficientShares`],
    /// [`VaultError::SlippageExceeded`], [`VaultError::InsufficientLiquidity`]
    /// when too much capital is deployed, or [`VaultError::TransferFailed`].
    pub async fn withdraw(
        &self,
        caller: &Principal,
        shares: Amount,
        min_assets_out: Amount,
        deadline: u64,
    ) -> VaultResult<Amount> {
        let mut state = self.state.lock().await;
        let current_block = self.ctx.clock.block_height();
        let plan = state
            .plan_withdraw(caller, shares, min_assets_out, deadline, current_block)
            .map_err(|e| self.rejected("withdraw", caller, e))?;

        let net = plan.redemption.net;
        self.bounded_transfer(self.ctx.assets.transfer_out(caller, net))
            .await?;

        state.commit_withdraw(caller, &plan)?;
        info!(
            vault = %self.config.id,
            caller = %caller,
            shares,
            gross = plan.redemption.gross,
            fee = plan.redemption.fee,
            net,
            "withdraw committed"
        );
        Ok(net)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Idle plus allocated assets.
    pub async fn get_total_assets(&self) -> Amount {
        self.state.lock().await.total_assets
    }

    /// All outstanding shares, dead shares included.
    pub async fn get_total_supply(&self) -> Amount {
        self.state.lock().await.shares.total_supply()
    }

    /// Price of one share in micro-units; `SCALE` for an empty vault.
    pub async fn get_share_price(&self) -> VaultResult<Amount> {
        self.state.lock().await.share_price()
    }

    /// Share balance of `holder`.
    pub async fn get_balance_of(&self, holder: &Principal) -> Amount {
        self.state.lock().await.shares.balance_of(holder)
    }

    pub async fn is_paused(&self) -> bool {
        self.state.lock().await.access.is_paused()
    }

    pub async fn is_strategy_whitelisted(&self, strategy: &Principal) -> bool {
        self.state.lock().await.access.is_whitelisted(strategy)
    }

    /// Name of the share token.
    pub fn get_name(&self) -> &str {
        &self.config.share_name
    }

    /// Ticker of the share token.
    pub fn get_symbol(&self) -> &str {
        &self.config.symbol
    }

    /// Display summary.
    pub async fn get_vault_info(&self) -> VaultResult<VaultInfo> {
        let state = self.state.lock().await;
        Ok(VaultInfo {
            name: self.config.name.clone(),
            symbol: self.config.symbol.clone(),
            target_apy: self.config.target_apy.clone(),
            risk_score: self.config.risk_score,
            total_assets: state.total_assets,
            total_supply: state.shares.total_supply(),
            share_price: state.share_price()?,
            strategy_focus: self.config.strategy_focus.clone(),
            initialized: state.shares.is_seeded(),
            paused: state.access.is_paused(),
        })
    }

    /// Assets physically held by the vault: idle balance plus accrued fees.
    pub async fn get_vault_balance(&self) -> VaultResult<Amount> {
        let state = self.state.lock().await;
        state.idle_balance()?.safe_add(state.accrued_fees)
    }

    /// `total_assets - Σ allocations`.
    pub async fn get_idle_balance(&self) -> VaultResult<Amount> {
        self.state.lock().await.idle_balance()
    }

    /// Capital deployed in `strategy`.
    pub async fn get_strategy_allocation(&self, strategy: &Principal) -> Amount {
        self.state.lock().await.allocator.allocated(strategy)
    }

    /// `(strategy, allocation)` for every strategy holding capital.
    pub async fn get_allocations(&self) -> Vec<(Principal, Amount)> {
        self.state
            .lock()
            .await
            .allocator
            .allocations()
            .map(|(p, a)| (p.clone(), a))
            .collect()
    }

    /// Fees retained and not yet collected.
    pub async fn get_accrued_fees(&self) -> Amount {
        self.state.lock().await.accrued_fees
    }

    pub async fn get_active_strategy(&self) -> Option<Principal> {
        self.state.lock().await.access.active_strategy().cloned()
    }

    pub async fn get_owner(&self) -> Principal {
        self.state.lock().await.access.owner().clone()
    }

    /// The live performance fee in bps.
    pub async fn get_performance_fee(&self) -> u16 {
        self.state.lock().await.performance_fee_bps
    }

    /// Number of holders with a non-zero balance, excluding the burn sink.
    pub async fn get_holder_count(&self) -> usize {
        self.state.lock().await.shares.holder_count()
    }

    /// Rechecks the ledger and allocation invariants.
    pub async fn is_consistent(&self) -> bool {
        self.state.lock().await.is_consistent()
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn bounded_transfer<F>(&self, call: F) -> VaultResult<()>
    where
        F: Future<Output = Result<(), TransferError>>,
    {
        match tokio::time::timeout(self.ctx.call_timeout, call).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(VaultError::TransferFailed(e.to_string())),
            Err(_) => Err(VaultError::TransferFailed(format!(
                "timed out after {:?}",
                self.ctx.call_timeout
            ))),
        }
    }

    fn rejected(&self, operation: &str, caller: &Principal, err: VaultError) -> VaultError {
        debug!(
            vault = %self.config.id,
            caller = %caller,
            operation,
            code = err.code(),
            "rejected: {}",
            err
        );
        err
    }
}
