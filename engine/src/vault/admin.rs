//! Owner-only administration: kill switch, whitelist, fee, ownership, and
//! fee collection.

use tracing::info;

use super::Vault;
use crate::config::MAX_PERFORMANCE_FEE_BPS;
use crate::error::{VaultError, VaultResult};
use crate::types::{Amount, Principal};

impl Vault {
    /// Engages the kill switch. Idempotent.
    pub async fn pause(&self, caller: &Principal) -> VaultResult<()> {
        let mut state = self.state.lock().await;
        state.access.pause(caller)?;
        info!(vault = %self.config.id, caller = %caller, "vault paused");
        Ok(())
    }

    /// Releases the kill switch. Idempotent.
    pub async fn resume(&self, caller: &Principal) -> VaultResult<()> {
        let mut state = self.state.lock().await;
        state.access.resume(caller)?;
        info!(vault = %self.config.id, caller = %caller, "vault resumed");
        Ok(())
    }

    /// Adds `strategy` to the whitelist, or removes it when `enabled` is
    /// false. The change is mirrored into the deployment registry.
    pub async fn whitelist_strategy(
        &self,
        caller: &Principal,
        strategy: &Principal,
        enabled: bool,
    ) -> VaultResult<()> {
        let mut state = self.state.lock().await;
        state.access.whitelist_strategy(caller, strategy, enabled)?;
        self.ctx
            .registry
            .record_whitelist(&self.config.id, strategy, enabled);
        info!(
            vault = %self.config.id,
            strategy = %strategy,
            enabled,
            "strategy whitelist updated"
        );
        Ok(())
    }

    /// Marks a whitelisted strategy as the active one.
    pub async fn set_active_strategy(
        &self,
        caller: &Principal,
        strategy: &Principal,
    ) -> VaultResult<()> {
        let mut state = self.state.lock().await;
        state.access.set_active_strategy(caller, strategy)?;
        info!(vault = %self.config.id, strategy = %strategy, "active strategy set");
        Ok(())
    }

    /// Hands the vault to `new_owner`, effective immediately.
    pub async fn transfer_owner(&self, caller: &Principal, new_owner: Principal) -> VaultResult<()> {
        let mut state = self.state.lock().await;
        state.access.transfer_owner(caller, new_owner)?;
        info!(
            vault = %self.config.id,
            from = %caller,
            to = %state.access.owner(),
            "ownership transferred"
        );
        Ok(())
    }

    /// Changes the performance fee. Applies to withdrawals and harvests from
    /// now on; fees already accrued are unaffected.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotAuthorized`], or [`VaultError::InvalidConfig`] above
    /// [`MAX_PERFORMANCE_FEE_BPS`].
    pub async fn set_performance_fee(&self, caller: &Principal, fee_bps: u16) -> VaultResult<()> {
        let mut state = self.state.lock().await;
        state.access.require_owner(caller)?;
        if fee_bps > MAX_PERFORMANCE_FEE_BPS {
            return Err(VaultError::InvalidConfig(format!(
                "performance fee {} bps exceeds maximum {} bps",
                fee_bps, MAX_PERFORMANCE_FEE_BPS
            )));
        }
        let previous = state.performance_fee_bps;
        state.performance_fee_bps = fee_bps;
        info!(vault = %self.config.id, previous, fee_bps, "performance fee updated");
        Ok(())
    }

    /// Pays every accrued fee out to `recipient` and returns the amount.
    /// Works while paused.
    pub async fn collect_fees(&self, caller: &Principal, recipient: &Principal) -> VaultResult<Amount> {
        let mut state = self.state.lock().await;
        state.access.require_owner(caller)?;
        let fees = state.accrued_fees;
        if fees == 0 {
            return Ok(0);
        }

        self.bounded_transfer(self.ctx.assets.transfer_out(recipient, fees))
            .await?;

        state.accrued_fees = 0;
        info!(
            vault = %self.config.id,
            recipient = %recipient,
            amount = fees,
            "fees collected"
        );
        Ok(fees)
    }
}
