//! # Asset Transfer Capability
//!
//! Moving the base asset in and out of a vault is somebody else's job. The
//! engine only asks an [`AssetLedger`] to pull a deposit from a wallet or
//! push a payout to one, and commits its own books after the ledger says
//! yes.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;

use crate::types::{Amount, Principal};

/// Errors from the asset ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The sending wallet cannot cover the transfer.
    #[error("insufficient balance for {owner}: has {balance}, needs {amount}")]
    InsufficientBalance {
        /// Wallet being debited.
        owner: Principal,
        /// Its balance.
        balance: Amount,
        /// The transfer amount.
        amount: Amount,
    },

    /// Crediting would overflow the recipient's balance.
    #[error("balance overflow for {0}")]
    Overflow(Principal),

    /// The ledger refused for its own reasons.
    #[error("ledger rejected transfer: {0}")]
    Rejected(String),
}

/// Moves the base asset between wallets and a vault's custody.
#[async_trait]
pub trait AssetLedger: Send + Sync {
    /// Pull `amount` from `from` into the vault.
    async fn transfer_in(&self, from: &Principal, amount: Amount) -> Result<(), TransferError>;

    /// Push `amount` from the vault to `to`.
    async fn transfer_out(&self, to: &Principal, amount: Amount) -> Result<(), TransferError>;
}

/// Wallet balances kept in memory. Deposits debit the wallet, payouts
/// credit it; custody itself is accounted for by the vault.
#[derive(Debug, Default)]
pub struct MemoryAssetLedger {
    balances: RwLock<HashMap<Principal, Amount>>,
}

impl MemoryAssetLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `amount` to `owner` out of thin air. Test and simulation only.
    pub fn fund(&self, owner: &Principal, amount: Amount) {
        let mut balances = self.balances.write();
        let entry = balances.entry(owner.clone()).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Wallet balance of `owner`.
    pub fn balance_of(&self, owner: &Principal) -> Amount {
        self.balances.read().get(owner).copied().unwrap_or(0)
    }
}

#[async_trait]
impl AssetLedger for MemoryAssetLedger {
    async fn transfer_in(&self, from: &Principal, amount: Amount) -> Result<(), TransferError> {
        let mut balances = self.balances.write();
        let balance = balances.get(from).copied().unwrap_or(0);
        if balance < amount {
            return Err(TransferError::InsufficientBalance {
                owner: from.clone(),
                balance,
                amount,
            });
        }
        balances.insert(from.clone(), balance - amount);
        Ok(())
    }

    async fn transfer_out(&self, to: &Principal, amount: Amount) -> Result<(), TransferError> {
        let mut balances = self.balances.write();
        let balance = balances.get(to).copied().unwrap_or(0);
        let updated = balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow(to.clone()))?;
        balances.insert(to.clone(), updated);
        Ok(())
    }
}
