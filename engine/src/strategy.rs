//! # Strategy Capability
//!
//! A strategy is anything that takes idle capital, does something with it,
//! and later reports a profit. The engine never knows what that something
//! is. The allocator depends on the [`Strategy`] trait alone, and concrete
//! strategies are looked up by address in a [`StrategyDirectory`].
//!
//! Whitelisting and attachment are separate concerns: the whitelist (in
//! [`crate::access`]) says a vault *may* use an address; the directory says
//! which capability *answers* at that address.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use crate::types::{Amount, Principal};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors a strategy capability can return.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    /// The strategy refused the call.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Withdrawal larger than what the strategy holds.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        /// Amount the vault asked for.
        requested: Amount,
        /// Amount the strategy holds.
        available: Amount,
    },

    /// The strategy is temporarily unreachable.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// The interface every yield strategy exposes to a vault.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Accept `amount` of capital from the vault.
    async fn deposit(&self, amount: Amount) -> Result<(), StrategyError>;

    /// Return `amount` of capital to the vault.
    async fn withdraw(&self, amount: Amount) -> Result<(), StrategyError>;

    /// Realize profit since the last report and hand at most `max` of it to
    /// the vault. Anything above `max` stays with the strategy for a later
    /// report.
    async fn report_yield(&self, max: Amount) -> Result<Amount, StrategyError>;
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// Address → capability map. Each vault owns one.
#[derive(Default)]
pub struct StrategyDirectory {
    strategies: RwLock<HashMap<Principal, Arc<dyn Strategy>>>,
}

impl StrategyDirectory {
    /// An empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `strategy` at `address`, replacing whatever was there.
    pub fn attach(&self, address: Principal, strategy: Arc<dyn Strategy>) {
        tracing::debug!(strategy = %address, "strategy capability attached");
        self.strategies.write().insert(address, strategy);
    }

    /// Detaches the capability at `address`.
    pub fn detach(&self, address: &Principal) -> Option<Arc<dyn Strategy>> {
        self.strategies.write().remove(address)
    }

    /// The capability at `address`, if any.
    pub fn resolve(&self, address: &Principal) -> Option<Arc<dyn Strategy>> {
        self.strategies.read().get(address).cloned()
    }

    /// Number of attached capabilities.
    pub fn len(&self) -> usize {
        self.strategies.read().len()
    }

    /// `true` if nothing is attached.
    pub fn is_empty(&self) -> bool {
        self.strategies.read().is_empty()
    }
}

impl std::fmt::Debug for StrategyDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut addresses: Vec<_> = self.strategies.read().keys().cloned().collect();
        addresses.sort();
        f.debug_struct("StrategyDirectory")
            .field("strategies", &addresses)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// In-process reference strategy
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryStrategyState {
    deployed: Amount,
    pending_yield: Amount,
    failing: Option<String>,
}

/// A strategy that holds capital in memory and pays out whatever yield has
/// been credited to it with [`MemoryStrategy::accrue`].
///
/// Used by the node's simulated deployment and by tests. It can be switched
/// into a failing mode to exercise the vault's failure isolation.
#[derive(Debug, Default)]
pub struct MemoryStrategy {
    state: Mutex<MemoryStrategyState>,
}

impl MemoryStrategy {
    /// A strategy with nothing deployed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `amount` of profit to be paid out on the next report.
    pub fn accrue(&self, amount: Amount) {
        let mut state = self.state.lock();
        state.pending_yield = state.pending_yield.saturating_add(amount);
    }

    /// Makes every subsequent call fail with `reason`, or clears the failure.
    pub fn set_failing(&self, reason: Option<&str>) {
        self.state.lock().failing = reason.map(str::to_string);
    }

    /// Capital currently held on behalf of the vault.
    pub fn deployed(&self) -> Amount {
        self.state.lock().deployed
    }

    /// Profit waiting for the next report.
    pub fn pending_yield(&self) -> Amount {
        self.state.lock().pending_yield
    }
}

#[async_trait]
impl Strategy for MemoryStrategy {
    async fn deposit(&self, amount: Amount) -> Result<(), StrategyError> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.failing {
            return Err(StrategyError::Rejected(reason.clone()));
        }
        state.deployed = state
            .deployed
            .checked_add(amount)
            .ok_or_else(|| StrategyError::Rejected("deposit overflow".into()))?;
        Ok(())
    }

    async fn withdraw(&self, amount: Amount) -> Result<(), StrategyError> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.failing {
            return Err(StrategyError::Rejected(reason.clone()));
        }
        if amount > state.deployed {
            return Err(StrategyError::InsufficientFunds {
                requested: amount,
                available: state.deployed,
            });
        }
        state.deployed -= amount;
        Ok(())
    }

    async fn report_yield(&self, max: Amount) -> Result<Amount, StrategyError> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.failing {
            return Err(StrategyError::Unavailable(reason.clone()));
        }
        let paid = state.pending_yield.min(max);
        state.pending_yield -= paid;
        Ok(paid)
    }
}
