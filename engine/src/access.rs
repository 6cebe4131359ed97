//! # Access Control
//!
//! Owner, pause switch, and strategy whitelist for one vault.
//!
//! ## State Machine
//!
//! ```text
//!    ┌──────────┐   pause (owner)   ┌──────────┐
//!    │  Active  │ ────────────────► │  Paused  │
//!    └──────────┘ ◄──────────────── └──────────┘
//!                   resume (owner)
//! ```
//!
//! Both transitions are owner-only and idempotent: pausing a paused vault
//! succeeds and changes nothing. There are no automatic transitions.
//!
//! Every method checks first and writes last, so an `Err` means nothing
//! moved.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};
use crate::types::Principal;

/// Whether the vault accepts state-mutating calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultStatus {
    /// Normal operation.
    Active,
    /// Kill switch engaged. Only emergency recalls and admin calls go through.
    Paused,
}

impl std::fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VaultStatus::Active => write!(f, "Active"),
            VaultStatus::Paused => write!(f, "Paused"),
        }
    }
}

/// Owner, status, and strategy permissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessControl {
    owner: Principal,
    status: VaultStatus,
    whitelisted_strategies: BTreeSet<Principal>,
    active_strategy: Option<Principal>,
}

impl AccessControl {
    /// Starts `Active`, owned by `owner`, with an empty whitelist.
    pub fn new(owner: Principal) -> Self {
        Self {
            owner,
            status: VaultStatus::Active,
            whitelisted_strategies: BTreeSet::new(),
            active_strategy: None,
        }
    }

    /// Fails with [`VaultError::NotAuthorized`] unless `caller` is the owner.
    pub fn require_owner(&self, caller: &Principal) -> VaultResult<()> {
        if *caller != self.owner {
            return Err(VaultError::NotAuthorized {
                caller: caller.clone(),
            });
        }
        Ok(())
    }

    /// Fails with [`VaultError::Paused`] while the kill switch is engaged.
    pub fn require_active(&self) -> VaultResult<()> {
        match self.status {
            VaultStatus::Active => Ok(()),
            VaultStatus::Paused => Err(VaultError::Paused),
        }
    }

    /// Engages the kill switch. Idempotent.
    pub fn pause(&mut self, caller: &Principal) -> VaultResult<()> {
        self.require_owner(caller)?;
        self.status = VaultStatus::Paused;
        Ok(())
    }

    /// Releases the kill switch. Idempotent.
    pub fn resume(&mut self, caller: &Principal) -> VaultResult<()> {
        self.require_owner(caller)?;
        self.status = VaultStatus::Active;
        Ok(())
    }

    /// Adds or removes `strategy` from the whitelist.
    ///
    /// Removing the active strategy also clears the active slot.
    pub fn whitelist_strategy(
        &mut self,
        caller: &Principal,
        strategy: &Principal,
        enabled: bool,
    ) -> VaultResult<()> {
        self.require_owner(caller)?;
        if enabled {
            self.whitelisted_strategies.insert(strategy.clone());
        } else {
            self.whitelisted_strategies.remove(strategy);
            if self.active_strategy.as_ref() == Some(strategy) {
                self.active_strategy = None;
            }
        }
        Ok(())
    }

    /// Fails with [`VaultError::StrategyNotWhitelisted`] unless `strategy`
    /// is on the whitelist.
    pub fn require_whitelisted(&self, strategy: &Principal) -> VaultResult<()> {
        if !self.whitelisted_strategies.contains(strategy) {
            return Err(VaultError::StrategyNotWhitelisted(strategy.clone()));
        }
        Ok(())
    }

    /// Marks a whitelisted strategy as the active one.
    pub fn set_active_strategy(
        &mut self,
        caller: &Principal,
        strategy: &Principal,
    ) -> VaultResult<()> {
        self.require_owner(caller)?;
        self.require_whitelisted(strategy)?;
        self.active_strategy = Some(strategy.clone());
        Ok(())
    }

    /// Hands ownership to `new_owner`. Takes effect immediately.
    pub fn transfer_owner(&mut self, caller: &Principal, new_owner: Principal) -> VaultResult<()> {
        self.require_owner(caller)?;
        self.owner = new_owner;
        Ok(())
    }

    /// Current owner.
    pub fn owner(&self) -> &Principal {
        &self.owner
    }

    /// Current status.
    pub fn status(&self) -> VaultStatus {
        self.status
    }

    /// `true` while paused.
    pub fn is_paused(&self) -> bool {
        self.status == VaultStatus::Paused
    }

    /// `true` if `strategy` is whitelisted.
    pub fn is_whitelisted(&self, strategy: &Principal) -> bool {
        self.whitelisted_strategies.contains(strategy)
    }

    /// Whitelisted strategies in address order.
    pub fn whitelisted(&self) -> impl Iterator<Item = &Principal> {
        self.whitelisted_strategies.iter()
    }

    /// The active strategy, if one is set.
    pub fn active_strategy(&self) -> Option<&Principal> {
        self.active_strategy.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Principal {
        Principal::from("owner")
    }

    fn stranger() -> Principal {
        Principal::from("stranger")
    }

    #[test]
    fn starts_active_with_empty_whitelist() {
        let acl = AccessControl::new(owner());
        assert_eq!(acl.status(), VaultStatus::Active);
        assert_eq!(acl.whitelisted().count(), 0);
        assert!(acl.active_strategy().is_none());
    }

    #[test]
    fn pause_and_resume_are_idempotent() {
        let mut acl = AccessControl::new(owner());
        acl.pause(&owner()).unwrap();
        acl.pause(&owner()).unwrap();
        assert!(acl.is_paused());
        assert_eq!(acl.require_active(), Err(VaultError::Paused));

        acl.resume(&owner()).unwrap();
        acl.resume(&owner()).unwrap();
        assert!(!acl.is_paused());
        acl.require_active().unwrap();
    }

    #[test]
    fn non_owner_cannot_toggle_pause() {
        let mut acl = AccessControl::new(owner());
        assert_eq!(acl.pause(&stranger()).unwrap_err().code(), 401);
        assert!(!acl.is_paused());

        acl.pause(&owner()).unwrap();
        assert_eq!(acl.resume(&stranger()).unwrap_err().code(), 401);
        assert!(acl.is_paused());
    }

    #[test]
    fn active_strategy_requires_whitelist() {
        let mut acl = AccessControl::new(owner());
        let zest = Principal::from("strategy-zest-v1");
        assert_eq!(
            acl.set_active_strategy(&owner(), &zest),
            Err(VaultError::StrategyNotWhitelisted(zest.clone()))
        );

        acl.whitelist_strategy(&owner(), &zest, true).unwrap();
        acl.set_active_strategy(&owner(), &zest).unwrap();
        assert_eq!(acl.active_strategy(), Some(&zest));
    }

    #[test]
    fn delisting_clears_active_strategy() {
        let mut acl = AccessControl::new(owner());
        let bitflow = Principal::from("strategy-bitflow-v1");
        acl.whitelist_strategy(&owner(), &bitflow, true).unwrap();
        acl.set_active_strategy(&owner(), &bitflow).unwrap();

        acl.whitelist_strategy(&owner(), &bitflow, false).unwrap();
        assert!(!acl.is_whitelisted(&bitflow));
        assert!(acl.active_strategy().is_none());
    }

    #[test]
    fn non_owner_cannot_whitelist() {
        let mut acl = AccessControl::new(owner());
        let s = Principal::from("s");
        assert!(acl.whitelist_strategy(&stranger(), &s, true).is_err());
        assert!(!acl.is_whitelisted(&s));
    }

    #[test]
    fn ownership_transfer_is_immediate() {
        let mut acl = AccessControl::new(owner());
        acl.transfer_owner(&owner(), stranger()).unwrap();
        assert_eq!(acl.owner(), &stranger());
        assert!(acl.pause(&owner()).is_err());
        acl.pause(&stranger()).unwrap();
    }
}
