//! # Vault Registry (Strategy Manager)
//!
//! A read-only view of which strategies each vault knows about, and which
//! vault each strategy manager is bound to.
//!
//! Callers never write to the registry. Vaults record whitelist changes
//! here as part of committing them, so the registry always reflects the
//! last committed whitelist of every vault without anyone taking a vault
//! lock to answer a display query.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::types::{Principal, VaultId};

/// One strategy as seen by one vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyRecord {
    /// The vault.
    pub vault: VaultId,
    /// The strategy address.
    pub strategy: Principal,
    /// Current whitelist status.
    pub whitelisted: bool,
}

/// Strategy-manager registry shared by a deployment.
#[derive(Debug, Default)]
pub struct VaultRegistry {
    managers: RwLock<HashMap<String, VaultId>>,
    strategies: RwLock<BTreeMap<(VaultId, Principal), bool>>,
}

impl VaultRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `manager_id` to `vault`.
    pub fn bind_manager(&self, manager_id: impl Into<String>, vault: VaultId) {
        self.managers.write().insert(manager_id.into(), vault);
    }

    /// Records a committed whitelist change. Called by the vault only.
    pub(crate) fn record_whitelist(&self, vault: &str, strategy: &Principal, enabled: bool) {
        self.strategies
            .write()
            .insert((vault.to_string(), strategy.clone()), enabled);
    }

    /// Distinct strategy addresses ever registered with any vault, whether
    /// or not they are still whitelisted.
    pub fn get_strategy_count(&self) -> usize {
        self.strategies
            .read()
            .keys()
            .map(|(_, strategy)| strategy)
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Whether `vault` currently whitelists `strategy`.
    pub fn is_whitelisted(&self, vault: &str, strategy: &Principal) -> bool {
        self.strategies
            .read()
            .get(&(vault.to_string(), strategy.clone()))
            .copied()
            .unwrap_or(false)
    }

    /// The vault bound to `manager_id`.
    pub fn get_vault(&self, manager_id: &str) -> Option<VaultId> {
        self.managers.read().get(manager_id).cloned()
    }

    /// Every strategy `vault` has ever registered, in address order.
    pub fn strategies_for(&self, vault: &str) -> Vec<StrategyRecord> {
        self.strategies
            .read()
            .iter()
            .filter(|((v, _), _)| v == vault)
            .map(|((v, s), whitelisted)| StrategyRecord {
                vault: v.clone(),
                strategy: s.clone(),
                whitelisted: *whitelisted,
            })
            .collect()
    }

    /// Every record across all vaults.
    pub fn records(&self) -> Vec<StrategyRecord> {
        self.strategies
            .read()
            .iter()
            .map(|((v, s), whitelisted)| StrategyRecord {
                vault: v.clone(),
                strategy: s.clone(),
                whitelisted: *whitelisted,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manager_binding_round_trips() {
        let reg = VaultRegistry::new();
        assert!(reg.get_vault("strategy-manager-v2").is_none());
        reg.bind_manager("strategy-manager-v2", "vault-stx-v2".into());
        assert_eq!(
            reg.get_vault("strategy-manager-v2").as_deref(),
            Some("vault-stx-v2")
        );
    }

    #[test]
    fn strategy_count_counts_distinct_addresses() {
        let reg = VaultRegistry::new();
        let zest = Principal::from("strategy-zest-v1");
        let alex = Principal::from("strategy-alex-stx-usda");
        reg.record_whitelist("vault-growth", &zest, true);
        reg.record_whitelist("vault-stx-v2", &zest, true);
        reg.record_whitelist("vault-growth", &alex, true);
        reg.record_whitelist("vault-growth", &alex, false);
        assert_eq!(reg.get_strategy_count(), 2);
    }

    #[test]
    fn whitelist_status_is_per_vault() {
        let reg = VaultRegistry::new();
        let zest = Principal::from("strategy-zest-v1");
        reg.record_whitelist("vault-growth", &zest, true);
        assert!(reg.is_whitelisted("vault-growth", &zest));
        assert!(!reg.is_whitelisted("vault-conservative", &zest));

        reg.record_whitelist("vault-growth", &zest, false);
        assert!(!reg.is_whitelisted("vault-growth", &zest));
        assert_eq!(reg.strategies_for("vault-growth").len(), 1);
    }
}
