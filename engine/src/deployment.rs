//! # Deployment
//!
//! Stands up a set of vaults from a [`DeploymentConfig`]. The vaults share
//! one registry, one asset ledger, and one clock. Each keeps its own lock,
//! its own books, and its own strategy directory, so a capability attached
//! to one vault answers to that vault alone.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::clock::BlockClock;
use crate::config::{DeploymentConfig, VaultTier};
use crate::error::VaultResult;
use crate::registry::VaultRegistry;
use crate::strategy::{MemoryStrategy, StrategyDirectory};
use crate::transfer::AssetLedger;
use crate::types::{Principal, VaultId};
use crate::vault::{Vault, VaultContext};

/// A running set of vaults.
#[derive(Debug)]
pub struct Deployment {
    config: DeploymentConfig,
    vaults: Vec<Arc<Vault>>,
    index: HashMap<String, usize>,
    registry: Arc<VaultRegistry>,
    memory_strategies: HashMap<(VaultId, Principal), Arc<MemoryStrategy>>,
}

impl Deployment {
    /// Validates `config` and creates every vault it lists.
    ///
    /// Every vault gets one in-process [`MemoryStrategy`] per configured
    /// strategy address, so yield credited for one vault can only be
    /// reported to that vault. The strategy manager is bound to the balanced
    /// vault if there is one, otherwise to the first vault.
    pub fn from_config(
        config: DeploymentConfig,
        assets: Arc<dyn AssetLedger>,
        clock: Arc<dyn BlockClock>,
    ) -> VaultResult<Self> {
        config.validate()?;

        let registry = Arc::new(VaultRegistry::new());

        let mut vaults = Vec::with_capacity(config.vaults.len());
        let mut index = HashMap::new();
        let mut memory_strategies = HashMap::new();
        for vault_config in &config.vaults {
            let strategies = Arc::new(StrategyDirectory::new());
            for address in &config.strategies {
                let strategy = Arc::new(MemoryStrategy::new());
                strategies.attach(address.clone(), strategy.clone());
                memory_strategies.insert((vault_config.id.clone(), address.clone()), strategy);
            }
            let ctx = VaultContext {
                assets: assets.clone(),
                clock: clock.clone(),
                strategies,
                registry: registry.clone(),
                call_timeout: config.strategy_call_timeout(),
            };
            index.insert(vault_config.id.clone(), vaults.len());
            vaults.push(Arc::new(Vault::new(
                vault_config.clone(),
                config.owner.clone(),
                ctx,
            )?));
        }

        let managed = config
            .vaults
            .iter()
            .find(|v| v.tier == VaultTier::Balanced)
            .or_else(|| config.vaults.first());
        if let Some(vault) = managed {
            registry.bind_manager(config.strategy_manager_id.clone(), vault.id.clone());
        }

        info!(
            vaults = vaults.len(),
            strategies = config.strategies.len(),
            owner = %config.owner,
            "deployment ready"
        );

        Ok(Self {
            config,
            vaults,
            index,
            registry,
            memory_strategies,
        })
    }

    /// The vault with identifier `id`.
    pub fn vault(&self, id: &str) -> Option<&Arc<Vault>> {
        self.index.get(id).and_then(|i| self.vaults.get(*i))
    }

    /// Every vault, in configuration order.
    pub fn vaults(&self) -> &[Arc<Vault>] {
        &self.vaults
    }

    /// The shared strategy registry.
    pub fn registry(&self) -> &Arc<VaultRegistry> {
        &self.registry
    }

    /// The strategy directory of vault `id`. Attach external capabilities
    /// here.
    pub fn strategies(&self, id: &str) -> Option<&Arc<StrategyDirectory>> {
        self.vault(id).map(|v| v.strategies())
    }

    /// The in-process strategy serving `address` for vault `id`, if the
    /// address was configured.
    pub fn memory_strategy(&self, id: &str, address: &Principal) -> Option<&Arc<MemoryStrategy>> {
        self.memory_strategies.get(&(id.to_string(), address.clone()))
    }

    /// The configuration the deployment was built from.
    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }
}
