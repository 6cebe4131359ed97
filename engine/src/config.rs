//! # Engine Configuration & Constants
//!
//! Every magic number the vaults depend on lives here, along with the three
//! risk-tier presets and the deployment file format the node loads.
//!
//! Changing a constant after vaults are seeded changes what existing shares
//! are worth. Treat this file as part of the ledger.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};
use crate::types::{Amount, Principal, VaultId};

// ---------------------------------------------------------------------------
// Fixed-Point Parameters
// ---------------------------------------------------------------------------

/// One whole unit of the base asset in micro-units. Share price uses the
/// same scale, so `SCALE` is a price of exactly 1.0.
pub const SCALE: Amount = 1_000_000;

/// Basis-point denominator. 10_000 bps = 100%.
pub const BPS_DENOMINATOR: Amount = 10_000;

/// Upper bound on any performance fee, in bps (20%).
pub const MAX_PERFORMANCE_FEE_BPS: u16 = 2_000;

// ---------------------------------------------------------------------------
// Bootstrap Parameters
// ---------------------------------------------------------------------------

/// Shares minted once to the burn sink on the first deposit.
pub const DEAD_SHARES: Amount = 1_000;

/// Default floor for the first deposit: 1000 STX.
pub const DEFAULT_MIN_FIRST_DEPOSIT: Amount = 1_000 * SCALE;

/// The Stacks burn address. Nobody holds its key, which is the point.
pub const BURN_SINK_ADDRESS: &str = "SP000000000000000000002Q6VF78";

// ---------------------------------------------------------------------------
// Capability Calls
// ---------------------------------------------------------------------------

/// Bound on any single strategy or transfer call.
pub const DEFAULT_STRATEGY_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Default strategy-manager identifier for a deployment.
pub const DEFAULT_STRATEGY_MANAGER_ID: &str = "strategy-manager-v2";

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

/// Default HTTP API port.
pub const DEFAULT_API_PORT: u16 = 8740;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 8742;

/// Default block interval for the node's clock, in milliseconds.
pub const DEFAULT_BLOCK_TIME_MS: u64 = 2_000;

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// Risk tier of a vault. Each tier is an independent vault instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VaultTier {
    /// Capital preservation, no performance fee.
    Conservative,
    /// Diversified, 8% fee.
    Balanced,
    /// Maximum yield, 8% fee, backed dead shares.
    Growth,
}

impl VaultTier {
    /// All tiers in display order.
    pub const ALL: [VaultTier; 3] = [
        VaultTier::Conservative,
        VaultTier::Balanced,
        VaultTier::Growth,
    ];
}

impl std::fmt::Display for VaultTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VaultTier::Conservative => write!(f, "conservative"),
            VaultTier::Balanced => write!(f, "balanced"),
            VaultTier::Growth => write!(f, "growth"),
        }
    }
}

// ---------------------------------------------------------------------------
// VaultConfig
// ---------------------------------------------------------------------------

/// Parameters of a single vault instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Identifier within the deployment, e.g. `"vault-growth"`.
    pub id: VaultId,
    /// Risk tier.
    pub tier: VaultTier,
    /// Display name of the vault.
    pub name: String,
    /// Name of the share token.
    pub share_name: String,
    /// Ticker of the share token.
    pub symbol: String,
    /// Marketing APY range, display only.
    pub target_apy: String,
    /// Risk score from 1 (lowest) to 5.
    pub risk_score: u8,
    /// One-line strategy description, display only.
    pub strategy_focus: String,
    /// Performance fee in basis points.
    pub performance_fee_bps: u16,
    /// Floor for the very first deposit.
    pub min_first_deposit: Amount,
    /// When set, the dead shares are backed by an equal virtual asset amount
    /// in every conversion, so the seeded share price is exactly 1.0.
    #[serde(default)]
    pub back_dead_shares: bool,
}

impl VaultConfig {
    /// The observed preset for a tier.
    pub fn for_tier(tier: VaultTier) -> Self {
        match tier {
            VaultTier::Conservative => Self {
                id: "vault-conservative".into(),
                tier,
                name: "SNP Conservative Vault".into(),
                share_name: "SNP Conservative Vault Shares".into(),
                symbol: "snSTX-CONS".into(),
                target_apy: "8-10%".into(),
                risk_score: 2,
                strategy_focus: "Capital preservation with stable, lower-risk strategies".into(),
                performance_fee_bps: 0,
                min_first_deposit: DEFAULT_MIN_FIRST_DEPOSIT,
                back_dead_shares: false,
            },
            VaultTier::Balanced => Self {
                id: "vault-stx-v2".into(),
                tier,
                name: "SNP Balanced Vault".into(),
                share_name: "SNP Balanced Vault Shares".into(),
                symbol: "snSTX-BAL".into(),
                target_apy: "12-16%".into(),
                risk_score: 3,
                strategy_focus: "Diversified yield with managed risk".into(),
                performance_fee_bps: 800,
                min_first_deposit: DEFAULT_MIN_FIRST_DEPOSIT,
                back_dead_shares: false,
            },
            VaultTier::Growth => Self {
                id: "vault-growth".into(),
                tier,
                name: "SNP Growth Vault".into(),
                share_name: "SNP Growth Vault Shares".into(),
                symbol: "snSTX-GRTH".into(),
                target_apy: "18-25%".into(),
                risk_score: 4,
                strategy_focus: "Maximum yields, higher risk tolerance".into(),
                performance_fee_bps: 800,
                min_first_deposit: DEFAULT_MIN_FIRST_DEPOSIT,
                back_dead_shares: true,
            },
        }
    }

    /// Checks the parameters that the math depends on.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidConfig`] for a fee above
    /// [`MAX_PERFORMANCE_FEE_BPS`], a zero minimum first deposit, an empty id,
    /// or a risk score outside 1..=5.
    pub fn validate(&self) -> VaultResult<()> {
        if self.id.is_empty() {
            return Err(VaultError::InvalidConfig("vault id must not be empty".into()));
        }
        if self.performance_fee_bps > MAX_PERFORMANCE_FEE_BPS {
            return Err(VaultError::InvalidConfig(format!(
                "performance fee {} bps exceeds maximum {} bps",
                self.performance_fee_bps, MAX_PERFORMANCE_FEE_BPS
            )));
        }
        if self.min_first_deposit == 0 {
            return Err(VaultError::InvalidConfig(
                "minimum first deposit must be positive".into(),
            ));
        }
        if !(1..=5).contains(&self.risk_score) {
            return Err(VaultError::InvalidConfig(format!(
                "risk score {} outside 1..=5",
                self.risk_score
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DeploymentConfig
// ---------------------------------------------------------------------------

/// Everything needed to stand up a set of vaults. Loaded from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Initial owner of every vault.
    pub owner: Principal,
    /// Identifier of the strategy manager bound to the vaults.
    #[serde(default = "default_manager_id")]
    pub strategy_manager_id: String,
    /// Bound on each strategy or transfer call, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub strategy_call_timeout_ms: u64,
    /// The vaults to create.
    pub vaults: Vec<VaultConfig>,
    /// Strategy addresses to attach an in-process capability for.
    #[serde(default)]
    pub strategies: Vec<Principal>,
}

fn default_manager_id() -> String {
    DEFAULT_STRATEGY_MANAGER_ID.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_STRATEGY_CALL_TIMEOUT.as_millis() as u64
}

impl DeploymentConfig {
    /// The three observed tiers under one owner.
    pub fn three_tier(owner: Principal) -> Self {
        Self {
            owner,
            strategy_manager_id: default_manager_id(),
            strategy_call_timeout_ms: default_timeout_ms(),
            vaults: VaultTier::ALL.iter().map(|t| VaultConfig::for_tier(*t)).collect(),
            strategies: Vec::new(),
        }
    }

    /// Reads and validates a JSON deployment file.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidConfig`] if the file cannot be read or
    /// parsed, or if any vault fails [`VaultConfig::validate`].
    pub fn load(path: &Path) -> VaultResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            VaultError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            VaultError::InvalidConfig(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every vault and rejects duplicate ids.
    pub fn validate(&self) -> VaultResult<()> {
        if self.strategy_call_timeout_ms == 0 {
            return Err(VaultError::InvalidConfig(
                "strategy call timeout must be positive".into(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for vault in &self.vaults {
            vault.validate()?;
            if !seen.insert(vault.id.as_str()) {
                return Err(VaultError::InvalidConfig(format!(
                    "duplicate vault id {}",
                    vault.id
                )));
            }
        }
        Ok(())
    }

    /// The call timeout as a `Duration`.
    pub fn strategy_call_timeout(&self) -> Duration {
        Duration::from_millis(self.strategy_call_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn tier_presets_match_observed_parameters() {
        let cons = VaultConfig::for_tier(VaultTier::Conservative);
        assert_eq!(cons.performance_fee_bps, 0);
        assert_eq!(cons.symbol, "snSTX-CONS");
        assert!(!cons.back_dead_shares);

        let bal = VaultConfig::for_tier(VaultTier::Balanced);
        assert_eq!(bal.performance_fee_bps, 800);
        assert_eq!(bal.id, "vault-stx-v2");

        let growth = VaultConfig::for_tier(VaultTier::Growth);
        assert_eq!(growth.performance_fee_bps, 800);
        assert_eq!(growth.risk_score, 4);
        assert!(growth.back_dead_shares);
    }

    #[test]
    fn presets_validate() {
        for tier in VaultTier::ALL {
            VaultConfig::for_tier(tier).validate().unwrap();
        }
    }

    #[test]
    fn excessive_fee_rejected() {
        let mut cfg = VaultConfig::for_tier(VaultTier::Growth);
        cfg.performance_fee_bps = MAX_PERFORMANCE_FEE_BPS + 1;
        assert_eq!(cfg.validate().unwrap_err().code(), 419);
    }

    #[test]
    fn duplicate_vault_ids_rejected() {
        let mut cfg = DeploymentConfig::three_tier(Principal::from("owner"));
        cfg.vaults.push(VaultConfig::for_tier(VaultTier::Growth));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_round_trips_through_file() {
        let cfg = DeploymentConfig::three_tier(Principal::from("ST1OWNER"));
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string_pretty(&cfg).unwrap().as_bytes())
            .unwrap();

        let loaded = DeploymentConfig::load(file.path()).unwrap();
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.strategy_call_timeout(), DEFAULT_STRATEGY_CALL_TIMEOUT);
    }

    #[test]
    fn load_applies_serde_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"owner":"ST1OWNER","vaults":[]}}"#).unwrap();

        let loaded = DeploymentConfig::load(file.path()).unwrap();
        assert_eq!(loaded.strategy_manager_id, DEFAULT_STRATEGY_MANAGER_ID);
        assert!(loaded.strategies.is_empty());
    }

    #[test]
    fn load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = DeploymentConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, VaultError::InvalidConfig(_)));
    }
}
