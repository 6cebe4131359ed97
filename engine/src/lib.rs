// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # SNP Vault Engine
//!
//! The accounting core behind the SNP yield vaults. Depositors hand the
//! vault STX, the vault hands back shares, and the shares are redeemable for
//! a proportional slice of whatever the vault owns, idle or deployed into a
//! strategy, net of the performance fee.
//!
//! It is a small ledger facing adversarial input. Rounding, first-depositor
//! inflation, fee math and half-applied state changes all end up as somebody
//! else's money, so the engine is built around three habits:
//!
//! 1. All amounts are `u128` micro-units. Conversions round down, in the
//!    vault's favor, through a 256-bit intermediate.
//! 2. Every mutating operation builds a plan first, performs its outbound
//!    call second, and commits last. Failure at any step leaves the vault
//!    exactly as it was.
//! 3. One mutex per vault, held for the whole operation, including the
//!    awaits on strategy and transfer capabilities.
//!
//! ## Architecture
//!
//! - **math** — fixed-point share/asset conversion and fee math.
//! - **access** — owner, pause switch, strategy whitelist.
//! - **ledger** — share balances, total supply, dead shares.
//! - **allocator** — per-strategy capital allocations.
//! - **vault** — deposit, withdraw, preview, harvest, recall.
//! - **registry** — read-only strategy manager view across vaults.
//! - **strategy / transfer / clock** — capability seams to the outside world.
//! - **deployment** — wires the three risk tiers together.
//! - **config** — constants and tier presets.

pub mod access;
pub mod allocator;
pub mod clock;
pub mod config;
pub mod deployment;
pub mod error;
pub mod ledger;
pub mod math;
pub mod registry;
pub mod strategy;
pub mod transfer;
pub mod types;
pub mod vault;

pub use config::{DeploymentConfig, VaultConfig, VaultTier};
pub use deployment::Deployment;
pub use error::{VaultError, VaultResult};
pub use types::{Amount, Principal, VaultId};
pub use vault::{Vault, VaultContext, VaultInfo, WithdrawPreview};
