//! # Shared Types
//!
//! Principals and amount aliases used by every other module.

use serde::{Deserialize, Serialize};

use crate::config::BURN_SINK_ADDRESS;

/// An amount of base asset or shares, in micro-units (10⁻⁶).
pub type Amount = u128;

/// Identifier of a vault within a deployment (e.g. `"vault-growth"`).
pub type VaultId = String;

/// An account on the external ledger: a wallet, a contract, or a strategy.
///
/// Principals are opaque to the engine. Authentication happens upstream, so
/// by the time a `Principal` reaches a vault operation it is trusted to be
/// the real caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Wraps an address string.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The unspendable address that owns the dead shares.
    pub fn burn_sink() -> Self {
        Self(BURN_SINK_ADDRESS.to_string())
    }

    /// Returns `true` for the burn sink.
    pub fn is_burn_sink(&self) -> bool {
        self.0 == BURN_SINK_ADDRESS
    }

    /// The underlying address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for Principal {
    fn from(address: String) -> Self {
        Self(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burn_sink_is_recognized() {
        assert!(Principal::burn_sink().is_burn_sink());
        assert!(!Principal::from("ST1SJ3DTE5DN7X54YDH5D64R3BCB6A2AG2ZQ8YPD5").is_burn_sink());
    }

    #[test]
    fn serializes_as_plain_string() {
        let p = Principal::from("ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG");
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG\"");
        let back: Principal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
