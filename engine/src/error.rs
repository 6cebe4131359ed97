//! # Vault Errors
//!
//! One taxonomy for everything a vault operation can reject. Every variant
//! maps to a stable numeric code so callers that speak the old contract
//! interface (`(err u403)` and friends) keep working.
//!
//! Codes are normalized across tiers: the legacy balanced vault reported
//! `104` for a paused vault where the other two reported `403`. The engine
//! reports `403` everywhere.

use thiserror::Error;

use crate::types::{Amount, Principal};

/// Result alias used throughout the engine.
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors returned by vault, allocator, and access-control operations.
///
/// A returned error always means no state was changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// A non-owner called an owner-only operation.
    #[error("not authorized: {caller} is not the vault owner")]
    NotAuthorized {
        /// The principal that attempted the call.
        caller: Principal,
    },

    /// A state-mutating call arrived while the vault is paused.
    #[error("vault is paused")]
    Paused,

    /// Deposit, withdraw, allocation, or recall of zero.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// First deposit below the configured floor.
    #[error("first deposit of {amount} is below the minimum of {minimum}")]
    MinimumFirstDeposit {
        /// The rejected deposit.
        amount: Amount,
        /// The configured floor.
        minimum: Amount,
    },

    /// Withdrawal larger than the caller's share balance.
    #[error("insufficient shares: balance {balance}, requested {requested}")]
    InsufficientShares {
        /// Caller's current share balance.
        balance: Amount,
        /// Shares the caller tried to redeem.
        requested: Amount,
    },

    /// Net proceeds fell below the caller's declared minimum.
    #[error("slippage exceeded: would receive {net}, minimum is {min_out}")]
    SlippageExceeded {
        /// What the withdrawal would have paid.
        net: Amount,
        /// What the caller demanded.
        min_out: Amount,
    },

    /// The call arrived after its expiry marker.
    #[error("deadline passed: current block {current}, deadline {deadline}")]
    DeadlinePassed {
        /// Block height at execution time.
        current: u64,
        /// The caller's deadline.
        deadline: u64,
    },

    /// Allocation or activation targeting a strategy not on the whitelist.
    #[error("strategy {0} is not whitelisted")]
    StrategyNotWhitelisted(Principal),

    /// The strategy's yield report failed or timed out.
    #[error("harvest from {strategy} failed: {reason}")]
    HarvestFailed {
        /// Strategy that was harvested.
        strategy: Principal,
        /// What went wrong.
        reason: String,
    },

    /// A computation would leave the representable range.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    /// The idle balance cannot cover the request.
    #[error("insufficient liquidity: requested {requested}, idle {idle}")]
    InsufficientLiquidity {
        /// Assets the operation needs from the idle balance.
        requested: Amount,
        /// Assets currently idle.
        idle: Amount,
    },

    /// Recall larger than what the strategy currently holds.
    #[error("insufficient allocation in {strategy}: allocated {allocated}, requested {requested}")]
    InsufficientAllocation {
        /// The strategy being recalled from.
        strategy: Principal,
        /// What the vault has deployed there.
        allocated: Amount,
        /// What the caller asked for.
        requested: Amount,
    },

    /// The strategy is whitelisted but no capability is attached to it.
    #[error("strategy {0} has no capability attached")]
    StrategyUnavailable(Principal),

    /// A strategy `deposit` or `withdraw` call failed.
    #[error("strategy {strategy} rejected {operation}: {reason}")]
    StrategyCallFailed {
        /// Strategy that was called.
        strategy: Principal,
        /// `"deposit"` or `"withdraw"`.
        operation: &'static str,
        /// The strategy's error.
        reason: String,
    },

    /// A strategy call exceeded the bounded timeout.
    #[error("strategy {strategy} timed out during {operation}")]
    StrategyTimeout {
        /// Strategy that was called.
        strategy: Principal,
        /// The operation that stalled.
        operation: &'static str,
    },

    /// The asset transfer capability rejected or timed out.
    #[error("asset transfer failed: {0}")]
    TransferFailed(String),

    /// Configuration or parameter update out of bounds.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl VaultError {
    /// Stable numeric code for this error kind.
    pub fn code(&self) -> u32 {
        match self {
            VaultError::NotAuthorized { .. } => 401,
            VaultError::Paused => 403,
            VaultError::InsufficientShares { .. } => 405,
            VaultError::ZeroAmount => 406,
            VaultError::SlippageExceeded { .. } => 407,
            VaultError::DeadlinePassed { .. } => 408,
            VaultError::StrategyNotWhitelisted(_) => 409,
            VaultError::ArithmeticOverflow => 410,
            VaultError::MinimumFirstDeposit { .. } => 411,
            VaultError::HarvestFailed { .. } => 412,
            VaultError::InsufficientLiquidity { .. } => 413,
            VaultError::InsufficientAllocation { .. } => 414,
            VaultError::StrategyUnavailable(_) => 415,
            VaultError::StrategyCallFailed { .. } => 416,
            VaultError::StrategyTimeout { .. } => 417,
            VaultError::TransferFailed(_) => 418,
            VaultError::InvalidConfig(_) => 419,
        }
    }

    /// Short machine-readable name, e.g. `"ERR-PAUSED"`.
    pub fn kind(&self) -> &'static str {
        match self {
            VaultError::NotAuthorized { .. } => "ERR-NOT-AUTHORIZED",
            VaultError::Paused => "ERR-PAUSED",
            VaultError::InsufficientShares { .. } => "ERR-INSUFFICIENT-SHARES",
            VaultError::ZeroAmount => "ERR-ZERO-AMOUNT",
            VaultError::SlippageExceeded { .. } => "ERR-SLIPPAGE-EXCEEDED",
            VaultError::DeadlinePassed { .. } => "ERR-DEADLINE-PASSED",
            VaultError::StrategyNotWhitelisted(_) => "ERR-STRATEGY-NOT-WHITELISTED",
            VaultError::ArithmeticOverflow => "ERR-ARITHMETIC-OVERFLOW",
            VaultError::MinimumFirstDeposit { .. } => "ERR-MINIMUM-FIRST-DEPOSIT",
            VaultError::HarvestFailed { .. } => "ERR-HARVEST-FAILED",
            VaultError::InsufficientLiquidity { .. } => "ERR-INSUFFICIENT-LIQUIDITY",
            VaultError::InsufficientAllocation { .. } => "ERR-INSUFFICIENT-ALLOCATION",
            VaultError::StrategyUnavailable(_) => "ERR-STRATEGY-UNAVAILABLE",
            VaultError::StrategyCallFailed { .. } => "ERR-STRATEGY-CALL-FAILED",
            VaultError::StrategyTimeout { .. } => "ERR-STRATEGY-TIMEOUT",
            VaultError::TransferFailed(_) => "ERR-TRANSFER-FAILED",
            VaultError::InvalidConfig(_) => "ERR-INVALID-CONFIG",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_codes_are_preserved() {
        assert_eq!(
            VaultError::NotAuthorized {
                caller: Principal::from("x")
            }
            .code(),
            401
        );
        assert_eq!(VaultError::Paused.code(), 403);
        assert_eq!(VaultError::ZeroAmount.code(), 406);
        assert_eq!(
            VaultError::MinimumFirstDeposit {
                amount: 1,
                minimum: 2
            }
            .code(),
            411
        );
        assert_eq!(
            VaultError::StrategyNotWhitelisted(Principal::from("s")).code(),
            409
        );
    }

    #[test]
    fn display_includes_context() {
        let err = VaultError::SlippageExceeded {
            net: 919,
            min_out: 950,
        };
        let msg = err.to_string();
        assert!(msg.contains("919"));
        assert!(msg.contains("950"));
        assert_eq!(err.kind(), "ERR-SLIPPAGE-EXCEEDED");
    }
}
