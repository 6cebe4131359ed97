//! # Block Clock
//!
//! Withdrawal deadlines are block heights. The engine reads the current
//! height through [`BlockClock`] and never advances it itself.

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of the current block height.
pub trait BlockClock: Send + Sync {
    /// Height of the block the current operation executes in.
    fn block_height(&self) -> u64;
}

/// A clock advanced by hand: by the node's block ticker, or by tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    height: AtomicU64,
}

impl ManualClock {
    /// A clock starting at `height`.
    pub fn new(height: u64) -> Self {
        Self {
            height: AtomicU64::new(height),
        }
    }

    /// Moves to the next block and returns its height.
    pub fn advance(&self) -> u64 {
        self.height.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Jumps to `height`.
    pub fn set(&self, height: u64) {
        self.height.store(height, Ordering::SeqCst);
    }
}

impl BlockClock for ManualClock {
    fn block_height(&self) -> u64 {
        self.height.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_and_set() {
        let clock = ManualClock::new(5);
        assert_eq!(clock.advance(), 6);
        assert_eq!(clock.block_height(), 6);
        clock.set(100);
        assert_eq!(clock.block_height(), 100);
    }
}
