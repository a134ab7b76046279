//! Port interfaces the pool consumes from the rest of the node.
//!
//! These traits define the contracts between the pool and its
//! collaborators:
//! - [`TimeProvider`] — wall clock, injected for deterministic tests
//! - [`TransactionValidator`] — structural input validation (consensus layer)
//! - [`ChainQuery`] — read-only view of the canonical chain
//! - [`PoolObserver`] — admission/removal event subscriber
//!
//! All ports are borrowed by the pool (non-owning) and must outlive it.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::mempool::entry::TransactionCheckInfo;
use crate::types::{Hash256, Transaction};

/// Source of wall-clock time in seconds since the Unix epoch.
pub trait TimeProvider: Send + Sync {
    /// Current time in seconds since the Unix epoch.
    fn now(&self) -> u64;
}

/// The system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeProvider for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Structural transaction-input validation against the current chain tip.
///
/// The pool never performs cryptographic checks itself; this port owns
/// signature, ring-signature, and commitment verification.
pub trait TransactionValidator: Send + Sync {
    /// Check the transaction's inputs against the current chain tip.
    ///
    /// On success, updates `info.max_used_block` to the most recent block
    /// any input references. On failure, records the block at which
    /// validation failed in `info.last_failed_block`. The check may use
    /// the incoming `info` as a cache of a previous verdict.
    fn check_inputs(&self, tx: &Transaction, info: &mut TransactionCheckInfo) -> bool;
}

/// Read-only view of the canonical chain.
pub trait ChainQuery: Send + Sync {
    /// Current chain tip as `(height, block_hash)`.
    fn chain_tip(&self) -> (u64, Hash256);

    /// Hash of the canonical block at `height`, or `None` beyond the tip.
    fn block_hash_at(&self, height: u64) -> Option<Hash256>;

    /// Whether a transaction id is already confirmed in the canonical chain.
    fn is_transaction_confirmed(&self, id: &Hash256) -> bool;
}

/// Subscriber to pool admission and removal events.
///
/// Callbacks are invoked with the pool lock released; it is safe to call
/// back into the pool from inside a callback.
pub trait PoolObserver: Send + Sync {
    /// A transaction entered the pool.
    fn tx_deposited(&self, id: &Hash256);

    /// A transaction left the pool (taken, expired, or confirmed).
    fn tx_removed(&self, id: &Hash256);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BlockInfo;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ------------------------------------------------------------------
    // Mock: TransactionValidator
    // ------------------------------------------------------------------

    struct MockValidator {
        valid: bool,
        tip: BlockInfo,
    }

    impl TransactionValidator for MockValidator {
        fn check_inputs(&self, _tx: &Transaction, info: &mut TransactionCheckInfo) -> bool {
            if self.valid {
                info.max_used_block = self.tip;
            } else {
                info.last_failed_block = self.tip;
            }
            self.valid
        }
    }

    // ------------------------------------------------------------------
    // Mock: ChainQuery
    // ------------------------------------------------------------------

    struct MockChain {
        height: u64,
        hash: Hash256,
    }

    impl ChainQuery for MockChain {
        fn chain_tip(&self) -> (u64, Hash256) {
            (self.height, self.hash)
        }

        fn block_hash_at(&self, height: u64) -> Option<Hash256> {
            (height <= self.height).then_some(self.hash)
        }

        fn is_transaction_confirmed(&self, _id: &Hash256) -> bool {
            false
        }
    }

    // ------------------------------------------------------------------
    // Mock: PoolObserver
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct CountingObserver {
        deposits: AtomicUsize,
        removals: AtomicUsize,
    }

    impl PoolObserver for CountingObserver {
        fn tx_deposited(&self, _id: &Hash256) {
            self.deposits.fetch_add(1, Ordering::SeqCst);
        }

        fn tx_removed(&self, _id: &Hash256) {
            self.removals.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sample_tx() -> Transaction {
        Transaction {
            version: 1,
            unlock_time: 0,
            inputs: vec![],
            outputs: vec![],
            extra: vec![],
        }
    }

    // ------------------------------------------------------------------
    // Object safety: verify each trait is dyn-compatible
    // ------------------------------------------------------------------

    fn _assert_time_provider_object_safe(t: &dyn TimeProvider) {
        let _ = t.now();
    }

    fn _assert_validator_object_safe(v: &dyn TransactionValidator) {
        let _ = v.check_inputs(&sample_tx(), &mut TransactionCheckInfo::default());
    }

    fn _assert_chain_query_object_safe(c: &dyn ChainQuery) {
        let _ = c.chain_tip();
    }

    fn _assert_observer_object_safe(o: &dyn PoolObserver) {
        o.tx_deposited(&Hash256::ZERO);
    }

    // ------------------------------------------------------------------
    // SystemClock
    // ------------------------------------------------------------------

    #[test]
    fn system_clock_is_past_2020() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now() > 1_577_836_800);
    }

    #[test]
    fn system_clock_monotonic_enough() {
        let a = SystemClock.now();
        let b = SystemClock.now();
        assert!(b >= a);
    }

    // ------------------------------------------------------------------
    // Validator contract
    // ------------------------------------------------------------------

    #[test]
    fn validator_success_sets_max_used() {
        let tip = BlockInfo::new(7, Hash256([0x07; 32]));
        let v = MockValidator { valid: true, tip };
        let mut info = TransactionCheckInfo::default();
        assert!(v.check_inputs(&sample_tx(), &mut info));
        assert_eq!(info.max_used_block, tip);
        assert!(info.last_failed_block.is_none());
    }

    #[test]
    fn validator_failure_sets_last_failed() {
        let tip = BlockInfo::new(9, Hash256([0x09; 32]));
        let v = MockValidator { valid: false, tip };
        let mut info = TransactionCheckInfo::default();
        assert!(!v.check_inputs(&sample_tx(), &mut info));
        assert!(info.max_used_block.is_none());
        assert_eq!(info.last_failed_block, tip);
    }

    // ------------------------------------------------------------------
    // ChainQuery contract
    // ------------------------------------------------------------------

    #[test]
    fn chain_query_tip_and_lookup() {
        let chain = MockChain {
            height: 5,
            hash: Hash256([0x05; 32]),
        };
        assert_eq!(chain.chain_tip(), (5, Hash256([0x05; 32])));
        assert!(chain.block_hash_at(5).is_some());
        assert!(chain.block_hash_at(6).is_none());
    }

    // ------------------------------------------------------------------
    // Observer contract
    // ------------------------------------------------------------------

    #[test]
    fn observer_counts_events() {
        let obs = CountingObserver::default();
        obs.tx_deposited(&Hash256::ZERO);
        obs.tx_deposited(&Hash256::ZERO);
        obs.tx_removed(&Hash256::ZERO);
        assert_eq!(obs.deposits.load(Ordering::SeqCst), 2);
        assert_eq!(obs.removals.load(Ordering::SeqCst), 1);
    }
}
