//! End-to-end lifecycle tests for the transaction pool.
//!
//! Each test drives the pool through its public API with mock ports:
//! admission, withdrawal, double-spend handling, template ordering,
//! reorg re-admission, expiration, peer diffing, and persistence.

use std::sync::Arc;

use parking_lot::Mutex;

use umbra_core::error::MempoolError;
use umbra_core::traits::PoolObserver;
use umbra_core::types::{BlockTemplate, Hash256};
use umbra_tests::helpers::*;

#[derive(Default)]
struct RecordingObserver {
    log: Mutex<Vec<(char, Hash256)>>,
}

impl PoolObserver for RecordingObserver {
    fn tx_deposited(&self, id: &Hash256) {
        self.log.lock().push(('d', *id));
    }

    fn tx_removed(&self, id: &Hash256) {
        self.log.lock().push(('r', *id));
    }
}

// ======================================================================
// Scenario 1: Admit and take
// A transaction goes in, is counted, comes back out intact, and the
// observer sees deposit before removal.
// ======================================================================

#[test]
fn admit_and_take() {
    let h = PoolHarness::new();
    let obs = Arc::new(RecordingObserver::default());
    h.pool.add_observer(obs.clone() as Arc<dyn PoolObserver>);

    let tx = make_tx(0x01, 1_000);
    let blob_size = tx.blob_size().unwrap();
    let txid = h.pool.add_tx(tx.clone(), false, 0).unwrap();
    assert_eq!(h.pool.get_transactions_count(), 1);

    let taken = h.pool.take_tx(&txid).unwrap();
    assert_eq!(taken.tx, tx);
    assert_eq!(taken.blob_size, blob_size);
    assert_eq!(taken.fee, 1_000);

    assert_eq!(h.pool.get_transactions_count(), 0);
    assert_eq!(*obs.log.lock(), vec![('d', txid), ('r', txid)]);
}

// ======================================================================
// Scenario 2: Double-spend rejection
// A second transaction spending the same key image is refused and the
// pool is untouched.
// ======================================================================

#[test]
fn double_spend_rejection() {
    let h = PoolHarness::new();
    h.pool.add_tx(make_tx(0x0A, 1_000), false, 0).unwrap();

    let rival = make_tx_with_nonce(0x0A, 5_000, 9);
    assert_eq!(
        h.pool.add_tx(rival, false, 0).unwrap_err(),
        MempoolError::DoubleSpend
    );
    assert_eq!(h.pool.get_transactions_count(), 1);
}

// ======================================================================
// Scenario 3: Priority order
// Template selection runs highest fee-per-byte first, smaller size
// breaking rate ties, earlier receipt breaking the rest.
// ======================================================================

#[test]
fn template_priority_order() {
    let h = PoolHarness::new();

    h.clock.set(T0);
    let id1 = h
        .pool
        .add_tx_with_meta(make_tx(1, 1_100), Hash256([1; 32]), 1_100, false, 0)
        .unwrap();
    h.clock.set(T0 + 1);
    let id2 = h
        .pool
        .add_tx_with_meta(make_tx(2, 2_200), Hash256([2; 32]), 1_100, false, 0)
        .unwrap();
    h.clock.set(T0 + 2);
    let id3 = h
        .pool
        .add_tx_with_meta(make_tx(3, 2_200), Hash256([3; 32]), 550, false, 0)
        .unwrap();

    let mut block = BlockTemplate::default();
    h.pool
        .fill_block_template(&mut block, 1_000_000, usize::MAX, 0, 0);

    assert_eq!(block.tx_hashes, vec![id3, id2, id1]);
}

// ======================================================================
// Scenario 4: Reorg re-admission
// A confirmed transaction returns as kept-by-block when its block is
// disconnected, coexisting with a conflicting pending transaction.
// ======================================================================

#[test]
fn reorg_readmission() {
    let h = PoolHarness::new();
    let tx_a = make_tx(0x11, 1_000);
    let id_a = h.pool.add_tx(tx_a.clone(), false, 0).unwrap();

    // A block confirms A.
    h.pool.on_blockchain_inc(1, &Hash256([0xB1; 32]), &[id_a]);
    assert!(!h.pool.have_tx(&id_a));

    // A rival spending the same key image arrives in the meantime.
    let id_b = h
        .pool
        .add_tx(make_tx_with_nonce(0x11, 2_000, 9), false, 1)
        .unwrap();

    // The block disconnects; A is re-admitted as kept-by-block and both
    // rivals coexist until a later block settles the question.
    h.pool.on_blockchain_dec(0, &Hash256([0xC0; 32]), vec![tx_a]);

    assert!(h.pool.have_tx(&id_a));
    assert!(h.pool.have_tx(&id_b));
    let entries = h.pool.pool_entries();
    let entry_a = entries.iter().find(|e| e.id == id_a).unwrap();
    let entry_b = entries.iter().find(|e| e.id == id_b).unwrap();
    assert!(entry_a.kept_by_block);
    assert!(!entry_b.kept_by_block);
}

// ======================================================================
// Scenario 5: Expiration
// With a one-hour lifetime, a transaction admitted at T0 is swept one
// second past the deadline and remembered as recently deleted.
// ======================================================================

#[test]
fn expiration_sweep() {
    let h = PoolHarness::new();
    h.clock.set(T0);
    let txid = h.pool.add_tx(make_tx(0x01, 1_000), false, 0).unwrap();

    h.clock.set(T0 + 3_601);
    h.pool.on_idle();

    assert!(!h.pool.have_tx(&txid));
    let (_, deleted) = h.pool.get_difference(&[txid]);
    assert_eq!(deleted, vec![txid]);
}

// ======================================================================
// Scenario 6: Pool diff
// Peers learn which pooled ids they are missing and which of their known
// ids are gone.
// ======================================================================

#[test]
fn pool_difference() {
    let h = PoolHarness::new();
    let a = h.pool.add_tx(make_tx(1, 1_000), false, 0).unwrap();
    let b = h.pool.add_tx(make_tx(2, 1_000), false, 0).unwrap();
    let c = h.pool.add_tx(make_tx(3, 1_000), false, 0).unwrap();

    let unknown = Hash256([0xDD; 32]);
    let (new_ids, deleted_ids) = h.pool.get_difference(&[b, unknown]);

    let mut expected = vec![a, c];
    expected.sort();
    assert_eq!(new_ids, expected);
    assert_eq!(deleted_ids, vec![unknown]);
}

// ======================================================================
// Observer re-entry
// Callbacks run with the pool lock released, so an observer may query
// the pool (and the transaction it was told about is already visible).
// ======================================================================

#[test]
fn observer_reenters_pool_without_deadlock() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use umbra_core::mempool::MemoryPool;

    struct ReentrantObserver {
        pool: Mutex<Option<Arc<MemoryPool>>>,
        verified: AtomicBool,
    }

    impl PoolObserver for ReentrantObserver {
        fn tx_deposited(&self, id: &Hash256) {
            if let Some(pool) = self.pool.lock().as_ref() {
                assert!(pool.have_tx(id));
                self.verified.store(true, Ordering::SeqCst);
            }
        }

        fn tx_removed(&self, _id: &Hash256) {}
    }

    let h = PoolHarness::new();
    let pool = Arc::new(h.pool);
    let obs = Arc::new(ReentrantObserver {
        pool: Mutex::new(Some(Arc::clone(&pool))),
        verified: AtomicBool::new(false),
    });
    pool.add_observer(obs.clone() as Arc<dyn PoolObserver>);

    pool.add_tx(make_tx(1, 1_000), false, 0).unwrap();
    assert!(obs.verified.load(Ordering::SeqCst));
}

// ======================================================================
// Persistence across restarts
// deinit writes the snapshot, a fresh pool loads it back identically.
// ======================================================================

#[test]
fn persistence_across_restart() {
    let dir = tempfile::tempdir().unwrap();

    let h = PoolHarness::new();
    h.pool.init(dir.path()).unwrap();
    h.clock.set(T0);
    h.pool.add_tx(make_tx(1, 1_000), false, 0).unwrap();
    h.clock.set(T0 + 7);
    h.pool.add_tx(make_tx(2, 0), true, 0).unwrap();

    let before = h.pool.pool_entries();
    h.pool.deinit().unwrap();
    assert_eq!(h.pool.get_transactions_count(), 0);

    let h2 = PoolHarness::new();
    h2.pool.init(dir.path()).unwrap();
    assert_eq!(h2.pool.pool_entries(), before);
}

// ======================================================================
// Corrupt state file
// Garbage on disk is discarded with a warning and the pool starts empty.
// ======================================================================

#[test]
fn corrupt_state_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("poolstate.bin"), [0xFF; 64]).unwrap();

    let h = PoolHarness::new();
    h.pool.init(dir.path()).unwrap();
    assert_eq!(h.pool.get_transactions_count(), 0);

    // The pool is fully usable afterwards, and deinit replaces the file.
    h.pool.add_tx(make_tx(1, 1_000), false, 0).unwrap();
    h.pool.deinit().unwrap();

    let h2 = PoolHarness::new();
    h2.pool.init(dir.path()).unwrap();
    assert_eq!(h2.pool.get_transactions_count(), 1);
}
