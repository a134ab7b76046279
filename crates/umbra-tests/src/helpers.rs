//! Shared test helpers: mock ports and transaction constructors.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use umbra_core::currency::Currency;
use umbra_core::mempool::{MemoryPool, TransactionCheckInfo};
use umbra_core::traits::{ChainQuery, TimeProvider, TransactionValidator};
use umbra_core::types::{BlockInfo, Hash256, KeyImage, Transaction, TxInput, TxOutput};

/// Reference test epoch.
pub const T0: u64 = 1_700_000_000;

/// Controllable clock.
pub struct TestClock {
    now: AtomicU64,
}

impl TestClock {
    pub fn new(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl TimeProvider for TestClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Chain stub with a settable tip. Nothing is ever confirmed; hook-driven
/// removal passes confirmed ids explicitly.
pub struct TestChain {
    inner: Mutex<(u64, HashMap<u64, Hash256>)>,
}

impl TestChain {
    pub fn new() -> Self {
        let mut hashes = HashMap::new();
        hashes.insert(0, Hash256([0xC0; 32]));
        Self {
            inner: Mutex::new((0, hashes)),
        }
    }

    pub fn set_tip(&self, height: u64, hash: Hash256) {
        let mut inner = self.inner.lock();
        inner.0 = height;
        inner.1.insert(height, hash);
    }
}

impl Default for TestChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainQuery for TestChain {
    fn chain_tip(&self) -> (u64, Hash256) {
        let inner = self.inner.lock();
        let hash = inner.1.get(&inner.0).copied().unwrap_or_default();
        (inner.0, hash)
    }

    fn block_hash_at(&self, height: u64) -> Option<Hash256> {
        let inner = self.inner.lock();
        if height > inner.0 {
            return None;
        }
        inner.1.get(&height).copied()
    }

    fn is_transaction_confirmed(&self, _id: &Hash256) -> bool {
        false
    }
}

/// Validator stub: accepts or rejects everything, stamping a configurable
/// referenced block on success.
pub struct TestValidator {
    valid: AtomicBool,
    max_used: Mutex<BlockInfo>,
}

impl TestValidator {
    pub fn new() -> Self {
        Self {
            valid: AtomicBool::new(true),
            max_used: Mutex::new(BlockInfo::NONE),
        }
    }

    pub fn set_valid(&self, valid: bool) {
        self.valid.store(valid, Ordering::SeqCst);
    }

    pub fn set_max_used(&self, info: BlockInfo) {
        *self.max_used.lock() = info;
    }
}

impl Default for TestValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionValidator for TestValidator {
    fn check_inputs(&self, _tx: &Transaction, info: &mut TransactionCheckInfo) -> bool {
        if self.valid.load(Ordering::SeqCst) {
            info.max_used_block = *self.max_used.lock();
            true
        } else {
            info.last_failed_block = BlockInfo::new(0, Hash256([0xFA; 32]));
            false
        }
    }
}

/// A pool wired to controllable mock ports.
pub struct PoolHarness {
    pub pool: MemoryPool,
    pub validator: Arc<TestValidator>,
    pub chain: Arc<TestChain>,
    pub clock: Arc<TestClock>,
}

impl PoolHarness {
    /// Pool with spec-scenario settings: fee floor 1000 atomic units,
    /// one-hour relay lifetime.
    pub fn new() -> Self {
        Self::with_currency(test_currency())
    }

    pub fn with_currency(currency: Currency) -> Self {
        let validator = Arc::new(TestValidator::new());
        let chain = Arc::new(TestChain::new());
        let clock = Arc::new(TestClock::new(T0));
        let pool = MemoryPool::new(
            currency,
            validator.clone() as Arc<dyn TransactionValidator>,
            chain.clone() as Arc<dyn ChainQuery>,
            clock.clone() as Arc<dyn TimeProvider>,
        );
        Self {
            pool,
            validator,
            chain,
            clock,
        }
    }
}

impl Default for PoolHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Currency with test-friendly pool parameters.
pub fn test_currency() -> Currency {
    Currency {
        minimum_fee: 1_000,
        mempool_tx_live_time: 3_600,
        mempool_tx_from_alt_block_live_time: 7_200,
        sweep_interval: 60,
        ..Currency::default()
    }
}

/// Key image from a seed byte.
pub fn ki(seed: u8) -> KeyImage {
    KeyImage([seed; 32])
}

/// A transaction spending one ring input tagged with key image `seed`.
///
/// The fee is `inputs − outputs`; a nonce output keeps ids distinct for
/// equal `(seed, fee)` pairs.
pub fn make_tx(seed: u8, fee: u64) -> Transaction {
    make_tx_with_nonce(seed, fee, 0)
}

/// Like [`make_tx`], with an explicit uniqueness nonce.
pub fn make_tx_with_nonce(seed: u8, fee: u64, nonce: u64) -> Transaction {
    Transaction {
        version: 1,
        unlock_time: nonce,
        inputs: vec![TxInput::ToKey {
            amount: fee + 500,
            key_offsets: vec![u64::from(seed)],
            key_image: ki(seed),
        }],
        outputs: vec![TxOutput {
            amount: 500,
            key: [seed; 32],
        }],
        extra: vec![],
    }
}

/// A transaction spending one multisignature global output.
pub fn make_multisig_tx(amount: u64, output_index: u64, fee: u64) -> Transaction {
    Transaction {
        version: 1,
        unlock_time: 0,
        inputs: vec![TxInput::Multisignature {
            amount: amount + fee,
            output_index,
        }],
        outputs: vec![TxOutput {
            amount,
            key: [0x33; 32],
        }],
        extra: vec![],
    }
}
