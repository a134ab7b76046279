//! In-memory pool of unconfirmed transactions (mempool).
//!
//! The pool sits between the P2P layer (which delivers unconfirmed
//! transactions) and the block assembler (which selects transactions for
//! the next block). It provides:
//! - O(1) lookup by transaction id
//! - double-spend detection over key images and spent global outputs
//! - fee-per-byte ordered selection for block templates
//! - reorg re-admission and confirmation-driven removal
//! - expiration sweeps, secondary indices, and a persisted snapshot
//!
//! Cryptographic validation is the caller's concern, reached through the
//! [`TransactionValidator`] port. All state sits behind one re-entrant
//! lock; the validator may call back into the pool from the same thread.

pub mod entry;
pub mod priority;

mod conflicts;
mod indices;
mod observer;
mod persistence;

pub use entry::{PoolEntry, TakenTransaction, TransactionCheckInfo};
pub use priority::PriorityKey;

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use tracing::{debug, info, warn};

use crate::currency::Currency;
use crate::error::{MempoolError, PersistenceError};
use crate::traits::{ChainQuery, PoolObserver, TimeProvider, TransactionValidator};
use crate::types::{BlockTemplate, GlobalOutput, Hash256, KeyImage, Transaction};

use conflicts::SpentInputs;
use indices::{PaymentIdIndex, TimestampIndex};
use observer::{ObserverRegistry, PoolEvent};

/// Rate limiter: lets an action through at most once per interval.
#[derive(Debug)]
struct OnceInInterval {
    interval: u64,
    last: u64,
}

impl OnceInInterval {
    fn new(interval: u64) -> Self {
        Self { interval, last: 0 }
    }

    fn due(&mut self, now: u64) -> bool {
        if now.saturating_sub(self.last) > self.interval {
            self.last = now;
            true
        } else {
            false
        }
    }
}

/// Everything behind the pool lock.
struct PoolState {
    /// Primary store: id → entry (owner of the bodies).
    entries: HashMap<Hash256, PoolEntry>,
    /// Priority index; same membership as `entries`.
    priority: BTreeSet<PriorityKey>,
    /// Double-spend conflict indices.
    spent: SpentInputs,
    /// Payment id → tx ids, when indices are enabled.
    payment_index: PaymentIdIndex,
    /// Receive time → tx ids, when indices are enabled.
    timestamp_index: TimestampIndex,
    /// Ids recently removed, with removal time. Never contains a pooled id.
    recently_deleted: HashMap<Hash256, u64>,
    /// Expiration sweep rate limiter.
    sweep: OnceInInterval,
    /// Data directory recorded by `init`, used by `deinit`.
    config_folder: Option<PathBuf>,
    /// Whether the secondary indices are maintained.
    indices_enabled: bool,
}

impl PoolState {
    /// Insert a fully formed entry into every index.
    ///
    /// The caller has already run the admission checks.
    fn insert_entry(&mut self, entry: PoolEntry, events: &mut Vec<PoolEvent>) {
        self.recently_deleted.remove(&entry.id);
        self.spent.add(&entry.id, &entry.tx, entry.kept_by_block);
        self.priority.insert(entry.priority_key());
        if self.indices_enabled {
            if let Some(pid) = entry.tx.payment_id() {
                self.payment_index.add(pid, entry.id);
            }
            self.timestamp_index.add(entry.receive_time, entry.id);
        }
        events.push(PoolEvent::Deposited(entry.id));
        self.entries.insert(entry.id, entry);
    }

    /// Withdraw an entry's contributions from every index and record the
    /// removal time.
    fn remove_entry(
        &mut self,
        id: &Hash256,
        now: u64,
        events: &mut Vec<PoolEvent>,
    ) -> Option<PoolEntry> {
        let entry = self.entries.remove(id)?;
        let in_priority = self.priority.remove(&entry.priority_key());
        debug_assert!(in_priority, "priority index out of sync with store");
        self.spent.remove(id, &entry.tx, entry.kept_by_block);
        if self.indices_enabled {
            if let Some(pid) = entry.tx.payment_id() {
                self.payment_index.remove(&pid, id);
            }
            self.timestamp_index.remove(entry.receive_time, id);
        }
        self.recently_deleted.insert(*id, now);
        events.push(PoolEvent::Removed(*id));
        Some(entry)
    }

    /// Whether admitting `tx` would double-spend against the pool.
    ///
    /// A key image held only by kept-by-block entries does not count; a
    /// spent global output always does.
    fn have_spent_inputs(&self, tx: &Transaction) -> bool {
        for ki in tx.key_images() {
            if let Some(spenders) = self.spent.key_image_spenders(ki) {
                let relayed_spender = spenders
                    .iter()
                    .any(|sid| self.entries.get(sid).map_or(false, |e| !e.kept_by_block));
                if relayed_spender {
                    return true;
                }
            }
        }
        tx.spent_global_outputs()
            .any(|out| self.spent.is_output_spent(&out))
    }

    fn clear_all(&mut self) {
        self.entries.clear();
        self.priority.clear();
        self.spent.clear();
        self.payment_index.clear();
        self.timestamp_index.clear();
        self.recently_deleted.clear();
    }
}

/// The transaction memory pool.
///
/// Thread-safe: one re-entrant lock guards the whole state, so the
/// validator port may call back into the pool from the same thread (as it
/// does during block template filling). Observer callbacks are dispatched
/// with the lock released.
pub struct MemoryPool {
    currency: Currency,
    validator: Arc<dyn TransactionValidator>,
    chain: Arc<dyn ChainQuery>,
    clock: Arc<dyn TimeProvider>,
    observers: ObserverRegistry,
    state: ReentrantMutex<RefCell<PoolState>>,
}

impl MemoryPool {
    /// Create an empty pool wired to its ports.
    pub fn new(
        currency: Currency,
        validator: Arc<dyn TransactionValidator>,
        chain: Arc<dyn ChainQuery>,
        clock: Arc<dyn TimeProvider>,
    ) -> Self {
        let state = PoolState {
            entries: HashMap::new(),
            priority: BTreeSet::new(),
            spent: SpentInputs::new(),
            payment_index: PaymentIdIndex::default(),
            timestamp_index: TimestampIndex::default(),
            recently_deleted: HashMap::new(),
            sweep: OnceInInterval::new(currency.sweep_interval),
            config_folder: None,
            indices_enabled: currency.blockchain_indices_enabled,
        };
        Self {
            currency,
            validator,
            chain,
            clock,
            observers: ObserverRegistry::new(),
            state: ReentrantMutex::new(RefCell::new(state)),
        }
    }

    // --- observers ---

    /// Register an observer. Returns false if already registered.
    pub fn add_observer(&self, observer: Arc<dyn PoolObserver>) -> bool {
        self.observers.add(observer)
    }

    /// Unregister an observer. Returns false if it was not registered.
    pub fn remove_observer(&self, observer: &Arc<dyn PoolObserver>) -> bool {
        self.observers.remove(observer)
    }

    // --- admission ---

    /// Admit a transaction, computing its id and blob size from the
    /// canonical encoding.
    ///
    /// `height` is the chain height at which the transaction was handed
    /// to the pool; it provides logging context only.
    pub fn add_tx(
        &self,
        tx: Transaction,
        kept_by_block: bool,
        height: u64,
    ) -> Result<Hash256, MempoolError> {
        let blob = tx
            .canonical_bytes()
            .map_err(|e| MempoolError::Internal(e.to_string()))?;
        let id = Hash256(blake3::hash(&blob).into());
        self.add_tx_with_meta(tx, id, blob.len() as u64, kept_by_block, height)
    }

    /// Admit a transaction whose id and blob size the caller already
    /// computed (the relay path serializes exactly once).
    ///
    /// With `kept_by_block` set the fee floor is bypassed, a failed input
    /// check is recorded in `last_failed_block` instead of rejecting, and
    /// conflicting inputs are admitted additively.
    pub fn add_tx_with_meta(
        &self,
        tx: Transaction,
        id: Hash256,
        blob_size: u64,
        kept_by_block: bool,
        height: u64,
    ) -> Result<Hash256, MempoolError> {
        let mut events = Vec::new();
        let result = self.add_tx_inner(tx, id, blob_size, kept_by_block, height, &mut events);
        self.observers.dispatch(&events);
        result
    }

    fn add_tx_inner(
        &self,
        tx: Transaction,
        id: Hash256,
        blob_size: u64,
        kept_by_block: bool,
        height: u64,
        events: &mut Vec<PoolEvent>,
    ) -> Result<Hash256, MempoolError> {
        if blob_size == 0 {
            return Err(MempoolError::Internal("empty transaction blob".into()));
        }

        let guard = self.state.lock();

        let fee = tx.fee().map_err(|_| MempoolError::InvalidInputs)?;
        if !kept_by_block && fee < self.currency.minimum_fee {
            return Err(MempoolError::FeeTooLow {
                fee,
                minimum: self.currency.minimum_fee,
            });
        }

        if self.chain.is_transaction_confirmed(&id) {
            return Err(MempoolError::AlreadyPresent(id));
        }

        // Port calls happen before any state borrow so a validator that
        // re-enters the pool can take its own borrow.
        let mut check_info = TransactionCheckInfo::default();
        if !self.validator.check_inputs(&tx, &mut check_info) {
            if !kept_by_block {
                return Err(MempoolError::InvalidInputs);
            }
            warn!(tx = %id, height, "kept-by-block transaction failed input check, admitting");
        }
        let now = self.clock.now();

        let mut st = guard.borrow_mut();
        if st.entries.contains_key(&id) {
            return Err(MempoolError::AlreadyPresent(id));
        }
        if !kept_by_block && st.have_spent_inputs(&tx) {
            return Err(MempoolError::DoubleSpend);
        }

        st.insert_entry(
            PoolEntry {
                id,
                tx,
                blob_size,
                fee,
                kept_by_block,
                receive_time: now,
                check_info,
            },
            events,
        );
        debug!(tx = %id, fee, blob_size, kept_by_block, height, "transaction deposited into pool");
        Ok(id)
    }

    // --- removal ---

    /// Withdraw a transaction for block inclusion.
    ///
    /// Removes the entry's contributions from all indices, records the id
    /// in the recently-deleted set, and notifies observers. Returns
    /// `None` if the id is not pooled.
    pub fn take_tx(&self, id: &Hash256) -> Option<TakenTransaction> {
        let mut events = Vec::new();
        let taken = {
            let guard = self.state.lock();
            let now = self.clock.now();
            let mut st = guard.borrow_mut();
            st.remove_entry(id, now, &mut events).map(|entry| {
                debug!(tx = %id, "transaction taken from pool");
                TakenTransaction {
                    tx: entry.tx,
                    blob_size: entry.blob_size,
                    fee: entry.fee,
                }
            })
        };
        self.observers.dispatch(&events);
        taken
    }

    // --- readiness ---

    /// Whether a pooled transaction is currently eligible for block
    /// inclusion: the validator accepts it at the tip, and the block its
    /// inputs most recently reference is still canonical.
    ///
    /// Updates the entry's cached check info; never touches the conflict
    /// indices.
    pub fn is_transaction_ready_to_go(&self, id: &Hash256) -> bool {
        let guard = self.state.lock();
        let (tx, mut info) = match guard.borrow().entries.get(id) {
            Some(entry) => (entry.tx.clone(), entry.check_info),
            None => return false,
        };
        let ready = self.check_ready(&tx, &mut info);
        if let Some(entry) = guard.borrow_mut().entries.get_mut(id) {
            entry.check_info = info;
        }
        ready
    }

    fn check_ready(&self, tx: &Transaction, info: &mut TransactionCheckInfo) -> bool {
        if !self.validator.check_inputs(tx, info) {
            return false;
        }
        if info.max_used_block.is_none() {
            return true;
        }
        let (tip_height, _) = self.chain.chain_tip();
        if info.max_used_block.height > tip_height {
            return false;
        }
        match self.chain.block_hash_at(info.max_used_block.height) {
            Some(hash) => hash == info.max_used_block.hash,
            None => false,
        }
    }

    // --- block template ---

    /// Fill a block template from the pool, highest priority first.
    ///
    /// Entries are skipped when they would exceed `max_cumulative_size`,
    /// are not ready, would push the block past the reward penalty limit,
    /// or conflict with an already selected entry. Returns
    /// the cumulative size and fee of the selection. Holds the pool lock
    /// for the whole pass, so the selection sees a consistent snapshot.
    pub fn fill_block_template(
        &self,
        block: &mut BlockTemplate,
        median_size: usize,
        max_cumulative_size: usize,
        already_generated_coins: u64,
        height: u64,
    ) -> (usize, u64) {
        let guard = self.state.lock();

        let (candidates, min_blob) = {
            let st = guard.borrow();
            let candidates: Vec<Hash256> = st.priority.iter().rev().map(|k| k.id).collect();
            let min_blob = st
                .priority
                .iter()
                .map(|k| k.blob_size)
                .min()
                .unwrap_or(u64::MAX);
            (candidates, min_blob)
        };

        let mut total_size = 0usize;
        let mut total_fee = 0u64;
        let mut used_key_images: HashSet<KeyImage> = HashSet::new();
        let mut used_outputs: BTreeSet<GlobalOutput> = BTreeSet::new();

        for id in candidates {
            let remaining = max_cumulative_size.saturating_sub(total_size);
            if (remaining as u64) < min_blob {
                break;
            }

            let (tx, blob_size, fee, mut info) = {
                let st = guard.borrow();
                match st.entries.get(&id) {
                    Some(e) => (e.tx.clone(), e.blob_size, e.fee, e.check_info),
                    None => continue,
                }
            };
            if blob_size > remaining as u64 {
                continue;
            }

            let ready = self.check_ready(&tx, &mut info);
            if let Some(entry) = guard.borrow_mut().entries.get_mut(&id) {
                entry.check_info = info;
            }
            if !ready {
                continue;
            }

            let next_size = total_size + blob_size as usize;
            let next_fee = total_fee.saturating_add(fee);
            if self
                .currency
                .block_reward(median_size, next_size, already_generated_coins, next_fee)
                .is_none()
            {
                continue;
            }

            if tx.key_images().any(|ki| used_key_images.contains(ki))
                || tx
                    .spent_global_outputs()
                    .any(|out| used_outputs.contains(&out))
            {
                continue;
            }
            used_key_images.extend(tx.key_images().copied());
            used_outputs.extend(tx.spent_global_outputs());

            block.tx_hashes.push(id);
            total_size = next_size;
            total_fee = next_fee;
        }

        debug!(
            height,
            selected = block.tx_hashes.len(),
            total_size,
            total_fee,
            "filled block template"
        );
        (total_size, total_fee)
    }

    // --- chain hooks ---

    /// The chain advanced: sweep expired entries (rate-limited) and drop
    /// the transactions the new blocks confirmed.
    pub fn on_blockchain_inc(&self, new_height: u64, top_hash: &Hash256, confirmed: &[Hash256]) {
        let mut events = Vec::new();
        {
            let guard = self.state.lock();
            let now = self.clock.now();
            let mut st = guard.borrow_mut();
            if st.sweep.due(now) {
                self.remove_expired(&mut st, now, &mut events);
            }
            for id in confirmed {
                if st.entries.contains_key(id) {
                    debug!(tx = %id, "removing confirmed transaction from pool");
                    st.remove_entry(id, now, &mut events);
                } else {
                    st.recently_deleted.insert(*id, now);
                }
            }
        }
        self.observers.dispatch(&events);
        debug!(new_height, top = %top_hash, "pool advanced to new chain tip");
    }

    /// The chain rolled back: re-admit the disconnected blocks'
    /// transactions as kept-by-block.
    ///
    /// Kept entries bypass the fee floor and may conflict with pending
    /// entries; such conflicts coexist until later confirmations resolve
    /// them.
    pub fn on_blockchain_dec(&self, new_height: u64, top_hash: &Hash256, txs: Vec<Transaction>) {
        debug!(new_height, top = %top_hash, "re-admitting transactions from disconnected blocks");
        for tx in txs {
            match self.add_tx(tx, true, new_height) {
                Ok(_) | Err(MempoolError::AlreadyPresent(_)) => {}
                Err(e) => warn!(error = %e, "failed to re-admit rolled-back transaction"),
            }
        }
    }

    /// Periodic housekeeping: expiration sweep, rate-limited.
    pub fn on_idle(&self) {
        let mut events = Vec::new();
        {
            let guard = self.state.lock();
            let now = self.clock.now();
            let mut st = guard.borrow_mut();
            if st.sweep.due(now) {
                self.remove_expired(&mut st, now, &mut events);
            }
        }
        self.observers.dispatch(&events);
    }

    /// Drop entries past their lifetime and prune the recently-deleted
    /// set past its retention window.
    fn remove_expired(&self, st: &mut PoolState, now: u64, events: &mut Vec<PoolEvent>) {
        let expired: Vec<Hash256> = st
            .entries
            .values()
            .filter_map(|entry| {
                let age = now.saturating_sub(entry.receive_time);
                let lifetime = if entry.kept_by_block {
                    self.currency.mempool_tx_from_alt_block_live_time
                } else {
                    self.currency.mempool_tx_live_time
                };
                (age > lifetime).then_some(entry.id)
            })
            .collect();
        for id in &expired {
            debug!(tx = %id, "removing expired transaction from pool");
            st.remove_entry(id, now, events);
        }

        let retention = self.currency.deleted_tx_retention;
        st.recently_deleted
            .retain(|_, removed_at| now.saturating_sub(*removed_at) <= retention);
    }

    // --- queries ---

    /// Whether the pool holds the given id.
    pub fn have_tx(&self, id: &Hash256) -> bool {
        self.state.lock().borrow().entries.contains_key(id)
    }

    /// Number of pooled transactions.
    pub fn get_transactions_count(&self) -> usize {
        self.state.lock().borrow().entries.len()
    }

    /// A pooled transaction body, if present.
    pub fn get_transaction(&self, id: &Hash256) -> Option<Transaction> {
        self.state
            .lock()
            .borrow()
            .entries
            .get(id)
            .map(|e| e.tx.clone())
    }

    /// Snapshot of all pooled transaction bodies.
    pub fn get_transactions(&self) -> Vec<Transaction> {
        let guard = self.state.lock();
        let st = guard.borrow();
        let mut entries: Vec<&PoolEntry> = st.entries.values().collect();
        entries.sort_by_key(|e| e.id);
        entries.iter().map(|e| e.tx.clone()).collect()
    }

    /// Look up many ids at once; unknown ids land in the second list.
    pub fn get_transactions_by_ids(&self, ids: &[Hash256]) -> (Vec<Transaction>, Vec<Hash256>) {
        let guard = self.state.lock();
        let st = guard.borrow();
        let mut found = Vec::new();
        let mut missed = Vec::new();
        for id in ids {
            match st.entries.get(id) {
                Some(entry) => found.push(entry.tx.clone()),
                None => missed.push(*id),
            }
        }
        (found, missed)
    }

    /// Pool diff against a peer's view.
    ///
    /// `new_ids` are pool members missing from `known_ids`; `deleted_ids`
    /// are known ids no longer pooled (freshly confirmed or expired ones
    /// also sit in the recently-deleted set until its retention window,
    /// seven days by default, runs out — peers silent for longer will
    /// re-gossip them).
    pub fn get_difference(&self, known_ids: &[Hash256]) -> (Vec<Hash256>, Vec<Hash256>) {
        let guard = self.state.lock();
        let st = guard.borrow();
        let known: HashSet<Hash256> = known_ids.iter().copied().collect();
        let mut new_ids: Vec<Hash256> = st
            .entries
            .keys()
            .filter(|id| !known.contains(id))
            .copied()
            .collect();
        new_ids.sort();
        let deleted_ids: Vec<Hash256> = known_ids
            .iter()
            .filter(|id| !st.entries.contains_key(id))
            .copied()
            .collect();
        (new_ids, deleted_ids)
    }

    /// Ids of pooled transactions carrying the given payment id.
    ///
    /// Empty unless blockchain indices are enabled.
    pub fn transaction_ids_by_payment_id(&self, payment_id: &Hash256) -> Vec<Hash256> {
        self.state.lock().borrow().payment_index.get(payment_id)
    }

    /// Ids received within `[begin, end]`, capped at `limit`, plus the
    /// total count within the range.
    ///
    /// Empty unless blockchain indices are enabled.
    pub fn transaction_ids_by_timestamp(
        &self,
        begin: u64,
        end: u64,
        limit: u32,
    ) -> (Vec<Hash256>, u64) {
        self.state
            .lock()
            .borrow()
            .timestamp_index
            .range(begin, end, limit)
    }

    /// Snapshot of all pool entries, sorted by id.
    pub fn pool_entries(&self) -> Vec<PoolEntry> {
        let guard = self.state.lock();
        let st = guard.borrow();
        let mut entries: Vec<PoolEntry> = st.entries.values().cloned().collect();
        entries.sort_by_key(|e| e.id);
        entries
    }

    /// Human-readable dump of the pool contents.
    pub fn print_pool(&self, short_format: bool) -> String {
        use std::fmt::Write as _;

        let entries = self.pool_entries();
        let mut out = String::new();
        for e in &entries {
            if short_format {
                let _ = writeln!(
                    out,
                    "id: {} blob_size: {} fee: {} kept_by_block: {} receive_time: {}",
                    e.id, e.blob_size, e.fee, e.kept_by_block, e.receive_time
                );
            } else {
                let _ = writeln!(out, "id: {}", e.id);
                let _ = writeln!(
                    out,
                    "  blob_size: {} fee: {} kept_by_block: {} receive_time: {}",
                    e.blob_size, e.fee, e.kept_by_block, e.receive_time
                );
                let _ = writeln!(
                    out,
                    "  max_used_block: {}:{}",
                    e.check_info.max_used_block.height, e.check_info.max_used_block.hash
                );
                let _ = writeln!(
                    out,
                    "  last_failed_block: {}:{}",
                    e.check_info.last_failed_block.height, e.check_info.last_failed_block.hash
                );
            }
        }
        out
    }

    // --- persistence ---

    /// Load the persisted pool state from `config_folder`, if any.
    ///
    /// Each persisted record is re-admitted through the same insertion
    /// path as live admission, with its kept flag, receive time, and
    /// cached check info preserved. A corrupt or version-mismatched file
    /// is discarded with a warning and the pool starts empty.
    pub fn init(&self, config_folder: &Path) -> Result<(), PersistenceError> {
        let mut events = Vec::new();
        {
            let guard = self.state.lock();
            guard.borrow_mut().config_folder = Some(config_folder.to_path_buf());

            let path = config_folder.join(persistence::POOLSTATE_FILENAME);
            if !path.exists() {
                return Ok(());
            }

            match persistence::load(&path) {
                Ok(snapshot) => {
                    let mut st = guard.borrow_mut();
                    let mut loaded = 0usize;
                    // Kept-by-block entries are admitted additively over
                    // conflicts, so relayed entries must re-enter first to
                    // reproduce the admission order the indices saw live.
                    let (relayed, kept): (Vec<PoolEntry>, Vec<PoolEntry>) = snapshot
                        .entries
                        .into_iter()
                        .partition(|e| !e.kept_by_block);
                    for entry in relayed.into_iter().chain(kept) {
                        if st.entries.contains_key(&entry.id) {
                            continue;
                        }
                        if !entry.kept_by_block && st.have_spent_inputs(&entry.tx) {
                            warn!(tx = %entry.id, "discarding persisted transaction conflicting with pool");
                            continue;
                        }
                        st.insert_entry(entry, &mut events);
                        loaded += 1;
                    }
                    for (id, removed_at) in snapshot.recently_deleted {
                        if !st.entries.contains_key(&id) {
                            st.recently_deleted.insert(id, removed_at);
                        }
                    }
                    info!(loaded, "loaded transaction pool state");
                }
                Err(e) => {
                    warn!(error = %e, "discarding corrupt transaction pool state");
                }
            }
        }
        self.observers.dispatch(&events);
        Ok(())
    }

    /// Persist the pool state atomically and clear the in-memory state.
    ///
    /// I/O failures are surfaced; the in-memory state is left intact in
    /// that case. A pool that was never initialized persists nothing.
    pub fn deinit(&self) -> Result<(), PersistenceError> {
        let guard = self.state.lock();
        let mut st = guard.borrow_mut();

        let folder = match &st.config_folder {
            Some(folder) => folder.clone(),
            None => {
                debug!("pool deinit without init, nothing to persist");
                return Ok(());
            }
        };

        let mut entries: Vec<PoolEntry> = st.entries.values().cloned().collect();
        entries.sort_by_key(|e| e.id);
        let mut recently_deleted: Vec<(Hash256, u64)> = st
            .recently_deleted
            .iter()
            .map(|(id, removed_at)| (*id, *removed_at))
            .collect();
        recently_deleted.sort();

        let snapshot = persistence::PoolSnapshot {
            entries,
            recently_deleted,
        };
        persistence::save(&folder.join(persistence::POOLSTATE_FILENAME), &snapshot)?;
        info!(count = snapshot.entries.len(), "persisted transaction pool state");

        st.clear_all();
        Ok(())
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        let guard = self.state.lock();
        let st = guard.borrow();

        assert_eq!(st.entries.len(), st.priority.len(), "priority index size");
        for entry in st.entries.values() {
            assert!(
                st.priority.contains(&entry.priority_key()),
                "entry missing from priority index"
            );
            for ki in entry.tx.key_images() {
                let spenders = st.spent.key_image_spenders(ki).expect("key image indexed");
                assert!(spenders.contains(&entry.id), "key image not owned by entry");
            }
            for out in entry.tx.spent_global_outputs() {
                assert!(st.spent.is_output_spent(&out), "spent output not indexed");
            }
        }
        for id in st.spent.referenced_ids() {
            assert!(st.entries.contains_key(&id), "phantom id in conflict index");
        }
        for id in st.recently_deleted.keys() {
            assert!(
                !st.entries.contains_key(id),
                "recently deleted id still pooled"
            );
        }
    }
}
