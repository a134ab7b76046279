//! Double-spend conflict indices.
//!
//! Two independent domains are tracked for pooled transactions:
//! key images of ring inputs, and `(amount, global index)` pairs consumed
//! by multisignature inputs. Kept-by-block entries may conflict with
//! existing entries; such conflicts are recorded additively and logged,
//! never rejected here.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::warn;

use crate::types::{GlobalOutput, Hash256, KeyImage, Transaction};

/// Resources consumed by pooled transactions.
#[derive(Debug, Default)]
pub(crate) struct SpentInputs {
    /// Key image → ids of the pool transactions referencing it.
    ///
    /// More than one id appears only while kept-by-block conflicts are
    /// pending resolution. Empty sets are erased on last withdrawal.
    key_images: HashMap<KeyImage, HashSet<Hash256>>,
    /// Global outputs consumed by pooled multisignature inputs.
    spent_outputs: BTreeSet<GlobalOutput>,
}

impl SpentInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record all of `tx`'s inputs as spent by `id`.
    ///
    /// Conflicts are possible only for kept-by-block entries (the caller
    /// rejects conflicting relayed transactions before insertion); they
    /// are logged and recorded additively.
    pub fn add(&mut self, id: &Hash256, tx: &Transaction, kept_by_block: bool) {
        for ki in tx.key_images() {
            let spenders = self.key_images.entry(*ki).or_default();
            if !spenders.is_empty() {
                debug_assert!(kept_by_block, "relayed tx admitted over a spent key image");
                warn!(key_image = %ki, tx = %id, "key image already spent in pool, keeping both");
            }
            spenders.insert(*id);
        }
        for out in tx.spent_global_outputs() {
            if !self.spent_outputs.insert(out) {
                debug_assert!(kept_by_block, "relayed tx admitted over a spent output");
                warn!(output = %out, tx = %id, "global output already spent in pool, keeping both");
            }
        }
    }

    /// Withdraw all of `tx`'s contributions recorded under `id`.
    pub fn remove(&mut self, id: &Hash256, tx: &Transaction, kept_by_block: bool) {
        for ki in tx.key_images() {
            if let Some(spenders) = self.key_images.get_mut(ki) {
                let removed = spenders.remove(id);
                debug_assert!(removed || kept_by_block, "key image index out of sync");
                if spenders.is_empty() {
                    self.key_images.remove(ki);
                }
            } else {
                debug_assert!(kept_by_block, "key image index out of sync");
            }
        }
        for out in tx.spent_global_outputs() {
            // A kept-by-block sibling may have inserted the same pair; it
            // is withdrawn with whichever conflicting entry leaves first.
            self.spent_outputs.remove(&out);
        }
    }

    /// Ids of pool transactions referencing `ki`, if any.
    pub fn key_image_spenders(&self, ki: &KeyImage) -> Option<&HashSet<Hash256>> {
        self.key_images.get(ki)
    }

    /// Whether a global output is consumed by some pooled transaction.
    pub fn is_output_spent(&self, out: &GlobalOutput) -> bool {
        self.spent_outputs.contains(out)
    }

    /// Number of distinct key images tracked.
    pub fn key_image_count(&self) -> usize {
        self.key_images.len()
    }

    /// Number of spent global outputs tracked.
    pub fn spent_output_count(&self) -> usize {
        self.spent_outputs.len()
    }

    /// Every id referenced anywhere in either index.
    pub fn referenced_ids(&self) -> HashSet<Hash256> {
        self.key_images.values().flatten().copied().collect()
    }

    pub fn clear(&mut self) {
        self.key_images.clear();
        self.spent_outputs.clear();
    }
}
