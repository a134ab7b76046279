//! Secondary pool indices: payment id and receipt timestamp.
//!
//! Maintained in lockstep with the primary store when blockchain indices
//! are enabled; otherwise both stay empty and lookups return nothing.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::types::Hash256;

/// Payment id → ids of pool transactions carrying it.
#[derive(Debug, Default)]
pub(crate) struct PaymentIdIndex {
    map: HashMap<Hash256, HashSet<Hash256>>,
}

impl PaymentIdIndex {
    pub fn add(&mut self, payment_id: Hash256, tx_id: Hash256) {
        self.map.entry(payment_id).or_default().insert(tx_id);
    }

    pub fn remove(&mut self, payment_id: &Hash256, tx_id: &Hash256) {
        if let Some(ids) = self.map.get_mut(payment_id) {
            ids.remove(tx_id);
            if ids.is_empty() {
                self.map.remove(payment_id);
            }
        }
    }

    /// Ids of pool transactions carrying `payment_id`, sorted for
    /// deterministic output.
    pub fn get(&self, payment_id: &Hash256) -> Vec<Hash256> {
        let mut ids: Vec<_> = self
            .map
            .get(payment_id)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

/// Receipt time → ids of pool transactions received then.
#[derive(Debug, Default)]
pub(crate) struct TimestampIndex {
    map: BTreeMap<u64, BTreeSet<Hash256>>,
}

impl TimestampIndex {
    pub fn add(&mut self, timestamp: u64, tx_id: Hash256) {
        self.map.entry(timestamp).or_default().insert(tx_id);
    }

    pub fn remove(&mut self, timestamp: u64, tx_id: &Hash256) {
        if let Some(ids) = self.map.get_mut(&timestamp) {
            ids.remove(tx_id);
            if ids.is_empty() {
                self.map.remove(&timestamp);
            }
        }
    }

    /// Ids received within `[begin, end]`, in (time, id) order, capped at
    /// `limit`. Also returns the total count within the range.
    pub fn range(&self, begin: u64, end: u64, limit: u32) -> (Vec<Hash256>, u64) {
        let mut ids = Vec::new();
        let mut total = 0u64;
        for bucket in self.map.range(begin..=end).map(|(_, ids)| ids) {
            for tx_id in bucket {
                total += 1;
                if ids.len() < limit as usize {
                    ids.push(*tx_id);
                }
            }
        }
        (ids, total)
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}
