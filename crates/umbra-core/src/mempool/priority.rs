//! Compound priority ordering for pool entries.

use std::cmp::Ordering;

use crate::types::Hash256;

/// Ranking key for a pool entry.
///
/// Greater means higher priority. The order is lexicographic on:
///
/// 1. fee per byte, compared via the cross products `fee × other.blob_size`
///    in 128-bit arithmetic so that fees up to `u64::MAX` cannot overflow;
/// 2. smaller blob size;
/// 3. earlier receive time;
/// 4. transaction id bytes, so the order is total and deterministic.
///
/// Stored in a `BTreeSet` that is iterated in reverse for highest-first
/// traversal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriorityKey {
    pub fee: u64,
    pub blob_size: u64,
    pub receive_time: u64,
    pub id: Hash256,
}

impl Ord for PriorityKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = u128::from(self.fee) * u128::from(other.blob_size);
        let rhs = u128::from(other.fee) * u128::from(self.blob_size);
        lhs.cmp(&rhs)
            .then(other.blob_size.cmp(&self.blob_size))
            .then(other.receive_time.cmp(&self.receive_time))
            .then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for PriorityKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
