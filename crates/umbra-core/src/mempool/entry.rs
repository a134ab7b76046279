//! Pool entry records.

use serde::{Deserialize, Serialize};

use crate::mempool::priority::PriorityKey;
use crate::types::{BlockInfo, Hash256, Transaction};

/// Cached validator verdicts for a pooled transaction.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct TransactionCheckInfo {
    /// The most recent block any input references; `NONE` until validated.
    pub max_used_block: BlockInfo,
    /// The block at which validation most recently failed; `NONE` if never.
    pub last_failed_block: BlockInfo,
}

/// A transaction held in the pool, with admission metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolEntry {
    /// Transaction id (primary key).
    pub id: Hash256,
    /// The transaction body.
    pub tx: Transaction,
    /// Canonical serialized size in bytes (at least 1).
    pub blob_size: u64,
    /// Fee in atomic units.
    pub fee: u64,
    /// Whether the entry came from a disconnected block (liberal
    /// double-spend and lifetime policy).
    pub kept_by_block: bool,
    /// Seconds since epoch of first admission.
    pub receive_time: u64,
    /// Cached validator verdicts.
    pub check_info: TransactionCheckInfo,
}

impl PoolEntry {
    /// Key under which this entry is ranked in the priority index.
    pub(crate) fn priority_key(&self) -> PriorityKey {
        PriorityKey {
            fee: self.fee,
            blob_size: self.blob_size,
            receive_time: self.receive_time,
            id: self.id,
        }
    }
}

/// Transaction withdrawn from the pool for block inclusion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TakenTransaction {
    /// The transaction body.
    pub tx: Transaction,
    /// Canonical serialized size in bytes.
    pub blob_size: u64,
    /// Fee in atomic units.
    pub fee: u64,
}
