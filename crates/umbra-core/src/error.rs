//! Error types for the Umbra protocol.
use thiserror::Error;

use crate::types::Hash256;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("serialization: {0}")] Serialization(String),
    #[error("outputs exceed inputs or amount overflow")] InvalidAmounts,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MempoolError {
    #[error("fee too low: {fee} < minimum {minimum}")] FeeTooLow { fee: u64, minimum: u64 },
    #[error("transaction inputs failed validation")] InvalidInputs,
    #[error("double spend: key image or global output already used by a pool transaction")] DoubleSpend,
    #[error("transaction already in pool: {0}")] AlreadyPresent(Hash256),
    #[error("internal: {0}")] Internal(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("corrupt pool state: {0}")] Corrupt(String),
    #[error("io: {0}")] Io(String),
}
