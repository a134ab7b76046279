//! Core protocol types: transactions, inputs, block references.
//!
//! All monetary values are in atomic units (1 UMB = 10^12 atomic units).
//! Transaction ids are BLAKE3 hashes of the canonical bincode encoding.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TransactionError;

/// A 32-byte hash value.
///
/// Used for transaction IDs, block hashes, and payment identifiers.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The zero hash (32 zero bytes). Used as the "no block" sentinel.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create a Hash256 from a byte array.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero hash.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A key image: the double-spend tag derived from a ring input.
///
/// Opaque to this layer; equality is the only operation the pool needs.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct KeyImage(pub [u8; 32]);

impl KeyImage {
    /// Create a KeyImage from a byte array.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for KeyImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Identifies one concrete output ever produced on the chain.
///
/// Outputs are grouped per amount; `index` is the global position within
/// that amount's output sequence. Uniqueness of spends over this set is a
/// consensus rule.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub struct GlobalOutput {
    /// Output amount in atomic units.
    pub amount: u64,
    /// Global index within the amount's output sequence.
    pub index: u64,
}

impl fmt::Display for GlobalOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.amount, self.index)
    }
}

/// A transaction input.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub enum TxInput {
    /// Ring input spending one of the referenced outputs anonymously.
    ///
    /// `key_offsets` are the global indices of the ring members; the key
    /// image uniquely tags the real spend without revealing which member
    /// it is.
    ToKey {
        amount: u64,
        key_offsets: Vec<u64>,
        key_image: KeyImage,
    },
    /// Multisignature input spending one specific global output.
    Multisignature {
        amount: u64,
        output_index: u64,
    },
}

impl TxInput {
    /// The amount consumed by this input, in atomic units.
    pub fn amount(&self) -> u64 {
        match self {
            Self::ToKey { amount, .. } => *amount,
            Self::Multisignature { amount, .. } => *amount,
        }
    }
}

/// A transaction output.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct TxOutput {
    /// Value in atomic units.
    pub amount: u64,
    /// One-time destination key (opaque 32 bytes at this layer).
    pub key: [u8; 32],
}

// --- Transaction extra field tags ---

/// Single padding byte.
pub const TX_EXTRA_TAG_PADDING: u8 = 0x00;
/// Followed by the 32-byte transaction public key.
pub const TX_EXTRA_TAG_PUBKEY: u8 = 0x01;
/// Followed by a length byte and that many nonce bytes.
pub const TX_EXTRA_TAG_NONCE: u8 = 0x02;
/// Nonce prefix byte introducing a 32-byte payment identifier.
pub const TX_EXTRA_NONCE_PAYMENT_ID: u8 = 0x00;

/// Parse a payment identifier out of a transaction extra field.
///
/// Walks the TLV structure of `extra`; returns the payment id carried in a
/// nonce sub-field, or `None` if absent or the structure is malformed.
pub fn parse_payment_id(extra: &[u8]) -> Option<Hash256> {
    let mut i = 0;
    while i < extra.len() {
        match extra[i] {
            TX_EXTRA_TAG_PADDING => i += 1,
            TX_EXTRA_TAG_PUBKEY => i += 1 + 32,
            TX_EXTRA_TAG_NONCE => {
                let len = *extra.get(i + 1)? as usize;
                let nonce = extra.get(i + 2..i + 2 + len)?;
                if len == 33 && nonce[0] == TX_EXTRA_NONCE_PAYMENT_ID {
                    let mut pid = [0u8; 32];
                    pid.copy_from_slice(&nonce[1..]);
                    return Some(Hash256(pid));
                }
                i += 2 + len;
            }
            _ => return None,
        }
    }
    None
}

/// Build an extra field carrying the given payment identifier.
pub fn extra_with_payment_id(pid: &Hash256) -> Vec<u8> {
    let mut extra = Vec::with_capacity(35);
    extra.push(TX_EXTRA_TAG_NONCE);
    extra.push(33);
    extra.push(TX_EXTRA_NONCE_PAYMENT_ID);
    extra.extend_from_slice(pid.as_bytes());
    extra
}

/// A transaction transferring value between one-time keys.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    /// Protocol version.
    pub version: u64,
    /// Block height or timestamp before which outputs cannot be spent.
    pub unlock_time: u64,
    /// Inputs consuming previous outputs.
    pub inputs: Vec<TxInput>,
    /// New outputs created by this transaction.
    pub outputs: Vec<TxOutput>,
    /// Extra field: tx public key, payment id nonce, padding.
    pub extra: Vec<u8>,
}

impl Transaction {
    /// Canonical encoding of this transaction.
    ///
    /// Uses bincode with standard config for deterministic serialization.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| TransactionError::Serialization(e.to_string()))
    }

    /// Compute the transaction ID (BLAKE3 hash of the canonical encoding).
    pub fn id(&self) -> Result<Hash256, TransactionError> {
        Ok(Hash256(blake3::hash(&self.canonical_bytes()?).into()))
    }

    /// Serialized size of the canonical encoding, in bytes.
    pub fn blob_size(&self) -> Result<u64, TransactionError> {
        Ok(self.canonical_bytes()?.len() as u64)
    }

    /// Sum of all input amounts. Returns `None` on overflow.
    pub fn total_input_amount(&self) -> Option<u64> {
        self.inputs
            .iter()
            .try_fold(0u64, |acc, i| acc.checked_add(i.amount()))
    }

    /// Sum of all output amounts. Returns `None` on overflow.
    pub fn total_output_amount(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, o| acc.checked_add(o.amount))
    }

    /// Transaction fee: inputs minus outputs.
    ///
    /// `Err` when either sum overflows or outputs exceed inputs.
    pub fn fee(&self) -> Result<u64, TransactionError> {
        let inputs = self
            .total_input_amount()
            .ok_or(TransactionError::InvalidAmounts)?;
        let outputs = self
            .total_output_amount()
            .ok_or(TransactionError::InvalidAmounts)?;
        inputs
            .checked_sub(outputs)
            .ok_or(TransactionError::InvalidAmounts)
    }

    /// Key images of all ring inputs.
    pub fn key_images(&self) -> impl Iterator<Item = &KeyImage> + '_ {
        self.inputs.iter().filter_map(|input| match input {
            TxInput::ToKey { key_image, .. } => Some(key_image),
            TxInput::Multisignature { .. } => None,
        })
    }

    /// Global outputs consumed by multisignature inputs.
    pub fn spent_global_outputs(&self) -> impl Iterator<Item = GlobalOutput> + '_ {
        self.inputs.iter().filter_map(|input| match input {
            TxInput::Multisignature {
                amount,
                output_index,
            } => Some(GlobalOutput {
                amount: *amount,
                index: *output_index,
            }),
            TxInput::ToKey { .. } => None,
        })
    }

    /// Payment identifier carried in the extra field, if any.
    pub fn payment_id(&self) -> Option<Hash256> {
        parse_payment_id(&self.extra)
    }
}

/// Reference to a block by height and hash.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct BlockInfo {
    /// Block height; `u64::MAX` in the `NONE` sentinel.
    pub height: u64,
    /// Block hash; zero in the `NONE` sentinel.
    pub hash: Hash256,
}

impl BlockInfo {
    /// Sentinel meaning "no block recorded".
    pub const NONE: Self = Self {
        height: u64::MAX,
        hash: Hash256::ZERO,
    };

    /// Create a block reference.
    pub fn new(height: u64, hash: Hash256) -> Self {
        Self { height, hash }
    }

    /// Check whether this is the "no block" sentinel.
    pub fn is_none(&self) -> bool {
        self.height == u64::MAX && self.hash.is_zero()
    }
}

impl Default for BlockInfo {
    fn default() -> Self {
        Self::NONE
    }
}

/// A candidate block skeleton being filled with pool transactions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockTemplate {
    /// Protocol major version.
    pub major_version: u8,
    /// Hash of the current chain tip this template extends.
    pub prev_hash: Hash256,
    /// Proposed block timestamp (Unix seconds).
    pub timestamp: u64,
    /// Selected transaction ids, in inclusion order.
    pub tx_hashes: Vec<Hash256>,
}
