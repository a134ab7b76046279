//! On-disk pool snapshot: `poolstate.bin`.
//!
//! Layout (all integers little-endian, varints LEB128):
//!
//! ```text
//! magic            [u8; 4] = "UMPL"
//! version          u32
//! entry count      varint
//! entries          id[32] | blob_size varint | fee varint | kept u8 |
//!                  receive_time i64 | max_used_block | last_failed_block |
//!                  blob len varint | canonical tx blob
//! deleted count    varint
//! deleted          (id[32] | time i64) pairs
//! ```
//!
//! Block references are a varint height followed by a 32-byte hash. The
//! writer goes through a temp file with an fsync and an atomic rename.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::error::PersistenceError;
use crate::mempool::entry::{PoolEntry, TransactionCheckInfo};
use crate::types::{BlockInfo, Hash256, Transaction};

pub(crate) const POOLSTATE_MAGIC: [u8; 4] = *b"UMPL";
pub(crate) const POOLSTATE_VERSION: u32 = 1;
pub(crate) const POOLSTATE_FILENAME: &str = "poolstate.bin";

/// Everything the pool persists across restarts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct PoolSnapshot {
    pub entries: Vec<PoolEntry>,
    pub recently_deleted: Vec<(Hash256, u64)>,
}

// --- varint ---

fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            buf.push(byte | 0x80);
        } else {
            buf.push(byte);
            return;
        }
    }
}

// --- reader over the raw file bytes ---

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], PersistenceError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| PersistenceError::Corrupt("truncated file".into()))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, PersistenceError> {
        Ok(self.take(1)?[0])
    }

    fn u32_le(&mut self) -> Result<u32, PersistenceError> {
        let bytes: [u8; 4] = self.take(4)?.try_into().expect("4 bytes");
        Ok(u32::from_le_bytes(bytes))
    }

    fn i64_le(&mut self) -> Result<i64, PersistenceError> {
        let bytes: [u8; 8] = self.take(8)?.try_into().expect("8 bytes");
        Ok(i64::from_le_bytes(bytes))
    }

    fn hash(&mut self) -> Result<Hash256, PersistenceError> {
        let bytes: [u8; 32] = self.take(32)?.try_into().expect("32 bytes");
        Ok(Hash256(bytes))
    }

    fn varint(&mut self) -> Result<u64, PersistenceError> {
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let byte = self.u8()?;
            let bits = u64::from(byte & 0x7F);
            if shift == 63 && bits > 1 {
                return Err(PersistenceError::Corrupt("varint overflow".into()));
            }
            value |= bits << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(PersistenceError::Corrupt("varint too long".into()))
    }

    fn at_end(&self) -> bool {
        self.pos == self.buf.len()
    }
}

// --- block reference ---

fn write_block_info(buf: &mut Vec<u8>, info: &BlockInfo) {
    write_varint(buf, info.height);
    buf.extend_from_slice(info.hash.as_bytes());
}

fn read_block_info(r: &mut Reader<'_>) -> Result<BlockInfo, PersistenceError> {
    let height = r.varint()?;
    let hash = r.hash()?;
    Ok(BlockInfo { height, hash })
}

// --- snapshot codec ---

pub(crate) fn encode(snapshot: &PoolSnapshot) -> Result<Vec<u8>, PersistenceError> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&POOLSTATE_MAGIC);
    buf.extend_from_slice(&POOLSTATE_VERSION.to_le_bytes());

    write_varint(&mut buf, snapshot.entries.len() as u64);
    for entry in &snapshot.entries {
        let blob = entry
            .tx
            .canonical_bytes()
            .map_err(|e| PersistenceError::Io(format!("encode transaction: {e}")))?;
        buf.extend_from_slice(entry.id.as_bytes());
        write_varint(&mut buf, entry.blob_size);
        write_varint(&mut buf, entry.fee);
        buf.push(u8::from(entry.kept_by_block));
        buf.extend_from_slice(&(entry.receive_time as i64).to_le_bytes());
        write_block_info(&mut buf, &entry.check_info.max_used_block);
        write_block_info(&mut buf, &entry.check_info.last_failed_block);
        write_varint(&mut buf, blob.len() as u64);
        buf.extend_from_slice(&blob);
    }

    write_varint(&mut buf, snapshot.recently_deleted.len() as u64);
    for (id, time) in &snapshot.recently_deleted {
        buf.extend_from_slice(id.as_bytes());
        buf.extend_from_slice(&(*time as i64).to_le_bytes());
    }

    Ok(buf)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<PoolSnapshot, PersistenceError> {
    let mut r = Reader::new(bytes);

    if r.take(4)? != POOLSTATE_MAGIC {
        return Err(PersistenceError::Corrupt("bad magic".into()));
    }
    let version = r.u32_le()?;
    if version != POOLSTATE_VERSION {
        return Err(PersistenceError::Corrupt(format!(
            "unsupported version {version}"
        )));
    }

    let entry_count = r.varint()?;
    let mut entries = Vec::new();
    for _ in 0..entry_count {
        let id = r.hash()?;
        let blob_size = r.varint()?;
        let fee = r.varint()?;
        let kept_by_block = match r.u8()? {
            0 => false,
            1 => true,
            b => {
                return Err(PersistenceError::Corrupt(format!(
                    "bad kept-by-block byte {b:#x}"
                )))
            }
        };
        let receive_time = r.i64_le()?;
        if receive_time < 0 {
            return Err(PersistenceError::Corrupt("negative receive time".into()));
        }
        let max_used_block = read_block_info(&mut r)?;
        let last_failed_block = read_block_info(&mut r)?;

        let blob_len = r.varint()? as usize;
        let blob = r.take(blob_len)?;
        if blob_size != blob_len as u64 {
            return Err(PersistenceError::Corrupt("blob size mismatch".into()));
        }
        if Hash256(blake3::hash(blob).into()) != id {
            return Err(PersistenceError::Corrupt("blob does not match id".into()));
        }
        let (tx, consumed): (Transaction, usize) =
            bincode::decode_from_slice(blob, bincode::config::standard())
                .map_err(|e| PersistenceError::Corrupt(format!("transaction blob: {e}")))?;
        if consumed != blob_len {
            return Err(PersistenceError::Corrupt("trailing bytes in blob".into()));
        }

        entries.push(PoolEntry {
            id,
            tx,
            blob_size,
            fee,
            kept_by_block,
            receive_time: receive_time as u64,
            check_info: TransactionCheckInfo {
                max_used_block,
                last_failed_block,
            },
        });
    }

    let deleted_count = r.varint()?;
    let mut recently_deleted = Vec::new();
    for _ in 0..deleted_count {
        let id = r.hash()?;
        let time = r.i64_le()?;
        if time < 0 {
            return Err(PersistenceError::Corrupt("negative deletion time".into()));
        }
        recently_deleted.push((id, time as u64));
    }

    if !r.at_end() {
        return Err(PersistenceError::Corrupt("trailing bytes".into()));
    }

    Ok(PoolSnapshot {
        entries,
        recently_deleted,
    })
}

// --- file io ---

/// Write a snapshot atomically: temp file, fsync, rename.
pub(crate) fn save(path: &Path, snapshot: &PoolSnapshot) -> Result<(), PersistenceError> {
    let bytes = encode(snapshot)?;
    let tmp = path.with_file_name(format!("{POOLSTATE_FILENAME}.tmp"));

    let mut file = File::create(&tmp).map_err(|e| PersistenceError::Io(e.to_string()))?;
    file.write_all(&bytes)
        .map_err(|e| PersistenceError::Io(e.to_string()))?;
    file.sync_all()
        .map_err(|e| PersistenceError::Io(e.to_string()))?;
    drop(file);

    fs::rename(&tmp, path).map_err(|e| PersistenceError::Io(e.to_string()))
}

/// Load a snapshot. `Corrupt` errors mean the file should be discarded.
pub(crate) fn load(path: &Path) -> Result<PoolSnapshot, PersistenceError> {
    let bytes = fs::read(path).map_err(|e| PersistenceError::Io(e.to_string()))?;
    decode(&bytes)
}
