//! Module `bytelog` implements component 2: a linear, offset-addressable
//! byte store for variable-length record payloads, built on the
//! coarse-grained bucket layout from [`crate::monolog`].

use std::convert::TryInto;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::err_at;
use crate::error::Result;
use crate::monolog::CoarseBytes;
use crate::serialize::Serialize;

/// 48-bit offset field (spec §4.4): a byte log cannot grow past this many
/// bytes.
pub(crate) const MAX_OFFSET: u64 = 1 << 48;

pub(crate) struct ByteLog {
    tail: AtomicU64,
    capacity: u64,
    bytes: CoarseBytes,
}

impl ByteLog {
    pub(crate) fn new(bucket_bytes: usize) -> ByteLog {
        let nbuckets = (MAX_OFFSET as usize / bucket_bytes).max(1).min(1024);
        let capacity = (nbuckets * bucket_bytes) as u64;
        ByteLog {
            tail: AtomicU64::new(0),
            capacity,
            bytes: CoarseBytes::new(bucket_bytes, nbuckets),
        }
    }

    /// Claim `[offset, offset+len)` for exclusive use by the caller. Does
    /// not allocate buckets; the caller must call `ensure_allocated` on the
    /// returned range before writing (spec §4.2). Bounded by whichever is
    /// smaller: the 48-bit offset field, or this log's actual bucket
    /// capacity (`nbuckets * bucket_bytes`, which is often the tighter
    /// limit for a small configured bucket size).
    pub(crate) fn reserve(&self, len: u64) -> Result<u64> {
        let offset = self.tail.fetch_add(len, Ordering::Relaxed);
        let cap = self.capacity.min(MAX_OFFSET);
        if offset + len > cap {
            return err_at!(
                CapacityExhausted,
                msg: "byte log offset {} exceeds {}-byte cap",
                offset + len,
                cap
            );
        }
        Ok(offset)
    }

    pub(crate) fn ensure_allocated(&self, lo: u64, hi: u64) {
        self.bytes.ensure_allocated(lo, hi)
    }

    pub(crate) fn write(&self, offset: u64, src: &[u8]) {
        self.bytes.write(offset, src)
    }

    pub(crate) fn read(&self, offset: u64, dst: &mut [u8]) {
        self.bytes.read(offset, dst)
    }

    pub(crate) fn storage_size(&self) -> usize {
        self.bytes.storage_size()
    }
}

impl Serialize for ByteLog {
    /// Bucket-size-prefixed segments (spec §6): a u64 tail, the u32 bucket
    /// size, the u32 bucket count, then one flag byte per bucket followed by
    /// its `bucket_size` raw bytes when the flag marks it allocated.
    fn encode(&self, buf: &mut Vec<u8>) {
        let bucket_size = self.bytes.bucket_size();
        let nbuckets = self.bytes.nbuckets();
        buf.extend_from_slice(&self.tail.load(Ordering::Acquire).to_le_bytes());
        buf.extend_from_slice(&(bucket_size as u32).to_le_bytes());
        buf.extend_from_slice(&(nbuckets as u32).to_le_bytes());
        let mut segment = vec![0u8; bucket_size];
        for bucket_idx in 0..nbuckets {
            if self.bytes.is_bucket_allocated(bucket_idx) {
                buf.push(1);
                self.bytes.read_bucket(bucket_idx, &mut segment);
                buf.extend_from_slice(&segment);
            } else {
                buf.push(0);
            }
        }
    }

    /// Restores into `self`, which must already be configured with the same
    /// bucket size and count the encoding was produced with (the
    /// serialised form names no bucket-layout negotiation, per spec §6 —
    /// the collaborator that persisted the log store owns that contract).
    fn decode(&mut self, buf: &[u8]) -> Result<()> {
        let tail = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        let bucket_size = u32::from_le_bytes(buf[8..12].try_into().unwrap()) as usize;
        let nbuckets = u32::from_le_bytes(buf[12..16].try_into().unwrap()) as usize;
        let mut off = 16;
        for bucket_idx in 0..nbuckets {
            let flag = buf[off];
            off += 1;
            if flag == 1 {
                self.bytes.write_bucket(bucket_idx, &buf[off..off + bucket_size]);
                off += bucket_size;
            }
        }
        self.tail.store(tail, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
#[path = "bytelog_test.rs"]
mod bytelog_test;
