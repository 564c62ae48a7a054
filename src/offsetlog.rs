//! Module `offsetlog` implements component 4: the publication boundary of
//! the entire store. Maps `record_id -> (byte_offset, length)` and carries
//! the monotonic write/read tails that give the engine its visibility
//! protocol (spec §3 I1-I3, §4.4).

use std::convert::TryInto;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::err_at;
use crate::error::Result;
use crate::monolog::CoarseWords;
use crate::serialize::Serialize;

/// 16-bit length field (spec §4.4): a single record cannot exceed this.
pub(crate) const MAX_LENGTH: u64 = (1 << 16) - 1;

fn pack(offset: u64, length: u64) -> u64 {
    (length << 48) | offset
}

fn unpack(word: u64) -> (u64, u64) {
    (word & ((1 << 48) - 1), word >> 48)
}

pub(crate) struct OffsetLog {
    write_tail: AtomicU64,
    read_tail: AtomicU64,
    capacity: u64,
    words: CoarseWords,
}

impl OffsetLog {
    pub(crate) fn new(bucket_entries: usize) -> OffsetLog {
        // coarse-grained variant: up to 1024 buckets (spec §4.1), same cap
        // the byte log uses.
        let nbuckets = 1024;
        let capacity = (nbuckets * bucket_entries) as u64;
        OffsetLog {
            write_tail: AtomicU64::new(0),
            read_tail: AtomicU64::new(0),
            capacity,
            words: CoarseWords::new(bucket_entries, nbuckets),
        }
    }

    /// Assign a record id and record its (offset, length) entry. The id is
    /// not yet visible; callers must follow with `end_append`. Fails once
    /// assigned ids would exceed this log's bucket capacity
    /// (`nbuckets * bucket_entries`), the same cap `ByteLog::reserve` checks.
    pub(crate) fn begin_append(&self, byte_offset: u64, length: u64) -> Result<u64> {
        let id = self.write_tail.fetch_add(1, Ordering::Relaxed);
        if id >= self.capacity {
            return err_at!(
                CapacityExhausted,
                msg: "offset log record id {} exceeds {}-entry cap",
                id,
                self.capacity
            );
        }
        self.words.ensure_allocated(id, id + 1);
        self.words.store(id, pack(byte_offset, length));
        Ok(id)
    }

    /// Publish `record_id`. Spins until every id below it has already
    /// published, so publication order equals assignment order (I1-I3).
    pub(crate) fn end_append(&self, record_id: u64) {
        loop {
            match self.read_tail.compare_exchange(
                record_id,
                record_id + 1,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(_) => std::hint::spin_loop(),
            }
        }
    }

    /// Claim `n` consecutive ids in one fetch-add.
    pub(crate) fn reserve_ids(&self, n: u64) -> Result<u64> {
        let start = self.write_tail.fetch_add(n, Ordering::Relaxed);
        if start + n > self.capacity {
            return err_at!(
                CapacityExhausted,
                msg: "offset log range [{}, {}) exceeds {}-entry cap",
                start,
                start + n,
                self.capacity
            );
        }
        self.words.ensure_allocated(start, start + n);
        Ok(start)
    }

    pub(crate) fn write_entry(&self, record_id: u64, byte_offset: u64, length: u64) {
        self.words.store(record_id, pack(byte_offset, length));
    }

    /// Publish `[start_id, start_id+n)` as a single unit.
    pub(crate) fn end_append_range(&self, start_id: u64, n: u64) {
        loop {
            match self.read_tail.compare_exchange(
                start_id,
                start_id + n,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(_) => std::hint::spin_loop(),
            }
        }
    }

    pub(crate) fn lookup(&self, record_id: u64) -> (u64, u64) {
        unpack(self.words.load(record_id))
    }

    pub(crate) fn is_visible(&self, record_id: u64) -> bool {
        record_id < self.read_tail.load(Ordering::Acquire)
    }

    pub(crate) fn is_visible_at(&self, record_id: u64, ceiling: u64) -> bool {
        record_id < ceiling
    }

    pub(crate) fn num_visible(&self) -> u64 {
        self.read_tail.load(Ordering::Acquire)
    }

    pub(crate) fn storage_size(&self) -> usize {
        self.words.storage_size() + std::mem::size_of::<Self>()
    }
}

impl Serialize for OffsetLog {
    /// Growable-array-of-u64 format (spec §6): a u32 logical size, that many
    /// little-endian u64 words, then the `read_tail` (spec's "equals
    /// write_tail at quiescent serialisation time"). Assumes fewer than
    /// 2^32 ids, matching the generic growable-array encoding's own size
    /// field width.
    fn encode(&self, buf: &mut Vec<u8>) {
        let n = self.write_tail.load(Ordering::Acquire);
        buf.extend_from_slice(&(n as u32).to_le_bytes());
        for i in 0..n {
            buf.extend_from_slice(&self.words.load(i).to_le_bytes());
        }
        buf.extend_from_slice(&self.read_tail.load(Ordering::Acquire).to_le_bytes());
    }

    fn decode(&mut self, buf: &[u8]) -> Result<()> {
        let n = u32::from_le_bytes(buf[0..4].try_into().unwrap()) as u64;
        let mut off = 4;
        self.words.ensure_allocated(0, n);
        for i in 0..n {
            let word = u64::from_le_bytes(buf[off..off + 8].try_into().unwrap());
            self.words.store(i, word);
            off += 8;
        }
        let read_tail = u64::from_le_bytes(buf[off..off + 8].try_into().unwrap());
        self.write_tail.store(n, Ordering::Release);
        self.read_tail.store(read_tail, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
#[path = "offsetlog_test.rs"]
mod offsetlog_test;
