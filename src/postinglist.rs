//! Module `postinglist` implements component 3: an append-only sequence of
//! record ids under one (index, token value) key, or under one stream.
//!
//! Two consistency modes are provided (spec §4.3):
//!
//! * [PostingList] — "relaxed": a single atomic tail. `size()` may include
//!   a slot whose write has been claimed but not yet completed; callers
//!   compensate with an externally supplied visibility ceiling (I6). Used
//!   by tiered-index leaves.
//! * [ConsistentPostingList] — a `write_tail` claims slots, a `read_tail`
//!   is CAS-advanced only after the write completes, so `size()` never
//!   exposes an uninitialised slot. Used by streams.

use std::convert::TryInto;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::Result;
use crate::monolog::FineLog;
use crate::serialize::Serialize;

/// Relaxed-consistency posting list (spec §4.3, "the engine uses the
/// relaxed variant for secondary-index postings").
pub(crate) struct PostingList {
    tail: AtomicU32,
    data: FineLog,
}

impl PostingList {
    pub(crate) fn new() -> PostingList {
        PostingList {
            tail: AtomicU32::new(0),
            data: FineLog::new(),
        }
    }

    /// Claim the next slot and write `r` into it. May be observed by a
    /// concurrent `size()` before the write below completes.
    pub(crate) fn push_back(&self, r: u64) {
        let idx = self.tail.fetch_add(1, Ordering::Relaxed);
        self.data.ensure_allocated(idx, idx + 1);
        self.data.store(idx, r);
    }

    pub(crate) fn size(&self) -> u32 {
        self.tail.load(Ordering::Acquire)
    }

    pub(crate) fn get(&self, idx: u32) -> u64 {
        self.data.load(idx)
    }

    /// Iterate the ids visible at the moment of the call, i.e. up to the
    /// snapshotted `size()`, in posting order.
    pub(crate) fn iter_snapshot(&self) -> impl Iterator<Item = u64> + '_ {
        let n = self.size();
        (0..n).map(move |i| self.get(i))
    }

    /// Encode as a u32 length followed by that many little-endian u64
    /// record ids (spec §6).
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        let n = self.size();
        buf.extend_from_slice(&n.to_le_bytes());
        for i in 0..n {
            buf.extend_from_slice(&self.get(i).to_le_bytes());
        }
    }

    pub(crate) fn decode(buf: &[u8]) -> (PostingList, usize) {
        let n = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        let list = PostingList::new();
        let mut off = 4;
        for i in 0..n {
            let r = u64::from_le_bytes(buf[off..off + 8].try_into().unwrap());
            list.data.ensure_allocated(i, i + 1);
            list.data.store(i, r);
            off += 8;
        }
        list.tail.store(n, Ordering::Release);
        (list, off)
    }
}

impl Serialize for PostingList {
    fn encode(&self, buf: &mut Vec<u8>) {
        PostingList::encode(self, buf)
    }

    /// Replaces this list's contents with what `buf` decodes to. `buf` may
    /// carry trailing bytes belonging to a sibling encoding; only the
    /// consumed prefix is used.
    fn decode(&mut self, buf: &[u8]) -> Result<()> {
        let (decoded, _consumed) = PostingList::decode(buf);
        let size = decoded.size();
        self.data = decoded.data;
        self.tail.store(size, Ordering::Release);
        Ok(())
    }
}

/// Consistent-ordering posting list (spec §4.3, "the consistent variant
/// for streams").
pub(crate) struct ConsistentPostingList {
    write_tail: AtomicU32,
    read_tail: AtomicU32,
    data: FineLog,
}

impl ConsistentPostingList {
    pub(crate) fn new() -> ConsistentPostingList {
        ConsistentPostingList {
            write_tail: AtomicU32::new(0),
            read_tail: AtomicU32::new(0),
            data: FineLog::new(),
        }
    }

    /// Claim a slot, write `r`, then spin-advance `read_tail` so that
    /// publication order matches claim order, matching the offset log's
    /// `end_append` discipline (spec §4.4).
    pub(crate) fn push_back(&self, r: u64) {
        let idx = self.write_tail.fetch_add(1, Ordering::Relaxed);
        self.data.ensure_allocated(idx, idx + 1);
        self.data.store(idx, r);
        loop {
            match self.read_tail.compare_exchange(
                idx,
                idx + 1,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(_) => std::hint::spin_loop(),
            }
        }
    }

    pub(crate) fn size(&self) -> u32 {
        self.read_tail.load(Ordering::Acquire)
    }

    pub(crate) fn get(&self, idx: u32) -> u64 {
        self.data.load(idx)
    }

    pub(crate) fn iter_snapshot(&self) -> impl Iterator<Item = u64> + '_ {
        let n = self.size();
        (0..n).map(move |i| self.get(i))
    }
}

#[cfg(test)]
#[path = "postinglist_test.rs"]
mod postinglist_test;
