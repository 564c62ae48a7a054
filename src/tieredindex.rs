//! Module `tieredindex` implements component 5: a tree mapping a
//! fixed-width unsigned token value to a posting list via 1-4 levels of
//! sparse arrays (spec §3 "Tiered index shape", §4.5).
//!
//! Interior nodes ("indexlets") are dense arrays of atomic child pointers,
//! lazily allocated via the same CAS-publish protocol as
//! [`crate::monolog`]. Width determines the chunking of the token value
//! and thus the tree's depth and per-level fan-out:
//!
//! | width | depth | fan-outs |
//! |---|---|---|
//! | 1 | 1 | 256 |
//! | 2 | 1 | 65536 |
//! | 3 | 2 | 65536, 256 |
//! | 4 | 2 | 65536, 65536 |
//! | 5 | 3 | 65536, 65536, 256 |
//! | 6 | 3 | 65536, 65536, 65536 |
//! | 7 | 4 | 65536, 65536, 65536, 256 |
//! | 8 | 4 | 65536, 65536, 65536, 65536 |

use std::convert::TryInto;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::error::Result;
use crate::postinglist::PostingList;
use crate::serialize::Serialize;

/// The per-level chunk widths (in bits) for a token of `width` bytes, most
/// significant chunk first. Two-byte (65536-way) chunks are peeled off the
/// top until one byte (256-way) remains, matching the width/depth table.
pub(crate) fn chunk_bits(width: u8) -> Vec<u32> {
    let mut chunks = Vec::new();
    let mut remaining = width;
    while remaining >= 2 {
        chunks.push(16);
        remaining -= 2;
    }
    if remaining == 1 {
        chunks.push(8);
    }
    chunks
}

fn fanout_for_bits(bits: u32) -> usize {
    1usize << bits
}

/// Split `value` into its per-level chunks, most significant first.
pub(crate) fn decompose(value: u64, bits: &[u32]) -> Vec<u32> {
    let total: u32 = bits.iter().sum();
    let mut shift = total;
    let mut parts = Vec::with_capacity(bits.len());
    for &b in bits {
        shift -= b;
        let mask: u64 = (1u64 << b) - 1;
        parts.push(((value >> shift) & mask) as u32);
    }
    parts
}

enum Child {
    Node(Indexlet),
    Leaf(PostingList),
}

/// A dense array of atomic pointers to the next level (spec's "indexlet").
struct Indexlet {
    slots: Vec<AtomicPtr<Child>>,
}

impl Indexlet {
    fn new(fanout: usize) -> Indexlet {
        let mut slots = Vec::with_capacity(fanout);
        slots.resize_with(fanout, || AtomicPtr::new(std::ptr::null_mut()));
        Indexlet { slots }
    }

    fn get(&self, slot: usize) -> *mut Child {
        self.slots[slot].load(Ordering::Acquire)
    }

    fn get_or_create(&self, slot: usize, make: impl FnOnce() -> Child) -> *mut Child {
        let existing = self.get(slot);
        if !existing.is_null() {
            return existing;
        }
        let fresh = Box::into_raw(Box::new(make()));
        match self.slots[slot].compare_exchange(
            std::ptr::null_mut(),
            fresh,
            Ordering::Release,
            Ordering::Acquire,
        ) {
            Ok(_) => fresh,
            Err(_) => {
                unsafe { drop(Box::from_raw(fresh)) };
                self.slots[slot].load(Ordering::Acquire)
            }
        }
    }
}

impl Drop for Indexlet {
    fn drop(&mut self) {
        for slot in self.slots.iter_mut() {
            let ptr = *slot.get_mut();
            if !ptr.is_null() {
                unsafe { drop(Box::from_raw(ptr)) };
            }
        }
    }
}

unsafe impl Send for Indexlet {}
unsafe impl Sync for Indexlet {}

pub(crate) struct TieredIndex {
    width: u8,
    bits: Vec<u32>,
    root: Indexlet,
}

impl TieredIndex {
    pub(crate) fn new(width: u8) -> TieredIndex {
        let bits = chunk_bits(width);
        let root_fanout = fanout_for_bits(bits[0]);
        TieredIndex {
            width,
            bits,
            root: Indexlet::new(root_fanout),
        }
    }

    pub(crate) fn width(&self) -> u8 {
        self.width
    }

    pub(crate) fn depth(&self) -> usize {
        self.bits.len()
    }

    /// Traverse, allocating each missing level via CAS-publish; push `r`
    /// onto the leaf posting list (spec §4.5 `add_entry`).
    pub(crate) fn add_entry(&self, value: u64, r: u64) {
        let parts = decompose(value, &self.bits);
        let depth = parts.len();
        let mut node = &self.root;
        for (level, &slot) in parts.iter().enumerate() {
            if level + 1 < depth {
                let next_fanout = fanout_for_bits(self.bits[level + 1]);
                let child = node.get_or_create(slot as usize, || Child::Node(Indexlet::new(next_fanout)));
                // SAFETY: `child` was published with release ordering by
                // `get_or_create` and is never freed while `self` is alive.
                node = match unsafe { &*child } {
                    Child::Node(indexlet) => indexlet,
                    Child::Leaf(_) => unreachable!("depth mismatch in tiered index"),
                };
            } else {
                let leaf = node.get_or_create(slot as usize, || Child::Leaf(PostingList::new()));
                match unsafe { &*leaf } {
                    Child::Leaf(posting_list) => posting_list.push_back(r),
                    Child::Node(_) => unreachable!("depth mismatch in tiered index"),
                }
            }
        }
    }

    /// Traverse without allocating; `None` if any slot along the path is
    /// null (spec §4.5 `lookup`).
    pub(crate) fn lookup(&self, value: u64) -> Option<&PostingList> {
        let parts = decompose(value, &self.bits);
        let depth = parts.len();
        let mut node = &self.root;
        for (level, &slot) in parts.iter().enumerate() {
            let child = node.get(slot as usize);
            if child.is_null() {
                return None;
            }
            // SAFETY: non-null slot was published with release ordering;
            // we observed it with acquire ordering in `Indexlet::get`.
            let child_ref = unsafe { &*child };
            if level + 1 < depth {
                node = match child_ref {
                    Child::Node(indexlet) => indexlet,
                    Child::Leaf(_) => unreachable!("depth mismatch in tiered index"),
                };
            } else {
                return match child_ref {
                    Child::Leaf(posting_list) => Some(posting_list),
                    Child::Node(_) => unreachable!("depth mismatch in tiered index"),
                };
            }
        }
        None
    }

    pub(crate) fn storage_size(&self) -> usize {
        fn walk(indexlet: &Indexlet) -> usize {
            let mut size = indexlet.slots.len() * std::mem::size_of::<AtomicPtr<Child>>();
            for slot in indexlet.slots.iter() {
                let ptr = slot.load(Ordering::Acquire);
                if !ptr.is_null() {
                    size += std::mem::size_of::<Child>();
                    match unsafe { &*ptr } {
                        Child::Node(child) => size += walk(child),
                        Child::Leaf(_) => {}
                    }
                }
            }
            size
        }
        walk(&self.root)
    }
}

/// Collect every populated leaf as `(path_value, posting_list)`, walking the
/// tree in slot order. `path_value` is reassembled with the same per-level
/// shifts `decompose` used to split it, so it equals the original token
/// value that reached `add_entry`.
fn walk_leaves<'a>(node: &'a Indexlet, bits: &[u32], level: usize, prefix: u64, out: &mut Vec<(u64, &'a PostingList)>) {
    let depth = bits.len();
    for (slot, atomic) in node.slots.iter().enumerate() {
        let ptr = atomic.load(Ordering::Acquire);
        if ptr.is_null() {
            continue;
        }
        // SAFETY: non-null slot was published with release ordering and is
        // never freed while `node` is alive.
        let child = unsafe { &*ptr };
        let next_prefix = (prefix << bits[level]) | slot as u64;
        if level + 1 < depth {
            match child {
                Child::Node(indexlet) => walk_leaves(indexlet, bits, level + 1, next_prefix, out),
                Child::Leaf(_) => unreachable!("depth mismatch in tiered index"),
            }
        } else {
            match child {
                Child::Leaf(posting_list) => out.push((next_prefix, posting_list)),
                Child::Node(_) => unreachable!("depth mismatch in tiered index"),
            }
        }
    }
}

impl Serialize for TieredIndex {
    /// Spec §6: a u64 populated-leaf count, then per leaf the concatenated
    /// chunk path as a single `width`-byte unsigned integer followed by a
    /// posting list.
    fn encode(&self, buf: &mut Vec<u8>) {
        let mut leaves = Vec::new();
        walk_leaves(&self.root, &self.bits, 0, 0, &mut leaves);
        buf.extend_from_slice(&(leaves.len() as u64).to_le_bytes());
        let width = self.width as usize;
        for (value, posting_list) in leaves {
            let be = value.to_be_bytes();
            buf.extend_from_slice(&be[8 - width..]);
            posting_list.encode(buf);
        }
    }

    /// Replays each leaf's postings through `add_entry`, so `self` must
    /// already be a freshly constructed `TieredIndex` of the matching width.
    fn decode(&mut self, buf: &[u8]) -> Result<()> {
        let count = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        let width = self.width as usize;
        let mut off = 8;
        for _ in 0..count {
            let mut value_bytes = [0u8; 8];
            value_bytes[8 - width..].copy_from_slice(&buf[off..off + width]);
            let value = u64::from_be_bytes(value_bytes);
            off += width;
            let (posting_list, consumed) = PostingList::decode(&buf[off..]);
            off += consumed;
            for record_id in posting_list.iter_snapshot() {
                self.add_entry(value, record_id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tieredindex_test.rs"]
mod tieredindex_test;
