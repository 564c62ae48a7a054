//! Module `monolog` implements the bucketed, grow-on-demand array that
//! every other storage component in this crate is built on.
//!
//! Two layouts are provided, matching spec §4.1:
//!
//! * [FineLog] — double-spaced bucket sizing (`FBS = 16`), used where many
//!   small, independently-growing arrays are needed (posting lists).
//! * [CoarseBytes] / [CoarseWords] — fixed-size buckets, used where one huge
//!   linearly addressed array is needed (the byte log, the offset log).
//!
//! All three share one allocation discipline: a bucket slot starts out
//! null; the first writer to touch it allocates a zeroed region and
//! publishes the pointer with `compare_exchange` (release); a losing
//! allocator drops its region and re-reads the winner's pointer (acquire).
//! This is the exact protocol used by the teacher's MVCC root swap
//! (`llrb_mvcc.rs`: `Arc::into_raw`/`compare_exchange`/`Arc::from_raw`),
//! specialised here to plain heap buckets instead of `Arc<T>` roots.

use std::sync::atomic::{AtomicPtr, AtomicU64, Ordering};

use crate::bits::highest_bit;

/// Bias added to a fine-grained index before bucket math, so that bucket 0
/// always holds `FBS` elements and later buckets double in size.
const FBS: u32 = 16;
const FBS_HIBIT: u32 = 4;
/// `ceil(log2(2^31 / FBS))` rounded up; gives logical capacity ~2^31.
const FINE_NBUCKETS: usize = 32;

#[inline]
fn fine_locate(idx: u32) -> (usize, u32, u32) {
    let pos = idx + FBS;
    let hibit = highest_bit(pos);
    let bucket_off = pos ^ (1 << hibit);
    let bucket_idx = (hibit - FBS_HIBIT) as usize;
    let bucket_len = 1u32 << hibit;
    (bucket_idx, bucket_off, bucket_len)
}

fn alloc_u64_bucket(len: u32) -> *mut AtomicU64 {
    let mut v: Vec<AtomicU64> = Vec::with_capacity(len as usize);
    for _ in 0..len {
        v.push(AtomicU64::new(0));
    }
    Box::into_raw(v.into_boxed_slice()) as *mut AtomicU64
}

/// Install `new_bucket` into `slot` if it is still null; otherwise drop the
/// loser and return the winner, already observed with acquire ordering.
fn publish_u64_bucket(slot: &AtomicPtr<AtomicU64>, new_bucket: *mut AtomicU64, len: u32) -> *mut AtomicU64 {
    match slot.compare_exchange(
        std::ptr::null_mut(),
        new_bucket,
        Ordering::Release,
        Ordering::Acquire,
    ) {
        Ok(_) => new_bucket,
        Err(_) => {
            // SAFETY: we are the exclusive owner of `new_bucket`, nobody else saw it.
            unsafe {
                drop(Box::from_raw(std::slice::from_raw_parts_mut(
                    new_bucket, len as usize,
                )));
            }
            slot.load(Ordering::Acquire)
        }
    }
}

/// Fine-grained, grow-on-demand array of `AtomicU64`. The substrate for
/// [`crate::postinglist::PostingList`].
pub(crate) struct FineLog {
    buckets: [AtomicPtr<AtomicU64>; FINE_NBUCKETS],
}

impl FineLog {
    pub(crate) fn new() -> FineLog {
        FineLog {
            buckets: std::array::from_fn(|_| AtomicPtr::new(std::ptr::null_mut())),
        }
    }

    fn bucket(&self, bucket_idx: usize, bucket_len: u32) -> *mut AtomicU64 {
        let slot = &self.buckets[bucket_idx];
        let existing = slot.load(Ordering::Acquire);
        if !existing.is_null() {
            return existing;
        }
        let fresh = alloc_u64_bucket(bucket_len);
        publish_u64_bucket(slot, fresh, bucket_len)
    }

    /// Allocate every bucket covering `[lo, hi)`. Idempotent; safe to call
    /// from multiple racing writers (see spec §4.1's `ensure_allocated`).
    pub(crate) fn ensure_allocated(&self, lo: u32, hi: u32) {
        if hi <= lo {
            return;
        }
        let (first, _, _) = fine_locate(lo);
        let (last, _, _) = fine_locate(hi - 1);
        for bucket_idx in first..=last {
            let bucket_len = 1u32 << (bucket_idx as u32 + FBS_HIBIT);
            self.bucket(bucket_idx, bucket_len);
        }
    }

    /// Store `val` at `idx` with release ordering, allocating the bucket
    /// first if necessary.
    pub(crate) fn store(&self, idx: u32, val: u64) {
        let (bucket_idx, bucket_off, bucket_len) = fine_locate(idx);
        let bucket = self.bucket(bucket_idx, bucket_len);
        // SAFETY: `bucket` was published by `compare_exchange(Release)` and
        // points to `bucket_len` initialised `AtomicU64`s; `bucket_off <
        // bucket_len` by construction of `fine_locate`.
        unsafe { (*bucket.add(bucket_off as usize)).store(val, Ordering::Release) };
    }

    /// Load the value at `idx` with acquire ordering. `idx` must already be
    /// covered by a published bucket (callers gate on a tail).
    pub(crate) fn load(&self, idx: u32) -> u64 {
        let (bucket_idx, bucket_off, _) = fine_locate(idx);
        let bucket = self.buckets[bucket_idx].load(Ordering::Acquire);
        debug_assert!(!bucket.is_null(), "load of un-allocated monolog bucket");
        unsafe { (*bucket.add(bucket_off as usize)).load(Ordering::Acquire) }
    }
}

impl Drop for FineLog {
    fn drop(&mut self) {
        for (bucket_idx, slot) in self.buckets.iter_mut().enumerate() {
            let ptr = *slot.get_mut();
            if !ptr.is_null() {
                let len = 1usize << (bucket_idx as u32 + FBS_HIBIT);
                unsafe { drop(Box::from_raw(std::slice::from_raw_parts_mut(ptr, len))) };
            }
        }
    }
}

// Safety: all access goes through the atomics; raw pointers are only ever
// read after an acquire load of the owning slot.
unsafe impl Send for FineLog {}
unsafe impl Sync for FineLog {}

/// Coarse-grained, grow-on-demand array of raw bytes. The substrate for
/// [`crate::bytelog::ByteLog`]. Element writes are plain (non-atomic)
/// copies: callers only ever touch a byte range they alone reserved via a
/// tail `fetch_add`, so no two threads ever write the same byte (see
/// spec §4.2).
pub(crate) struct CoarseBytes {
    bucket_size: usize,
    buckets: Vec<AtomicPtr<u8>>,
}

impl CoarseBytes {
    pub(crate) fn new(bucket_size: usize, nbuckets: usize) -> CoarseBytes {
        let mut buckets = Vec::with_capacity(nbuckets);
        buckets.resize_with(nbuckets, || AtomicPtr::new(std::ptr::null_mut()));
        CoarseBytes {
            bucket_size,
            buckets,
        }
    }

    fn locate(&self, offset: u64) -> (usize, usize) {
        let bucket_idx = (offset / self.bucket_size as u64) as usize;
        let bucket_off = (offset % self.bucket_size as u64) as usize;
        (bucket_idx, bucket_off)
    }

    fn bucket(&self, bucket_idx: usize) -> *mut u8 {
        let slot = &self.buckets[bucket_idx];
        let existing = slot.load(Ordering::Acquire);
        if !existing.is_null() {
            return existing;
        }
        let fresh = {
            let v = vec![0u8; self.bucket_size];
            Box::into_raw(v.into_boxed_slice()) as *mut u8
        };
        match slot.compare_exchange(
            std::ptr::null_mut(),
            fresh,
            Ordering::Release,
            Ordering::Acquire,
        ) {
            Ok(_) => fresh,
            Err(_) => {
                unsafe {
                    drop(Box::from_raw(std::slice::from_raw_parts_mut(
                        fresh,
                        self.bucket_size,
                    )))
                };
                slot.load(Ordering::Acquire)
            }
        }
    }

    /// Allocate every bucket covering the half-open byte range `[lo, hi)`.
    pub(crate) fn ensure_allocated(&self, lo: u64, hi: u64) {
        if hi <= lo {
            return;
        }
        let (first, _) = self.locate(lo);
        let (last, _) = self.locate(hi - 1);
        for bucket_idx in first..=last {
            self.bucket(bucket_idx);
        }
    }

    /// Copy `src` into the array starting at `offset`, splitting the copy
    /// across bucket boundaries as needed.
    pub(crate) fn write(&self, offset: u64, src: &[u8]) {
        let (mut bucket_idx, mut bucket_off) = self.locate(offset);
        let mut remaining = src.len();
        let mut src_off = 0usize;
        while remaining > 0 {
            let bucket = self.bucket(bucket_idx);
            let room = self.bucket_size - bucket_off;
            let n = room.min(remaining);
            unsafe {
                std::ptr::copy_nonoverlapping(
                    src.as_ptr().add(src_off),
                    bucket.add(bucket_off),
                    n,
                );
            }
            src_off += n;
            remaining -= n;
            bucket_idx += 1;
            bucket_off = 0;
        }
    }

    /// Copy `dst.len()` bytes starting at `offset` into `dst`, splitting
    /// the copy across bucket boundaries as needed.
    pub(crate) fn read(&self, offset: u64, dst: &mut [u8]) {
        let (mut bucket_idx, mut bucket_off) = self.locate(offset);
        let mut remaining = dst.len();
        let mut dst_off = 0usize;
        while remaining > 0 {
            let bucket = self.buckets[bucket_idx].load(Ordering::Acquire);
            debug_assert!(!bucket.is_null(), "read of un-allocated byte-log bucket");
            let room = self.bucket_size - bucket_off;
            let n = room.min(remaining);
            unsafe {
                std::ptr::copy_nonoverlapping(
                    bucket.add(bucket_off),
                    dst.as_mut_ptr().add(dst_off),
                    n,
                );
            }
            dst_off += n;
            remaining -= n;
            bucket_idx += 1;
            bucket_off = 0;
        }
    }

    pub(crate) fn storage_size(&self) -> usize {
        let bucket_ptrs = self.buckets.len() * std::mem::size_of::<AtomicPtr<u8>>();
        let allocated = self
            .buckets
            .iter()
            .filter(|b| !b.load(Ordering::Acquire).is_null())
            .count()
            * self.bucket_size;
        bucket_ptrs + allocated
    }

    pub(crate) fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    pub(crate) fn nbuckets(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn is_bucket_allocated(&self, bucket_idx: usize) -> bool {
        !self.buckets[bucket_idx].load(Ordering::Acquire).is_null()
    }

    /// Force-allocate bucket `bucket_idx` and overwrite it wholesale with
    /// `src` (must be exactly `bucket_size` bytes). Used by the serialised
    /// form's decode path, which restores one bucket-sized segment at a time.
    pub(crate) fn write_bucket(&self, bucket_idx: usize, src: &[u8]) {
        debug_assert_eq!(src.len(), self.bucket_size);
        let bucket = self.bucket(bucket_idx);
        unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), bucket, self.bucket_size) };
    }

    pub(crate) fn read_bucket(&self, bucket_idx: usize, dst: &mut [u8]) {
        debug_assert_eq!(dst.len(), self.bucket_size);
        let bucket = self.buckets[bucket_idx].load(Ordering::Acquire);
        debug_assert!(!bucket.is_null(), "read_bucket of un-allocated bucket");
        unsafe { std::ptr::copy_nonoverlapping(bucket, dst.as_mut_ptr(), self.bucket_size) };
    }
}

impl Drop for CoarseBytes {
    fn drop(&mut self) {
        for slot in self.buckets.iter_mut() {
            let ptr = *slot.get_mut();
            if !ptr.is_null() {
                unsafe {
                    drop(Box::from_raw(std::slice::from_raw_parts_mut(
                        ptr,
                        self.bucket_size,
                    )))
                };
            }
        }
    }
}

unsafe impl Send for CoarseBytes {}
unsafe impl Sync for CoarseBytes {}

/// Coarse-grained, grow-on-demand array of `AtomicU64` words. The
/// substrate for [`crate::offsetlog::OffsetLog`].
pub(crate) struct CoarseWords {
    bucket_entries: usize,
    buckets: Vec<AtomicPtr<AtomicU64>>,
}

impl CoarseWords {
    pub(crate) fn new(bucket_entries: usize, nbuckets: usize) -> CoarseWords {
        let mut buckets = Vec::with_capacity(nbuckets);
        buckets.resize_with(nbuckets, || AtomicPtr::new(std::ptr::null_mut()));
        CoarseWords {
            bucket_entries,
            buckets,
        }
    }

    fn locate(&self, idx: u64) -> (usize, usize) {
        let bucket_idx = (idx / self.bucket_entries as u64) as usize;
        let bucket_off = (idx % self.bucket_entries as u64) as usize;
        (bucket_idx, bucket_off)
    }

    fn bucket(&self, bucket_idx: usize) -> *mut AtomicU64 {
        let slot = &self.buckets[bucket_idx];
        let existing = slot.load(Ordering::Acquire);
        if !existing.is_null() {
            return existing;
        }
        let fresh = alloc_u64_bucket(self.bucket_entries as u32);
        publish_u64_bucket(slot, fresh, self.bucket_entries as u32)
    }

    pub(crate) fn ensure_allocated(&self, lo: u64, hi: u64) {
        if hi <= lo {
            return;
        }
        let (first, _) = self.locate(lo);
        let (last, _) = self.locate(hi - 1);
        for bucket_idx in first..=last {
            self.bucket(bucket_idx);
        }
    }

    pub(crate) fn store(&self, idx: u64, val: u64) {
        let (bucket_idx, bucket_off) = self.locate(idx);
        let bucket = self.bucket(bucket_idx);
        unsafe { (*bucket.add(bucket_off)).store(val, Ordering::Release) };
    }

    pub(crate) fn load(&self, idx: u64) -> u64 {
        let (bucket_idx, bucket_off) = self.locate(idx);
        let bucket = self.buckets[bucket_idx].load(Ordering::Acquire);
        debug_assert!(!bucket.is_null(), "load of un-allocated offset-log bucket");
        unsafe { (*bucket.add(bucket_off)).load(Ordering::Acquire) }
    }

    pub(crate) fn storage_size(&self) -> usize {
        let bucket_ptrs = self.buckets.len() * std::mem::size_of::<AtomicPtr<AtomicU64>>();
        let allocated = self
            .buckets
            .iter()
            .filter(|b| !b.load(Ordering::Acquire).is_null())
            .count()
            * self.bucket_entries
            * std::mem::size_of::<AtomicU64>();
        bucket_ptrs + allocated
    }
}

impl Drop for CoarseWords {
    fn drop(&mut self) {
        for slot in self.buckets.iter_mut() {
            let ptr = *slot.get_mut();
            if !ptr.is_null() {
                unsafe {
                    drop(Box::from_raw(std::slice::from_raw_parts_mut(
                        ptr,
                        self.bucket_entries,
                    )))
                };
            }
        }
    }
}

unsafe impl Send for CoarseWords {}
unsafe impl Sync for CoarseWords {}

#[cfg(test)]
#[path = "monolog_test.rs"]
mod monolog_test;
