//! Module `store` implements component 7: the orchestrator. Allocates
//! record ids, appends bytes, dispatches to indexes and streams, and
//! exposes the public query surface (spec §4.7).

use std::sync::RwLock;

use crate::bytelog::ByteLog;
use crate::config::Config;
use crate::err_at;
use crate::error::Result;
use crate::filter::FilterIter;
use crate::offsetlog::OffsetLog;
use crate::stream::{Predicate, Stream};
use crate::tieredindex::TieredIndex;
use crate::types::{Entry, RecordId, StorageFootprint, Token};

/// Minimum base for any `index_id`; also the modulus that recovers a
/// width class from an `index_id` (spec §3 "Index descriptor").
const OFFSETMIN: u32 = 1024;

/// `base(width)` for `width` in `1..=8`, i.e. `OFFSETMIN * class_code`
/// with class codes `1,2,4,8,16,32,64,128` — matches the width/class
/// table in spec §8 S6, and the `OFFSET1..OFFSET8` constants of the
/// source this engine's index dispatch is modelled on.
const WIDTH_BASE: [u32; 8] = [1024, 2048, 4096, 8192, 16384, 32768, 65536, 131072];

fn base_for_width(width: u8) -> u32 {
    WIDTH_BASE[(width - 1) as usize]
}

fn width_from_class_code(class_code: u32) -> Option<u8> {
    match class_code {
        1 => Some(1),
        2 => Some(2),
        4 => Some(3),
        8 => Some(4),
        16 => Some(5),
        32 => Some(6),
        64 => Some(7),
        128 => Some(8),
        _ => None,
    }
}

/// Split an `index_id` back into `(width, slot)`, or `None` if it does not
/// decode to one of the eight known width classes (spec §7
/// `unknown_index`).
fn decode_index_id(index_id: u32) -> Option<(u8, u32)> {
    let class_code = index_id / OFFSETMIN;
    let slot = index_id % OFFSETMIN;
    width_from_class_code(class_code).map(|width| (width, slot))
}

fn width_mask(width: u8) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1u64 << (width as u32 * 8)) - 1
    }
}

/// A record may not exceed this many bytes (spec §3, §4.4's 16-bit length
/// field).
pub const MAX_RECORD_LEN: usize = (1 << 16) - 1;

/// The log store: an in-memory, append-only, lock-free-on-the-hot-path
/// store with secondary indexing and derived streams.
pub struct LogStore {
    name: String,
    byte_log: ByteLog,
    offset_log: OffsetLog,
    indexes: [RwLock<Vec<Box<TieredIndex>>>; 8],
    streams: RwLock<Vec<Box<Stream>>>,
}

impl LogStore {
    pub fn new(config: Config) -> LogStore {
        LogStore {
            name: config.name.clone(),
            byte_log: ByteLog::new(config.coarse_bucket_bytes()),
            offset_log: OffsetLog::new(config.coarse_bucket_entries()),
            indexes: std::array::from_fn(|_| RwLock::new(Vec::new())),
            streams: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a new index for tokens of `width` bytes. Returns 0 if
    /// `width` is outside `1..=8` (spec §4.7, §7 `width_unsupported`).
    pub fn add_index(&self, width: u8) -> u32 {
        if !(1..=8).contains(&width) {
            log::warn!(target: "monolog::store", "add_index: unsupported width {}", width);
            return 0;
        }
        let registry = &self.indexes[(width - 1) as usize];
        let mut guard = registry.write().unwrap();
        let slot = guard.len() as u32;
        guard.push(Box::new(TieredIndex::new(width)));
        drop(guard);
        let index_id = base_for_width(width) + slot;
        log::debug!(
            target: "monolog::store",
            "add_index: width={} slot={} index_id={}",
            width,
            slot,
            index_id
        );
        index_id
    }

    /// Register a new derived stream. Returns its `stream_id`.
    pub fn add_stream(&self, predicate: Predicate) -> u32 {
        let mut guard = self.streams.write().unwrap();
        let stream_id = guard.len() as u32;
        guard.push(Box::new(Stream::new(predicate)));
        drop(guard);
        log::debug!(target: "monolog::store", "add_stream: stream_id={}", stream_id);
        stream_id
    }

    /// Look up an index by `index_id` without holding any lock across the
    /// traversal that follows. Sound because registries only ever grow
    /// (never remove or move an entry): once `Box::into_raw`-backed, a
    /// `TieredIndex`'s address is stable for the life of the store.
    fn locate_index(&self, index_id: u32) -> Option<&TieredIndex> {
        let (width, slot) = decode_index_id(index_id)?;
        let registry = &self.indexes[(width - 1) as usize];
        let guard = registry.read().unwrap();
        let boxed = guard.get(slot as usize)?;
        let ptr: *const TieredIndex = boxed.as_ref();
        drop(guard);
        // SAFETY: see the function's doc comment.
        Some(unsafe { &*ptr })
    }

    fn locate_stream(&self, stream_id: u32) -> Option<&Stream> {
        let guard = self.streams.read().unwrap();
        let boxed = guard.get(stream_id as usize)?;
        let ptr: *const Stream = boxed.as_ref();
        drop(guard);
        // SAFETY: see `locate_index`.
        Some(unsafe { &*ptr })
    }

    /// Append `bytes` with its `tokens`, per the `insert` protocol (spec
    /// §4.7). Returns the assigned `record_id`.
    pub fn insert(&self, bytes: &[u8], tokens: &[Token]) -> Result<RecordId> {
        if bytes.len() > MAX_RECORD_LEN {
            return err_at!(
                RecordTooLarge,
                msg: "record of {} bytes exceeds {}-byte cap",
                bytes.len(),
                MAX_RECORD_LEN
            );
        }

        let len = bytes.len() as u64;
        let offset = self.byte_log.reserve(len)?;
        self.byte_log.ensure_allocated(offset, offset + len);

        let record_id = self.offset_log.begin_append(offset, len)?;
        self.byte_log.write(offset, bytes);

        for token in tokens {
            match decode_index_id(token.index_id) {
                Some((width, _slot)) => {
                    if let Some(index) = self.locate_index(token.index_id) {
                        index.add_entry(token.value & width_mask(width), record_id);
                    }
                }
                None => {
                    // unknown_index on add_entry is a no-op (spec §7).
                }
            }
        }

        {
            let guard = self.streams.read().unwrap();
            for stream in guard.iter() {
                stream.evaluate(record_id, bytes, tokens);
            }
        }

        self.offset_log.end_append(record_id);
        Ok(record_id)
    }

    /// Read a whole record into `buf`. `false` iff `record_id` is not yet
    /// visible (spec §4.7 `get`).
    pub fn get(&self, record_id: RecordId, buf: &mut [u8]) -> bool {
        if !self.offset_log.is_visible(record_id) {
            return false;
        }
        let (offset, length) = self.offset_log.lookup(record_id);
        self.byte_log.read(offset, &mut buf[..length as usize]);
        true
    }

    /// Ergonomic wrapper over `get` that owns its buffer (spec §3's
    /// supplemental `Entry` view type).
    pub fn get_entry(&self, record_id: RecordId) -> Option<Entry> {
        if !self.offset_log.is_visible(record_id) {
            return None;
        }
        let (offset, length) = self.offset_log.lookup(record_id);
        let mut bytes = vec![0u8; length as usize];
        self.byte_log.read(offset, &mut bytes);
        Some(Entry::new(record_id, bytes))
    }

    /// Partial read, clamping `len` to the record's actual remaining
    /// length (spec §4.7 `extract`, §9's explicit-clamp design note).
    /// Returns `(found, bytes_read)`.
    pub fn extract(&self, record_id: RecordId, off: u64, len: u64, buf: &mut [u8]) -> (bool, usize) {
        if !self.offset_log.is_visible(record_id) {
            return (false, 0);
        }
        let (offset, length) = self.offset_log.lookup(record_id);
        let clamped = len.min(length.saturating_sub(off)) as usize;
        self.byte_log.read(offset + off, &mut buf[..clamped]);
        (true, clamped)
    }

    /// Range-scan `index_id` over `[v_lo, v_hi]`, snapshotting the current
    /// visibility ceiling (spec §4.7 `filter`). Empty iterator if
    /// `index_id` does not decode to a registered index.
    pub fn filter(&self, index_id: u32, v_lo: u64, v_hi: u64) -> FilterIter<'_> {
        let ceiling = self.offset_log.num_visible();
        FilterIter::new(self.locate_index(index_id), v_lo, v_hi, ceiling)
    }

    /// Snapshot the ids a stream has accepted so far, in posting order.
    pub fn stream_snapshot(&self, stream_id: u32) -> Vec<RecordId> {
        match self.locate_stream(stream_id) {
            Some(stream) => stream.iter_snapshot().collect(),
            None => Vec::new(),
        }
    }

    pub fn stream_size(&self, stream_id: u32) -> u32 {
        self.locate_stream(stream_id).map_or(0, Stream::size)
    }

    pub fn num_records(&self) -> u64 {
        self.offset_log.num_visible()
    }

    /// Byte-log usage: bytes physically backed by allocated buckets, not
    /// merely reserved.
    pub fn size(&self) -> u64 {
        self.byte_log.storage_size() as u64
    }

    pub fn storage_footprint(&self) -> StorageFootprint {
        let indexes = self
            .indexes
            .iter()
            .map(|registry| {
                registry
                    .read()
                    .unwrap()
                    .iter()
                    .map(|index| index.storage_size())
                    .sum::<usize>()
            })
            .sum();
        let streams = self.streams.read().unwrap().len() * std::mem::size_of::<Stream>();
        StorageFootprint {
            byte_log: self.byte_log.storage_size(),
            offset_log: self.offset_log.storage_size(),
            indexes,
            streams,
        }
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;
