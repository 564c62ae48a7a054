//! Module `stream` implements component 6: a derived posting list fed by a
//! user predicate invoked on every insert (spec §4.6).

use crate::postinglist::ConsistentPostingList;
use crate::types::{RecordId, Token};

/// Predicate signature from spec §4.6: pure, side-effect free, callable
/// concurrently from arbitrary writer threads.
pub type Predicate = Box<dyn Fn(RecordId, &[u8], usize, &[Token]) -> bool + Send + Sync>;

pub(crate) struct Stream {
    predicate: Predicate,
    postings: ConsistentPostingList,
}

impl Stream {
    pub(crate) fn new(predicate: Predicate) -> Stream {
        Stream {
            predicate,
            postings: ConsistentPostingList::new(),
        }
    }

    /// Evaluate this stream's predicate against a just-reserved (not yet
    /// published) record, appending its id on a match. Uses the consistent
    /// posting-list variant so a reader's `size()` never exposes a
    /// reserved-but-unwritten slot.
    pub(crate) fn evaluate(&self, record_id: RecordId, bytes: &[u8], tokens: &[Token]) {
        if (self.predicate)(record_id, bytes, bytes.len(), tokens) {
            self.postings.push_back(record_id);
        }
    }

    pub(crate) fn size(&self) -> u32 {
        self.postings.size()
    }

    pub(crate) fn iter_snapshot(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.postings.iter_snapshot()
    }
}

#[cfg(test)]
#[path = "stream_test.rs"]
mod stream_test;
