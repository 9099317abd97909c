//! Stream index
//!
//! Two mappings keyed by stream id, mutated together within each grant:
//! the local tail (last issued per-stream offset) and the back-pointer
//! (last global position at which the stream was extended). All writes
//! happen inside the allocator's serialization, so plain maps suffice;
//! a grant's updates are visible in full to the next serialized caller.

use std::collections::HashMap;
use tokenlog_common::{NO_POSITION, StreamId};

/// Per-stream tails and back-pointers
#[derive(Debug, Default)]
pub struct StreamIndex {
    /// Last issued local offset per stream (-1 = none yet)
    local_tails: HashMap<StreamId, i64>,
    /// Last global position at which each stream was extended
    backpointers: HashMap<StreamId, i64>,
}

impl StreamIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `stream` was extended to global position `end` and
    /// return the previous back-pointer (`NO_POSITION` if absent).
    pub fn update_backpointer(&mut self, stream: StreamId, end: i64) -> i64 {
        match self.backpointers.get_mut(&stream) {
            Some(value) => {
                let previous = *value;
                *value = previous.max(end);
                previous
            }
            None => {
                self.backpointers.insert(stream, end);
                NO_POSITION
            }
        }
    }

    /// Advance the local tail of `stream` by `count` entries and return
    /// the new tail.
    pub fn advance_local(&mut self, stream: StreamId, count: u32) -> i64 {
        let tail = self.local_tails.entry(stream).or_insert(NO_POSITION);
        *tail += i64::from(count);
        *tail
    }

    /// Local tail of `stream` (`NO_POSITION` if the stream has no grants)
    pub fn query_local(&self, stream: &StreamId) -> i64 {
        self.local_tails.get(stream).copied().unwrap_or(NO_POSITION)
    }

    /// Back-pointer of `stream` (`NO_POSITION` if absent)
    pub fn query_back(&self, stream: &StreamId) -> i64 {
        self.backpointers.get(stream).copied().unwrap_or(NO_POSITION)
    }

    /// Greatest back-pointer across `streams` (`NO_POSITION` when none of
    /// them have entries)
    pub fn max_backpointer<'a>(&self, streams: impl IntoIterator<Item = &'a StreamId>) -> i64 {
        streams
            .into_iter()
            .fold(NO_POSITION, |acc, id| acc.max(self.query_back(id)))
    }
}
