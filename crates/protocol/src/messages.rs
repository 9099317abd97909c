//! Token request payload
//!
//! A single request shape covers all four call forms the sequencer serves:
//! tail queries (`num_tokens == 0`), raw global allocations (`streams`
//! absent), stream appends, and transaction commits. A missing `streams`
//! field and an empty set mean different things and must stay distinct:
//! absent takes the raw-allocation path, empty queries the global tail.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tokenlog_common::StreamId;

/// Request for the next token(s) at the sequencer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
    /// Number of contiguous positions requested; 0 means query
    pub num_tokens: u32,

    /// Streams the entry belongs to; `None` means "no streams"
    pub streams: Option<BTreeSet<StreamId>>,

    /// The global log layer retried this position
    pub overwrite: bool,

    /// The local stream layer retried this position
    pub replex_overwrite: bool,

    /// Treat this request as a transaction commit
    pub txn_resolution: bool,

    /// Snapshot position of the transaction; meaningful only when
    /// `txn_resolution` is set
    pub read_timestamp: i64,

    /// Streams read by the transaction
    pub read_set: BTreeSet<StreamId>,

    /// Optional fine-grained conflict set; keys written by the transaction
    pub conflict_keys: BTreeSet<Vec<u8>>,
}

impl TokenRequest {
    /// Query the current tails without allocating anything
    pub fn query(streams: impl IntoIterator<Item = StreamId>) -> Self {
        Self {
            num_tokens: 0,
            streams: Some(streams.into_iter().collect()),
            ..Self::base()
        }
    }

    /// Allocate `num_tokens` positions at the global tail, touching no streams
    pub fn raw(num_tokens: u32) -> Self {
        Self {
            num_tokens,
            streams: None,
            ..Self::base()
        }
    }

    /// Append `num_tokens` entries to the given streams
    pub fn append(num_tokens: u32, streams: impl IntoIterator<Item = StreamId>) -> Self {
        Self {
            num_tokens,
            streams: Some(streams.into_iter().collect()),
            ..Self::base()
        }
    }

    /// Turn an append into a transaction commit against the given snapshot
    pub fn with_txn(
        mut self,
        read_timestamp: i64,
        read_set: impl IntoIterator<Item = StreamId>,
    ) -> Self {
        self.txn_resolution = true;
        self.read_timestamp = read_timestamp;
        self.read_set = read_set.into_iter().collect();
        self
    }

    /// Attach fine-grained conflict keys to a transaction commit
    pub fn with_conflict_keys(mut self, keys: impl IntoIterator<Item = Vec<u8>>) -> Self {
        self.conflict_keys = keys.into_iter().collect();
        self
    }

    /// Mark this request as a global-layer retry
    pub fn with_overwrite(mut self) -> Self {
        self.overwrite = true;
        self
    }

    /// Mark this request as a local-stream-layer retry
    pub fn with_replex_overwrite(mut self) -> Self {
        self.replex_overwrite = true;
        self
    }

    /// Reject field combinations the protocol forbids
    pub fn validate(&self) -> Result<(), RequestError> {
        // The write protocol terminates on a global overwrite before the
        // local layer can retry, so both flags together cannot happen.
        if self.overwrite && self.replex_overwrite {
            return Err(RequestError::ConflictingOverwriteFlags);
        }
        Ok(())
    }

    fn base() -> Self {
        Self {
            num_tokens: 0,
            streams: None,
            overwrite: false,
            replex_overwrite: false,
            txn_resolution: false,
            read_timestamp: 0,
            read_set: BTreeSet::new(),
            conflict_keys: BTreeSet::new(),
        }
    }
}

/// Errors for requests the sequencer must not act on
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("overwrite and replex_overwrite are mutually exclusive")]
    ConflictingOverwriteFlags,
}
