//! Token allocator
//!
//! The serializing core: owns the global tail and every derived index,
//! and is the only writer to any of them. `handle` takes `&mut self`, so
//! serialization is by construction; wrap the sequencer in a mutex or
//! put it behind [`crate::SequencerService`] to share it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokenlog_common::{NO_POSITION, StreamId};
use tokenlog_lease_store::LeaseStore;
use tokenlog_protocol::{TokenRequest, TokenResponse};

use crate::config::SequencerConfig;
use crate::conflict::ConflictCache;
use crate::error::Result;
use crate::lease::LeaseManager;
use crate::streams::StreamIndex;

/// The token-issuing core
pub struct Sequencer {
    /// Next global position to be issued
    global_tail: i64,
    lease: LeaseManager,
    streams: StreamIndex,
    conflicts: ConflictCache,
}

impl Sequencer {
    /// Boot the sequencer against the given lease store
    ///
    /// Reads the persisted lease and skips past the previous holder's
    /// range (or honors the configured initial-token override). Fails if
    /// the store cannot be read or the new lease cannot be persisted.
    pub fn new(store: Arc<dyn LeaseStore>, config: SequencerConfig) -> Result<Self> {
        let conflict_cache_size = config.conflict_cache_size;
        let (lease, tail) = LeaseManager::initialize(store, &config)?;
        Ok(Self {
            global_tail: tail,
            lease,
            streams: StreamIndex::new(),
            conflicts: ConflictCache::with_capacity(conflict_cache_size),
        })
    }

    /// Next position to be issued
    pub fn global_tail(&self) -> i64 {
        self.global_tail
    }

    /// First position past the currently persisted lease range
    pub fn lease_limit(&self) -> i64 {
        self.lease.limit()
    }

    /// Service a token request
    ///
    /// Every error leaves the global tail and all indices untouched, so
    /// the caller may retry.
    pub fn handle(&mut self, req: &TokenRequest) -> Result<TokenResponse> {
        req.validate()?;

        // Zero tokens requested: a pure query of the current tail(s)
        if req.num_tokens == 0 {
            return Ok(self.latest_offsets(req));
        }

        // Renew the lease ahead of exhaustion
        self.lease.maybe_renew(self.global_tail);

        let n = i64::from(req.num_tokens);

        // No streams: allocate at the tail of the global log, no index
        // updates. Distinct from an empty stream set, which queries.
        let streams = match &req.streams {
            None => {
                self.lease.ensure_capacity(self.global_tail + n)?;
                let base = self.global_tail;
                self.global_tail += n;
                tracing::trace!(base, n, "raw grant");
                return Ok(TokenResponse::new(base, BTreeMap::new(), BTreeMap::new()));
            }
            Some(streams) => streams,
        };

        if req.txn_resolution
            && !self.txn_resolution(req.read_timestamp, &req.read_set, &req.conflict_keys)
        {
            // The txn aborts: do not hand out a token
            return Ok(TokenResponse::aborted());
        }

        self.lease.ensure_capacity(self.global_tail + n)?;
        let base = self.global_tail;
        let end = base + n - 1;
        self.global_tail += n;

        let mut backpointer_map = BTreeMap::new();
        let mut stream_tokens = BTreeMap::new();
        for id in streams {
            backpointer_map.insert(*id, self.streams.update_backpointer(*id, end));

            // Action table for (overwrite, replex_overwrite): a global-log
            // retry burns a global position but must not inflate local
            // stream offsets; a local-layer retry behaves like a fresh
            // write.
            if req.replex_overwrite || !req.overwrite {
                stream_tokens.insert(*id, self.streams.advance_local(*id, req.num_tokens));
            }
        }

        if req.txn_resolution {
            for key in &req.conflict_keys {
                self.conflicts.record_write(key, end);
            }
        }

        tracing::trace!(base, end, streams = streams.len(), "grant");
        Ok(TokenResponse::new(base, backpointer_map, stream_tokens))
    }

    /// Query path: report tails without advancing anything
    fn latest_offsets(&self, req: &TokenRequest) -> TokenResponse {
        let mut stream_tails = BTreeMap::new();
        let mut max_stream_global = NO_POSITION;

        if let Some(streams) = &req.streams {
            // Collect the latest local offset for every stream in the
            // request, and the latest global offset across all of them.
            for id in streams {
                stream_tails.insert(*id, self.streams.query_local(id));
            }
            max_stream_global = self.streams.max_backpointer(streams);
        }

        // With no streams given, the caller wants the last issued global
        // position.
        let token = match &req.streams {
            Some(streams) if !streams.is_empty() => max_stream_global,
            _ => self.global_tail - 1,
        };

        TokenResponse::new(token, BTreeMap::new(), stream_tails)
    }

    /// Returns true if the txn commits.
    ///
    /// A transaction aborts iff a stream in its read set was extended
    /// past the snapshot, or a cached conflict key was written past it.
    /// A conflict cache miss is safe: eviction must never force an abort,
    /// and the back-pointer check is the ground truth.
    fn txn_resolution(
        &self,
        read_timestamp: i64,
        read_set: &BTreeSet<StreamId>,
        conflict_keys: &BTreeSet<Vec<u8>>,
    ) -> bool {
        tracing::trace!(read_timestamp, streams = read_set.len(), "txn resolution");

        for id in read_set {
            let back = self.streams.query_back(id);
            if back != NO_POSITION && back > read_timestamp {
                tracing::debug!(
                    stream = %id,
                    back,
                    read_timestamp,
                    "rejecting txn: stream extended past snapshot"
                );
                return false;
            }
        }

        for key in conflict_keys {
            if let Some(pos) = self.conflicts.lookup(key) {
                if pos > read_timestamp {
                    tracing::debug!(
                        pos,
                        read_timestamp,
                        "rejecting txn: conflict key written past snapshot"
                    );
                    return false;
                }
            }
        }

        true
    }
}
