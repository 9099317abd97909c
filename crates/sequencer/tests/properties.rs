//! Property tests for the sequencer invariants
//!
//! Random request sequences run against the real sequencer and a naive
//! shadow model with unbounded history. The model pins down uniqueness,
//! monotonicity, lease safety, back-pointer and stream-tail behavior, and
//! the transaction safety rule (aborts only on real conflicts, commits
//! only on consistent read sets).

use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tokenlog_common::{NO_POSITION, StreamId};
use tokenlog_lease_store_memory::MemoryLeaseStore;
use tokenlog_protocol::TokenRequest;
use tokenlog_sequencer::{Sequencer, SequencerConfig, SequencerError};

const LEASE_LENGTH: i64 = 50;
const RENEWAL_NOTICE: i64 = 5;
const CONFLICT_CACHE_SIZE: usize = 2;

fn stream(i: usize) -> StreamId {
    StreamId::from_bytes([i as u8 + 1; 16])
}

fn key(i: usize) -> Vec<u8> {
    vec![b'k', i as u8]
}

#[derive(Debug, Clone)]
enum Op {
    Query {
        streams: Vec<usize>,
    },
    Raw {
        n: u32,
    },
    Append {
        n: u32,
        streams: Vec<usize>,
        overwrite: bool,
        replex_overwrite: bool,
    },
    Txn {
        n: u32,
        streams: Vec<usize>,
        read_timestamp: i64,
        read_set: Vec<usize>,
        keys: Vec<usize>,
    },
}

impl Op {
    fn to_request(&self) -> TokenRequest {
        match self {
            Op::Query { streams } => TokenRequest::query(streams.iter().map(|&i| stream(i))),
            Op::Raw { n } => TokenRequest::raw(*n),
            Op::Append {
                n,
                streams,
                overwrite,
                replex_overwrite,
            } => {
                let mut req = TokenRequest::append(*n, streams.iter().map(|&i| stream(i)));
                if *overwrite {
                    req = req.with_overwrite();
                }
                if *replex_overwrite {
                    req = req.with_replex_overwrite();
                }
                req
            }
            Op::Txn {
                n,
                streams,
                read_timestamp,
                read_set,
                keys,
            } => TokenRequest::append(*n, streams.iter().map(|&i| stream(i)))
                .with_txn(*read_timestamp, read_set.iter().map(|&i| stream(i)))
                .with_conflict_keys(keys.iter().map(|&i| key(i))),
        }
    }
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let stream_set = || proptest::collection::vec(0usize..4, 0..3);
    prop_oneof![
        2 => stream_set().prop_map(|streams| Op::Query { streams }),
        2 => (1u32..4).prop_map(|n| Op::Raw { n }),
        // Oversized raw grants force multi-step lease extension
        1 => (40u32..70).prop_map(|n| Op::Raw { n }),
        4 => (1u32..4, stream_set(), any::<bool>(), any::<bool>()).prop_map(
            |(n, streams, overwrite, replex_overwrite)| Op::Append {
                n,
                streams,
                overwrite,
                replex_overwrite,
            }
        ),
        4 => (
            1u32..3,
            stream_set(),
            -1i64..120,
            stream_set(),
            proptest::collection::vec(0usize..3, 0..3),
        )
            .prop_map(|(n, streams, read_timestamp, read_set, keys)| Op::Txn {
                n,
                streams,
                read_timestamp,
                read_set,
                keys,
            }),
    ]
}

/// Unbounded-history twin of the sequencer state
#[derive(Default)]
struct Model {
    tail: i64,
    local: HashMap<usize, i64>,
    back: HashMap<usize, i64>,
    /// Full conflict-key history; the real cache holds a subset of this
    keys: HashMap<Vec<u8>, i64>,
    max_issued: i64,
}

impl Model {
    fn new() -> Self {
        Self {
            max_issued: NO_POSITION,
            ..Self::default()
        }
    }

    fn stream_conflict(&self, read_set: &[usize], read_timestamp: i64) -> bool {
        read_set
            .iter()
            .any(|i| self.back.get(i).is_some_and(|&v| v > read_timestamp))
    }

    fn key_conflict(&self, keys: &[usize], read_timestamp: i64) -> bool {
        keys.iter()
            .any(|&i| self.keys.get(&key(i)).is_some_and(|&v| v > read_timestamp))
    }

    fn apply_grant(&mut self, streams: &[usize], n: u32, advance_local: bool) -> (i64, i64) {
        let base = self.tail;
        let end = base + i64::from(n) - 1;
        self.tail += i64::from(n);
        self.max_issued = self.max_issued.max(end);

        let unique: HashSet<usize> = streams.iter().copied().collect();
        for i in unique {
            let entry = self.back.entry(i).or_insert(NO_POSITION);
            *entry = (*entry).max(end);
            if advance_local {
                *self.local.entry(i).or_insert(NO_POSITION) += i64::from(n);
            }
        }
        (base, end)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn sequencer_matches_unbounded_model(ops in proptest::collection::vec(op_strategy(), 1..80)) {
        let store = Arc::new(MemoryLeaseStore::new());
        let config = SequencerConfig::default()
            .with_lease_length(LEASE_LENGTH)
            .with_lease_renewal_notice(RENEWAL_NOTICE)
            .with_conflict_cache_size(CONFLICT_CACHE_SIZE);
        let mut seq = Sequencer::new(store.clone(), config).unwrap();
        let mut model = Model::new();
        let mut last_persisted = store.current().unwrap();

        for op in &ops {
            let req = op.to_request();
            let result = seq.handle(&req);

            match op {
                Op::Query { streams } => {
                    let resp = result.unwrap();
                    // Queries never move the tail
                    prop_assert_eq!(seq.global_tail(), model.tail);
                    let expected_token = if streams.is_empty() {
                        model.tail - 1
                    } else {
                        streams
                            .iter()
                            .map(|i| model.back.get(i).copied().unwrap_or(NO_POSITION))
                            .fold(NO_POSITION, i64::max)
                    };
                    prop_assert_eq!(resp.token, expected_token);
                    let expected_tails: BTreeMap<StreamId, i64> = streams
                        .iter()
                        .map(|&i| (stream(i), model.local.get(&i).copied().unwrap_or(NO_POSITION)))
                        .collect();
                    prop_assert_eq!(resp.stream_tokens, expected_tails);
                }
                Op::Raw { n } => {
                    let resp = result.unwrap();
                    let (base, _) = model.apply_grant(&[], *n, false);
                    prop_assert_eq!(resp.token, base);
                    prop_assert!(resp.backpointer_map.is_empty());
                    prop_assert!(resp.stream_tokens.is_empty());
                }
                Op::Append { n, streams, overwrite, replex_overwrite } => {
                    if *overwrite && *replex_overwrite {
                        // Forbidden flag pair: rejected before any state moves
                        prop_assert!(matches!(
                            result,
                            Err(SequencerError::MalformedRequest(_))
                        ));
                        prop_assert_eq!(seq.global_tail(), model.tail);
                        continue;
                    }
                    let resp = result.unwrap();
                    let expected_backpointers: BTreeMap<StreamId, i64> = streams
                        .iter()
                        .map(|&i| (stream(i), model.back.get(&i).copied().unwrap_or(NO_POSITION)))
                        .collect();
                    let advance_local = *replex_overwrite || !*overwrite;
                    let (base, _) = model.apply_grant(streams, *n, advance_local);

                    prop_assert_eq!(resp.token, base);
                    prop_assert_eq!(resp.backpointer_map, expected_backpointers);
                    let expected_tokens: BTreeMap<StreamId, i64> = if advance_local {
                        streams
                            .iter()
                            .map(|&i| (stream(i), model.local[&i]))
                            .collect()
                    } else {
                        BTreeMap::new()
                    };
                    prop_assert_eq!(resp.stream_tokens, expected_tokens);
                }
                Op::Txn { n, streams, read_timestamp, read_set, keys } => {
                    let resp = result.unwrap();
                    let stream_conflict = model.stream_conflict(read_set, *read_timestamp);
                    let key_conflict = model.key_conflict(keys, *read_timestamp);

                    if resp.is_abort() {
                        // An abort must correspond to a real conflict;
                        // eviction alone can never cause one
                        prop_assert!(stream_conflict || key_conflict);
                        prop_assert_eq!(seq.global_tail(), model.tail);
                    } else {
                        // A commit must never slip past an extended stream;
                        // the back-pointer rule is exact
                        prop_assert!(!stream_conflict);
                        let (base, end) = model.apply_grant(streams, *n, true);
                        prop_assert_eq!(resp.token, base);
                        for &i in keys {
                            let entry = model.keys.entry(key(i)).or_insert(NO_POSITION);
                            *entry = (*entry).max(end);
                        }
                    }
                }
            }

            // Lease safety: everything ever issued sits under the
            // persisted bound, and the persisted bound never moves back
            let persisted = store.current().unwrap();
            prop_assert!(persisted >= last_persisted);
            last_persisted = persisted;
            prop_assert!(model.max_issued < persisted + LEASE_LENGTH);
            prop_assert!(seq.global_tail() <= persisted + LEASE_LENGTH);
        }

        // Final reconciliation: per-stream tails match the model exactly
        for i in 0..4 {
            let resp = seq.handle(&TokenRequest::query([stream(i)])).unwrap();
            prop_assert_eq!(
                resp.stream_tokens[&stream(i)],
                model.local.get(&i).copied().unwrap_or(NO_POSITION)
            );
        }
    }

    #[test]
    fn issued_ranges_are_unique_and_ordered(sizes in proptest::collection::vec(1u32..8, 1..60)) {
        let store = Arc::new(MemoryLeaseStore::new());
        let config = SequencerConfig::default()
            .with_lease_length(LEASE_LENGTH)
            .with_lease_renewal_notice(RENEWAL_NOTICE);
        let mut seq = Sequencer::new(store, config).unwrap();

        let mut previous_end = NO_POSITION;
        for n in sizes {
            let resp = seq.handle(&TokenRequest::raw(n)).unwrap();
            // Each range begins after every position issued before it
            prop_assert!(resp.token > previous_end);
            previous_end = resp.token + i64::from(n) - 1;
        }
    }

    #[test]
    fn conflict_cache_stays_bounded_and_monotone(
        writes in proptest::collection::vec((0usize..6, 0i64..1000), 1..200)
    ) {
        use tokenlog_sequencer::conflict::ConflictCache;

        let mut cache = ConflictCache::with_capacity(3);
        let mut high_water: HashMap<usize, i64> = HashMap::new();

        for (k, pos) in writes {
            cache.record_write(&key(k), pos);
            let entry = high_water.entry(k).or_insert(NO_POSITION);
            *entry = (*entry).max(pos);

            prop_assert!(cache.len() <= 3);
            // The key just written is resident, and its entry never
            // understates this write nor overstates the true history.
            // Eviction may have dropped an earlier, higher position; the
            // cache is allowed to forget, never to invent.
            let cached = cache.lookup(&key(k)).unwrap();
            prop_assert!(cached >= pos);
            prop_assert!(cached <= *entry);
        }
    }
}
