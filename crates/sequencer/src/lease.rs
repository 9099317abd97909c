//! Lease management
//!
//! The sequencer may only issue positions inside `[L, L + lease_length)`
//! where `L` is the last durably persisted lease start. On boot the lease
//! skips forward past the previous holder's entire range: that process
//! may have issued any position inside it, and reusing one would break
//! total-order uniqueness. If two processes both believe they are the
//! sequencer, each skip keeps their issued ranges disjoint as long as
//! neither exceeds its bound, which makes the bound a correctness
//! guarantee rather than a performance knob.
//!
//! Only the lease start is persisted. Stream tails and the conflict cache
//! are rebuilt empty after a restart, so local counts for streams that
//! were active under the previous lease undercount reality; global
//! ordering is unaffected.

use std::sync::Arc;
use tokenlog_lease_store::LeaseStore;

use crate::config::SequencerConfig;
use crate::error::{Result, SequencerError};

/// In-memory view of the persisted lease
pub struct LeaseManager {
    store: Arc<dyn LeaseStore>,
    lease_start: i64,
    lease_length: i64,
    renewal_notice: i64,
}

impl LeaseManager {
    /// Read (or create) the persisted lease and return the manager
    /// together with the initial global tail.
    pub fn initialize(
        store: Arc<dyn LeaseStore>,
        config: &SequencerConfig,
    ) -> Result<(Self, i64)> {
        let lease_start = match config.initial_token {
            Some(token) => {
                // Administrative reset: start exactly where the operator
                // says, bypassing the skip-forward rule.
                store.write_lease(token)?;
                tracing::info!(token, "lease reset to operator-supplied initial token");
                token
            }
            None => match store.read_lease()? {
                Some(previous) => {
                    // Skip the previous holder's entire range.
                    let start = previous + config.lease_length;
                    store.write_lease(start)?;
                    tracing::info!(previous, start, "skipping past previous lease");
                    start
                }
                None => {
                    store.write_lease(0)?;
                    tracing::info!("first boot, leasing from the start of the log");
                    0
                }
            },
        };

        let manager = Self {
            store,
            lease_start,
            lease_length: config.lease_length,
            renewal_notice: config.lease_renewal_notice,
        };
        Ok((manager, lease_start))
    }

    /// Current lease start
    pub fn start(&self) -> i64 {
        self.lease_start
    }

    /// First position past the currently leased range
    pub fn limit(&self) -> i64 {
        self.lease_start + self.lease_length
    }

    /// Renew ahead of exhaustion once the tail crosses the notice
    /// threshold. A failed store write is tolerated here: the grant still
    /// fits under the old bound, and `ensure_capacity` enforces the hard
    /// limit.
    pub fn maybe_renew(&mut self, current_tail: i64) {
        if current_tail < self.limit() - self.renewal_notice {
            return;
        }
        let next = self.lease_start + self.lease_length;
        match self.store.write_lease(next) {
            Ok(()) => {
                tracing::info!(start = next, "lease renewed");
                self.lease_start = next;
            }
            Err(e) => {
                tracing::warn!(error = %e, "lease renewal failed, continuing under current bound");
            }
        }
    }

    /// Make sure every position below `needed` sits under a durably
    /// persisted bound, extending the lease as many times as it takes.
    /// Refuses with `LeaseExhausted` when the store will not accept the
    /// extension; the caller must not advance the tail in that case.
    pub fn ensure_capacity(&mut self, needed: i64) -> Result<()> {
        while self.limit() < needed {
            let next = self.lease_start + self.lease_length;
            if let Err(e) = self.store.write_lease(next) {
                tracing::warn!(error = %e, needed, bound = self.limit(), "cannot extend lease");
                return Err(SequencerError::LeaseExhausted {
                    needed,
                    bound: self.limit(),
                });
            }
            self.lease_start = next;
        }
        Ok(())
    }
}
