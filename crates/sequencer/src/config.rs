//! Sequencer configuration

/// Configuration for the sequencer core
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Administrative override for the initial token
    ///
    /// When set, the lease is reset to this position and issuance starts
    /// there, bypassing the skip-forward rule applied on normal restarts.
    pub initial_token: Option<i64>,

    /// Number of positions covered by one persisted lease
    pub lease_length: i64,

    /// Renewal slack: renew once the tail is this close to the bound
    pub lease_renewal_notice: i64,

    /// Maximum number of conflict cache entries
    pub conflict_cache_size: usize,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            initial_token: None,
            lease_length: 100_000,
            lease_renewal_notice: 10_000,
            conflict_cache_size: 10_000,
        }
    }
}

impl SequencerConfig {
    /// Set the initial token override
    pub fn with_initial_token(mut self, token: i64) -> Self {
        self.initial_token = Some(token);
        self
    }

    /// Set the lease length
    pub fn with_lease_length(mut self, length: i64) -> Self {
        self.lease_length = length;
        self
    }

    /// Set the renewal notice threshold
    pub fn with_lease_renewal_notice(mut self, notice: i64) -> Self {
        self.lease_renewal_notice = notice;
        self
    }

    /// Set the conflict cache bound
    pub fn with_conflict_cache_size(mut self, size: usize) -> Self {
        self.conflict_cache_size = size;
        self
    }
}
