//! Error types for the sequencer

use thiserror::Error;
use tokenlog_lease_store::LeaseStoreError;
use tokenlog_protocol::RequestError;

/// Result type for sequencer operations
pub type Result<T> = std::result::Result<T, SequencerError>;

/// Errors that can occur while serving token requests
#[derive(Debug, Clone, Error)]
pub enum SequencerError {
    /// The grant would advance the tail past the persisted lease bound
    /// and the bound could not be durably extended. The tail was not
    /// advanced; the caller may retry.
    #[error("lease exhausted: position {needed} exceeds persisted bound {bound}")]
    LeaseExhausted { needed: i64, bound: i64 },

    /// The lease store failed outside a grant (boot, explicit reset)
    #[error("lease store error: {0}")]
    Storage(#[from] LeaseStoreError),

    /// The request carried a field combination the protocol forbids
    #[error("malformed request: {0}")]
    MalformedRequest(#[from] RequestError),

    /// The service task is gone
    #[error("sequencer service unavailable")]
    ServiceUnavailable,
}
