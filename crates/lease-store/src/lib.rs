//! Lease persistence trait for the sequencer
//!
//! The sequencer's only durable state is a single integer: the starting
//! position of the lease it currently holds. This crate defines the
//! storage trait that guards it; backends supply durability.

use thiserror::Error;

/// Result type for lease store operations
pub type Result<T> = std::result::Result<T, LeaseStoreError>;

/// Errors from a lease storage backend
#[derive(Debug, Clone, Error)]
pub enum LeaseStoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("corrupt lease record: {0}")]
    Corrupt(String),
}

/// Trait for durable lease storage backends
///
/// The store holds one value and does not interpret it. Each call is a
/// direct round-trip; no caching.
pub trait LeaseStore: Send + Sync {
    /// Last durably written lease start, or `None` on first boot
    fn read_lease(&self) -> Result<Option<i64>>;

    /// Durably persist `pos` as the new lease start
    ///
    /// Must not return until the write is durable. Issuing tokens above a
    /// bound that was never durably recorded would let a restarted
    /// process hand the same positions out again.
    fn write_lease(&self, pos: i64) -> Result<()>;
}
